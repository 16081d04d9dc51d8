//! Error types.
use std::{any::Any, fmt, sync::Arc};

use snafu::Snafu;

/// A generic error.
///
/// Raw callables handed to a computation can fail with any error that converts into this type, which covers every
/// `std::error::Error + Send + Sync + 'static` as well as errors built with [`generic_error!`][crate::generic_error].
pub type GenericError = anyhow::Error;

/// The outcome of running a computation.
pub type Outcome<T> = Result<T, ComputationError>;

/// A computation error.
///
/// Errors are cheap to clone, as a single failure may need to be observed by every holder of a shared computation.
#[derive(Clone, Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ComputationError {
    /// The wrapped callable returned an error.
    #[snafu(display("{}", error))]
    BranchFailure {
        /// Error returned by the callable, unchanged.
        error: Arc<GenericError>,
    },

    /// The wrapped callable panicked.
    #[snafu(display("Computation panicked: {}", message))]
    Panicked {
        /// Panic message, if the payload was a string.
        message: String,
    },

    /// A computation was invoked, or its result extracted, more than once.
    #[snafu(display("Computation was already invoked."))]
    AlreadyInvoked,

    /// The result of a computation taking arguments was requested before it was invoked.
    #[snafu(display("Computation has not been invoked yet."))]
    NotInvoked,

    /// Every operand of a race failed.
    #[snafu(display("All {} race branches failed. Last failure: {}", failures.len(), LastFailure(failures)))]
    AllBranchesFailed {
        /// Failures of each operand, in operand order.
        failures: Vec<ComputationError>,
    },
}

impl ComputationError {
    pub(crate) fn from_generic(error: GenericError) -> Self {
        Self::BranchFailure { error: Arc::new(error) }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_string()
        };

        Self::Panicked { message }
    }

    /// Combines the failures of two race operands, flattening nested races so operand order is preserved.
    pub(crate) fn all_branches_failed(lhs: Self, rhs: Self) -> Self {
        let mut failures = lhs.into_failures();
        failures.extend(rhs.into_failures());
        Self::AllBranchesFailed { failures }
    }

    fn into_failures(self) -> Vec<Self> {
        match self {
            Self::AllBranchesFailed { failures } => failures,
            other => vec![other],
        }
    }

    /// Returns `true` if this error indicates misuse of a computation rather than a failure of its work.
    ///
    /// Misuse is never recovered by a race.
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::AlreadyInvoked | Self::NotInvoked)
    }

    /// Returns the failure surfaced by this error.
    ///
    /// When every race operand failed, this is the failure of the last operand. Otherwise, it is this error.
    pub fn surfaced(&self) -> &Self {
        match self {
            Self::AllBranchesFailed { failures } => failures.last().map(Self::surfaced).unwrap_or(self),
            other => other,
        }
    }

    /// Returns the individual operand failures if every operand of a race failed.
    pub fn failures(&self) -> Option<&[ComputationError]> {
        match self {
            Self::AllBranchesFailed { failures } => Some(failures),
            _ => None,
        }
    }

    /// Returns the error returned by the wrapped callable, if any.
    pub fn branch_error(&self) -> Option<&GenericError> {
        match self.surfaced() {
            Self::BranchFailure { error } => Some(error),
            _ => None,
        }
    }

    /// Attempts to downcast the error returned by the wrapped callable to a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.branch_error().and_then(|error| error.downcast_ref::<E>())
    }
}

struct LastFailure<'a>(&'a [ComputationError]);

impl fmt::Display for LastFailure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.last() {
            Some(failure) => fmt::Display::fmt(failure, f),
            None => f.write_str("<none>"),
        }
    }
}
