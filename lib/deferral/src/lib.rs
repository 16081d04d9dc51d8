//! Deferred, composable computations.
//!
//! `deferral` provides a small algebra for building units of work now and running them later. A [`Computation`] wraps
//! a callable and runs it at most once, when invoked. A [`SharedComputation`] can be invoked from any number of places
//! and threads while still running its work exactly once, broadcasting the outcome to every caller.
//!
//! Computations compose without running anything:
//!
//! - [`Computation::then`] chains a transform onto the result, and [`Computation::flatten`] collapses a computation
//!   that produces another computation.
//! - [`race`][fn@race] (and [`when_any!`]) combines computations of the same shape into one that produces the first
//!   successful result, recovering failures as long as some operand succeeds.
//! - [`join`][fn@join] (and [`when_all!`]) combines computations into one that produces a flat tuple of every result,
//!   in operand order.
//!
//! Races and joins run either in [`Manner::Sequence`], one operand after another on the calling thread, or in
//! [`Manner::Parallel`], each operand on its own worker thread. Worker threads are configured with
//! [`WorkerConfiguration`].
//!
//! ```
//! use deferral::{apply, when_all, when_any, Computation, Manner};
//!
//! let hello = || Computation::from_fn(|()| "Hello".to_string());
//! let world = || Computation::from_fn(|()| "World!".to_string());
//!
//! assert_eq!(when_any!(Manner::Sequence; hello(), world()).extract().unwrap(), "Hello");
//!
//! let greeting = when_all!(Manner::Parallel; hello(), world())
//!     .then(apply(|x: String, y: String| format!("{}, {}", x, y)));
//! assert_eq!(greeting.extract().unwrap(), "Hello, World!");
//! ```
#![deny(warnings)]
#![deny(missing_docs)]

mod aggregate;
pub use self::aggregate::when_any;

mod channel;

mod combinators;
pub use self::combinators::{apply, identity, make_tuple, then};

mod computation;
pub use self::computation::{Computation, Deferred};

mod error;
pub use self::error::{ComputationError, GenericError, Outcome};

mod join;
pub use self::join::{join, Joined};

mod manner;
pub use self::manner::{Manner, When};

mod race;
pub use self::race::race;

mod shared;
pub use self::shared::SharedComputation;

mod tuple;
pub use self::tuple::{Concat, IntoTuple, TupleApply};

mod worker;
pub use self::worker::{ConfigurationError, WorkerConfiguration};

/// Macro for constructing a generic error.
///
/// The resulting value evaluates to [`GenericError`], and can be constructed from a string literal, a format string
/// (with arguments accepted, in the same order as `std::format!`), or a value which implements `Debug` and `Display`,
/// such as an existing error that implements `std::error::Error`.
///
/// This is the easiest way to fail a computation built from a raw callable:
///
/// ```
/// use deferral::{generic_error, Computation};
///
/// let parse = Computation::new(|(raw,): (String,)| {
///     if raw.is_empty() {
///         return Err(generic_error!("input was empty"));
///     }
///     Ok(raw.len())
/// });
/// assert_eq!(parse.get((String::new(),)).unwrap_err().to_string(), "input was empty");
/// ```
#[macro_export]
macro_rules! generic_error {
    ($msg:literal $(,)?) => { $crate::_anyhow!($msg) };
    ($err:expr $(,)?) => { $crate::_anyhow!($err) };
    ($fmt:expr, $($arg:tt)*) => { $crate::_anyhow!($fmt, $($arg)*) };
}

#[doc(hidden)]
pub use anyhow::anyhow as _anyhow;
