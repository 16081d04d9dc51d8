use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
};

use tracing::trace;

use crate::{
    error::{ComputationError, GenericError, Outcome},
    join::Joined,
    manner::Manner,
    shared::SharedComputation,
    tuple::{Concat, IntoTuple, TupleApply},
};

type Callable<T, A> = Box<dyn FnOnce(A) -> Outcome<T> + Send>;

enum State<T, A> {
    Pending(Callable<T, A>),
    Running,
    Resolved(Outcome<T>),
    Extracted,
}

/// A deferred, single-shot unit of work.
///
/// A `Computation<T, A>` wraps a callable taking the argument tuple `A` and producing `T`, together with a slot where
/// the outcome is stored once the callable has run. Nothing runs until the computation is invoked: combinators only
/// build new computations that own the ones they were given.
///
/// A computation can be invoked at most once. Invoking it again, or extracting its result twice, yields
/// [`ComputationError::AlreadyInvoked`]. Use [`share`][Self::share] when more than one caller needs to invoke it.
///
/// Failures of the callable, whether returned errors or panics, are captured into the outcome and surface unchanged
/// when the result is extracted.
pub struct Computation<T, A = ()> {
    state: State<T, A>,
}

impl<T, A> Computation<T, A> {
    /// Creates a new `Computation` from a fallible callable.
    pub fn new<F, E>(f: F) -> Self
    where
        F: FnOnce(A) -> Result<T, E> + Send + 'static,
        E: Into<GenericError>,
    {
        Self::from_outcome_fn(move |args| f(args).map_err(|e| ComputationError::from_generic(e.into())))
    }

    /// Creates a new `Computation` from an infallible callable.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce(A) -> T + Send + 'static,
    {
        Self::from_outcome_fn(move |args| Ok(f(args)))
    }

    pub(crate) fn from_outcome_fn<F>(f: F) -> Self
    where
        F: FnOnce(A) -> Outcome<T> + Send + 'static,
    {
        Self {
            state: State::Pending(Box::new(f)),
        }
    }

    /// Returns `true` if the computation has not been invoked yet.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending(_))
    }

    /// Returns `true` if the computation has been invoked and its outcome not yet extracted.
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, State::Resolved(_))
    }

    /// Invokes the computation with the given arguments, storing the outcome.
    ///
    /// The outcome, successful or not, is retrieved afterwards with [`into_result`][Self::into_result] (or
    /// [`extract`][Self::extract] for computations without arguments).
    ///
    /// # Errors
    ///
    /// If the computation was already invoked, [`ComputationError::AlreadyInvoked`] is returned and nothing runs.
    pub fn invoke(&mut self, args: A) -> Result<(), ComputationError> {
        let callable = match std::mem::replace(&mut self.state, State::Running) {
            State::Pending(callable) => callable,
            other => {
                self.state = other;
                return Err(ComputationError::AlreadyInvoked);
            }
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(move || callable(args)))
            .unwrap_or_else(|payload| Err(ComputationError::from_panic(payload)));
        if let Err(e) = &outcome {
            trace!(error = %e, "Computation failed.");
        }

        self.state = State::Resolved(outcome);
        Ok(())
    }

    /// Consumes the computation, returning its stored outcome.
    ///
    /// # Errors
    ///
    /// If the computation has not been invoked yet, [`ComputationError::NotInvoked`] is returned. If the outcome was
    /// already extracted, [`ComputationError::AlreadyInvoked`] is returned. Otherwise, the stored failure, if any, is
    /// returned.
    pub fn into_result(mut self) -> Outcome<T> {
        self.take_outcome()
    }

    fn take_outcome(&mut self) -> Outcome<T> {
        match std::mem::replace(&mut self.state, State::Extracted) {
            State::Resolved(outcome) => outcome,
            State::Pending(callable) => {
                self.state = State::Pending(callable);
                Err(ComputationError::NotInvoked)
            }
            State::Running | State::Extracted => Err(ComputationError::AlreadyInvoked),
        }
    }

    /// Invokes the computation with the given arguments and returns its outcome.
    ///
    /// # Errors
    ///
    /// If the computation was already invoked, [`ComputationError::AlreadyInvoked`] is returned. Otherwise, any failure
    /// of the wrapped callable is returned.
    pub fn get(mut self, args: A) -> Outcome<T> {
        self.invoke(args)?;
        self.take_outcome()
    }

    /// Converts this computation into a [`SharedComputation`], allowing it to be invoked by many callers.
    ///
    /// The computation must not have been invoked yet: sharing an already-invoked computation produces a shared
    /// computation whose outcome is [`ComputationError::AlreadyInvoked`].
    pub fn share(self) -> SharedComputation<T, A> {
        SharedComputation::from_task(self)
    }
}

impl<T> Computation<T, ()> {
    /// Creates a new `Computation` that produces `value`.
    pub fn ready(value: T) -> Self
    where
        T: Send + 'static,
    {
        Self::from_outcome_fn(move |()| Ok(value))
    }

    /// Creates a new `Computation` that fails with `error`.
    pub fn failed<E>(error: E) -> Self
    where
        E: Into<GenericError>,
    {
        let error = ComputationError::from_generic(error.into());
        Self::from_outcome_fn(move |()| Err(error))
    }

    /// Extracts the outcome of the computation, invoking it first if it has not been invoked yet.
    ///
    /// # Errors
    ///
    /// If the outcome was already extracted, [`ComputationError::AlreadyInvoked`] is returned. Otherwise, any failure
    /// of the wrapped callable is returned.
    pub fn extract(mut self) -> Outcome<T> {
        if self.is_pending() {
            self.invoke(())?;
        }
        self.take_outcome()
    }
}

impl<T, A> Computation<T, A>
where
    T: Send + 'static,
    A: 'static,
{
    /// Returns a new `Computation` that runs this one and then applies `f` to its result.
    ///
    /// Nothing is invoked eagerly. Failures of this computation pass through without calling `f`.
    pub fn map<U, F>(self, f: F) -> Computation<U, A>
    where
        F: FnOnce(T) -> U + Send + 'static,
    {
        Computation::from_outcome_fn(move |args| self.get(args).map(f))
    }

    /// Returns a new `Computation` that runs this one and then applies `f` to its result.
    ///
    /// This is the continuation-chaining entry point, and is identical to [`map`][Self::map].
    pub fn then<U, F>(self, f: F) -> Computation<U, A>
    where
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.map(f)
    }

    /// Returns a new `Computation` that runs this one and then applies the fallible `f` to its result.
    pub fn try_map<U, E, F>(self, f: F) -> Computation<U, A>
    where
        F: FnOnce(T) -> Result<U, E> + Send + 'static,
        E: Into<GenericError>,
    {
        Computation::from_outcome_fn(move |args| {
            self.get(args)
                .and_then(|value| f(value).map_err(|e| ComputationError::from_generic(e.into())))
        })
    }

    /// Returns a new `Computation` that runs this one and then calls `f` with the elements of the resulting tuple as
    /// positional arguments.
    pub fn apply<F>(self, f: F) -> Computation<T::Output, A>
    where
        T: TupleApply<F>,
        F: Send + 'static,
    {
        self.map(move |tuple| tuple.apply_to(f))
    }

    /// Races this computation against `rhs`, returning the first successful result.
    ///
    /// See [`race`][fn@crate::race].
    pub fn or<R>(self, manner: Manner, rhs: R) -> Computation<T, A>
    where
        R: Deferred<Output = T, Args = A>,
        A: Clone + Send,
    {
        crate::race::race(manner, self, rhs)
    }

    /// Joins this computation with `rhs`, returning both results as a single flat tuple.
    ///
    /// See [`join`][fn@crate::join].
    pub fn and<R>(self, manner: Manner, rhs: R) -> Computation<Joined<T, R::Output>, <A as Concat<R::Args>>::Output>
    where
        R: Deferred,
        T: IntoTuple,
        R::Output: IntoTuple + Send + 'static,
        T::Tuple: Concat<<R::Output as IntoTuple>::Tuple> + Send + 'static,
        <R::Output as IntoTuple>::Tuple: Send + 'static,
        R::Args: Send + 'static,
        A: Concat<R::Args>,
    {
        crate::join::join(manner, self, rhs)
    }
}

impl<C, A> Computation<C, A>
where
    C: Deferred + Send + 'static,
    C::Output: 'static,
    C::Args: 'static,
    A: Concat<C::Args> + 'static,
{
    /// Flattens a computation producing another computation into a single computation.
    ///
    /// The flattened computation takes the outer arguments followed by the inner arguments. When invoked, it runs this
    /// computation with the outer arguments, then runs the computation it produced with the inner arguments, returning
    /// the inner result.
    pub fn flatten(self) -> Computation<C::Output, <A as Concat<C::Args>>::Output> {
        Computation::from_outcome_fn(move |args| {
            let (outer_args, inner_args) = A::split(args);
            let inner = self.get(outer_args)?;
            inner.into_computation().get(inner_args)
        })
    }
}

impl<T, A> fmt::Debug for Computation<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Pending(_) => "pending",
            State::Running => "running",
            State::Resolved(Ok(_)) => "resolved",
            State::Resolved(Err(_)) => "failed",
            State::Extracted => "extracted",
        };

        f.debug_struct("Computation").field("state", &state).finish()
    }
}

/// A value that can be lifted into a [`Computation`].
///
/// Every combinator accepts its operands through this trait, so that both plain and shared computations can be raced,
/// joined, or produced by a flattened computation.
pub trait Deferred: Sized {
    /// Type of the result.
    type Output;

    /// Argument tuple.
    type Args;

    /// Converts this value into a `Computation`.
    fn into_computation(self) -> Computation<Self::Output, Self::Args>;
}

impl<T, A> Deferred for Computation<T, A> {
    type Output = T;
    type Args = A;

    fn into_computation(self) -> Computation<T, A> {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering::SeqCst},
        Arc,
    };

    use super::*;
    use crate::generic_error;

    fn counted<T: Send + 'static>(counter: &Arc<AtomicUsize>, value: T) -> Computation<T> {
        let counter = Arc::clone(counter);
        Computation::from_fn(move |()| {
            counter.fetch_add(1, SeqCst);
            value
        })
    }

    #[test]
    fn extract_invokes_pending_computation() {
        let hello = Computation::from_fn(|()| "Hello".to_string());
        assert!(hello.is_pending());
        assert_eq!(hello.extract().unwrap(), "Hello");
    }

    #[test]
    fn get_with_arguments() {
        let echo = Computation::from_fn(|(s,): (String,)| s);
        assert_eq!(echo.get(("World".to_string(),)).unwrap(), "World");

        let add = Computation::from_fn(|(a, b): (i32, i32)| a + b);
        assert_eq!(add.get((2, 3)).unwrap(), 5);
    }

    #[test]
    fn invoke_then_extract() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut computation = counted(&counter, 42);

        computation.invoke(()).unwrap();
        assert!(computation.is_resolved());
        assert_eq!(counter.load(SeqCst), 1);

        assert_eq!(computation.extract().unwrap(), 42);
        assert_eq!(counter.load(SeqCst), 1);
    }

    #[test]
    fn second_invoke_is_rejected() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut computation = counted(&counter, 1);

        computation.invoke(()).unwrap();
        assert!(matches!(computation.invoke(()), Err(ComputationError::AlreadyInvoked)));
        assert_eq!(counter.load(SeqCst), 1);

        // The first outcome is still there.
        assert_eq!(computation.into_result().unwrap(), 1);
    }

    #[test]
    fn into_result_before_invoke() {
        let mut square = Computation::from_fn(|(x,): (u32,)| x * x);
        assert!(matches!(
            Computation::from_fn(|(x,): (u32,)| x).into_result(),
            Err(ComputationError::NotInvoked)
        ));

        square.invoke((9,)).unwrap();
        assert_eq!(square.into_result().unwrap(), 81);
    }

    #[test]
    fn failures_propagate_through_extract() {
        let failing = Computation::new(|()| Err::<String, _>(generic_error!("Exception!")));
        let error = failing.extract().unwrap_err();
        assert_eq!(error.to_string(), "Exception!");
        assert!(matches!(error, ComputationError::BranchFailure { .. }));

        let failed = Computation::<u8>::failed(generic_error!("nope"));
        assert_eq!(failed.extract().unwrap_err().to_string(), "nope");
    }

    #[test]
    fn panics_are_captured() {
        let panicking = Computation::from_fn(|()| -> u32 { panic!("boom") });
        let error = panicking.extract().unwrap_err();
        assert_eq!(error.to_string(), "Computation panicked: boom");
    }

    #[test]
    fn map_is_lazy() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mapped = counted(&counter, "Hello".to_string()).map(|s| s + ", World!");
        assert_eq!(counter.load(SeqCst), 0);

        assert_eq!(mapped.extract().unwrap(), "Hello, World!");
        assert_eq!(counter.load(SeqCst), 1);
    }

    #[test]
    fn map_skips_transform_on_failure() {
        let transformed = Arc::new(AtomicUsize::new(0));
        let transformed2 = Arc::clone(&transformed);
        let mapped = Computation::<u32>::failed(generic_error!("upstream")).then(move |x| {
            transformed2.fetch_add(1, SeqCst);
            x + 1
        });

        assert_eq!(mapped.extract().unwrap_err().to_string(), "upstream");
        assert_eq!(transformed.load(SeqCst), 0);
    }

    #[test]
    fn try_map() {
        let parsed = Computation::ready("17".to_string()).try_map(|s| s.parse::<u32>());
        assert_eq!(parsed.extract().unwrap(), 17);

        let error = Computation::ready("seventeen".to_string())
            .try_map(|s| s.parse::<u32>())
            .extract()
            .unwrap_err();
        assert!(error.downcast_ref::<std::num::ParseIntError>().is_some());
    }

    #[test]
    fn apply_spreads_tuple() {
        let merged = Computation::ready(("Hello".to_string(), "World!".to_string()))
            .apply(|x: String, y: String| format!("{}, {}", x, y));
        assert_eq!(merged.extract().unwrap(), "Hello, World!");
    }

    #[test]
    fn flatten_runs_outer_then_inner() {
        fn repeat() -> Computation<Computation<String, (String,)>, (usize,)> {
            Computation::from_fn(|(n,): (usize,)| Computation::from_fn(move |(s,): (String,)| s.repeat(n)))
        }

        let flattened = repeat().flatten().get((5, "x".to_string())).unwrap();
        let direct = repeat().get((5,)).unwrap().get(("x".to_string(),)).unwrap();
        assert_eq!(flattened, "xxxxx");
        assert_eq!(flattened, direct);
    }

    #[test]
    fn flatten_zero_arguments() {
        let nested = Computation::from_fn(|()| Computation::ready("Hello".to_string()));
        assert_eq!(nested.flatten().extract().unwrap(), "Hello");
    }

    #[test]
    fn flatten_outer_failure_skips_inner() {
        let nested = Computation::<Computation<u8>>::failed(generic_error!("outer"));
        assert_eq!(nested.flatten().extract().unwrap_err().to_string(), "outer");
    }

    #[cfg(not(feature = "loom"))]
    #[test]
    fn flatten_shared_inner() {
        let nested = Computation::from_fn(|(base,): (u32,)| {
            SharedComputation::wrap_fn(move |(offset,): (u32,)| base + offset)
        });
        assert_eq!(nested.flatten().get((40, 2)).unwrap(), 42);
    }

    #[test]
    fn debug_reflects_state() {
        let mut computation = Computation::ready(1);
        assert_eq!(format!("{:?}", computation), "Computation { state: \"pending\" }");
        computation.invoke(()).unwrap();
        assert_eq!(format!("{:?}", computation), "Computation { state: \"resolved\" }");
    }
}
