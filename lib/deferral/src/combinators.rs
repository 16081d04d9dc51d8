//! Free-standing combinators.
//!
//! These mirror the methods on [`Computation`] for callers that prefer building pipelines out of functions, and provide
//! the small transforms the racing and joining engine uses to normalize operands.
use crate::{
    computation::{Computation, Deferred},
    tuple::TupleApply,
};

/// Returns a new `Computation` that runs `operand` and then applies `f` to its result.
///
/// Accepts both plain and shared computations. Nothing is invoked eagerly.
pub fn then<D, U, F>(operand: D, f: F) -> Computation<U, D::Args>
where
    D: Deferred,
    D::Output: Send + 'static,
    D::Args: 'static,
    F: FnOnce(D::Output) -> U + Send + 'static,
{
    operand.into_computation().then(f)
}

/// Adapts `f`, a function taking positional arguments, into a function taking a tuple of those arguments.
///
/// This is how the tuple produced by a join is consumed:
///
/// ```
/// use deferral::{apply, when_all, Computation, Manner};
///
/// let hello = Computation::ready("Hello".to_string());
/// let world = Computation::ready("World!".to_string());
///
/// let greeting = when_all!(Manner::Parallel; hello, world)
///     .then(apply(|x: String, y: String| format!("{}, {}", x, y)));
/// assert_eq!(greeting.extract().unwrap(), "Hello, World!");
/// ```
pub fn apply<F, Tup>(f: F) -> impl FnOnce(Tup) -> Tup::Output
where
    Tup: TupleApply<F>,
{
    move |tuple| tuple.apply_to(f)
}

/// Returns `value` unchanged.
///
/// Used to lift a [`SharedComputation`][crate::SharedComputation] into a plain computation that reads its result.
pub fn identity<T>(value: T) -> T {
    value
}

/// Wraps `value` in a one-element tuple.
///
/// Used to normalize the operands of a join, so that every result is a tuple that can be concatenated.
pub fn make_tuple<T>(value: T) -> (T,) {
    (value,)
}
