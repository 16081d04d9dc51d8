//! Joining computations into a tuple of their results.
use crate::{
    computation::{Computation, Deferred},
    manner::Manner,
    tuple::{Concat, IntoTuple},
    worker,
};

/// Result type of joining computations that produce `L` and `R`.
pub type Joined<L, R> = <<L as IntoTuple>::Tuple as Concat<<R as IntoTuple>::Tuple>>::Output;

/// Joins `lhs` and `rhs`, returning a computation that produces both results as a single flat tuple.
///
/// The combined computation takes the arguments of `lhs` followed by the arguments of `rhs`. Its result is the result
/// of `lhs` followed by the result of `rhs`, regardless of which operand finished first. A result that is already a
/// tuple contributes its elements, and a bare value contributes itself (see [`IntoTuple`]), so joining a computation
/// producing `(1, 2)` with one producing `3` produces `(1, 2, 3)`.
///
/// Both operands must succeed: a failure of either is returned unchanged, with the failure of `lhs` taking precedence
/// when both fail.
///
/// ## Sequence
///
/// `lhs` runs to completion on the calling thread, then `rhs` does. If `lhs` fails, `rhs` never runs.
///
/// ## Parallel
///
/// `rhs` runs on a worker thread while `lhs` runs on the calling thread. The combined computation waits for both
/// before returning.
///
/// To keep a tuple result as a single element, wrap it with [`make_tuple`][crate::make_tuple] first, as
/// [`when_all!`][crate::when_all] and [`When::and`][crate::When::and] do for every operand.
pub fn join<L, R>(
    manner: Manner, lhs: L, rhs: R,
) -> Computation<Joined<L::Output, R::Output>, <L::Args as Concat<R::Args>>::Output>
where
    L: Deferred,
    R: Deferred,
    L::Output: IntoTuple + Send + 'static,
    R::Output: IntoTuple + Send + 'static,
    <L::Output as IntoTuple>::Tuple: Concat<<R::Output as IntoTuple>::Tuple> + Send + 'static,
    <R::Output as IntoTuple>::Tuple: Send + 'static,
    L::Args: Concat<R::Args> + 'static,
    R::Args: Send + 'static,
{
    let lhs = lhs.into_computation().then(IntoTuple::into_tuple);
    let rhs = rhs.into_computation().then(IntoTuple::into_tuple);
    join_tuples(manner, lhs, rhs)
}

/// Joins two computations producing tuples, concatenating their results.
pub(crate) fn join_tuples<T, U, A, B>(
    manner: Manner, lhs: Computation<T, A>, rhs: Computation<U, B>,
) -> Computation<T::Output, A::Output>
where
    T: Concat<U> + Send + 'static,
    U: Send + 'static,
    A: Concat<B> + 'static,
    B: Send + 'static,
{
    match manner {
        Manner::Sequence => Computation::from_outcome_fn(move |args| {
            let (lhs_args, rhs_args) = A::split(args);
            let lhs = lhs.get(lhs_args)?;
            let rhs = rhs.get(rhs_args)?;
            Ok(lhs.concat(rhs))
        }),
        Manner::Parallel => Computation::from_outcome_fn(move |args| {
            let (lhs_args, rhs_args) = A::split(args);

            let rhs = rhs.share();
            let worker_rhs = rhs.clone();
            worker::spawn("join", 1, move || worker_rhs.invoke(rhs_args));

            let lhs = lhs.get(lhs_args);
            let rhs = rhs.take();
            Ok(lhs?.concat(rhs?))
        }),
    }
}
