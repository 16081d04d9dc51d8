//! Racing computations against each other.
use tracing::debug;

use crate::{
    computation::{Computation, Deferred},
    error::{ComputationError, Outcome},
    manner::Manner,
    shared::SharedComputation,
    worker,
};

/// Races `lhs` against `rhs`, returning a computation that produces the first successful result.
///
/// Both operands take the same arguments and produce the same type, so the combined computation has the same shape as
/// either of them. Failures of one operand are recovered silently as long as the other succeeds. When both fail,
/// [`ComputationError::AllBranchesFailed`] is returned, holding both failures in operand order. Misuse errors, such as
/// [`ComputationError::AlreadyInvoked`], are never recovered.
///
/// ## Sequence
///
/// `lhs` runs first, on the calling thread. If it succeeds, its result is returned and `rhs` never runs. Otherwise,
/// `rhs` runs and its outcome decides the race.
///
/// ## Parallel
///
/// Each operand runs on its own worker thread. The operand that finishes first wins: if it succeeded, its result is
/// returned, and otherwise the other operand's result is used. Both operands always run to completion, and the
/// combined computation waits for both before returning, so no work is ever abandoned mid-flight.
pub fn race<L, R>(manner: Manner, lhs: L, rhs: R) -> Computation<L::Output, L::Args>
where
    L: Deferred,
    R: Deferred<Output = L::Output, Args = L::Args>,
    L::Output: Send + 'static,
    L::Args: Clone + Send + 'static,
{
    let lhs = lhs.into_computation();
    let rhs = rhs.into_computation();

    match manner {
        Manner::Sequence => race_sequence(lhs, rhs),
        Manner::Parallel => race_parallel(lhs, rhs),
    }
}

fn race_sequence<T, A>(lhs: Computation<T, A>, rhs: Computation<T, A>) -> Computation<T, A>
where
    T: Send + 'static,
    A: Clone + Send + 'static,
{
    Computation::from_outcome_fn(move |args: A| {
        let lhs_error = match lhs.get(args.clone()) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_misuse() => return Err(e),
            Err(e) => e,
        };

        debug!(error = %lhs_error, "First race branch failed. Running next branch.");

        match rhs.get(args) {
            Ok(value) => Ok(value),
            Err(e) if e.is_misuse() => Err(e),
            Err(rhs_error) => {
                debug!(error = %rhs_error, "All race branches failed.");
                Err(ComputationError::all_branches_failed(lhs_error, rhs_error))
            }
        }
    })
}

fn race_parallel<T, A>(lhs: Computation<T, A>, rhs: Computation<T, A>) -> Computation<T, A>
where
    T: Send + 'static,
    A: Clone + Send + 'static,
{
    Computation::from_outcome_fn(move |args: A| {
        // Whichever branch invokes this first is the winner.
        let first = SharedComputation::wrap_fn(|(index,): (usize,)| index);

        let lhs = lhs.share();
        let rhs = rhs.share();
        spawn_branch(0, lhs.clone(), first.clone(), args.clone());
        spawn_branch(1, rhs.clone(), first.clone(), args);

        let winner = first.result()?;
        let lhs_outcome = lhs.take();
        let rhs_outcome = rhs.take();
        debug!(winner, "Race finished.");

        settle(winner, lhs_outcome, rhs_outcome)
    })
}

fn spawn_branch<T, A>(index: usize, branch: SharedComputation<T, A>, first: SharedComputation<usize, (usize,)>, args: A)
where
    T: Send + 'static,
    A: Send + 'static,
{
    worker::spawn("race", index, move || {
        branch.invoke(args);
        first.invoke((index,));
    });
}

/// Picks the outcome of a parallel race once both branches have finished.
fn settle<T>(winner: usize, lhs: Outcome<T>, rhs: Outcome<T>) -> Outcome<T> {
    match (lhs, rhs) {
        (Ok(lhs_value), Ok(rhs_value)) => Ok(if winner == 0 { lhs_value } else { rhs_value }),
        (Err(e), _) if e.is_misuse() => Err(e),
        (_, Err(e)) if e.is_misuse() => Err(e),
        (Ok(value), Err(e)) => {
            debug!(branch = 1, error = %e, "Race branch failed. Using result of remaining branch.");
            Ok(value)
        }
        (Err(e), Ok(value)) => {
            debug!(branch = 0, error = %e, "Race branch failed. Using result of remaining branch.");
            Ok(value)
        }
        (Err(lhs_error), Err(rhs_error)) => {
            debug!(error = %rhs_error, "All race branches failed.");
            Err(ComputationError::all_branches_failed(lhs_error, rhs_error))
        }
    }
}
