//! N-ary racing and joining.
//!
//! Races and joins are binary. Combining more operands folds them from the left, one pairwise combination at a time,
//! using the same manner throughout. Building the fold is purely structural: nothing runs until the final computation
//! is invoked.
use crate::{
    computation::{Computation, Deferred},
    manner::{Manner, When},
};

/// Races `head` against every operand in `tail`, returning a computation that produces the first successful result.
///
/// This is the iterator form of [`when_any!`], for operands of a single type, such as a list of fallback sources built
/// at runtime. With an empty `tail`, the computation is equivalent to `head`.
pub fn when_any<D, I>(manner: Manner, head: D, tail: I) -> Computation<D::Output, D::Args>
where
    D: Deferred,
    D::Output: Send + 'static,
    D::Args: Clone + Send + 'static,
    I: IntoIterator,
    I::Item: Deferred<Output = D::Output, Args = D::Args>,
{
    tail.into_iter()
        .fold(When::any(manner, head), |when, operand| when.or(operand))
        .into_inner()
}

/// Races any number of computations, producing the first successful result.
///
/// Operands are given as a comma-separated list, optionally preceded by the [`Manner`] and a semicolon. The manner
/// defaults to [`Manner::Sequence`].
///
/// ```
/// use deferral::{when_any, Computation, Manner};
///
/// let primary = Computation::<String>::failed(deferral::generic_error!("primary unavailable"));
/// let replica = Computation::ready("from replica".to_string());
/// let cache = Computation::ready("from cache".to_string());
///
/// let value = when_any!(Manner::Sequence; primary, replica, cache);
/// assert_eq!(value.extract().unwrap(), "from replica");
/// ```
#[macro_export]
macro_rules! when_any {
    ($manner:expr; $head:expr $(, $tail:expr)* $(,)?) => {
        $crate::When::any($manner, $head)$(.or($tail))*.into_inner()
    };
    ($head:expr $(, $tail:expr)* $(,)?) => {
        $crate::when_any!($crate::Manner::Sequence; $head $(, $tail)*)
    };
}

/// Joins any number of computations, producing a flat tuple of their results in operand order.
///
/// Operands are given as a comma-separated list, optionally preceded by the [`Manner`] and a semicolon. The manner
/// defaults to [`Manner::Sequence`]. The joined computation takes the arguments of every operand, concatenated in
/// operand order.
///
/// ```
/// use deferral::{when_all, Computation, Manner};
///
/// let joined = when_all!(Manner::Parallel; Computation::ready(1), Computation::ready("two"), Computation::ready(3.0));
/// assert_eq!(joined.extract().unwrap(), (1, "two", 3.0));
/// ```
#[macro_export]
macro_rules! when_all {
    ($manner:expr; $head:expr $(, $tail:expr)* $(,)?) => {
        $crate::When::all($manner, $head)$(.and($tail))*.into_inner()
    };
    ($head:expr $(, $tail:expr)* $(,)?) => {
        $crate::when_all!($crate::Manner::Sequence; $head $(, $tail)*)
    };
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering::SeqCst},
        Arc,
    };

    use proptest::prelude::*;

    use super::*;
    use crate::{apply, generic_error, SharedComputation};

    fn hello() -> Computation<String> {
        Computation::from_fn(|()| "Hello".to_string())
    }

    fn world() -> Computation<String> {
        Computation::from_fn(|()| "World!".to_string())
    }

    #[test]
    fn hello_world() {
        let any = when_any!(Manner::Sequence; hello(), world());
        assert_eq!(any.extract().unwrap(), "Hello");

        let all = when_all!(Manner::Parallel; hello(), world());
        assert_eq!(all.extract().unwrap(), ("Hello".to_string(), "World!".to_string()));

        let greeting =
            when_all!(Manner::Parallel; hello(), world()).then(apply(|x: String, y: String| format!("{}, {}", x, y)));
        assert_eq!(greeting.extract().unwrap(), "Hello, World!");
    }

    #[test]
    fn when_all_orders_by_operand() {
        for manner in [Manner::Sequence, Manner::Parallel] {
            let joined = when_all!(manner; Computation::ready(1), Computation::ready(2), Computation::ready(3));
            assert_eq!(joined.extract().unwrap(), (1, 2, 3));
        }
    }

    #[test]
    fn default_manner_is_sequence() {
        let executions = Arc::new(AtomicUsize::new(0));
        let counted = |value: u32| {
            let executions = Arc::clone(&executions);
            Computation::from_fn(move |()| {
                executions.fetch_add(1, SeqCst);
                value
            })
        };

        // Sequential races stop at the first success.
        let any = when_any!(counted(1), counted(2), counted(3));
        assert_eq!(any.extract().unwrap(), 1);
        assert_eq!(executions.load(SeqCst), 1);

        let all = when_all!(counted(4), counted(5));
        assert_eq!(all.extract().unwrap(), (4, 5));
        assert_eq!(executions.load(SeqCst), 3);
    }

    #[test]
    fn single_operand() {
        assert_eq!(when_any!(hello()).extract().unwrap(), "Hello");
        assert_eq!(when_all!(hello()).extract().unwrap(), ("Hello".to_string(),));
    }

    #[test]
    fn when_all_keeps_tuple_operands_whole() {
        let joined = when_all!(Computation::ready((1, 2)), Computation::ready(3));
        assert_eq!(joined.extract().unwrap(), ((1, 2), 3));
    }

    #[test]
    fn when_all_concatenates_arguments() {
        let joined = when_all!(
            Computation::from_fn(|(a,): (u32,)| a * 2),
            Computation::from_fn(|()| "no arguments"),
            Computation::from_fn(|(b, c): (u32, u32)| b + c),
        );
        assert_eq!(joined.get((1, 2, 3)).unwrap(), (2, "no arguments", 5));
    }

    #[test]
    fn when_any_parallel_falls_through_failures() {
        let failing = |message: &'static str| Computation::<String>::new(move |()| Err(generic_error!(message)));

        let any = when_any!(Manner::Parallel; failing("a"), failing("b"), world());
        assert_eq!(any.extract().unwrap(), "World!");

        let any = when_any!(Manner::Parallel; failing("a"), failing("b"), failing("c"));
        let error = any.extract().unwrap_err();
        let messages = error
            .failures()
            .expect("should fail with every branch failure")
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>();
        assert_eq!(messages, vec!["a", "b", "c"]);
    }

    #[test]
    fn when_any_iterator_form() {
        let fallbacks = (0..4).map(|i| {
            Computation::new(move |()| {
                if i == 2 {
                    Ok(i)
                } else {
                    Err(generic_error!("miss"))
                }
            })
        });
        let first = Computation::new(|()| Err::<u32, _>(generic_error!("miss")));

        assert_eq!(when_any(Manner::Sequence, first, fallbacks).extract().unwrap(), 2);
        assert_eq!(
            when_any(Manner::Parallel, hello(), Vec::<Computation<String>>::new()).extract().unwrap(),
            "Hello"
        );
    }

    #[test]
    fn shared_operands() {
        let shared = SharedComputation::wrap_fn(|()| 10);
        let joined = when_all!(Manner::Parallel; shared.clone(), Computation::ready(20), shared.clone());
        assert_eq!(joined.extract().unwrap(), (10, 20, 10));

        let raced = when_any!(Computation::<u32>::failed(generic_error!("down")), shared);
        assert_eq!(raced.extract().unwrap(), 10);
    }

    #[test]
    fn building_runs_nothing() {
        let executions = Arc::new(AtomicUsize::new(0));
        let counted = |value: u32| {
            let executions = Arc::clone(&executions);
            Computation::from_fn(move |()| {
                executions.fetch_add(1, SeqCst);
                value
            })
        };

        let joined = when_all!(Manner::Parallel; counted(1), counted(2));
        let raced = when_any!(Manner::Parallel; counted(3), counted(4));
        assert_eq!(executions.load(SeqCst), 0);

        drop((joined, raced));
        assert_eq!(executions.load(SeqCst), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn property_when_all_ordering(
            a in any::<i64>(), b in ".*", c in any::<bool>(), d in any::<u8>(), parallel in any::<bool>(),
        ) {
            let manner = if parallel { Manner::Parallel } else { Manner::Sequence };
            let joined = when_all!(
                manner;
                Computation::ready(a),
                Computation::ready(b.clone()),
                Computation::ready(c),
                Computation::ready(d),
            );
            prop_assert_eq!(joined.extract().unwrap(), (a, b, c, d));
        }
    }
}
