use serde::Deserialize;

use crate::{
    combinators::make_tuple,
    computation::{Computation, Deferred},
    join::join_tuples,
    race::race,
    tuple::Concat,
};

/// Execution strategy for combining computations.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Manner {
    /// Operands run one after another, in operand order, on the calling thread.
    #[default]
    Sequence,

    /// Operands run concurrently, each on its own thread.
    Parallel,
}

/// A partially combined computation, along with the manner used to combine it.
///
/// `When` carries the manner through a chain of combinations, so that every operand added with [`or`][When::or] or
/// [`and`][When::and] is combined the same way as the ones before it.
#[derive(Debug)]
pub struct When<C> {
    manner: Manner,
    value: C,
}

impl<C> When<C> {
    /// Returns the manner used for every combination.
    pub fn manner(&self) -> Manner {
        self.manner
    }

    /// Consumes the wrapper, returning the combined computation.
    pub fn into_inner(self) -> C {
        self.value
    }
}

impl<T, A> When<Computation<T, A>>
where
    T: Send + 'static,
    A: 'static,
{
    /// Starts a race with `head` as its first operand.
    pub fn any<D>(manner: Manner, head: D) -> Self
    where
        D: Deferred<Output = T, Args = A>,
    {
        Self {
            manner,
            value: head.into_computation(),
        }
    }

    /// Races the combined computation against `rhs`.
    pub fn or<D>(self, rhs: D) -> Self
    where
        D: Deferred<Output = T, Args = A>,
        A: Clone + Send,
    {
        Self {
            manner: self.manner,
            value: race(self.manner, self.value, rhs),
        }
    }

    /// Joins the combined computation with `rhs`, appending its result to the result tuple.
    ///
    /// The combined computation's result must already be a tuple, as produced by [`When::all`].
    pub fn and<D>(
        self, rhs: D,
    ) -> When<Computation<<T as Concat<(D::Output,)>>::Output, <A as Concat<D::Args>>::Output>>
    where
        D: Deferred,
        D::Output: Send + 'static,
        D::Args: Send + 'static,
        T: Concat<(D::Output,)>,
        A: Concat<D::Args>,
    {
        let rhs = rhs.into_computation().then(make_tuple);
        When {
            manner: self.manner,
            value: join_tuples(self.manner, self.value, rhs),
        }
    }
}

impl<T, A> When<Computation<(T,), A>>
where
    T: Send + 'static,
    A: 'static,
{
    /// Starts a join with `head` as its first operand, normalizing its result to a one-element tuple.
    pub fn all<D>(manner: Manner, head: D) -> Self
    where
        D: Deferred<Output = T, Args = A>,
    {
        Self {
            manner,
            value: head.into_computation().then(make_tuple),
        }
    }
}
