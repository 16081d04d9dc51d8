#[cfg(feature = "loom")]
use loom::sync::{
    atomic::{AtomicBool, Ordering::AcqRel},
    Arc, Mutex,
};
#[cfg(not(feature = "loom"))]
use std::sync::{
    atomic::{AtomicBool, Ordering::AcqRel},
    Arc, Mutex,
};
use std::fmt;

use tracing::trace;

use crate::{
    channel::Channel,
    computation::{Computation, Deferred},
    error::{ComputationError, GenericError, Outcome},
    tuple::Concat,
};

struct Inner<T, A> {
    gate: AtomicBool,
    task: Mutex<Option<Computation<T, A>>>,
    channel: Channel<T>,
}

/// A computation that can be invoked by many callers, running its work exactly once.
///
/// `SharedComputation` is to [`Computation`] what a broadcast channel is to a oneshot channel: every clone of the handle
/// shares the same state, and invoking any of them, from any thread and any number of times, runs the wrapped
/// computation once. The first caller to acquire the gate runs it with its own arguments; every other caller discards
/// its arguments and waits for that outcome.
///
/// Cloning the handle is cheap, and the shared state lives as long as the longest-lived handle.
///
/// ## Construction
///
/// A shared computation is built from an existing computation with [`from_task`][Self::from_task] (or
/// [`Computation::share`]), or from a raw callable with [`wrap`][Self::wrap]. There is no implicit conversion from a raw
/// callable, which keeps a freshly built computation from being shared by accident.
pub struct SharedComputation<T, A = ()> {
    inner: Arc<Inner<T, A>>,
}

impl<T, A> SharedComputation<T, A> {
    /// Creates a new `SharedComputation` from an existing computation.
    pub fn from_task(task: Computation<T, A>) -> Self {
        Self {
            inner: Arc::new(Inner {
                gate: AtomicBool::new(false),
                task: Mutex::new(Some(task)),
                channel: Channel::new(),
            }),
        }
    }

    /// Creates a new `SharedComputation` from a fallible callable.
    pub fn wrap<F, E>(f: F) -> Self
    where
        F: FnOnce(A) -> Result<T, E> + Send + 'static,
        E: Into<GenericError>,
    {
        Self::from_task(Computation::new(f))
    }

    /// Creates a new `SharedComputation` from an infallible callable.
    pub fn wrap_fn<F>(f: F) -> Self
    where
        F: FnOnce(A) -> T + Send + 'static,
    {
        Self::from_task(Computation::from_fn(f))
    }

    /// Invokes the shared computation.
    ///
    /// If this is the first invocation across every handle, the wrapped computation runs on the calling thread with
    /// `args`. Otherwise, `args` is discarded and the call blocks until the first invocation has finished. Either way,
    /// the outcome is available once this returns.
    pub fn invoke(&self, args: A) {
        if self.inner.gate.swap(true, AcqRel) {
            trace!("Shared computation already claimed. Waiting for outcome.");
            self.inner.channel.wait();
            return;
        }

        trace!("Acquired gate for shared computation.");

        // Only the gate holder takes the task. A task shared after it was already invoked fails with `AlreadyInvoked`.
        let task = self.inner.task.lock().unwrap().take();
        let outcome = match task {
            Some(task) => task.get(args),
            None => Err(ComputationError::AlreadyInvoked),
        };

        self.inner.channel.publish(outcome);
    }

    /// Blocks until the shared computation has been invoked and finished.
    pub fn wait(&self) {
        self.inner.channel.wait()
    }

    /// Returns `true` if the shared computation has finished.
    pub fn is_ready(&self) -> bool {
        self.inner.channel.is_populated()
    }

    /// Moves the outcome out of the channel, blocking until it is available.
    ///
    /// Only for callers that hold every handle that will ever read the outcome.
    pub(crate) fn take(&self) -> Outcome<T> {
        self.inner.channel.take()
    }
}

impl<T, A> SharedComputation<T, A>
where
    T: Clone,
{
    /// Returns the outcome, blocking until the shared computation has been invoked and finished.
    ///
    /// Every call, from every handle, observes the same outcome.
    pub fn result(&self) -> Outcome<T> {
        self.inner.channel.read()
    }

    /// Returns the outcome if the shared computation has finished, without blocking.
    pub fn try_result(&self) -> Option<Outcome<T>> {
        self.inner.channel.try_read()
    }

    /// Invokes the shared computation with `args` and returns the outcome.
    ///
    /// `args` is only used if this is the first invocation.
    pub fn get(&self, args: A) -> Outcome<T> {
        self.invoke(args);
        self.result()
    }
}

impl<T> SharedComputation<T, ()>
where
    T: Clone,
{
    /// Extracts the outcome, invoking the shared computation first if it has not been invoked yet.
    pub fn extract(&self) -> Outcome<T> {
        self.get(())
    }
}

impl<T, A> SharedComputation<T, A>
where
    T: Clone + Send + 'static,
    A: 'static,
{
    /// Returns a [`Computation`] that invokes this shared computation and returns its outcome.
    ///
    /// This lifts the shared computation into the shape every combinator expects, without running anything.
    pub fn to_computation(&self) -> Computation<T, A> {
        self.map(crate::combinators::identity)
    }

    /// Returns a [`Computation`] that invokes this shared computation and then applies `f` to its result.
    pub fn map<U, F>(&self, f: F) -> Computation<U, A>
    where
        F: FnOnce(T) -> U + Send + 'static,
    {
        let shared = self.clone();
        Computation::from_outcome_fn(move |args| shared.get(args).map(f))
    }

    /// Returns a [`Computation`] that invokes this shared computation and then applies `f` to its result.
    ///
    /// Identical to [`map`][Self::map].
    pub fn then<U, F>(&self, f: F) -> Computation<U, A>
    where
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.map(f)
    }
}

impl<C, A> SharedComputation<C, A>
where
    C: Deferred + Clone + Send + 'static,
    C::Output: 'static,
    C::Args: 'static,
    A: Concat<C::Args> + 'static,
{
    /// Flattens a shared computation producing another computation into a single computation.
    ///
    /// The flattened computation takes the outer arguments followed by the inner arguments. Since the outer
    /// computation is shared, only the first invocation across every handle determines which inner computation is run.
    pub fn flatten(&self) -> Computation<C::Output, <A as Concat<C::Args>>::Output> {
        let outer = self.clone();
        Computation::from_outcome_fn(move |args| {
            let (outer_args, inner_args) = A::split(args);
            let inner = outer.get(outer_args)?;
            inner.into_computation().get(inner_args)
        })
    }
}

impl<T, A> Clone for SharedComputation<T, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, A> From<Computation<T, A>> for SharedComputation<T, A> {
    fn from(task: Computation<T, A>) -> Self {
        Self::from_task(task)
    }
}

impl<T, A> fmt::Debug for SharedComputation<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedComputation")
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl<T, A> Deferred for SharedComputation<T, A>
where
    T: Clone + Send + 'static,
    A: 'static,
{
    type Output = T;
    type Args = A;

    fn into_computation(self) -> Computation<T, A> {
        self.to_computation()
    }
}
