//! Worker threads for parallel combinators.
//!
//! Parallel combinators run their branches on raw OS threads, one per branch, spawned at invocation time and detached
//! immediately. A branch's completion is always observed through its own shared computation, never by joining the
//! thread, so a worker's lifetime is independent of whoever is waiting on it.
use std::sync::OnceLock;

use figment::{providers::Env, Figment};
use serde::Deserialize;
use snafu::{ResultExt as _, Snafu};

const DEFAULT_THREAD_NAME_PREFIX: &str = "deferral";

static INSTALLED: OnceLock<WorkerConfiguration> = OnceLock::new();

/// A worker configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ConfigurationError {
    /// Environment variable prefix was empty.
    #[snafu(display("Environment variable prefix must not be empty."))]
    EmptyPrefix,

    /// Configuration could not be extracted from its source.
    #[snafu(display("Failed to load worker configuration: {}", source))]
    Load {
        /// Error source.
        source: Box<figment::Error>,
    },
}

/// Configuration for worker threads spawned by parallel combinators.
///
/// Worker threads are named `<prefix>-<role>-<index>`, where the role is the combinator that spawned it (`race` or
/// `join`) and the index is the position of the branch it runs.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct WorkerConfiguration {
    /// Prefix for worker thread names.
    ///
    /// Defaults to `deferral`.
    thread_name_prefix: String,

    /// Stack size of worker threads, in bytes.
    ///
    /// Defaults to the platform default for spawned threads.
    stack_size: Option<usize>,
}

impl WorkerConfiguration {
    /// Sets the prefix for worker thread names.
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Sets the stack size of worker threads, in bytes.
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Returns the prefix for worker thread names.
    pub fn thread_name_prefix(&self) -> &str {
        &self.thread_name_prefix
    }

    /// Returns the stack size of worker threads, if one is set.
    pub fn stack_size(&self) -> Option<usize> {
        self.stack_size
    }

    /// Loads the worker configuration from environment variables.
    ///
    /// The prefix given will have an underscore appended to it if it does not already end with one. For example, with a
    /// prefix of `app`, `APP_THREAD_NAME_PREFIX` and `APP_STACK_SIZE` are read. Missing variables keep their defaults.
    ///
    /// # Errors
    ///
    /// If the prefix is empty, or a variable holds a value of the wrong type, an error is returned.
    pub fn from_environment(prefix: &str) -> Result<Self, ConfigurationError> {
        if prefix.is_empty() {
            return Err(ConfigurationError::EmptyPrefix);
        }

        let prefix = if prefix.ends_with('_') {
            prefix.to_string()
        } else {
            format!("{}_", prefix)
        };

        Figment::new()
            .merge(Env::prefixed(&prefix))
            .extract()
            .map_err(Box::new)
            .context(Load)
    }

    /// Installs this configuration for every worker thread spawned from now on.
    ///
    /// The configuration can only be installed once, and only before the first worker thread is spawned: after that,
    /// the configuration in effect is fixed and this configuration is handed back as an error.
    pub fn install(self) -> Result<(), Self> {
        INSTALLED.set(self)
    }

    /// Returns the configuration in effect for worker threads.
    pub fn current() -> &'static Self {
        INSTALLED.get_or_init(Self::default)
    }

    #[cfg_attr(feature = "loom", allow(dead_code))]
    fn thread_name(&self, role: &str, index: usize) -> String {
        format!("{}-{}-{}", self.thread_name_prefix, role, index)
    }
}

impl Default for WorkerConfiguration {
    fn default() -> Self {
        Self {
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            stack_size: None,
        }
    }
}

/// Runs `job` on a new, detached worker thread.
///
/// If the thread cannot be spawned, `job` runs on the calling thread instead, so that whoever waits on its outcome is
/// never left waiting forever.
#[cfg(not(feature = "loom"))]
pub(crate) fn spawn<F>(role: &'static str, index: usize, job: F)
where
    F: FnOnce() + Send + 'static,
{
    use std::sync::{Arc, Mutex};

    use tracing::{trace, warn};

    let config = WorkerConfiguration::current();
    let thread_name = config.thread_name(role, index);

    let mut builder = std::thread::Builder::new().name(thread_name.clone());
    if let Some(stack_size) = config.stack_size {
        builder = builder.stack_size(stack_size);
    }

    // A failed spawn consumes the closure it was given, so the job sits in a slot both sides can take it from.
    let slot = Arc::new(Mutex::new(Some(job)));
    let thread_slot = Arc::clone(&slot);
    let spawn_result = builder.spawn(move || {
        let job = thread_slot.lock().unwrap().take();
        if let Some(job) = job {
            job();
        }
    });

    match spawn_result {
        // Dropping the handle detaches the thread.
        Ok(_) => trace!(thread_name = %thread_name, "Spawned worker thread."),
        Err(e) => {
            warn!(
                thread_name = %thread_name,
                error = %e,
                "Failed to spawn worker thread. Running branch on the calling thread."
            );
            let job = slot.lock().unwrap().take();
            if let Some(job) = job {
                job();
            }
        }
    }
}

#[cfg(feature = "loom")]
pub(crate) fn spawn<F>(_role: &'static str, _index: usize, job: F)
where
    F: FnOnce() + Send + 'static,
{
    loom::thread::spawn(job);
}
