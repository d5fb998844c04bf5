use derive_more::From;

use std::io;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type HazardResult<T> = std::result::Result<T, HazardError>;

/// Failures surfaced by the harness primitives and scenario runners.
///
/// Races are never reported through this type: a lost append or a duplicate
/// singleton shows up as a violated post-condition the caller inspects.
#[derive(From, Debug)]
pub enum HazardError {
    /// A bounded wait (pool drain, barrier, future) ran out of time.
    WaitTimeout,

    /// A blocking wait was abandoned: the producer went away or a lock
    /// was poisoned underneath the waiter.
    Interrupted,

    /// A barrier participant failed or gave up while others were waiting.
    BrokenBarrier,

    /// Work was submitted after the pool was shut down.
    PoolShutDown,

    #[from(ignore)]
    TaskPanicked(String),

    #[from(ignore)]
    DataAccess(String),

    #[from(ignore)]
    Io(io::Error),

    #[from(ignore)]
    Pattern(regex::Error),

    #[from(ignore)]
    ParallelPool(rayon::ThreadPoolBuildError),
}

impl HazardError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, HazardError::WaitTimeout)
    }

    #[must_use]
    pub fn is_broken_barrier(&self) -> bool {
        matches!(self, HazardError::BrokenBarrier)
    }
}

impl From<io::Error> for HazardError {
    fn from(value: io::Error) -> Self {
        HazardError::Io(value)
    }
}

impl From<regex::Error> for HazardError {
    fn from(value: regex::Error) -> Self {
        HazardError::Pattern(value)
    }
}

impl From<rayon::ThreadPoolBuildError> for HazardError {
    fn from(value: rayon::ThreadPoolBuildError) -> Self {
        HazardError::ParallelPool(value)
    }
}

impl<T> From<std::sync::PoisonError<T>> for HazardError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        HazardError::Interrupted
    }
}

impl std::error::Error for HazardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HazardError::Io(err) => Some(err),
            HazardError::Pattern(err) => Some(err),
            HazardError::ParallelPool(err) => Some(err),
            _ => None,
        }
    }
}

impl core::fmt::Display for HazardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HazardError::WaitTimeout => write!(f, "HazardError::WaitTimeout"),
            HazardError::Interrupted => write!(f, "HazardError::Interrupted"),
            HazardError::BrokenBarrier => write!(f, "HazardError::BrokenBarrier"),
            HazardError::PoolShutDown => write!(f, "HazardError::PoolShutDown"),
            HazardError::TaskPanicked(msg) => write!(f, "HazardError::TaskPanicked({msg})"),
            HazardError::DataAccess(msg) => write!(f, "HazardError::DataAccess({msg})"),
            HazardError::Io(err) => write!(f, "HazardError::Io({err})"),
            HazardError::Pattern(err) => write!(f, "HazardError::Pattern({err})"),
            HazardError::ParallelPool(err) => write!(f, "HazardError::ParallelPool({err})"),
        }
    }
}

/// Renders a `catch_unwind` payload into something loggable.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        String::from("non-string panic payload")
    }
}
