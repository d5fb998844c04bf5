//! Concurrency primitives the scenarios are built from.
//!
//! - Task pool with fire-and-forget and future-returning submission
//! - Write-once futures
//! - Cyclic rendezvous barrier

pub mod barrier;
pub mod future;
pub mod thread_pool;

pub use barrier::{ArrivalResult, Barrier};
pub use future::TaskFuture;
pub use thread_pool::{PoolStats, TaskPool};
