//! Reproducible multi-threading hazards next to their correct baselines.
//!
//! This crate provides:
//! - **Primitives**: fixed-size task pool, write-once futures, cyclic barrier
//! - **Hazards**: an unsynchronized sequence that loses appends, a lazily
//!   created singleton that can be created twice, and two locks taken in
//!   opposite orders
//! - **Workloads**: prime search strategies and slow stand-in collaborators
//! - **Trials and timing**: repeat a race and count how often it shows up
//! - **Scenarios**: named console runners wiring it all together
//!
//! # Examples
//!
//! ```rust
//! use foundation_hazards::hazards::{RaceWindow, SharedSequence, SynchronizedContainer};
//! use foundation_hazards::primitives::TaskPool;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let racy = Arc::new(SharedSequence::<u64>::with_window(1_000, RaceWindow::Yield));
//! let locked = Arc::new(SynchronizedContainer::<u64>::new());
//! let pool = TaskPool::new(8).unwrap();
//!
//! for i in 0..1_000u64 {
//!     let racy = Arc::clone(&racy);
//!     let locked = Arc::clone(&locked);
//!     pool.execute(move || {
//!         racy.append(i);
//!         locked.append(i);
//!     }).unwrap();
//! }
//!
//! assert!(pool.shutdown_and_wait(Duration::from_secs(10)));
//! assert!(racy.size() <= 1_000);
//! assert_eq!(locked.size(), 1_000);
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod errors;
pub mod hazards;
pub mod primitives;
pub mod scenarios;
pub mod timing;
pub mod trials;
pub mod workloads;

pub use config::{HarnessConfig, ParallelismConfig};
pub use errors::{BoxedError, HazardError, HazardResult};
pub use scenarios::Scenario;
pub use trials::{TrialConfig, TrialReport, TrialRunner};
