//! Objects that reproduce a concurrency defect, each next to its fix.

pub mod dual_lock;
pub mod shared_sequence;
pub mod singleton;
pub mod slot;
pub mod synchronized;

pub use dual_lock::{run_conflicting, run_consistent, DeadlockOutcome, DualLockActor};
pub use shared_sequence::{RaceWindow, SharedSequence};
pub use singleton::{InitStrategy, Instance, SingletonRegistry};
pub use slot::SlotValue;
pub use synchronized::{ReadPolicy, SynchronizedContainer};
