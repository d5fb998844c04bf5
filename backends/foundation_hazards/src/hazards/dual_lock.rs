//! Two locks taken in opposite orders by two entry points.
//!
//! Lock order:
//! - [`DualLockActor::op_a`]: `journal` (A) then `ids` (B)
//! - [`DualLockActor::op_b`]: `ids` (B) then `journal` (A)
//!
//! Run one of each concurrently and, with a hold delay between the first and
//! second acquisition, each thread ends up holding the lock the other needs.
//! Neither acquisition has a timeout and nothing detects the cycle, so the
//! only way out is for the caller to stop waiting.

use core::time::Duration;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::errors::HazardResult;
use crate::primitives::TaskPool;

/// Whether both operations returned within the bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlockOutcome {
    Completed,
    DidNotComplete,
}

#[derive(Debug, Default)]
pub struct DualLockActor {
    journal: Mutex<Vec<String>>,
    ids: Mutex<Vec<String>>,
    hold_delay: Option<Duration>,
}

impl DualLockActor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause between acquiring the first lock and asking for the second.
    #[must_use]
    pub fn with_hold_delay(mut self, delay: Duration) -> Self {
        self.hold_delay = Some(delay);
        self
    }

    /// Takes A, then B, and records `value` in both.
    ///
    /// # Errors
    ///
    /// [`crate::HazardError::Interrupted`] if either lock was poisoned.
    pub fn op_a(&self, value: u64) -> HazardResult<()> {
        let mut journal = self.journal.lock()?;
        tracing::trace!("op_a({}) holding journal", value);
        self.hold();

        let mut ids = self.ids.lock()?;
        ids.push(value.to_string());
        journal.push(format!("op_a recorded {value}"));
        Ok(())
    }

    /// Takes B, records `id`, then takes A to log the change.
    ///
    /// # Errors
    ///
    /// [`crate::HazardError::Interrupted`] if either lock was poisoned.
    pub fn op_b(&self, id: &str) -> HazardResult<()> {
        let mut ids = self.ids.lock()?;
        ids.push(id.to_string());
        tracing::trace!("op_b({}) holding ids", id);
        self.hold();

        let mut journal = self.journal.lock()?;
        journal.push(format!("op_b recorded {id}"));
        Ok(())
    }

    /// Entries written to the journal so far.
    ///
    /// Blocks for as long as a deadlocked operation holds the journal lock.
    ///
    /// # Errors
    ///
    /// [`crate::HazardError::Interrupted`] if the lock was poisoned.
    pub fn journal(&self) -> HazardResult<Vec<String>> {
        Ok(self.journal.lock()?.clone())
    }

    /// # Errors
    ///
    /// [`crate::HazardError::Interrupted`] if the lock was poisoned.
    pub fn ids(&self) -> HazardResult<Vec<String>> {
        Ok(self.ids.lock()?.clone())
    }

    fn hold(&self) {
        if let Some(delay) = self.hold_delay {
            thread::sleep(delay);
        }
    }
}

/// Runs `op_a` and `op_b` concurrently and waits up to `bound` for both.
///
/// On [`DeadlockOutcome::DidNotComplete`] the two worker threads stay blocked
/// for the life of the process, holding both locks: `actor` must not be used
/// for anything that locks afterwards.
///
/// # Errors
///
/// [`crate::HazardError::Io`] if the worker threads cannot be spawned.
pub fn run_conflicting(actor: &Arc<DualLockActor>, bound: Duration) -> HazardResult<DeadlockOutcome> {
    let pool = TaskPool::new(2)?;

    let first = Arc::clone(actor);
    pool.execute(move || {
        if let Err(err) = first.op_a(1) {
            tracing::error!("op_a failed: {}", err);
        }
    })?;

    let second = Arc::clone(actor);
    pool.execute(move || {
        if let Err(err) = second.op_b("1") {
            tracing::error!("op_b failed: {}", err);
        }
    })?;

    Ok(settle(&pool, bound))
}

/// Runs `op_a` twice concurrently. Both take the locks in the same order, so
/// this always completes.
///
/// # Errors
///
/// [`crate::HazardError::Io`] if the worker threads cannot be spawned.
pub fn run_consistent(actor: &Arc<DualLockActor>, bound: Duration) -> HazardResult<DeadlockOutcome> {
    let pool = TaskPool::new(2)?;

    for value in [1, 2] {
        let actor = Arc::clone(actor);
        pool.execute(move || {
            if let Err(err) = actor.op_a(value) {
                tracing::error!("op_a failed: {}", err);
            }
        })?;
    }

    Ok(settle(&pool, bound))
}

fn settle(pool: &TaskPool, bound: Duration) -> DeadlockOutcome {
    if pool.shutdown_and_wait(bound) {
        DeadlockOutcome::Completed
    } else {
        tracing::warn!("lock-ordering run did not finish within {:?}", bound);
        DeadlockOutcome::DidNotComplete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;

    /// WHY: Opposite lock orders with a hold delay must wedge
    /// WHAT: The conflicting run reports DidNotComplete within the bound
    #[test]
    #[timeout(10000)]
    fn conflicting_order_deadlocks() {
        let actor = Arc::new(DualLockActor::new().with_hold_delay(Duration::from_millis(100)));
        let outcome = run_conflicting(&actor, Duration::from_millis(500)).unwrap();
        assert_eq!(outcome, DeadlockOutcome::DidNotComplete);
        // the actor is wedged from here on and intentionally leaked
    }

    /// WHY: Same lock order never deadlocks
    /// WHAT: Two op_a calls complete and both are recorded
    #[test]
    #[timeout(10000)]
    fn consistent_order_completes() {
        let actor = Arc::new(DualLockActor::new().with_hold_delay(Duration::from_millis(50)));
        let outcome = run_consistent(&actor, Duration::from_secs(5)).unwrap();
        assert_eq!(outcome, DeadlockOutcome::Completed);

        let mut ids = actor.ids().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(actor.journal().unwrap().len(), 2);
    }

    /// WHY: Each operation alone is correct
    /// WHAT: Sequential op_a then op_b record in both lists
    #[test]
    fn sequential_operations_record_both_sides() {
        let actor = DualLockActor::new();
        actor.op_a(7).unwrap();
        actor.op_b("x").unwrap();

        assert_eq!(actor.ids().unwrap(), vec!["7", "x"]);
        assert_eq!(
            actor.journal().unwrap(),
            vec!["op_a recorded 7", "op_b recorded x"]
        );
    }
}
