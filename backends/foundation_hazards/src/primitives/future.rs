//! Write-once result slot shared between a producer and a waiting consumer.

use core::time::Duration;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;

use crate::errors::{HazardError, HazardResult};

enum SlotState<R> {
    Pending,
    Ready(R),
    Failed(HazardError),
    Taken,
}

struct Slot<R> {
    state: Mutex<SlotState<R>>,
    ready: Condvar,
}

impl<R> Slot<R> {
    fn lock(&self) -> MutexGuard<'_, SlotState<R>> {
        match self.state.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }

    /// Only the first write lands; the slot is never overwritten.
    fn resolve(&self, outcome: SlotState<R>) {
        let mut guard = self.lock();
        if matches!(*guard, SlotState::Pending) {
            *guard = outcome;
            drop(guard);
            self.ready.notify_all();
        }
    }
}

/// Creates a connected producer/consumer pair for one work item.
pub(crate) fn channel<R>(index: usize) -> (Promise<R>, TaskFuture<R>) {
    let slot = Arc::new(Slot {
        state: Mutex::new(SlotState::Pending),
        ready: Condvar::new(),
    });
    (
        Promise {
            slot: Some(Arc::clone(&slot)),
        },
        TaskFuture { index, slot },
    )
}

/// Producer half. Consumed by the single write; dropping it unwritten wakes
/// the consumer with [`HazardError::Interrupted`].
pub(crate) struct Promise<R> {
    slot: Option<Arc<Slot<R>>>,
}

impl<R> Promise<R> {
    pub(crate) fn fulfil(mut self, value: R) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(SlotState::Ready(value));
        }
    }

    pub(crate) fn fail(mut self, err: HazardError) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(SlotState::Failed(err));
        }
    }
}

impl<R> Drop for Promise<R> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(SlotState::Failed(HazardError::Interrupted));
        }
    }
}

/// Handle to the result of work handed to [`TaskPool::submit`](super::TaskPool::submit).
pub struct TaskFuture<R> {
    index: usize,
    slot: Arc<Slot<R>>,
}

impl<R> TaskFuture<R> {
    /// Submission index of the work item behind this future.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// True once the producer has written a value or a failure.
    #[must_use]
    pub fn is_done(&self) -> bool {
        !matches!(*self.slot.lock(), SlotState::Pending)
    }

    /// Blocks until the result is written.
    ///
    /// # Errors
    ///
    /// [`HazardError::TaskPanicked`] when the work panicked,
    /// [`HazardError::Interrupted`] when the work was dropped unrun.
    pub fn wait(self) -> HazardResult<R> {
        let mut guard = self.slot.lock();
        while matches!(*guard, SlotState::Pending) {
            guard = match self.slot.ready.wait(guard) {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
        }
        take(&mut guard)
    }

    /// Blocks for at most `timeout`. A timed-out future stays usable.
    ///
    /// # Errors
    ///
    /// [`HazardError::WaitTimeout`] if nothing was written in time, otherwise
    /// as [`TaskFuture::wait`]. A value already taken reads as
    /// [`HazardError::Interrupted`].
    pub fn wait_timeout(&self, timeout: Duration) -> HazardResult<R> {
        // a timeout past the end of the clock means no deadline at all
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.slot.lock();
        while matches!(*guard, SlotState::Pending) {
            guard = match deadline {
                None => match self.slot.ready.wait(guard) {
                    Ok(g) => g,
                    Err(e) => e.into_inner(),
                },
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(HazardError::WaitTimeout);
                    }
                    match self.slot.ready.wait_timeout(guard, remaining) {
                        Ok((g, _)) => g,
                        Err(e) => e.into_inner().0,
                    }
                }
            };
        }
        take(&mut guard)
    }
}

fn take<R>(guard: &mut MutexGuard<'_, SlotState<R>>) -> HazardResult<R> {
    match std::mem::replace(&mut **guard, SlotState::Taken) {
        SlotState::Ready(value) => Ok(value),
        SlotState::Failed(err) => Err(err),
        SlotState::Pending | SlotState::Taken => Err(HazardError::Interrupted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    /// WHY: The consumer must see exactly the value the producer wrote
    /// WHAT: Fulfil from another thread, wait on this one
    #[test]
    fn wait_blocks_until_fulfilled() {
        let (promise, future) = channel::<u32>(3);
        assert!(!future.is_done());

        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            promise.fulfil(99);
        });

        assert_eq!(future.index(), 3);
        assert_eq!(future.wait().unwrap(), 99);
        producer.join().unwrap();
    }

    /// WHY: A dropped producer must never leave the consumer hanging
    /// WHAT: Drop the promise unwritten, expect Interrupted
    #[test]
    fn dropped_promise_interrupts_waiter() {
        let (promise, future) = channel::<u32>(0);
        drop(promise);
        assert!(matches!(future.wait(), Err(HazardError::Interrupted)));
    }

    /// WHY: Timeouts are recoverable
    /// WHAT: Time out once, then receive the value on a later wait
    #[test]
    fn timed_out_future_stays_usable() {
        let (promise, future) = channel::<&'static str>(0);
        assert!(matches!(
            future.wait_timeout(Duration::from_millis(10)),
            Err(HazardError::WaitTimeout)
        ));

        promise.fulfil("late");
        assert_eq!(future.wait_timeout(Duration::from_millis(10)).unwrap(), "late");
        assert!(matches!(
            future.wait_timeout(Duration::from_millis(10)),
            Err(HazardError::Interrupted)
        ));
    }

    /// WHY: A timeout beyond the clock's range must wait, not overflow
    /// WHAT: wait_timeout(Duration::MAX) returns the value written later
    #[test]
    #[ntest::timeout(10000)]
    fn unbounded_timeout_waits_for_the_value() {
        let (promise, future) = channel::<u32>(0);
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            promise.fulfil(7);
        });

        assert_eq!(future.wait_timeout(Duration::MAX).unwrap(), 7);
        producer.join().unwrap();
    }

    /// WHY: Failures travel through the slot like values
    /// WHAT: fail() surfaces the error to wait()
    #[test]
    fn failure_is_delivered() {
        let (promise, future) = channel::<u32>(0);
        promise.fail(HazardError::TaskPanicked("boom".into()));
        assert!(matches!(future.wait(), Err(HazardError::TaskPanicked(msg)) if msg == "boom"));
    }
}
