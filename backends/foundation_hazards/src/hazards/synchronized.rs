//! Growable sequence that serializes every mutation under one lock.
//!
//! Reads go through the same lock by default ([`ReadPolicy::Locked`]). That
//! is correct but turns every `last()` into a queue behind the writers.
//! [`ReadPolicy::Unlocked`] answers `last()` from a lock-free mirror of the
//! most recent append instead: faster, and free to be one append behind.

use core::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;

use super::slot::{Slot, SlotValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPolicy {
    #[default]
    Locked,
    Unlocked,
}

pub struct SynchronizedContainer<T: SlotValue> {
    items: Mutex<Vec<T>>,
    latest: Slot,
    reads: AtomicUsize,
    policy: ReadPolicy,
    work_delay: Option<Duration>,
}

impl<T: SlotValue> SynchronizedContainer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(ReadPolicy::Locked)
    }

    #[must_use]
    pub fn with_policy(policy: ReadPolicy) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            latest: Slot::default(),
            reads: AtomicUsize::new(0),
            policy,
            work_delay: None,
        }
    }

    /// Simulated work performed by every `append` and `last`, inside the
    /// critical section whenever the operation takes the lock.
    #[must_use]
    pub fn with_work_delay(mut self, delay: Duration) -> Self {
        self.work_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn policy(&self) -> ReadPolicy {
        self.policy
    }

    pub fn append(&self, value: T) {
        let mut items = self.lock();
        self.simulate_work();
        items.push(value);
        self.latest.store(value);
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Most recent element, read according to the container's [`ReadPolicy`].
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        match self.policy {
            ReadPolicy::Locked => {
                let items = self.lock();
                self.simulate_work();
                items.last().copied()
            }
            ReadPolicy::Unlocked => {
                self.simulate_work();
                self.latest.load()
            }
        }
    }

    /// Number of `last()` calls served.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Copy of the elements in lock-grant order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().clone()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self.items.into_inner() {
            Ok(items) => items,
            Err(e) => e.into_inner(),
        }
    }

    fn simulate_work(&self) {
        if let Some(delay) = self.work_delay {
            thread::sleep(delay);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        match self.items.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }
}

impl<T: SlotValue> Default for SynchronizedContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SlotValue> core::fmt::Debug for SynchronizedContainer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SynchronizedContainer")
            .field("size", &self.size())
            .field("policy", &self.policy)
            .field("work_delay", &self.work_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::TaskPool;
    use ntest::timeout;
    use std::sync::Arc;
    use std::time::Instant;

    fn fill_concurrently(container: &Arc<SynchronizedContainer<u64>>, count: usize) {
        let pool = TaskPool::new(8).unwrap();
        for i in 0..count {
            let container = Arc::clone(container);
            pool.execute(move || container.append(i as u64)).unwrap();
        }
        assert!(pool.shutdown_and_wait(Duration::from_secs(30)));
    }

    /// WHY: The lock makes every append count
    /// WHAT: For N in {0, 1, 10, 1000, 10000}, size == N after a drained pool
    #[test]
    #[timeout(60000)]
    fn concurrent_appends_are_never_lost() {
        for count in [0, 1, 10, 1_000, 10_000] {
            let container = Arc::new(SynchronizedContainer::<u64>::new());
            fill_concurrently(&container, count);
            assert_eq!(container.size(), count);

            let mut items = container.snapshot();
            items.sort_unstable();
            assert_eq!(items, (0..count as u64).collect::<Vec<_>>());
        }
    }

    /// WHY: Both read policies agree once writers are done
    /// WHAT: last() matches the final element under either policy
    #[test]
    fn read_policies_agree_at_rest() {
        for policy in [ReadPolicy::Locked, ReadPolicy::Unlocked] {
            let container = SynchronizedContainer::<i32>::with_policy(policy);
            assert_eq!(container.last(), None);
            container.append(3);
            container.append(5);
            assert_eq!(container.last(), Some(5));
            assert_eq!(container.reads(), 2);
            assert_eq!(container.into_vec(), vec![3, 5]);
        }
    }

    /// WHY: Serialized reads cost throughput under simulated work
    /// WHAT: 16 concurrent locked reads take longer than unlocked ones
    #[test]
    #[timeout(30000)]
    fn locked_reads_serialize_behind_the_lock() {
        fn timed_reads(policy: ReadPolicy) -> Duration {
            let container = Arc::new(
                SynchronizedContainer::<u32>::with_policy(policy)
                    .with_work_delay(Duration::from_millis(10)),
            );
            container.append(1);

            let start = Instant::now();
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let container = Arc::clone(&container);
                    thread::spawn(move || container.last())
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), Some(1));
            }
            start.elapsed()
        }

        let locked = timed_reads(ReadPolicy::Locked);
        let unlocked = timed_reads(ReadPolicy::Unlocked);
        assert!(locked >= Duration::from_millis(160));
        assert!(unlocked < locked);
    }
}
