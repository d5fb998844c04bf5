//! Lazily created shared instance, with and without an initialization guard.
//!
//! The registry is an ordinary value: create it once, share it by reference
//! or `Arc`, and call [`SingletonRegistry::get_instance`]. There is no global
//! accessor.

use core::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::thread;

/// How the first caller's construction is protected from concurrent callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStrategy {
    /// Check, pause, construct, publish. Nothing stops two callers from
    /// both seeing "not created yet".
    Racy,
    /// Check, take the init lock, check again, construct, publish.
    DoubleChecked,
    /// Atomic one-time initialization.
    Once,
}

/// The lazily constructed value. `id` is unique per construction.
#[derive(Debug, PartialEq, Eq)]
pub struct Instance {
    id: usize,
    created_on: String,
}

impl Instance {
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Name of the thread that constructed this instance.
    #[must_use]
    pub fn created_on(&self) -> &str {
        &self.created_on
    }
}

pub struct SingletonRegistry {
    strategy: InitStrategy,
    construct_delay: Duration,
    published: RwLock<Option<Arc<Instance>>>,
    init_lock: Mutex<()>,
    once: OnceLock<Arc<Instance>>,
    constructed: AtomicUsize,
}

impl SingletonRegistry {
    #[must_use]
    pub fn new(strategy: InitStrategy) -> Self {
        Self {
            strategy,
            construct_delay: Duration::ZERO,
            published: RwLock::new(None),
            init_lock: Mutex::new(()),
            once: OnceLock::new(),
            constructed: AtomicUsize::new(0),
        }
    }

    /// Pause injected between the "exists?" check and construction.
    #[must_use]
    pub fn with_construct_delay(mut self, delay: Duration) -> Self {
        self.construct_delay = delay;
        self
    }

    #[must_use]
    pub fn strategy(&self) -> InitStrategy {
        self.strategy
    }

    /// Returns the shared instance, creating it on first use.
    ///
    /// Under [`InitStrategy::Racy`] concurrent first callers may each get a
    /// different instance; the last publisher wins the slot.
    pub fn get_instance(&self) -> Arc<Instance> {
        match self.strategy {
            InitStrategy::Racy => self.get_racy(),
            InitStrategy::DoubleChecked => self.get_double_checked(),
            InitStrategy::Once => Arc::clone(self.once.get_or_init(|| self.construct())),
        }
    }

    /// How many instances have been constructed so far.
    #[must_use]
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    fn get_racy(&self) -> Arc<Instance> {
        // the slot's lock only keeps each read and write whole; the check
        // and the publish are separate critical sections
        if let Some(existing) = self.peek() {
            return existing;
        }
        let instance = self.construct();
        *self.write_slot() = Some(Arc::clone(&instance));
        instance
    }

    fn get_double_checked(&self) -> Arc<Instance> {
        if let Some(existing) = self.peek() {
            return existing;
        }

        let _init = match self.init_lock.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        if let Some(existing) = self.peek() {
            return existing;
        }
        let instance = self.construct();
        *self.write_slot() = Some(Arc::clone(&instance));
        instance
    }

    fn peek(&self) -> Option<Arc<Instance>> {
        match self.published.read() {
            Ok(g) => g.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }

    fn write_slot(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<Instance>>> {
        match self.published.write() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }

    fn construct(&self) -> Arc<Instance> {
        if !self.construct_delay.is_zero() {
            thread::sleep(self.construct_delay);
        }
        let id = self.constructed.fetch_add(1, Ordering::SeqCst);
        let created_on = thread::current().name().unwrap_or("unnamed").to_string();
        tracing::debug!("constructed singleton instance {} on {}", id, created_on);
        Arc::new(Instance { id, created_on })
    }
}

impl core::fmt::Debug for SingletonRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SingletonRegistry")
            .field("strategy", &self.strategy)
            .field("construct_delay", &self.construct_delay)
            .field("constructed", &self.constructed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Barrier;
    use ntest::timeout;
    use std::collections::HashSet;

    /// Lines up `participants` threads on a barrier, then has each fetch the
    /// instance once. Returns the distinct ids observed.
    fn concurrent_first_access(registry: &Arc<SingletonRegistry>, participants: usize) -> HashSet<usize> {
        let start = Barrier::new(participants);
        let handles: Vec<_> = (0..participants)
            .map(|_| {
                let registry = Arc::clone(registry);
                let start = start.clone();
                thread::spawn(move || {
                    start.arrive().unwrap();
                    registry.get_instance().id()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    /// WHY: The unguarded check-then-construct is the hazard
    /// WHAT: With a delay and 4 callers, some trial sees 2+ instances
    #[test]
    #[timeout(30000)]
    fn racy_strategy_can_construct_duplicates() {
        let duplicated = (0..10).any(|_| {
            let registry = Arc::new(
                SingletonRegistry::new(InitStrategy::Racy)
                    .with_construct_delay(Duration::from_millis(20)),
            );
            let ids = concurrent_first_access(&registry, 4);
            assert_eq!(registry.constructed(), ids.len());
            ids.len() >= 2
        });
        assert!(duplicated);
    }

    /// WHY: Both guards must hold under any concurrency
    /// WHAT: 16 callers with a delay always share exactly one instance
    #[test]
    #[timeout(30000)]
    fn guarded_strategies_construct_exactly_once() {
        for strategy in [InitStrategy::DoubleChecked, InitStrategy::Once] {
            for _ in 0..5 {
                let registry = Arc::new(
                    SingletonRegistry::new(strategy).with_construct_delay(Duration::from_millis(5)),
                );
                let ids = concurrent_first_access(&registry, 16);
                assert_eq!(ids.len(), 1, "{strategy:?} produced {ids:?}");
                assert_eq!(registry.constructed(), 1);
            }
        }
    }

    /// WHY: Once created, every strategy returns the same instance
    /// WHAT: Sequential calls hand back pointer-equal Arcs
    #[test]
    fn sequential_calls_reuse_the_instance() {
        for strategy in [InitStrategy::Racy, InitStrategy::DoubleChecked, InitStrategy::Once] {
            let registry = SingletonRegistry::new(strategy);
            let first = registry.get_instance();
            let second = registry.get_instance();
            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!(first.id(), 0);
            assert_eq!(registry.constructed(), 1);
        }
    }
}
