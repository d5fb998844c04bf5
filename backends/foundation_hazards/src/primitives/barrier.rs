//! Cyclic rendezvous barrier with a one-shot release action.

use core::fmt;
use core::time::Duration;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;

use crate::errors::{panic_message, HazardError, HazardResult};

type ReleaseAction = Box<dyn Fn() + Send + Sync + 'static>;

/// A barrier that blocks callers until `capacity` of them have arrived.
///
/// The last arrival of a cycle runs the release action (if any) before
/// anybody is let through, then the barrier starts a fresh cycle.
///
/// When one participant times out, calls [`Barrier::break_barrier`], or the
/// release action panics, the current cycle is broken: every waiter wakes
/// with [`HazardError::BrokenBarrier`] and later arrivals fail the same way
/// until [`Barrier::reset`].
///
/// # Examples
///
/// ```
/// use foundation_hazards::primitives::Barrier;
/// use std::thread;
///
/// let barrier = Barrier::with_action(3, || println!("|| Opening barrier. ||"));
/// let mut handles = vec![];
///
/// for i in 0..3 {
///     let barrier_clone = barrier.clone();
///     handles.push(thread::spawn(move || {
///         println!("Thread {} before barrier", i);
///         barrier_clone.arrive().unwrap();
///         println!("Thread {} after barrier", i);
///     }));
/// }
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// ```
pub struct Barrier {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<BarrierState>,
    condvar: Condvar,
    capacity: usize,
    action: Option<ReleaseAction>,
}

struct BarrierState {
    count: usize,
    current: Arc<Generation>,
}

/// One cycle of the barrier. Waiters hold on to the cycle they arrived in,
/// so a later reset cannot be mistaken for a release.
struct Generation {
    id: usize,
    broken: AtomicBool,
}

impl Generation {
    fn new(id: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            broken: AtomicBool::new(false),
        })
    }

    fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }
}

/// Returned to every caller let through by [`Barrier::arrive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrivalResult {
    is_leader: bool,
    generation: usize,
}

impl ArrivalResult {
    /// True for the arrival that completed the quorum and ran the action.
    #[inline]
    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    /// Cycle this arrival belonged to, counting from 0.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }
}

impl Barrier {
    /// Creates a barrier for `capacity` participants with no release action.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::build(capacity, None)
    }

    /// Creates a barrier whose release action runs once per completed cycle.
    ///
    /// The action runs on the completing participant's thread while the
    /// barrier's lock is held, so it must not call back into the barrier.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn with_action<F>(capacity: usize, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(capacity, Some(Box::new(action)))
    }

    fn build(capacity: usize, action: Option<ReleaseAction>) -> Self {
        assert!(capacity > 0, "Barrier capacity must be > 0");

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(BarrierState {
                    count: 0,
                    current: Generation::new(0),
                }),
                condvar: Condvar::new(),
                capacity,
                action,
            }),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Participants currently blocked in the active cycle.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.lock().count
    }

    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.lock().current.is_broken()
    }

    /// Blocks until `capacity` participants have arrived in this cycle.
    ///
    /// # Errors
    ///
    /// [`HazardError::BrokenBarrier`] when the cycle is or becomes broken.
    pub fn arrive(&self) -> HazardResult<ArrivalResult> {
        self.arrive_until(None)
    }

    /// Like [`Barrier::arrive`] but gives up after `timeout`, breaking the
    /// cycle for everybody else.
    ///
    /// # Errors
    ///
    /// [`HazardError::WaitTimeout`] for the caller that gave up,
    /// [`HazardError::BrokenBarrier`] when somebody else broke the cycle.
    pub fn arrive_timeout(&self, timeout: Duration) -> HazardResult<ArrivalResult> {
        self.arrive_until(Instant::now().checked_add(timeout))
    }

    /// Marks the current cycle as failed and wakes every waiter.
    pub fn break_barrier(&self) {
        let mut guard = self.lock();
        self.break_locked(&mut guard);
    }

    /// Breaks the current cycle (if anybody is waiting on it) and starts a
    /// fresh one that accepts arrivals again.
    pub fn reset(&self) {
        let mut guard = self.lock();
        if guard.count > 0 {
            self.break_locked(&mut guard);
        }
        let next = guard.current.id + 1;
        guard.current = Generation::new(next);
        guard.count = 0;
        tracing::debug!("Barrier reset to generation {}", next);
    }

    fn arrive_until(&self, deadline: Option<Instant>) -> HazardResult<ArrivalResult> {
        let mut guard = self.lock();

        let generation = Arc::clone(&guard.current);
        if generation.is_broken() {
            return Err(HazardError::BrokenBarrier);
        }

        guard.count += 1;

        if guard.count >= self.inner.capacity {
            return self.release_locked(guard, &generation);
        }

        loop {
            guard = match deadline {
                None => match self.inner.condvar.wait(guard) {
                    Ok(g) => g,
                    Err(e) => e.into_inner(),
                },
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        if generation.is_broken() {
                            return Err(HazardError::BrokenBarrier);
                        }
                        if !Arc::ptr_eq(&generation, &guard.current) {
                            break;
                        }
                        tracing::warn!(
                            "Barrier wait timed out in generation {}, breaking it",
                            generation.id
                        );
                        self.break_locked(&mut guard);
                        return Err(HazardError::WaitTimeout);
                    }
                    match self.inner.condvar.wait_timeout(guard, remaining) {
                        Ok((g, _)) => g,
                        Err(e) => e.into_inner().0,
                    }
                }
            };

            if generation.is_broken() {
                return Err(HazardError::BrokenBarrier);
            }
            if !Arc::ptr_eq(&generation, &guard.current) {
                break;
            }
        }

        Ok(ArrivalResult {
            is_leader: false,
            generation: generation.id,
        })
    }

    fn release_locked(
        &self,
        mut guard: MutexGuard<'_, BarrierState>,
        generation: &Arc<Generation>,
    ) -> HazardResult<ArrivalResult> {
        if let Some(action) = &self.inner.action {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| action())) {
                tracing::error!(
                    "Barrier release action panicked in generation {}: {}",
                    generation.id,
                    panic_message(payload.as_ref())
                );
                self.break_locked(&mut guard);
                return Err(HazardError::BrokenBarrier);
            }
        }

        guard.count = 0;
        guard.current = Generation::new(generation.id + 1);
        drop(guard);
        self.inner.condvar.notify_all();

        tracing::debug!("Barrier released generation {}", generation.id);
        Ok(ArrivalResult {
            is_leader: true,
            generation: generation.id,
        })
    }

    fn break_locked(&self, guard: &mut MutexGuard<'_, BarrierState>) {
        guard.current.broken.store(true, Ordering::Release);
        guard.count = 0;
        self.inner.condvar.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        match self.inner.state.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }
}

impl Clone for Barrier {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.lock();
        f.debug_struct("Barrier")
            .field("capacity", &self.inner.capacity)
            .field("count", &guard.count)
            .field("generation", &guard.current.id)
            .field("broken", &guard.current.is_broken())
            .finish()
    }
}
