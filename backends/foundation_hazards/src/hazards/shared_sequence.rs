//! Ordered sequence mutated with zero coordination.
//!
//! `append` is a read-modify-write of the length split into a separate load
//! and store, with a configurable gap between them. Two appenders that read
//! the same length write the same cell and both store `len + 1`: one element
//! is lost and `size()` ends up below the number of calls. That loss is the
//! behaviour under study and is not corrected.
//!
//! Storage is reserved up front (`capacity`) so the racing writers never
//! reallocate underneath each other. Appends past the end are dropped and
//! counted in [`SharedSequence::overflowed`].

use core::marker::PhantomData;
use core::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use super::slot::{Slot, SlotValue};

/// What happens between reading the length and publishing the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RaceWindow {
    /// Back-to-back; races still happen, just rarely.
    Tight,
    /// Yield the thread, which makes an interleaving likely even on one core.
    #[default]
    Yield,
    /// Sleep inside the window.
    Sleep(Duration),
}

impl RaceWindow {
    #[inline]
    fn open(self) {
        match self {
            RaceWindow::Tight => {}
            RaceWindow::Yield => thread::yield_now(),
            RaceWindow::Sleep(pause) => thread::sleep(pause),
        }
    }
}

pub struct SharedSequence<T: SlotValue> {
    slots: Box<[Slot]>,
    len: AtomicUsize,
    attempts: AtomicUsize,
    overflowed: AtomicUsize,
    window: RaceWindow,
    _marker: PhantomData<T>,
}

impl<T: SlotValue> SharedSequence<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_window(capacity, RaceWindow::default())
    }

    #[must_use]
    pub fn with_window(capacity: usize, window: RaceWindow) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::default()).collect(),
            len: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            overflowed: AtomicUsize::new(0),
            window,
            _marker: PhantomData,
        }
    }

    /// Appends without any coordination with concurrent callers.
    pub fn append(&self, value: T) {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        let len = self.len.load(Ordering::Acquire);
        self.window.open();

        let Some(slot) = self.slots.get(len) else {
            self.overflowed.fetch_add(1, Ordering::Relaxed);
            return;
        };
        slot.store(value);
        self.len.store(len + 1, Ordering::Release);
    }

    /// Removes the last element, racing with every other caller.
    ///
    /// Concurrent pops can hand out the same element twice while shrinking
    /// the sequence only once.
    pub fn pop(&self) -> Option<T> {
        let len = self.len.load(Ordering::Acquire);
        if len == 0 {
            return None;
        }
        self.window.open();

        let value = self.slots.get(len - 1).and_then(Slot::load);
        self.len.store(len - 1, Ordering::Release);
        value
    }

    /// Length as currently published.
    #[must_use]
    pub fn size(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Reads the last element without coordination.
    ///
    /// Mid-mutation this can be stale, or `None` when the published length
    /// points at a cell nobody has written yet.
    #[must_use]
    pub fn last(&self) -> Option<T> {
        let len = self.len.load(Ordering::Acquire);
        if len == 0 {
            return None;
        }
        self.window.open();
        self.slots.get(len - 1).and_then(Slot::load)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of `append` calls made, lost or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Appends dropped for lack of reserved capacity.
    #[must_use]
    pub fn overflowed(&self) -> usize {
        self.overflowed.load(Ordering::Relaxed)
    }

    /// `append` calls that did not survive as elements.
    #[must_use]
    pub fn lost_updates(&self) -> usize {
        self.attempts().saturating_sub(self.size())
    }

    /// Elements up to the published length.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        let len = self.size().min(self.slots.len());
        self.slots[..len].iter().filter_map(Slot::load).collect()
    }
}

impl<T: SlotValue> core::fmt::Debug for SharedSequence<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedSequence")
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .field("attempts", &self.attempts())
            .field("window", &self.window)
            .finish()
    }
}
