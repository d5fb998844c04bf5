//! Atomic cells holding one element each.
//!
//! Both container variants keep their elements as raw `u64` bits so an
//! unsynchronized reader can look at a cell without undefined behaviour. A
//! race then costs correctness (lost or stale values), never memory safety.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Element types that round-trip through a `u64`.
pub trait SlotValue: Copy + Send + Sync + 'static {
    fn into_raw(self) -> u64;
    fn from_raw(raw: u64) -> Self;
}

macro_rules! slot_value_lossless {
    ($($ty:ty),*) => {
        $(
            impl SlotValue for $ty {
                #[inline]
                #[allow(clippy::cast_lossless, clippy::cast_sign_loss)]
                fn into_raw(self) -> u64 {
                    self as u64
                }

                #[inline]
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                fn from_raw(raw: u64) -> Self {
                    raw as $ty
                }
            }
        )*
    };
}

slot_value_lossless!(u8, u16, u32, u64, usize, i8, i16, i32, i64);

#[derive(Debug, Default)]
pub(crate) struct Slot {
    value: AtomicU64,
    filled: AtomicBool,
}

impl Slot {
    #[inline]
    pub(crate) fn store<T: SlotValue>(&self, value: T) {
        self.value.store(value.into_raw(), Ordering::Relaxed);
        self.filled.store(true, Ordering::Release);
    }

    /// `None` until something has been stored here.
    #[inline]
    pub(crate) fn load<T: SlotValue>(&self) -> Option<T> {
        if self.filled.load(Ordering::Acquire) {
            Some(T::from_raw(self.value.load(Ordering::Relaxed)))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_values_round_trip() {
        let slot = Slot::default();
        assert_eq!(slot.load::<i32>(), None);
        slot.store(-17i32);
        assert_eq!(slot.load::<i32>(), Some(-17));
    }
}
