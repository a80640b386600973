//! Lamport single-producer single-consumer ring for `Copy` messages.
//!
//! Only atomic loads and stores are used, so it works between the two
//! Cortex-M0+ cores of the RP2040, which have no read-modify-write atomics.
//!
//! # Contract
//!
//! - Only ONE context may call [`push()`](Ring::push) (the interrupt handler).
//! - Only ONE context may call [`pop()`](Ring::pop) (the worker core).

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Fixed ring of `N` slots holding up to `N - 1` messages.
///
/// One slot always stays empty so that `head == tail` means empty and
/// `head + 1 == tail` means full.
pub struct Ring<T: Copy, const N: usize> {
    slots: [UnsafeCell<MaybeUninit<T>>; N],
    /// Next slot to write (producer only).
    head: AtomicUsize,
    /// Next slot to read (consumer only).
    tail: AtomicUsize,
}

// SAFETY: A slot is written only by the producer while it lies outside
// `tail..head`, and read only by the consumer while it lies inside. The
// Release store of `head`/`tail` publishes each hand-over.
unsafe impl<T: Copy + Send, const N: usize> Sync for Ring<T, N> {}

impl<T: Copy, const N: usize> Ring<T, N> {
    pub const fn new() -> Self {
        assert!(N >= 2, "ring needs at least 2 slots (1 usable)");
        Ring {
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Producer side. Hands the message back if the ring is full.
    pub fn push(&self, msg: T) -> Result<(), T> {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) % N;
        if next == self.tail.load(Ordering::Acquire) {
            return Err(msg);
        }
        // SAFETY: `head` is outside the consumer's window until published.
        unsafe { (*self.slots[head].get()).write(msg) };
        self.head.store(next, Ordering::Release);
        Ok(())
    }

    /// Consumer side.
    pub fn pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: `tail != head`, so the producer has written and published
        // this slot. `T: Copy`, so reading leaves nothing to drop.
        let msg = unsafe { (*self.slots[tail].get()).assume_init() };
        self.tail.store((tail + 1) % N, Ordering::Release);
        Some(msg)
    }

}

impl<T: Copy, const N: usize> Default for Ring<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
