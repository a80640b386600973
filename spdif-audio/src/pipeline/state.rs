use core::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a PCM sample buffer.
///
/// Buffers cycle `Stale → Filling → Ready → Stale`. The fill side owns the
/// first two transitions, the encode side owns the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BufferState {
    /// Drained (or never filled); free for the fill side.
    Stale = 0,
    /// Being written by the fill side.
    Filling = 1,
    /// Full; owned by the encode side until drained.
    Ready = 2,
}

/// Which of the two PCM buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferId {
    A,
    B,
}

impl BufferId {
    /// Fill priority order.
    pub const ALL: [BufferId; 2] = [BufferId::A, BufferId::B];

    pub const fn index(self) -> usize {
        match self {
            BufferId::A => 0,
            BufferId::B => 1,
        }
    }

    pub const fn other(self) -> BufferId {
        match self {
            BufferId::A => BufferId::B,
            BufferId::B => BufferId::A,
        }
    }
}

/// [`BufferState`] stored in an `AtomicU8`.
///
/// Only plain loads and stores are used: every transition has exactly one
/// writer, and Cortex-M0+ has no compare-and-swap.
pub(crate) struct AtomicBufferState(AtomicU8);

impl AtomicBufferState {
    pub(crate) const fn new(state: BufferState) -> Self {
        AtomicBufferState(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self, order: Ordering) -> BufferState {
        match self.0.load(order) {
            0 => BufferState::Stale,
            1 => BufferState::Filling,
            _ => BufferState::Ready,
        }
    }

    pub(crate) fn store(&self, state: BufferState, order: Ordering) {
        self.0.store(state as u8, order);
    }
}
