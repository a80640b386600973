//! Wire buffers: encoded biphase words waiting for DMA.

use core::cell::UnsafeCell;

use crate::constants::WIRE_BUFFER_SIZE;

/// One of the two chained DMA channels, each with its own wire buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    A,
    B,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::A, Channel::B];

    pub const fn index(self) -> usize {
        match self {
            Channel::A => 0,
            Channel::B => 1,
        }
    }

    /// The channel this one hands off to when it finishes.
    pub const fn chained(self) -> Channel {
        match self {
            Channel::A => Channel::B,
            Channel::B => Channel::A,
        }
    }
}

/// The two wire buffers, A and B.
///
/// The encode side writes a buffer only after its channel has finished
/// reading it, and must finish before the chain comes back around. Nothing
/// enforces that deadline: a late write means the hardware replays whatever
/// the buffer held.
#[repr(C, align(4))]
pub struct WireBuffers {
    words: [UnsafeCell<[u16; WIRE_BUFFER_SIZE]>; 2],
}

// SAFETY: Software access goes through the `unsafe` accessors below, whose
// callers guarantee a single writer. DMA reads happen outside the Rust
// memory model through the raw pointer from `as_ptr`.
unsafe impl Sync for WireBuffers {}

impl WireBuffers {
    pub const fn new() -> Self {
        WireBuffers {
            words: [
                UnsafeCell::new([0u16; WIRE_BUFFER_SIZE]),
                UnsafeCell::new([0u16; WIRE_BUFFER_SIZE]),
            ],
        }
    }

    /// Start address to program into `channel`'s read pointer.
    pub fn as_ptr(&self, channel: Channel) -> *const u16 {
        self.words[channel.index()].get() as *const u16
    }

    /// Words per buffer, which is also the DMA transfer count.
    pub const fn transfer_count(&self) -> usize {
        WIRE_BUFFER_SIZE
    }

    /// Exclusive access for the encode side.
    ///
    /// # Safety
    ///
    /// No other reference to this channel's buffer may exist for the
    /// lifetime of the returned borrow.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self, channel: Channel) -> &mut [u16; WIRE_BUFFER_SIZE] {
        unsafe { &mut *self.words[channel.index()].get() }
    }

    /// Shared view of a buffer.
    ///
    /// # Safety
    ///
    /// The encode side must not write this buffer while the borrow lives.
    pub unsafe fn get(&self, channel: Channel) -> &[u16; WIRE_BUFFER_SIZE] {
        unsafe { &*self.words[channel.index()].get() }
    }
}

impl Default for WireBuffers {
    fn default() -> Self {
        Self::new()
    }
}
