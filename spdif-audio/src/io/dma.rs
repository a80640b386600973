//! Chained two-channel DMA transmitter.
//!
//! ```text
//!   wire A ──ch A──┐                ┌──► completion IRQ ──► rearm A, Job::Encode(A)
//!                  ├──► serial TX ──┤
//!   wire B ──ch B──┘                └──► completion IRQ ──► rearm B, Job::Encode(B)
//! ```
//!
//! Channel A chains to B and B back to A, so the serial peripheral never
//! waits on software. Each completion rearms the finished channel's read
//! pointer and asks the worker to refill its wire buffer while the other
//! channel is on the wire.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::dispatch::{Dispatcher, Job};
use crate::error::TransmitError;
use crate::pipeline::{Channel, PipelineContext, WireBuffers};

/// The hardware side of one DMA channel.
///
/// Implementations program a real controller; the methods take `&self`
/// because they are called from both thread and interrupt context and only
/// poke memory-mapped registers.
pub trait TransferChannel {
    /// One-time programming: read `len` half-words starting at `words`,
    /// incrementing the read address, into the serial peripheral's data
    /// register, paced by its transmit request, chained to the partner
    /// channel, with the completion interrupt enabled. Must not start the
    /// transfer.
    fn configure(&self, words: *const u16, len: usize);

    /// Reset the read pointer to the start of the buffer without starting,
    /// so the partner's chain trigger restarts this channel.
    fn rearm(&self);

    /// Start the transfer now.
    fn trigger(&self);

    /// Stop the channel and discard any pending chain trigger.
    fn abort(&self);

    /// Check and acknowledge this channel's completion flag.
    fn take_completion(&self) -> bool;
}

impl<T: TransferChannel + ?Sized> TransferChannel for &T {
    fn configure(&self, words: *const u16, len: usize) {
        (**self).configure(words, len)
    }

    fn rearm(&self) {
        (**self).rearm()
    }

    fn trigger(&self) {
        (**self).trigger()
    }

    fn abort(&self) {
        (**self).abort()
    }

    fn take_completion(&self) -> bool {
        (**self).take_completion()
    }
}

pub struct DmaTransmitter<C> {
    channels: [C; 2],
    armed: AtomicBool,
}

impl<C: TransferChannel> DmaTransmitter<C> {
    /// `a` must be set up to chain to `b` and `b` back to `a`.
    pub const fn new(a: C, b: C) -> Self {
        DmaTransmitter {
            channels: [a, b],
            armed: AtomicBool::new(false),
        }
    }

    pub fn channel(&self, channel: Channel) -> &C {
        &self.channels[channel.index()]
    }

    /// Program both channels with their wire buffers. Nothing is started.
    pub fn setup(&self, wire: &WireBuffers) {
        for ch in Channel::ALL {
            self.channel(ch)
                .configure(wire.as_ptr(ch), wire.transfer_count());
        }
        debug!("DMA channels configured, {=usize} words each", wire.transfer_count());
    }

    /// Trigger channel A; from then on the chain keeps itself running.
    ///
    /// Refuses until both PCM buffers are Ready, so the first jobs have data
    /// to encode. Starting an armed transmitter does nothing.
    pub fn start<const N: usize>(&self, pipeline: &PipelineContext<N>) -> Result<(), TransmitError> {
        if !pipeline.both_ready() {
            return Err(TransmitError::NotReady);
        }
        if self.armed.load(Ordering::Acquire) {
            return Ok(());
        }
        self.armed.store(true, Ordering::Release);
        self.channel(Channel::A).trigger();
        info!("S/PDIF transmission started");
        Ok(())
    }

    /// Halt both channels. No more jobs are dispatched after this returns,
    /// but one may still be running; wait on the dispatcher before touching
    /// the pipeline.
    ///
    /// An abort leaves a channel's read pointer mid-buffer, so both are
    /// rewound to the start of their wire buffer for the next `start`.
    pub fn stop(&self) {
        self.armed.store(false, Ordering::Release);
        for ch in Channel::ALL {
            self.channel(ch).abort();
        }
        for ch in Channel::ALL {
            let c = self.channel(ch);
            let _ = c.take_completion();
            c.rearm();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Completion interrupt handler.
    ///
    /// For each finished channel, A first: acknowledge, rearm, then push an
    /// encode job for its wire buffer. Returns whether any channel had
    /// finished. Pushing spins if the worker still holds the previous job.
    pub fn on_interrupt(&self, dispatcher: &Dispatcher) -> bool {
        let mut handled = false;
        for ch in Channel::ALL {
            let c = self.channel(ch);
            if !c.take_completion() {
                continue;
            }
            handled = true;
            c.rearm();
            if self.armed.load(Ordering::Acquire) {
                dispatcher.push(Job::Encode(ch));
            }
        }
        handled
    }
}
