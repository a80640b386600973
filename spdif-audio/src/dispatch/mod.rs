//! Cross-core job dispatch.
//!
//! The DMA completion interrupt on core 0 must rearm its channel quickly, but
//! encoding a chunk takes far longer than an interrupt should. The interrupt
//! therefore pushes a [`Job`] into a [`Dispatcher`] and returns; a
//! [`Worker`] looping on core 1 pops and runs it.
//!
//! ```text
//!   core 0: DMA IRQ ──push──► [ 1 slot ] ──pop──► Worker::run  :core 1
//! ```
//!
//! The queue holds a single job. Pushing into a full queue spins, which stalls
//! the interrupt until the worker takes the previous job. Worst case that is
//! one full chunk encode.

mod ring;
mod worker;

use core::sync::atomic::{AtomicU32, Ordering};

use crate::pipeline::Channel;

pub use ring::Ring;
pub use worker::Worker;

/// Work the interrupt path can hand to the worker core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Job {
    /// Encode the next PCM chunk into this channel's wire buffer.
    Encode(Channel),
}

/// Single-slot job queue between the interrupt context and the worker.
///
/// `submitted` is written only by the pushing context and `completed` only by
/// the worker, so both stay plain load/store counters. The queue is idle
/// when they match.
pub struct Dispatcher {
    slot: Ring<Job, 2>,
    submitted: AtomicU32,
    completed: AtomicU32,
}

impl Dispatcher {
    pub const fn new() -> Self {
        Dispatcher {
            slot: Ring::new(),
            submitted: AtomicU32::new(0),
            completed: AtomicU32::new(0),
        }
    }

    /// Queue a job, spinning while the previous one has not been taken.
    ///
    /// Writes made before this call are visible to the worker once it pops
    /// the job (Release on push, Acquire on pop).
    pub fn push(&self, job: Job) {
        let n = self.submitted.load(Ordering::Relaxed);
        self.submitted.store(n.wrapping_add(1), Ordering::Release);

        let mut job = job;
        while let Err(rejected) = self.slot.push(job) {
            job = rejected;
            core::hint::spin_loop();
        }
    }

    /// Take the waiting job, if any. Worker side.
    pub fn pop(&self) -> Option<Job> {
        self.slot.pop()
    }

    /// Record that a popped job has finished. Worker side.
    pub(crate) fn complete(&self) {
        let n = self.completed.load(Ordering::Relaxed);
        self.completed.store(n.wrapping_add(1), Ordering::Release);
    }

    /// No job is queued or running.
    pub fn is_idle(&self) -> bool {
        self.completed.load(Ordering::Acquire) == self.submitted.load(Ordering::Acquire)
    }

    /// Spin until the worker has finished everything submitted so far.
    ///
    /// Callers must first make sure nothing new is being pushed.
    pub fn wait_idle(&self) {
        while !self.is_idle() {
            core::hint::spin_loop();
        }
    }

    /// Jobs submitted and not yet completed.
    pub fn in_flight(&self) -> u32 {
        self.submitted
            .load(Ordering::Acquire)
            .wrapping_sub(self.completed.load(Ordering::Acquire))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
