//! Shared pipeline state: the two PCM buffers and the encode-side cursor.
//!
//! ## Ownership
//!
//! | Field | Writer | Reader |
//! |-------|--------|--------|
//! | buffer state Stale→Filling→Ready | fill side | both |
//! | buffer state Ready→Stale | encode side | both |
//! | buffer bytes | fill side (while Filling) | encode side (while Ready) |
//! | encoder, selector, cursor | encode side | encode side |
//! | pause / end-of-stream flags | fill side | encode side |
//! | underrun and drain counters | encode side | anyone |
//!
//! No field has two writers at once, so plain atomic loads and stores with
//! Release/Acquire ordering are enough and no lock is taken.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::state::{AtomicBufferState, BufferId, BufferState};
use crate::constants::{AUDIO_BUFFER_SIZE, SAMPLE_CHUNK_SIZE};
use crate::encoder::{EncoderState, FrameEncoder};

struct PcmSlot<const N: usize> {
    state: AtomicBufferState,
    data: UnsafeCell<[u8; N]>,
}

impl<const N: usize> PcmSlot<N> {
    const fn new() -> Self {
        PcmSlot {
            state: AtomicBufferState::new(BufferState::Stale),
            data: UnsafeCell::new([0u8; N]),
        }
    }
}

/// State touched only by whichever context runs the encoder.
struct EncodeSide {
    encoder: FrameEncoder,
    active: BufferId,
    cursor: usize,
}

/// What [`PipelineContext::consume_chunk`] did with the wire buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChunkOutcome {
    /// A PCM chunk was encoded. `released` names the buffer that was used up
    /// and handed back to the fill side, if this chunk was its last.
    Encoded { released: Option<BufferId> },
    /// Paused: silence was encoded and no PCM was consumed.
    Paused,
    /// The stream has ended and the active buffer is empty: silence encoded.
    Drained,
    /// The active buffer was not Ready. The wire buffer is left as it was and
    /// will be transmitted again.
    Underrun,
}

/// Encode-side position, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipelineSnapshot {
    pub active: BufferId,
    pub cursor: usize,
    pub encoder: EncoderState,
}

/// Two PCM buffers of `N` bytes plus the state that moves data through them.
///
/// Shared by reference between the fill side (poll loop, core 0) and the
/// encode side (worker, core 1). `N` must be a non-zero multiple of
/// [`SAMPLE_CHUNK_SIZE`]; `new` panics otherwise, which is a compile error
/// when the context is a `static`.
pub struct PipelineContext<const N: usize = AUDIO_BUFFER_SIZE> {
    slots: [PcmSlot<N>; 2],
    encode: UnsafeCell<EncodeSide>,
    paused: AtomicBool,
    end_of_stream: AtomicBool,
    underruns: AtomicU32,
    drained: AtomicU32,
}

// SAFETY: Buffer bytes are only reached through a slot's state: the fill side
// writes a slot it moved to Filling, the encode side reads a slot it observed
// as Ready, and the transitions are Release stores paired with Acquire loads.
// `encode` is only reached through `unsafe` methods whose callers guarantee a
// single encode context.
unsafe impl<const N: usize> Sync for PipelineContext<N> {}

impl<const N: usize> PipelineContext<N> {
    pub const fn new() -> Self {
        assert!(
            N > 0 && N % SAMPLE_CHUNK_SIZE == 0,
            "PCM buffer size must be a non-zero multiple of SAMPLE_CHUNK_SIZE"
        );

        PipelineContext {
            slots: [PcmSlot::new(), PcmSlot::new()],
            encode: UnsafeCell::new(EncodeSide {
                encoder: FrameEncoder::new(),
                active: BufferId::A,
                cursor: 0,
            }),
            paused: AtomicBool::new(false),
            end_of_stream: AtomicBool::new(false),
            underruns: AtomicU32::new(0),
            drained: AtomicU32::new(0),
        }
    }

    /// Size of each PCM buffer in bytes.
    pub const fn buffer_size(&self) -> usize {
        N
    }

    pub fn state(&self, id: BufferId) -> BufferState {
        self.slots[id.index()].state.load(Ordering::Acquire)
    }

    pub fn both_ready(&self) -> bool {
        BufferId::ALL
            .iter()
            .all(|&id| self.state(id) == BufferState::Ready)
    }

    pub fn all_stale(&self) -> bool {
        BufferId::ALL
            .iter()
            .all(|&id| self.state(id) == BufferState::Stale)
    }

    // ── Fill side ─────────────────────────────────────────────────────

    /// Claim the first Stale buffer (A before B) for filling.
    ///
    /// Returns `None` when neither buffer is Stale, or when a fill is already
    /// in progress; the caller just tries again on its next poll. Must only be
    /// called from the single fill context.
    pub fn acquire_fill_target(&self) -> Option<FillTarget<'_, N>> {
        let states = BufferId::ALL.map(|id| self.state(id));
        if states.contains(&BufferState::Filling) {
            return None;
        }
        let id = BufferId::ALL
            .into_iter()
            .find(|id| states[id.index()] == BufferState::Stale)?;

        let slot = &self.slots[id.index()];
        slot.state.store(BufferState::Filling, Ordering::Release);

        // SAFETY: The slot was Stale and is now Filling. The encode side never
        // reads a slot that is not Ready, and there is only one fill context.
        let bytes = unsafe { &mut *slot.data.get() };
        Some(FillTarget {
            id,
            state: &slot.state,
            bytes,
        })
    }

    /// Publish a completed fill: the target's buffer becomes Ready.
    pub fn mark_filled(&self, target: FillTarget<'_, N>) -> BufferId {
        let id = target.id;
        target.state.store(BufferState::Ready, Ordering::Release);
        core::mem::forget(target);
        id
    }

    /// While paused the encode side emits silence instead of PCM.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// No more PCM will arrive. Once the buffers drain the encode side emits
    /// silence instead of counting underruns.
    pub fn mark_end_of_stream(&self) {
        self.end_of_stream.store(true, Ordering::Release);
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream.load(Ordering::Acquire)
    }

    /// Chunks that found the active buffer empty mid-stream since the last reset.
    pub fn underruns(&self) -> u32 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Silence chunks encoded after the stream ran dry. Once two have gone
    /// through, both wire buffers have finished sending real audio.
    pub fn drained_chunks(&self) -> u32 {
        self.drained.load(Ordering::Acquire)
    }

    // ── Encode side ───────────────────────────────────────────────────

    /// Encode the next chunk of the active buffer into `wire`.
    ///
    /// Advances the cursor by [`SAMPLE_CHUNK_SIZE`]. When the buffer is used
    /// up the selector flips to the other buffer, the cursor returns to zero
    /// and the used buffer goes back to Stale. That is the only way a Ready
    /// buffer becomes Stale outside [`reset`](Self::reset). The selector also
    /// moves, with the cursor at zero, when the active buffer is empty and
    /// the other one is Ready.
    ///
    /// # Safety
    ///
    /// Only one context may run the encode side at a time: either the worker,
    /// or the fill context while no job can be dispatched (transmitter
    /// disarmed and dispatcher idle).
    pub unsafe fn consume_chunk(&self, wire: &mut [u16]) -> ChunkOutcome {
        // SAFETY: Single encode context, guaranteed by the caller.
        let side = unsafe { &mut *self.encode.get() };

        if self.paused.load(Ordering::Acquire) {
            side.encoder.encode_silence(wire);
            return ChunkOutcome::Paused;
        }

        // After an underrun the fill side refills A first, which may not be
        // the buffer the selector is waiting on. Follow the data.
        if self.state(side.active) != BufferState::Ready
            && self.state(side.active.other()) == BufferState::Ready
        {
            side.active = side.active.other();
        }

        let slot = &self.slots[side.active.index()];
        if slot.state.load(Ordering::Acquire) != BufferState::Ready {
            if self.end_of_stream.load(Ordering::Acquire) {
                side.encoder.encode_silence(wire);
                let n = self.drained.load(Ordering::Relaxed);
                self.drained.store(n.saturating_add(1), Ordering::Release);
                return ChunkOutcome::Drained;
            }
            // Only the encode side writes the counter.
            let n = self.underruns.load(Ordering::Relaxed);
            self.underruns.store(n.wrapping_add(1), Ordering::Relaxed);
            return ChunkOutcome::Underrun;
        }

        // SAFETY: The slot is Ready, so the fill side will not touch it until
        // we store Stale below.
        let data = unsafe { &*slot.data.get() };
        side.encoder
            .encode(&data[side.cursor..side.cursor + SAMPLE_CHUNK_SIZE], wire);
        side.cursor += SAMPLE_CHUNK_SIZE;

        if side.cursor < N {
            return ChunkOutcome::Encoded { released: None };
        }

        let used = side.active;
        side.active = used.other();
        side.cursor = 0;
        slot.state.store(BufferState::Stale, Ordering::Release);
        ChunkOutcome::Encoded {
            released: Some(used),
        }
    }

    /// Encode one chunk of silence into `wire` without touching the buffers.
    ///
    /// Used to prime the wire buffers before the first transfer.
    ///
    /// # Safety
    ///
    /// Same as [`consume_chunk`](Self::consume_chunk).
    pub unsafe fn encode_silence(&self, wire: &mut [u16]) {
        // SAFETY: Single encode context, guaranteed by the caller.
        let side = unsafe { &mut *self.encode.get() };
        side.encoder.encode_silence(wire);
    }

    /// Cold-start state: both buffers Stale, selector on A, encoder at a
    /// block start with the wire low, flags and counters cleared.
    ///
    /// # Safety
    ///
    /// The encode side must be quiescent (see
    /// [`consume_chunk`](Self::consume_chunk)) and no [`FillTarget`] may be
    /// outstanding.
    pub unsafe fn reset(&self) {
        // SAFETY: Encode side quiescent, guaranteed by the caller.
        let side = unsafe { &mut *self.encode.get() };
        side.encoder.reset();
        side.active = BufferId::A;
        side.cursor = 0;

        for slot in &self.slots {
            slot.state.store(BufferState::Stale, Ordering::Release);
        }
        self.paused.store(false, Ordering::Release);
        self.end_of_stream.store(false, Ordering::Release);
        self.underruns.store(0, Ordering::Relaxed);
        self.drained.store(0, Ordering::Release);
    }

    /// Read the encode-side position.
    ///
    /// # Safety
    ///
    /// The encode side must not be running concurrently.
    pub unsafe fn snapshot(&self) -> PipelineSnapshot {
        // SAFETY: No concurrent encode context, guaranteed by the caller.
        let side = unsafe { &*self.encode.get() };
        PipelineSnapshot {
            active: side.active,
            cursor: side.cursor,
            encoder: side.encoder.state(),
        }
    }
}

impl<const N: usize> Default for PipelineContext<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to a buffer that is being filled.
///
/// Hand it to [`PipelineContext::mark_filled`] to publish the data. Dropping
/// it instead abandons the fill and returns the buffer to Stale.
pub struct FillTarget<'a, const N: usize> {
    id: BufferId,
    state: &'a AtomicBufferState,
    bytes: &'a mut [u8; N],
}

impl<'a, const N: usize> FillTarget<'a, N> {
    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn bytes_mut(&mut self) -> &mut [u8; N] {
        &mut *self.bytes
    }
}

impl<'a, const N: usize> Drop for FillTarget<'a, N> {
    fn drop(&mut self) {
        self.state.store(BufferState::Stale, Ordering::Release);
    }
}
