//! The playback surface: one static bundle plus a fill-side driver.
//!
//! [`Spdif`] holds everything both cores and the interrupt share and is meant
//! to live in a `static`. [`SpdifOutput`] borrows it on core 0 and drives
//! playback from the main loop:
//!
//! ```ignore
//! static SPDIF: Spdif<MyChannel> = Spdif::new(MyChannel::new(6), MyChannel::new(7));
//!
//! // core 1
//! unsafe { SPDIF.worker() }.run();
//!
//! // DMA interrupt
//! SPDIF.on_dma_interrupt();
//!
//! // core 0
//! let mut out = SpdifOutput::new(&SPDIF);
//! out.setup();
//! out.start(file, Playback::new(0, len))?;
//! while out.poll() || out.is_active() {}
//! ```

use crate::constants::AUDIO_BUFFER_SIZE;
use crate::dispatch::{Dispatcher, Worker};
use crate::error::PlaybackError;
use crate::pipeline::{Channel, PipelineContext, WireBuffers};

use super::dma::{DmaTransmitter, TransferChannel};
use super::source::{PcmSource, Playback, Stream};

/// Shared state of one S/PDIF output.
pub struct Spdif<C, const N: usize = AUDIO_BUFFER_SIZE> {
    pipeline: PipelineContext<N>,
    wire: WireBuffers,
    transmitter: DmaTransmitter<C>,
    dispatcher: Dispatcher,
}

impl<C: TransferChannel, const N: usize> Spdif<C, N> {
    pub const fn new(a: C, b: C) -> Self {
        Spdif {
            pipeline: PipelineContext::new(),
            wire: WireBuffers::new(),
            transmitter: DmaTransmitter::new(a, b),
            dispatcher: Dispatcher::new(),
        }
    }

    pub fn pipeline(&self) -> &PipelineContext<N> {
        &self.pipeline
    }

    pub fn wire(&self) -> &WireBuffers {
        &self.wire
    }

    pub fn transmitter(&self) -> &DmaTransmitter<C> {
        &self.transmitter
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Call from the DMA completion interrupt.
    pub fn on_dma_interrupt(&self) -> bool {
        self.transmitter.on_interrupt(&self.dispatcher)
    }

    /// The encode side, for the second core.
    ///
    /// # Safety
    ///
    /// Call once. The worker must be the only encode context for this
    /// output for as long as it lives.
    pub unsafe fn worker(&self) -> Worker<'_, N> {
        // SAFETY: Forwarded to the caller.
        unsafe { Worker::new(&self.pipeline, &self.wire, &self.dispatcher) }
    }
}

/// Fill-side driver: owns the playing source and keeps the buffers full.
///
/// Everything here runs on the fill context (core 0 main loop). `poll` must
/// be called often enough to refill a PCM buffer before the encode side
/// catches up with it, which at the default size is about 46 ms.
pub struct SpdifOutput<'a, S, C, const N: usize = AUDIO_BUFFER_SIZE> {
    spdif: &'a Spdif<C, N>,
    stream: Option<Stream<S>>,
}

impl<'a, S: PcmSource, C: TransferChannel, const N: usize> SpdifOutput<'a, S, C, N> {
    pub fn new(spdif: &'a Spdif<C, N>) -> Self {
        SpdifOutput {
            spdif,
            stream: None,
        }
    }

    /// Program the DMA channels. Call once before the first `start`.
    pub fn setup(&mut self) {
        self.spdif.transmitter.setup(&self.spdif.wire);
        info!("S/PDIF output ready, {=usize} byte buffers", N);
    }

    /// Begin playing `playback` from `source`, replacing whatever was playing.
    ///
    /// Transmission itself begins on a later [`poll`](Self::poll), once both
    /// PCM buffers hold data.
    pub fn start(&mut self, source: S, playback: Playback) -> Result<(), PlaybackError> {
        playback.validate()?;
        if self.stop().is_some() {
            debug!("previous stream replaced");
        }
        self.stream = Some(Stream::new(source, playback));
        info!(
            "playback {=u64}..{=u64}, repeat={=bool}",
            playback.start,
            playback.end,
            playback.repeat
        );
        Ok(())
    }

    /// Halt transmission and return the pipeline to its cold-start state.
    ///
    /// Waits for a running encode job to finish, so the worker must be alive.
    /// Returns the source if one was playing.
    pub fn stop(&mut self) -> Option<S> {
        let spdif = self.spdif;
        let was_armed = spdif.transmitter.is_armed();
        spdif.transmitter.stop();
        let in_flight = spdif.dispatcher.in_flight();
        if in_flight != 0 {
            debug!("waiting for {=u32} encode job(s)", in_flight);
        }
        spdif.dispatcher.wait_idle();
        // SAFETY: The transmitter is disarmed and the dispatcher idle, so no
        // job is running or can be dispatched, and no fill target is held
        // outside `poll`.
        unsafe { spdif.pipeline.reset() };
        if was_armed {
            info!("S/PDIF transmission stopped");
        }
        self.stream.take().map(Stream::into_source)
    }

    /// Do one step of fill-side work. Returns whether a buffer was filled.
    ///
    /// Starts transmission once both buffers are Ready, fills at most one
    /// Stale buffer, and stops the output once the stream has ended and
    /// everything queued has been encoded.
    pub fn poll(&mut self) -> bool {
        let spdif = self.spdif;
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        let armed = spdif.transmitter.is_armed();

        if !armed && spdif.pipeline.both_ready() {
            Self::begin_transmission(spdif);
            return false;
        }

        if stream.is_exhausted() {
            // Two drained chunks mean the last audio has left both wire buffers.
            if armed && spdif.pipeline.all_stale() && spdif.pipeline.drained_chunks() >= 2 {
                info!("playback finished at {=u64}", stream.position());
                self.stop();
                return false;
            }
            if armed {
                return false;
            }
            // Too little audio to fill both buffers: pad with silence so
            // transmission can begin at all.
            return match spdif.pipeline.acquire_fill_target() {
                Some(mut target) => {
                    target.bytes_mut().fill(0);
                    spdif.pipeline.mark_filled(target);
                    true
                }
                None => false,
            };
        }

        let Some(mut target) = spdif.pipeline.acquire_fill_target() else {
            return false;
        };
        match stream.fill(target.bytes_mut()) {
            Ok(read) => {
                let id = spdif.pipeline.mark_filled(target);
                trace!("filled {} with {=usize} bytes", id, read);
                if stream.is_exhausted() {
                    spdif.pipeline.mark_end_of_stream();
                    debug!("end of stream at {=u64}", stream.position());
                }
                true
            }
            Err(_) => {
                // Dropping the target returns the buffer to Stale.
                warn!("PCM read failed at {=u64}", stream.position());
                false
            }
        }
    }

    fn begin_transmission(spdif: &Spdif<C, N>) {
        // SAFETY: The transmitter is disarmed and the dispatcher idle, so
        // this is the only encode context and DMA is not reading the wire.
        unsafe {
            for ch in Channel::ALL {
                spdif.pipeline.encode_silence(spdif.wire.get_mut(ch));
            }
        }
        if spdif.transmitter.start(&spdif.pipeline).is_err() {
            warn!("transmitter refused to start");
        }
    }

    /// A stream is loaded, whether or not it is on the wire yet.
    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_transmitting(&self) -> bool {
        self.spdif.transmitter.is_armed()
    }

    /// Next byte offset to be read from the source.
    pub fn position(&self) -> Option<u64> {
        self.stream.as_ref().map(Stream::position)
    }

    /// Keep the wire running but send silence.
    pub fn pause(&mut self) {
        if self.is_active() {
            self.spdif.pipeline.set_paused(true);
            debug!("paused");
        }
    }

    pub fn resume(&mut self) {
        self.spdif.pipeline.set_paused(false);
    }

    pub fn is_paused(&self) -> bool {
        self.spdif.pipeline.is_paused()
    }

    pub fn underruns(&self) -> u32 {
        self.spdif.pipeline.underruns()
    }
}
