//! # spdif-audio
//!
//! A `no_std`, zero-allocation S/PDIF transmitter for the RP2040. 16-bit
//! stereo PCM is encoded into biphase-mark words on the second core and
//! clocked out of an SPI peripheral by two chained DMA channels, so a single
//! GPIO pin carries a consumer-grade digital audio stream with no audio
//! hardware at all.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Encoding | [`encoder`] | Subframe assembly, parity, biphase tables, preambles |
//! | Buffering | [`pipeline`] | Double PCM buffers, state handoff, wire buffers |
//! | Dispatch | [`dispatch`] | One-slot job queue and the core-1 worker |
//! | I/O | [`io`] | DMA transmitter, PCM source trait, playback surface |
//!
//! ## Data flow
//!
//! ```text
//!  PcmSource ──poll──► PCM A/B ──Worker──► wire A/B ──DMA A⇄B──► SPI TX ──► pin
//!     core 0            (8 KiB)   core 1   (2048 × u16)   chained
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use spdif_audio::io::{Playback, Spdif, SpdifOutput};
//!
//! static SPDIF: Spdif<MyDmaChannel> = Spdif::new(MyDmaChannel::new(6), MyDmaChannel::new(7));
//!
//! // core 1:
//! unsafe { SPDIF.worker() }.run();
//!
//! // DMA_IRQ_0:
//! SPDIF.on_dma_interrupt();
//!
//! // core 0:
//! let mut out = SpdifOutput::new(&SPDIF);
//! out.setup();
//! out.start(track, Playback::new(0, track_len))?;
//! loop {
//!     out.poll();
//! }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `defmt` | no | Logging through `defmt` and `defmt::Format` on public types |
//!
//! ## Audio parameters
//!
//! - **Sample rate:** 44 100 Hz ([`constants::SAMPLE_RATE`])
//! - **Sample format:** `i16` little-endian, interleaved L/R
//! - **Serial clock:** 5.6448 MHz ([`constants::SERIAL_CLOCK_HZ`])
//! - **PCM buffers:** 2 × 8192 bytes ([`constants::AUDIO_BUFFER_SIZE`])

#![no_std]

#[macro_use]
mod fmt;

pub mod constants;
pub mod dispatch;
pub mod encoder;
pub mod error;
pub mod io;
pub mod pipeline;

pub use error::{PlaybackError, TransmitError};
