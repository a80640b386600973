//! Hardware-facing half of the output.
//!
//! ## Components
//!
//! | Item | Runs on | Description |
//! |------|---------|-------------|
//! | [`PcmSource`] | core 0 | Random-access PCM reader, implemented by the application |
//! | [`SpdifOutput`] | core 0 | Fill loop, start/stop/pause surface |
//! | [`DmaTransmitter`] | core 0 IRQ | Chained channel pair, completion handling |
//! | [`TransferChannel`] | core 0 | Register-level seam to one DMA channel |
//! | [`Spdif`] | shared | Static bundle of pipeline, wire buffers, transmitter and dispatcher |
//!
//! ## Timing
//!
//! At 44.1 kHz stereo one chunk is 256 frames, about 5.8 ms on the wire.
//! The worker has that long to encode the next chunk for a channel before
//! the chain comes back to it. The fill side has one full PCM buffer,
//! about 46 ms at the default size, to refill a released buffer.

pub mod dma;
pub mod output;
pub mod source;

pub use dma::{DmaTransmitter, TransferChannel};
pub use output::{Spdif, SpdifOutput};
pub use source::{PcmSource, Playback, SampleOrder};

#[cfg(test)]
mod integration_tests;
