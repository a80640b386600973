/// Size of each of the two PCM sample buffers, in bytes (~46.44 ms of 44.1 kHz stereo).
pub const AUDIO_BUFFER_SIZE: usize = 8192;

/// Number of PCM bytes encoded per dispatched job.
///
/// PCM buffer sizes must be a non-zero multiple of this.
pub const SAMPLE_CHUNK_SIZE: usize = 1024;

/// Wire words emitted per 16-bit sample (one subframe).
pub const WIRE_WORDS_PER_SAMPLE: usize = 4;

/// Length of each DMA wire buffer in 16-bit words: one encoded chunk.
pub const WIRE_BUFFER_SIZE: usize = SAMPLE_CHUNK_SIZE / 2 * WIRE_WORDS_PER_SAMPLE;

/// Subframes per S/PDIF block (192 frames, left + right).
pub const SUBFRAMES_PER_BLOCK: u16 = 384;

/// Nominal output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44_100;

/// Serial clock for the wire: 64 biphase cells per frame, two per bit cell.
///
/// The RP2040 SPI divider lands roughly 0.03% slow of this.
pub const SERIAL_CLOCK_HZ: u32 = SAMPLE_RATE * 64 * 2;

const _: () = assert!(SERIAL_CLOCK_HZ == 5_644_800);
const _: () = assert!(WIRE_BUFFER_SIZE == 2048);
