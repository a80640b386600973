//! Subframe encoder: 16-bit PCM to biphase-mark wire words.
//!
//! Each sample becomes one 32-cell S/PDIF subframe, emitted as four 16-bit
//! words clocked out MSB first at twice the bit rate:
//!
//! ```text
//! cell:  0..3      4..7    8..10   11..26        27     28  29  30  31
//!       preamble   aux     zero    sample LSB→MSB sign   V   U   C   P
//! word:  [0]─────────────  [1]──────────────  [2]────  [3]─────────────
//! ```
//!
//! The sample sits one cell lower than a left-justified 24-bit word would put
//! it, with its sign bit copied into cell 27. Some DACs clip on full-scale
//! data in the top position, and the reduced level is reproducible, so it is
//! kept on purpose.

use super::tables::{BIPHASE, PARITY, X_PREAMBLE, Y_PREAMBLE, Z_PREAMBLE};
use crate::constants::{SUBFRAMES_PER_BLOCK, WIRE_WORDS_PER_SAMPLE};

/// Left shift that moves a 16-bit sample into subframe cells 11..26.
const SAMPLE_SHIFT: u32 = 11;
/// Top data cell of the shifted sample.
const SIGN_BIT: u32 = 1 << 26;
/// Cell 27, forced to match the sign so the value widens correctly.
const SIGN_EXTEND: u32 = 1 << 27;
/// Cell 31, set for even parity over cells 4..31.
const PARITY_BIT: u32 = 1 << 31;

/// Snapshot of the encoder's stream position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderState {
    /// Subframe index within the current block, `0..384`.
    pub subframe: u16,
    /// Whether the last emitted wire bit was high.
    pub invert: bool,
}

/// Stateful S/PDIF subframe encoder.
///
/// The block position and the wire level carry across calls, so one encoder
/// must see the whole stream in order. It is not safe to share between
/// execution contexts.
#[derive(Debug)]
pub struct FrameEncoder {
    subframe: u16,
    invert: bool,
}

impl FrameEncoder {
    /// Encoder positioned at a block start with the wire low.
    pub const fn new() -> Self {
        FrameEncoder {
            subframe: 0,
            invert: false,
        }
    }

    /// Return to the cold-start position.
    pub fn reset(&mut self) {
        self.subframe = 0;
        self.invert = false;
    }

    pub fn state(&self) -> EncoderState {
        EncoderState {
            subframe: self.subframe,
            invert: self.invert,
        }
    }

    /// Encode little-endian 16-bit samples into wire words.
    ///
    /// Writes four words per sample and returns the number of words written.
    /// A trailing odd byte is ignored.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `samples` has even length and that `wire` has room
    /// for every sample.
    pub fn encode(&mut self, samples: &[u8], wire: &mut [u16]) -> usize {
        debug_assert!(samples.len() % 2 == 0, "odd PCM byte count");
        debug_assert!(
            wire.len() >= samples.len() / 2 * WIRE_WORDS_PER_SAMPLE,
            "wire buffer too small"
        );

        let mut written = 0;
        for (pair, words) in samples
            .chunks_exact(2)
            .zip(wire.chunks_exact_mut(WIRE_WORDS_PER_SAMPLE))
        {
            self.encode_sample(pair[0], pair[1], words);
            written += WIRE_WORDS_PER_SAMPLE;
        }
        written
    }

    /// Fill `wire` with encoded zero samples.
    ///
    /// The stream position advances exactly as it would for real silence.
    pub fn encode_silence(&mut self, wire: &mut [u16]) -> usize {
        let mut written = 0;
        for words in wire.chunks_exact_mut(WIRE_WORDS_PER_SAMPLE) {
            self.encode_sample(0, 0, words);
            written += WIRE_WORDS_PER_SAMPLE;
        }
        written
    }

    fn encode_sample(&mut self, lo: u8, hi: u8, words: &mut [u16]) {
        // Parity of the sample bits folds down to one byte lookup.
        let mut parity = PARITY[(lo ^ hi) as usize];

        let mut subframe = (u32::from(hi) << 8 | u32::from(lo)) << SAMPLE_SHIFT;
        if subframe & SIGN_BIT != 0 {
            subframe |= SIGN_EXTEND;
            parity += 1;
        }
        if parity % 2 == 1 {
            subframe |= PARITY_BIT;
        }

        let preamble = match self.subframe {
            0 => Z_PREAMBLE,
            n if n % 2 == 1 => Y_PREAMBLE,
            _ => X_PREAMBLE,
        };

        // Word 0 carries the preamble and the always-zero aux cells, so the
        // low byte of the subframe never needs a lookup.
        words[0] = self.emit(preamble);
        words[1] = self.emit(BIPHASE[(subframe >> 8) as u8 as usize]);
        words[2] = self.emit(BIPHASE[(subframe >> 16) as u8 as usize]);
        words[3] = self.emit(BIPHASE[(subframe >> 24) as u8 as usize]);

        self.subframe += 1;
        if self.subframe == SUBFRAMES_PER_BLOCK {
            self.subframe = 0;
        }
    }

    /// Table patterns assume a low wire; flip them when the wire is high.
    #[inline(always)]
    fn emit(&mut self, pattern: u16) -> u16 {
        let word = if self.invert { !pattern } else { pattern };
        self.invert = word & 1 == 1;
        word
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}
