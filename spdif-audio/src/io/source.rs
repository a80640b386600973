//! Storage side: where PCM bytes come from.

use core::convert::Infallible;

use crate::error::PlaybackError;

/// Random-access reader for raw PCM.
///
/// A failed read is not fatal: the buffer simply is not filled this cycle
/// and the next poll tries again.
pub trait PcmSource {
    /// Error type for read operations.
    type Error;

    /// Read up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read; `0` means end of data.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// In-memory PCM, mostly for tone tables and tests.
impl PcmSource for &[u8] {
    type Error = Infallible;

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Infallible> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        let Some(rest) = self.get(start..) else {
            return Ok(0);
        };
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        Ok(n)
    }
}

/// Byte order of the 16-bit samples in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleOrder {
    #[default]
    LittleEndian,
    /// Swapped on the fill side; the encoder only sees little-endian.
    BigEndian,
}

/// What to play from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Playback {
    /// First byte, inclusive.
    pub start: u64,
    /// Last byte, exclusive.
    pub end: u64,
    pub order: SampleOrder,
    /// Jump back to `start` on reaching `end` instead of finishing.
    pub repeat: bool,
}

impl Playback {
    /// Play `start..end` once, little-endian.
    pub const fn new(start: u64, end: u64) -> Self {
        Playback {
            start,
            end,
            order: SampleOrder::LittleEndian,
            repeat: false,
        }
    }

    pub const fn with_order(mut self, order: SampleOrder) -> Self {
        self.order = order;
        self
    }

    pub const fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn validate(&self) -> Result<(), PlaybackError> {
        if self.end <= self.start {
            return Err(PlaybackError::EmptyRange);
        }
        if self.start % 2 != 0 || self.end % 2 != 0 {
            return Err(PlaybackError::Misaligned);
        }
        Ok(())
    }
}

/// A source being played: read position and end-of-data tracking.
pub(crate) struct Stream<S> {
    source: S,
    playback: Playback,
    position: u64,
    exhausted: bool,
}

impl<S: PcmSource> Stream<S> {
    pub(crate) fn new(source: S, playback: Playback) -> Self {
        Stream {
            source,
            position: playback.start,
            playback,
            exhausted: false,
        }
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    /// No more data will come out of [`fill`](Self::fill).
    pub(crate) fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub(crate) fn into_source(self) -> S {
        self.source
    }

    /// Fill `buf` completely, zero-padding past the end of data.
    ///
    /// Returns how many bytes came from the source. On error nothing about
    /// the stream changes, so the same range is retried next time.
    pub(crate) fn fill(&mut self, buf: &mut [u8]) -> Result<usize, S::Error> {
        let Playback {
            start,
            end,
            order,
            repeat,
        } = self.playback;
        let mut position = self.position;
        let mut filled = 0;
        let mut exhausted = false;

        while filled < buf.len() {
            if position >= end {
                if !repeat {
                    exhausted = true;
                    break;
                }
                position = start;
            }
            let want = ((buf.len() - filled) as u64).min(end - position) as usize;
            let n = self
                .source
                .read_at(position, &mut buf[filled..filled + want])?;
            if n == 0 {
                // Source shorter than the requested range.
                exhausted = true;
                break;
            }
            filled += n;
            position += n as u64;
        }

        buf[filled..].fill(0);
        if order == SampleOrder::BigEndian {
            for pair in buf[..filled].chunks_exact_mut(2) {
                pair.swap(0, 1);
            }
        }

        self.position = position;
        self.exhausted = exhausted || (!repeat && position >= end);
        Ok(filled)
    }
}
