//! Error types for the output surface.
//!
//! The encoder and the interrupt path have no error states. Errors only
//! arise when a caller hands over an unusable playback descriptor or tries to
//! arm the transmitter before the pipeline has data.

/// Rejected playback descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackError {
    /// `end` is not past `start`.
    #[error("playback range is empty")]
    EmptyRange,
    /// `start` or `end` falls in the middle of a 16-bit sample.
    #[error("playback range is not aligned to 16-bit samples")]
    Misaligned,
}

/// Transmitter could not be armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitError {
    /// Both PCM buffers must be Ready before channel A is triggered.
    #[error("both PCM buffers must be ready before transmission starts")]
    NotReady,
}
