//! S/PDIF framing and biphase-mark encoding.
//!
//! [`FrameEncoder`] turns 16-bit PCM into the wire words the serial
//! peripheral shifts out. It is a pure bit transform apart from two pieces of
//! stream state: the subframe position inside the 384-subframe block, and the
//! level the wire was left at.

mod frame;
pub mod tables;

pub use frame::{EncoderState, FrameEncoder};

#[cfg(test)]
pub(crate) use frame::decode;
