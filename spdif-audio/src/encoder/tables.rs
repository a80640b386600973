//! Lookup tables for subframe construction.
//!
//! Every biphase pattern here assumes the wire level before it was low. The
//! encoder inverts a pattern whenever the previous word ended high.

/// Preamble X: left channel, not at block start. Followed by four zero aux bits.
pub const X_PREAMBLE: u16 = 0xE2CC;
/// Preamble Y: right channel.
pub const Y_PREAMBLE: u16 = 0xE4CC;
/// Preamble Z: left channel, first subframe of a block.
pub const Z_PREAMBLE: u16 = 0xE8CC;

/// Number of set bits for every byte value.
pub static PARITY: [u8; 256] = parity_table();

/// Biphase-mark patterns for every byte value, LSB first, two wire cells per bit.
pub static BIPHASE: [u16; 256] = biphase_table();

const fn parity_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (i as u8).count_ones() as u8;
        i += 1;
    }
    table
}

/// Pattern for one byte: each bit cell opens with a transition, and a one
/// adds a second transition halfway through. The first cell lands in the
/// most significant wire bit.
const fn biphase_pattern(byte: u8) -> u16 {
    let mut pattern = 0u16;
    let mut level = 0u16;
    let mut bit = 0;
    while bit < 8 {
        level ^= 1;
        pattern = (pattern << 1) | level;
        if (byte >> bit) & 1 == 1 {
            level ^= 1;
        }
        pattern = (pattern << 1) | level;
        bit += 1;
    }
    pattern
}

const fn biphase_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = biphase_pattern(i as u8);
        i += 1;
    }
    table
}
