//! Static LZX tables.
//!
//! Position slots map a coarse match offset to a base value plus a number
//! of extra bits. Both tables are computed at compile time.

/// Number of literal symbols in the main tree.
pub const NUM_CHARS: usize = 256;

/// Smallest match length.
pub const MIN_MATCH: usize = 2;

/// Largest match length.
pub const MAX_MATCH: usize = 257;

/// Length headers 0..=6 encode the length directly; 7 pulls from the length tree.
pub const NUM_PRIMARY_LENGTHS: usize = 7;

/// Length tree element count.
pub const NUM_SECONDARY_LENGTHS: usize = 249;

/// Maximum number of position slots (2MB window).
pub const MAX_POSITION_SLOTS: usize = 50;

pub const PRETREE_SYMBOLS: usize = 20;
pub const PRETREE_TABLE_BITS: u32 = 6;

pub const MAIN_TREE_MAX_SYMBOLS: usize = NUM_CHARS + MAX_POSITION_SLOTS * 8;
pub const MAIN_TREE_TABLE_BITS: u32 = 12;

/// Length deltas sent per block.
pub const LENGTH_SYMBOLS: usize = NUM_SECONDARY_LENGTHS;
/// Symbols in the length table; a run-length code can spill into the last one.
pub const LENGTH_TABLE_SYMBOLS: usize = NUM_SECONDARY_LENGTHS + 1;
pub const LENGTH_TABLE_BITS: u32 = 12;

pub const ALIGNED_SYMBOLS: usize = 8;
pub const ALIGNED_TABLE_BITS: u32 = 7;

/// Extra offset bits per position slot.
pub const EXTRA_BITS: [u8; 52] = {
    let mut bits = [0u8; 52];
    let mut i = 0;
    let mut j = 0u8;
    while i <= 50 {
        bits[i] = j;
        bits[i + 1] = j;
        if i != 0 && j < 17 {
            j += 1;
        }
        i += 2;
    }
    bits
};

/// Base offset per position slot.
pub const POSITION_BASE: [u32; 51] = {
    let mut base = [0u32; 51];
    let mut i = 0;
    let mut j = 0u32;
    while i <= 50 {
        base[i] = j;
        j += 1u32 << EXTRA_BITS[i] as u32;
        i += 1;
    }
    base
};

/// Position slots used by a window of `2^window_bits` bytes.
pub const fn position_slots(window_bits: u32) -> usize {
    match window_bits {
        20 => 42,
        21 => 50,
        bits => (bits as usize) << 1,
    }
}
