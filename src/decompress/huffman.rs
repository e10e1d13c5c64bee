//! Canonical Huffman tables for LZX.
//!
//! Codes are up to 16 bits long. Codes of at most `table_bits` bits resolve
//! with a single direct lookup; longer codes continue through a binary tree
//! hanging off the direct table.

use super::tables::{PRETREE_SYMBOLS, PRETREE_TABLE_BITS};
use super::{BitReader, DecompressError, Result};

/// Maximum code length in bits.
pub const MAX_CODE_LENGTH: usize = 16;

/// Slack after each length array; run-length codes may overshoot their range.
pub const LENGTH_TABLE_SAFETY: usize = 64;

/// Huffman decoding table.
///
/// Direct entries are either a symbol (`>= 0`) or a tree node reference
/// (`< 0`, node `-entry - 1`). Each tree node is a left/right pair in `tree`.
pub struct HuffmanTable {
    table_bits: u32,
    num_symbols: usize,
    /// Code length per symbol, followed by `LENGTH_TABLE_SAFETY` spare slots
    lengths: Vec<u8>,
    table: Vec<i16>,
    tree: Vec<i16>,
}

impl HuffmanTable {
    /// Create an empty table (every length zero).
    pub fn new(num_symbols: usize, table_bits: u32) -> Self {
        debug_assert!(table_bits > 0 && table_bits <= MAX_CODE_LENGTH as u32);
        Self {
            table_bits,
            num_symbols,
            lengths: vec![0; num_symbols + LENGTH_TABLE_SAFETY],
            table: vec![0; 1 << table_bits],
            tree: vec![0; num_symbols * 2],
        }
    }

    /// Build a table from a set of code lengths.
    pub fn from_lengths(lengths: &[u8], table_bits: u32) -> Result<Self> {
        let mut table = Self::new(lengths.len(), table_bits);
        table.lengths[..lengths.len()].copy_from_slice(lengths);
        table.rebuild()?;
        Ok(table)
    }

    /// Number of symbols this table codes.
    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    /// Code lengths of all symbols.
    pub fn lengths(&self) -> &[u8] {
        &self.lengths[..self.num_symbols]
    }

    /// Code lengths including the spare slots, for run-length updates.
    pub fn lengths_mut(&mut self) -> &mut [u8] {
        &mut self.lengths
    }

    /// Forget all code lengths.
    pub fn clear(&mut self) {
        self.lengths.fill(0);
        self.table.fill(0);
    }

    /// Rebuild the decode table from the current code lengths.
    ///
    /// The lengths must either fill the code space exactly (Kraft sum of
    /// `2^16`) or all be zero, in which case every lookup yields symbol 0.
    pub fn rebuild(&mut self) -> Result<()> {
        let table_bits = self.table_bits;
        let lengths = &self.lengths[..self.num_symbols];

        let mut count = [0u32; MAX_CODE_LENGTH + 1];
        for &len in lengths {
            if len as usize > MAX_CODE_LENGTH {
                return Err(DecompressError::CorruptTable);
            }
            count[len as usize] += 1;
        }

        // Left-justified starting code per length, in a 16-bit code space
        let mut start = [0u32; MAX_CODE_LENGTH + 2];
        for len in 1..=MAX_CODE_LENGTH {
            start[len + 1] = start[len] + (count[len] << (16 - len));
        }

        if start[MAX_CODE_LENGTH + 1] != 1 << 16 {
            if start[MAX_CODE_LENGTH + 1] == 0 {
                self.table.fill(0);
                return Ok(());
            }
            return Err(DecompressError::CorruptTable);
        }

        let jut = 16 - table_bits;
        let mut weight = [0u32; MAX_CODE_LENGTH + 1];
        for len in 1..=table_bits as usize {
            start[len] >>= jut;
            weight[len] = 1 << (table_bits as usize - len);
        }
        for len in table_bits as usize + 1..=MAX_CODE_LENGTH {
            weight[len] = 1 << (16 - len);
        }

        // Entries past the short codes are roots for the long ones.
        let short_end = (start[table_bits as usize + 1] >> jut) as usize;
        let table_len = self.table.len();
        self.table[short_end.min(table_len)..].fill(0);

        let table_size = 1u32 << table_bits;
        let mut next_node = 0usize;
        let max_nodes = self.tree.len() / 2;

        for (symbol, &len) in lengths.iter().enumerate() {
            let len = len as usize;
            if len == 0 {
                continue;
            }

            let next_code = start[len] + weight[len];
            if len <= table_bits as usize {
                if next_code > table_size {
                    return Err(DecompressError::CorruptTable);
                }
                self.table[start[len] as usize..next_code as usize].fill(symbol as i16);
                start[len] = next_code;
                continue;
            }

            let code = start[len];
            start[len] = next_code;

            let mut index = (code >> jut) as usize;
            let mut in_tree = false;
            let mut path = code << table_bits;

            for _ in 0..len - table_bits as usize {
                let entry = if in_tree {
                    self.tree[index]
                } else {
                    self.table[index]
                };

                let node = if entry < 0 {
                    (-(entry as i32) - 1) as usize
                } else {
                    if next_node >= max_nodes {
                        return Err(DecompressError::CorruptTable);
                    }
                    let node = next_node;
                    next_node += 1;
                    self.tree[node * 2] = 0;
                    self.tree[node * 2 + 1] = 0;
                    let reference = -(node as i16) - 1;
                    if in_tree {
                        self.tree[index] = reference;
                    } else {
                        self.table[index] = reference;
                    }
                    node
                };

                index = node * 2 + ((path >> 15) & 1) as usize;
                in_tree = true;
                path <<= 1;
            }

            self.tree[index] = symbol as i16;
        }

        Ok(())
    }

    /// Decode a symbol from the bit reader.
    #[inline]
    pub fn decode(&self, reader: &mut BitReader) -> Result<u16> {
        reader.ensure_lookahead()?;

        let mut entry = self.table[reader.peek_bits(self.table_bits) as usize];
        if entry < 0 {
            // Long code: walk the tree with the bits after the table index.
            let buffer = reader.buffer();
            let mut mask = 1u32 << (31 - self.table_bits);
            while entry < 0 {
                if mask == 0 {
                    return Err(DecompressError::CorruptTable);
                }
                let node = (-(entry as i32) - 1) as usize;
                entry = self.tree[node * 2 + usize::from(buffer & mask != 0)];
                mask >>= 1;
            }
        }

        let symbol = entry as usize;
        reader.remove_bits(self.lengths[symbol] as u32)?;
        Ok(symbol as u16)
    }
}

/// Read the code lengths for `first..last` of a tree.
///
/// A 20-symbol pretree is sent first; its symbols are deltas against the
/// previous block's lengths (0-16), zero runs (17, 18) or a short run of
/// one repeated delta (19).
pub fn read_lengths(
    reader: &mut BitReader,
    lengths: &mut [u8],
    first: usize,
    last: usize,
) -> Result<()> {
    let mut pretree_lengths = [0u8; PRETREE_SYMBOLS];
    for len in &mut pretree_lengths {
        *len = reader.read_bits(4)? as u8;
    }
    let pretree = HuffmanTable::from_lengths(&pretree_lengths, PRETREE_TABLE_BITS)?;

    let mut x = first;
    while x < last {
        let symbol = pretree.decode(reader)?;
        match symbol {
            17 => {
                let run = reader.read_bits(4)? as usize + 4;
                fill(lengths, x, run, 0)?;
                x += run;
            }
            18 => {
                let run = reader.read_bits(5)? as usize + 20;
                fill(lengths, x, run, 0)?;
                x += run;
            }
            19 => {
                let run = reader.read_bits(1)? as usize + 4;
                let delta = pretree.decode(reader)?;
                let prev = *lengths
                    .get(x)
                    .ok_or(DecompressError::InvalidData("code length run overflow"))?;
                fill(lengths, x, run, apply_delta(prev, delta))?;
                x += run;
            }
            delta => {
                let len = lengths
                    .get_mut(x)
                    .ok_or(DecompressError::InvalidData("code length run overflow"))?;
                *len = apply_delta(*len, delta);
                x += 1;
            }
        }
    }

    Ok(())
}

/// `(prev - delta) mod 17`
#[inline]
fn apply_delta(prev: u8, delta: u16) -> u8 {
    let value = prev as i32 - delta as i32;
    (if value < 0 { value + 17 } else { value }) as u8
}

fn fill(lengths: &mut [u8], start: usize, run: usize, value: u8) -> Result<()> {
    let run = lengths
        .get_mut(start..start + run)
        .ok_or(DecompressError::InvalidData("code length run overflow"))?;
    run.fill(value);
    Ok(())
}
