//! LZX block decoder.
//!
//! A stream is a sequence of blocks, each with a 3-bit type and a 24-bit
//! uncompressed size. Blocks freely span frame boundaries; the decoder keeps
//! the current block and the Huffman code lengths between frames.

use tracing::trace;

use super::e8::E8Translator;
use super::huffman::{read_lengths, HuffmanTable};
use super::offsets::RepeatedOffsets;
use super::tables::{
    ALIGNED_SYMBOLS, ALIGNED_TABLE_BITS, EXTRA_BITS, LENGTH_SYMBOLS, LENGTH_TABLE_BITS,
    LENGTH_TABLE_SYMBOLS, MAIN_TREE_TABLE_BITS, MIN_MATCH, NUM_CHARS, NUM_PRIMARY_LENGTHS,
    POSITION_BASE,
};
use super::window::SlidingWindow;
use super::{BitReader, DecompressError, Result};

/// LZX block types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockKind {
    /// Offsets use raw extra bits
    Verbatim = 1,
    /// The low 3 offset bits come from the aligned-offset tree
    Aligned = 2,
    /// Stored bytes
    Uncompressed = 3,
}

impl BlockKind {
    /// Parse block type from its 3-bit value.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            1 => Some(Self::Verbatim),
            2 => Some(Self::Aligned),
            3 => Some(Self::Uncompressed),
            _ => None,
        }
    }
}

/// The block currently being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    /// Uncompressed bytes still to come
    pub remaining: u32,
    /// Uncompressed size from the header
    pub original_size: u32,
}

/// Decoder state carried from frame to frame.
pub struct BlockDecoder {
    main_tree: HuffmanTable,
    length_tree: HuffmanTable,
    aligned_tree: HuffmanTable,
    offsets: RepeatedOffsets,
    block: Option<Block>,
    main_elements: usize,
    /// Stream header (E8 flag and file size) consumed
    header_read: bool,
}

impl BlockDecoder {
    /// Create a decoder for a window with `position_slots` slots.
    pub fn new(position_slots: usize) -> Self {
        let main_elements = NUM_CHARS + position_slots * 8;
        Self {
            main_tree: HuffmanTable::new(main_elements, MAIN_TREE_TABLE_BITS),
            length_tree: HuffmanTable::new(LENGTH_TABLE_SYMBOLS, LENGTH_TABLE_BITS),
            aligned_tree: HuffmanTable::new(ALIGNED_SYMBOLS, ALIGNED_TABLE_BITS),
            offsets: RepeatedOffsets::new(),
            block: None,
            main_elements,
            header_read: false,
        }
    }

    /// Forget everything about the current stream.
    pub fn reset(&mut self) {
        // Lengths must start at zero since each tree is sent as deltas.
        self.main_tree.clear();
        self.length_tree.clear();
        self.aligned_tree.clear();
        self.offsets = RepeatedOffsets::new();
        self.block = None;
        self.header_read = false;
    }

    pub fn offsets(&self) -> RepeatedOffsets {
        self.offsets
    }

    pub fn current_block(&self) -> Option<Block> {
        self.block
    }

    /// Decode exactly `frame_len` bytes into the window.
    pub fn decode_frame(
        &mut self,
        reader: &mut BitReader,
        window: &mut SlidingWindow,
        e8: &mut E8Translator,
        frame_len: usize,
    ) -> Result<()> {
        if !self.header_read {
            if reader.read_bits(1)? != 0 {
                let high = reader.read_bits(16)?;
                let low = reader.read_bits(16)?;
                e8.set_file_size((high << 16) | low);
            }
            self.header_read = true;
        }

        window.wrap();
        let frame_start = window.position();
        if frame_start + frame_len > window.size() {
            return Err(DecompressError::InvalidData("frame straddles the window wrap"));
        }

        let mut togo = frame_len;
        while togo > 0 {
            let block = match self.block {
                Some(block) if block.remaining > 0 => block,
                _ => {
                    self.read_block_header(reader, e8)?;
                    continue;
                }
            };

            let run = (block.remaining as usize).min(togo);
            let produced = match block.kind {
                BlockKind::Uncompressed => {
                    window.write_bytes(reader.read_raw(run)?)?;
                    run
                }
                kind => self.decode_run(reader, window, kind, run)?,
            };

            // A match may end past the run; it still has to fit the block.
            if produced > block.remaining as usize {
                return Err(DecompressError::InvalidData("match ran past end of block"));
            }
            self.block = Some(Block {
                remaining: block.remaining - produced as u32,
                ..block
            });
            togo = togo.saturating_sub(produced);
        }

        if window.position() - frame_start != frame_len {
            return Err(DecompressError::InvalidData("frame overran its declared length"));
        }
        Ok(())
    }

    fn read_block_header(&mut self, reader: &mut BitReader, e8: &mut E8Translator) -> Result<()> {
        if let Some(prev) = self.block {
            if prev.kind == BlockKind::Uncompressed {
                if prev.original_size & 1 == 1 {
                    reader.skip_byte();
                }
                reader.reset_bits();
            }
        }

        let kind_bits = reader.read_bits(3)?;
        let high = reader.read_bits(8)?;
        let mid = reader.read_bits(8)?;
        let low = reader.read_bits(8)?;
        let size = (high << 16) | (mid << 8) | low;

        let kind = BlockKind::from_bits(kind_bits)
            .ok_or(DecompressError::InvalidData("invalid block type"))?;
        trace!(?kind, size, "LZX block header");

        match kind {
            BlockKind::Aligned => {
                for len in &mut self.aligned_tree.lengths_mut()[..ALIGNED_SYMBOLS] {
                    *len = reader.read_bits(3)? as u8;
                }
                self.aligned_tree.rebuild()?;
                self.read_main_trees(reader, e8)?;
            }
            BlockKind::Verbatim => self.read_main_trees(reader, e8)?,
            BlockKind::Uncompressed => {
                // Stored bytes can hold anything, including CALLs.
                e8.mark_started();
                reader.align_for_raw()?;
                let r0 = reader.read_raw_u32()?;
                let r1 = reader.read_raw_u32()?;
                let r2 = reader.read_raw_u32()?;
                self.offsets = RepeatedOffsets::from_raw([r0, r1, r2]);
            }
        }

        self.block = Some(Block {
            kind,
            remaining: size,
            original_size: size,
        });
        Ok(())
    }

    /// Main tree (literals, then matches) and length tree lengths.
    fn read_main_trees(&mut self, reader: &mut BitReader, e8: &mut E8Translator) -> Result<()> {
        read_lengths(reader, self.main_tree.lengths_mut(), 0, NUM_CHARS)?;
        read_lengths(reader, self.main_tree.lengths_mut(), NUM_CHARS, self.main_elements)?;
        self.main_tree.rebuild()?;
        if self.main_tree.lengths()[0xE8] != 0 {
            e8.mark_started();
        }

        read_lengths(reader, self.length_tree.lengths_mut(), 0, LENGTH_SYMBOLS)?;
        self.length_tree.rebuild()
    }

    /// Decode at least `run` bytes of a compressed block; returns the
    /// number actually produced (a final match may overshoot).
    fn decode_run(
        &mut self,
        reader: &mut BitReader,
        window: &mut SlidingWindow,
        kind: BlockKind,
        run: usize,
    ) -> Result<usize> {
        let mut produced = 0;
        while produced < run {
            let symbol = self.main_tree.decode(reader)? as usize;
            if symbol < NUM_CHARS {
                window.write_literal(symbol as u8)?;
                produced += 1;
                continue;
            }

            // Match: NUM_CHARS + (position slot << 3 | length header)
            let element = symbol - NUM_CHARS;
            let mut length = element & NUM_PRIMARY_LENGTHS;
            if length == NUM_PRIMARY_LENGTHS {
                length += self.length_tree.decode(reader)? as usize;
            }
            length += MIN_MATCH;

            let slot = element >> 3;
            let offset = if slot < 3 {
                self.offsets.reuse(slot)
            } else {
                let offset = match kind {
                    BlockKind::Aligned => self.aligned_offset(reader, slot)?,
                    _ => verbatim_offset(reader, slot)?,
                };
                self.offsets.push(offset);
                offset
            };

            window.copy_match(offset as usize, length)?;
            produced += length;
        }
        Ok(produced)
    }

    fn aligned_offset(&self, reader: &mut BitReader, slot: usize) -> Result<u32> {
        let extra = EXTRA_BITS[slot] as u32;
        let base = POSITION_BASE[slot] - 2;
        let offset = match extra {
            // Only slot 3 has no extra bits; its offset is 1 either way.
            0 => 1,
            1 | 2 => base + reader.read_bits(extra)?,
            3 => base + self.aligned_tree.decode(reader)? as u32,
            _ => {
                let verbatim = reader.read_bits(extra - 3)?;
                let aligned = self.aligned_tree.decode(reader)? as u32;
                base + (verbatim << 3) + aligned
            }
        };
        Ok(offset)
    }
}

fn verbatim_offset(reader: &mut BitReader, slot: usize) -> Result<u32> {
    if slot == 3 {
        return Ok(1);
    }
    let extra = EXTRA_BITS[slot] as u32;
    Ok(POSITION_BASE[slot] - 2 + reader.read_bits(extra)?)
}
