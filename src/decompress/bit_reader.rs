//! Bit reader for LZX frames.
//!
//! LZX packs bits MSB-first into 16-bit little-endian words. The reader keeps
//! a 32-bit shift buffer that is refilled one word at a time.

use super::{DecompressError, Result};

/// Bit reader over one compressed frame.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Bit buffer, next bit in the MSB
    buffer: u32,
    /// Bits available in buffer (including phantom bits)
    bits_left: u32,
    /// Zero bits appended after the end of `data` for Huffman look-ahead
    phantom_bits: u32,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader over a frame.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            buffer: 0,
            bits_left: 0,
            phantom_bits: 0,
        }
    }

    /// Refill until at least `n` bits are buffered.
    ///
    /// With `allow_overrun`, one zero word may be synthesized past the end of
    /// the data. Those bits can be peeked but never consumed.
    fn refill(&mut self, n: u32, allow_overrun: bool) -> Result<()> {
        while self.bits_left < n {
            if self.pos + 2 <= self.data.len() {
                let word = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
                self.buffer |= (word as u32) << (16 - self.bits_left);
                self.pos += 2;
            } else if allow_overrun && self.phantom_bits == 0 {
                self.phantom_bits = 16;
            } else {
                return Err(DecompressError::TruncatedInput);
            }
            self.bits_left += 16;
        }
        Ok(())
    }

    /// Make sure `n` (at most 17) real bits are buffered.
    ///
    /// Offsets in the top position slots carry 17 extra bits; the refill
    /// shift stays in range because it only runs while `bits_left <= 16`.
    #[inline]
    pub fn ensure_bits(&mut self, n: u32) -> Result<()> {
        debug_assert!(n <= 17);
        self.refill(n, false)
    }

    /// Buffer 16 bits for a Huffman lookup, tolerating the end of the frame.
    #[inline]
    pub fn ensure_lookahead(&mut self) -> Result<()> {
        self.refill(16, true)
    }

    /// Peek at the next n bits without consuming them.
    #[inline]
    pub fn peek_bits(&self, n: u32) -> u32 {
        debug_assert!(n > 0 && n <= 17);
        self.buffer >> (32 - n)
    }

    /// Raw view of the bit buffer, next bit in the MSB.
    #[inline]
    pub fn buffer(&self) -> u32 {
        self.buffer
    }

    /// Drop n buffered bits.
    #[inline]
    pub fn remove_bits(&mut self, n: u32) -> Result<()> {
        if n > self.bits_left - self.phantom_bits {
            return Err(DecompressError::TruncatedInput);
        }
        self.buffer = if n >= 32 { 0 } else { self.buffer << n };
        self.bits_left -= n;
        Ok(())
    }

    /// Read n bits (0..=17) and advance.
    #[inline]
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n == 0 {
            return Ok(0);
        }
        self.ensure_bits(n)?;
        let value = self.peek_bits(n);
        self.remove_bits(n)?;
        Ok(value)
    }

    /// Drop the bit buffer; the next read starts on a fresh word.
    pub fn reset_bits(&mut self) {
        self.buffer = 0;
        self.bits_left = 0;
        self.phantom_bits = 0;
    }

    /// Skip the 1-16 padding bits in front of an uncompressed block header
    /// and switch to byte-level reads.
    pub fn align_for_raw(&mut self) -> Result<()> {
        match self.bits_left - self.phantom_bits {
            // Word aligned: the next whole word is padding.
            0 => {
                if self.pos + 2 > self.data.len() {
                    return Err(DecompressError::TruncatedInput);
                }
                self.pos += 2;
            }
            // Only the tail of the last word is buffered.
            1..=16 => {}
            // A whole unread word is buffered behind the partial one.
            _ => self.pos -= 2,
        }
        self.reset_bits();
        Ok(())
    }

    /// Read `len` bytes directly from the frame.
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8]> {
        debug_assert_eq!(self.bits_left, 0, "raw read with buffered bits");
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(DecompressError::TruncatedInput)?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Read a little-endian u32 directly from the frame.
    pub fn read_raw_u32(&mut self) -> Result<u32> {
        let bytes = self.read_raw(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Skip one byte if there is one left.
    pub fn skip_byte(&mut self) {
        if self.pos < self.data.len() {
            self.pos += 1;
        }
    }

    /// Get the current byte position (bytes consumed from the frame).
    pub fn byte_position(&self) -> usize {
        self.pos
    }

    /// Buffered bits that came from real input.
    pub fn bits_left(&self) -> u32 {
        self.bits_left - self.phantom_bits
    }

    /// Check if every real bit has been consumed.
    pub fn is_eof(&self) -> bool {
        self.bits_left() == 0 && self.pos + 2 > self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_word_order() {
        // Word 0x1234 is stored little-endian; bits come out MSB-first.
        let data = [0x34, 0x12, 0xCD, 0xAB];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(4).unwrap(), 0x1);
        assert_eq!(reader.read_bits(8).unwrap(), 0x23);
        assert_eq!(reader.read_bits(8).unwrap(), 0x4A);
        assert_eq!(reader.read_bits(12).unwrap(), 0xBCD);
        assert!(reader.is_eof());
    }

    #[test]
    fn test_read_seventeen_bits() {
        let data = [0xFF, 0xFF, 0x00, 0x80, 0x00, 0xC0];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(1).unwrap(), 1);
        // 15 buffered bits plus two from the next word.
        assert_eq!(reader.read_bits(17).unwrap(), 0x1_FFFE);
        assert_eq!(reader.read_bits(14).unwrap(), 0);

        let mut reader = BitReader::new(&data[2..]);
        assert_eq!(reader.read_bits(17).unwrap(), 0x1_0001);
        assert_eq!(reader.read_bits(15).unwrap(), 0x4000);
        assert!(reader.is_eof());
    }

    #[test]
    fn test_read_zero_bits() {
        let data: [u8; 0] = [];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(0).unwrap(), 0);
    }

    #[test]
    fn test_truncated() {
        let data = [0xFF, 0xFF];
        let mut reader = BitReader::new(&data);

        reader.read_bits(12).unwrap();
        assert_eq!(reader.read_bits(8), Err(DecompressError::TruncatedInput));
    }

    #[test]
    fn test_odd_trailing_byte_is_not_a_word() {
        let data = [0x00];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(1), Err(DecompressError::TruncatedInput));
    }

    #[test]
    fn test_lookahead_past_end() {
        let data = [0x00, 0x80];
        let mut reader = BitReader::new(&data);

        reader.read_bits(4).unwrap();
        reader.ensure_lookahead().unwrap();
        assert_eq!(reader.peek_bits(16), 0);
        // 12 real bits remain; the synthesized ones cannot be consumed.
        assert_eq!(reader.bits_left(), 12);
        reader.remove_bits(12).unwrap();
        assert_eq!(reader.remove_bits(1), Err(DecompressError::TruncatedInput));
    }

    #[test]
    fn test_align_for_raw_partial_word() {
        let data = [0xFF, 0xFF, 0xAA, 0xBB, 0xCC, 0xDD];
        let mut reader = BitReader::new(&data);

        reader.read_bits(3).unwrap();
        reader.ensure_bits(16).unwrap();
        reader.align_for_raw().unwrap();
        assert_eq!(reader.read_raw(2).unwrap(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_align_for_raw_word_aligned() {
        let data = [0xFF, 0xFF, 0x00, 0x00, 0xCC, 0xDD];
        let mut reader = BitReader::new(&data);

        reader.read_bits(16).unwrap();
        reader.align_for_raw().unwrap();
        // A full padding word is skipped.
        assert_eq!(reader.read_raw(2).unwrap(), &[0xCC, 0xDD]);
        assert_eq!(reader.read_raw(1), Err(DecompressError::TruncatedInput));
    }
}
