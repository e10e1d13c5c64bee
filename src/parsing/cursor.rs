//! Bounds-checked little-endian field reader.
//!
//! All container records are decoded field by field through [`ByteCursor`];
//! every read that would run past the buffer fails with
//! [`ExtractError::BufferTooSmall`].

use crate::error::{ExtractError, Result};

/// Read position over a byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Start reading at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Result<Self> {
        let mut cursor = Self::new(data);
        cursor.seek(pos)?;
        Ok(cursor)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(ExtractError::BufferTooSmall {
                needed: pos,
                have: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(ExtractError::BufferTooSmall {
            needed: usize::MAX,
            have: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(ExtractError::BufferTooSmall {
                needed: end,
                have: self.data.len(),
            });
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// NUL-terminated string; the terminator is consumed.
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(ExtractError::BufferTooSmall {
                needed: self.data.len() + 1,
                have: self.data.len(),
            })?;
        let name = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(name)
    }

    /// `u16` length followed by that many bytes, then padding to an even
    /// position.
    pub fn read_counted_string(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        if self.pos & 1 == 1 && self.pos < self.data.len() {
            self.pos += 1;
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_fields() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xFF];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(cursor.read_u8().unwrap(), 0xFF);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_read_past_end() {
        let data = [1, 2, 3];
        let mut cursor = ByteCursor::new(&data);
        cursor.read_u16().unwrap();
        assert!(matches!(
            cursor.read_u16(),
            Err(ExtractError::BufferTooSmall { needed: 4, have: 3 })
        ));
        // A failed read does not move the cursor.
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_cstring() {
        let data = b"abc\0def";
        let mut cursor = ByteCursor::new(data);
        assert_eq!(cursor.read_cstring().unwrap(), "abc");
        assert_eq!(cursor.position(), 4);
        assert!(cursor.read_cstring().is_err());
    }

    #[test]
    fn test_counted_string_padding() {
        // Length 3 ends at offset 5, padded to 6.
        let data = [3, 0, b'x', b'y', b'z', 0, 1, 0];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_counted_string().unwrap(), "xyz");
        assert_eq!(cursor.position(), 6);
        assert_eq!(cursor.read_u16().unwrap(), 1);
    }

    #[test]
    fn test_counted_string_even_length() {
        let data = [2, 0, b'o', b'k', 7, 0];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_counted_string().unwrap(), "ok");
        assert_eq!(cursor.read_u16().unwrap(), 7);
    }

    #[test]
    fn test_seek() {
        let data = [0u8; 4];
        assert!(ByteCursor::at(&data, 4).is_ok());
        assert!(ByteCursor::at(&data, 5).is_err());
    }
}
