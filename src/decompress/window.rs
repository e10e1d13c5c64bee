//! LZX sliding window.
//!
//! Holds every byte decoded so far for the current logical stream. Frames
//! never straddle the wrap point, so a frame's output is always contiguous.

use super::{DecompressError, Result};

/// Circular history buffer.
pub struct SlidingWindow {
    /// Sliding window buffer
    window: Vec<u8>,
    /// Window size mask for wrap-around
    mask: usize,
    /// Current write position in window
    pos: usize,
    /// Bytes of valid history behind `pos`, capped at the window size
    history: usize,
}

impl SlidingWindow {
    /// Create a new window; `size` must be a power of two.
    pub fn new(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        Self {
            window: vec![0; size],
            mask: size - 1,
            pos: 0,
            history: 0,
        }
    }

    /// Reset for a new stream, keeping the allocation.
    /// Window contents are not cleared; reads are validated against `history`.
    #[inline]
    pub fn reset(&mut self) {
        self.pos = 0;
        self.history = 0;
    }

    /// Preload reference data at the end of the window so that the first
    /// matches of the stream can point into it.
    pub fn seed(&mut self, data: &[u8]) -> Result<()> {
        let size = self.window.len();
        if data.len() > size {
            return Err(DecompressError::InvalidData("reference data larger than window"));
        }
        self.window[..size - data.len()].fill(0);
        self.window[size - data.len()..].copy_from_slice(data);
        self.pos = 0;
        self.history = data.len();
        Ok(())
    }

    /// Window size in bytes.
    pub fn size(&self) -> usize {
        self.window.len()
    }

    /// Get the current window position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes available for back-references.
    pub fn history(&self) -> usize {
        self.history
    }

    /// Fold the position back into the window after a full wrap.
    #[inline]
    pub fn wrap(&mut self) {
        self.pos &= self.mask;
    }

    /// Write a literal byte.
    #[inline]
    pub fn write_literal(&mut self, byte: u8) -> Result<()> {
        if self.pos >= self.window.len() {
            return Err(DecompressError::InvalidData("literal ran over window wrap"));
        }
        self.window[self.pos] = byte;
        self.advance(1);
        Ok(())
    }

    /// Write stored bytes from an uncompressed block.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.pos + bytes.len();
        if end > self.window.len() {
            return Err(DecompressError::InvalidData("stored run ran over window wrap"));
        }
        self.window[self.pos..end].copy_from_slice(bytes);
        self.advance(bytes.len());
        Ok(())
    }

    /// Copy `length` bytes starting `offset` bytes back.
    ///
    /// The source may wrap around the start of the window; the destination
    /// never does.
    pub fn copy_match(&mut self, offset: usize, length: usize) -> Result<()> {
        if offset == 0 || offset > self.history {
            return Err(DecompressError::InvalidData("match offset beyond decoded data"));
        }
        if self.pos + length > self.window.len() {
            return Err(DecompressError::InvalidData("match ran over window wrap"));
        }

        let dest = self.pos;
        if offset <= dest {
            self.copy_forward(dest - offset, dest, length);
        } else {
            // Source starts before the wrap point: take the tail of the
            // window first, then continue from the start.
            let src = dest + self.window.len() - offset;
            let before_wrap = offset - dest;
            if before_wrap < length {
                self.copy_forward(src, dest, before_wrap);
                self.copy_forward(0, dest + before_wrap, length - before_wrap);
            } else {
                self.copy_forward(src, dest, length);
            }
        }

        self.advance(length);
        Ok(())
    }

    /// LZ77 copy; byte by byte when the source runs into the destination.
    #[inline]
    fn copy_forward(&mut self, src: usize, dest: usize, len: usize) {
        if src >= dest || src + len <= dest {
            self.window.copy_within(src..src + len, dest);
        } else {
            for i in 0..len {
                self.window[dest + i] = self.window[src + i];
            }
        }
    }

    #[inline]
    fn advance(&mut self, n: usize) {
        self.pos += n;
        self.history = (self.history + n).min(self.window.len());
    }

    /// The `len` bytes that end at the current position.
    pub fn recent(&self, len: usize) -> &[u8] {
        let end = if self.pos == 0 { self.window.len() } else { self.pos };
        &self.window[end - len..end]
    }
}
