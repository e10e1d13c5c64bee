//! Intel E8 call translation.
//!
//! The compressor rewrites the 32-bit operand of every x86 `CALL` (0xE8)
//! from a relative to an absolute target. Decoding reverses that, one frame
//! at a time, for the first `E8_FRAME_LIMIT` frames of a stream.

use tracing::trace;

/// Frames after this many are never translated.
pub const E8_FRAME_LIMIT: u32 = 32768;

/// Frames at or below this size are skipped.
const MIN_FRAME: usize = 6;

/// The last bytes of a frame that are never scanned for an opcode.
const TAIL: usize = 10;

/// Per-stream E8 translation state.
#[derive(Debug, Clone, Default)]
pub struct E8Translator {
    /// File size hint from the stream header, 0 when absent
    file_size: u32,
    /// Set once a block could contain 0xE8 bytes
    started: bool,
    /// Logical position of the next frame in the uncompressed stream
    curpos: u32,
    /// Frames seen so far
    frames: u32,
}

impl E8Translator {
    /// Create a translator for a stream with the given file-size hint.
    pub fn new(file_size: u32) -> Self {
        Self {
            file_size,
            ..Self::default()
        }
    }

    /// File-size hint, 0 when the stream did not carry one.
    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    pub fn set_file_size(&mut self, file_size: u32) {
        self.file_size = file_size;
    }

    /// Note that a block may contain CALL opcodes.
    pub fn mark_started(&mut self) {
        if !self.started {
            trace!("E8 translation active");
        }
        self.started = true;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Frames passed through [`translate`](Self::translate) so far.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Undo the translation on one decoded frame, in place.
    pub fn translate(&mut self, frame: &mut [u8]) {
        let frame_index = self.frames;
        self.frames = self.frames.saturating_add(1);
        if frame_index >= E8_FRAME_LIMIT || self.file_size == 0 {
            return;
        }

        let len = frame.len() as u32;
        if frame.len() <= MIN_FRAME || !self.started {
            self.curpos = self.curpos.wrapping_add(len);
            return;
        }

        let file_size = self.file_size as i32;
        let mut curpos = self.curpos as i32;
        self.curpos = self.curpos.wrapping_add(len);

        let end = frame.len().saturating_sub(TAIL);
        let mut i = 0;
        while i < end {
            if frame[i] != 0xE8 {
                i += 1;
                curpos = curpos.wrapping_add(1);
                continue;
            }

            let operand = &mut frame[i + 1..i + 5];
            let abs_off = i32::from_le_bytes([operand[0], operand[1], operand[2], operand[3]]);
            if abs_off >= curpos.wrapping_neg() && abs_off < file_size {
                let rel_off = if abs_off >= 0 {
                    abs_off.wrapping_sub(curpos)
                } else {
                    abs_off.wrapping_add(file_size)
                };
                operand.copy_from_slice(&rel_off.to_le_bytes());
            }
            i += 5;
            curpos = curpos.wrapping_add(5);
        }
    }
}
