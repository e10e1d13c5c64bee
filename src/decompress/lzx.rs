//! LZX decompression session.
//!
//! A session owns the sliding window and all inter-frame state of one
//! logical stream. Frames are fed in order; each call yields exactly the
//! number of bytes the container declared for that frame.

use tracing::debug;

use super::block::{Block, BlockDecoder};
use super::e8::E8Translator;
use super::offsets::RepeatedOffsets;
use super::tables::position_slots;
use super::window::SlidingWindow;
use super::{BitReader, DecompressError, Result};

/// Uncompressed size of a full LZX frame.
pub const DEFAULT_FRAME_SIZE: usize = 0x8000;

/// Worst-case growth of a compressed frame over its uncompressed size.
pub const MAX_GROWTH: usize = 6144;

const MIN_WINDOW_BITS: u32 = 15;
const MAX_WINDOW_BITS: u32 = 21;

/// Options for creating a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Window size in bytes, a power of two from 2^15 to 2^21
    pub window_size: usize,
    /// Largest uncompressed frame a caller may request
    pub max_frame_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            window_size: 0x10_0000,
            max_frame_size: DEFAULT_FRAME_SIZE,
        }
    }
}

/// Stateful LZX decoder for one logical stream.
pub struct LzxSession {
    window: SlidingWindow,
    decoder: BlockDecoder,
    e8: E8Translator,
    window_bits: u32,
    max_frame_size: usize,
}

impl LzxSession {
    /// Create a session with the given window size and default options.
    pub fn new(window_size: usize) -> Result<Self> {
        Self::with_options(SessionOptions {
            window_size,
            ..SessionOptions::default()
        })
    }

    /// Create a session with explicit options.
    pub fn with_options(options: SessionOptions) -> Result<Self> {
        let window_bits = window_bits(options.window_size)
            .ok_or(DecompressError::InvalidWindowSize(options.window_size))?;

        debug!(
            window_size = options.window_size,
            max_frame_size = options.max_frame_size,
            "LZX session created"
        );

        Ok(Self {
            window: SlidingWindow::new(options.window_size),
            decoder: BlockDecoder::new(position_slots(window_bits)),
            e8: E8Translator::default(),
            window_bits,
            max_frame_size: options.max_frame_size,
        })
    }

    /// Decompress one frame.
    ///
    /// `output_len` is the frame's uncompressed size as declared by the
    /// container; the result is exactly that long.
    pub fn decompress(&mut self, frame: &[u8], output_len: usize) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(output_len);
        self.decompress_into(frame, output_len, &mut output)?;
        Ok(output)
    }

    /// Decompress one frame, appending the output to `out`.
    ///
    /// A frame may be up to [`MAX_GROWTH`] bytes longer than its output;
    /// anything longer is rejected before decoding.
    pub fn decompress_into(
        &mut self,
        frame: &[u8],
        output_len: usize,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        if output_len > self.max_frame_size {
            return Err(DecompressError::OutputLargerThanAgreed {
                requested: output_len,
                agreed: self.max_frame_size,
            });
        }
        if frame.len() > output_len + MAX_GROWTH {
            return Err(DecompressError::InvalidData(
                "compressed frame exceeds output plus growth allowance",
            ));
        }

        let mut reader = BitReader::new(frame);
        self.decoder
            .decode_frame(&mut reader, &mut self.window, &mut self.e8, output_len)?;

        let start = out.len();
        out.extend_from_slice(self.window.recent(output_len));
        self.e8.translate(&mut out[start..]);
        Ok(())
    }

    /// Preload the window with data that the first frames may reference.
    ///
    /// Only meaningful at the start of a stream; the session is reset first.
    pub fn set_reference_data(&mut self, data: &[u8]) -> Result<()> {
        self.reset();
        self.window.seed(data)?;
        debug!(len = data.len(), "LZX window seeded with reference data");
        Ok(())
    }

    /// Start a new logical stream with the same window size.
    pub fn reset(&mut self) {
        self.window.reset();
        self.decoder.reset();
        self.e8 = E8Translator::default();
    }

    /// Window size in bytes.
    pub fn window_size(&self) -> usize {
        self.window.size()
    }

    pub fn window_bits(&self) -> u32 {
        self.window_bits
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Current repeated offsets `[R0, R1, R2]`.
    pub fn repeated_offsets(&self) -> RepeatedOffsets {
        self.decoder.offsets()
    }

    /// Block in progress, if any.
    pub fn current_block(&self) -> Option<Block> {
        self.decoder.current_block()
    }

    /// E8 file-size hint from the stream header, 0 when absent.
    pub fn file_size_hint(&self) -> u32 {
        self.e8.file_size()
    }

    /// Frames decoded since the stream started.
    pub fn frames_processed(&self) -> u32 {
        self.e8.frames()
    }
}

impl std::fmt::Debug for LzxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LzxSession")
            .field("window_size", &self.window.size())
            .field("position", &self.window.position())
            .field("max_frame_size", &self.max_frame_size)
            .field("block", &self.decoder.current_block())
            .finish()
    }
}

fn window_bits(window_size: usize) -> Option<u32> {
    if !window_size.is_power_of_two() {
        return None;
    }
    let bits = window_size.trailing_zeros();
    (MIN_WINDOW_BITS..=MAX_WINDOW_BITS)
        .contains(&bits)
        .then_some(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bits() {
        assert_eq!(window_bits(0x8000), Some(15));
        assert_eq!(window_bits(0x20_0000), Some(21));
        assert_eq!(window_bits(0x4000), None);
        assert_eq!(window_bits(0x40_0000), None);
        assert_eq!(window_bits(0x8001), None);
        assert_eq!(window_bits(0), None);
    }

    #[test]
    fn test_default_options() {
        let options = SessionOptions::default();
        assert_eq!(options.window_size, 0x10_0000);
        assert_eq!(options.max_frame_size, DEFAULT_FRAME_SIZE);

        let session = LzxSession::with_options(options).unwrap();
        assert_eq!(session.window_bits(), 20);
        assert_eq!(session.repeated_offsets().get(), [1, 1, 1]);
        assert_eq!(session.current_block(), None);
    }

    #[test]
    fn test_custom_frame_limit() {
        let mut session = LzxSession::with_options(SessionOptions {
            window_size: 0x8000,
            max_frame_size: 16,
        })
        .unwrap();
        assert_eq!(
            session.decompress(&[], 17),
            Err(DecompressError::OutputLargerThanAgreed {
                requested: 17,
                agreed: 16
            })
        );
    }

    #[test]
    fn test_frame_growth_limit() {
        // Trailing bytes up to the allowance are never read.
        let mut frame = crate::test_support::lzx_stored(b"abcd", true);
        frame.resize(4 + MAX_GROWTH, 0);

        let mut session = LzxSession::new(0x8000).unwrap();
        assert_eq!(session.decompress(&frame, 4).unwrap(), b"abcd");

        frame.push(0);
        let mut session = LzxSession::new(0x8000).unwrap();
        assert!(matches!(
            session.decompress(&frame, 4),
            Err(DecompressError::InvalidData(_))
        ));
    }
}
