//! LZX decompression.
//!
//! This module implements the LZX codec used by Microsoft cabinet files and
//! by the Xbox / Xbox 360 recovery media: Huffman-coded literals and matches
//! over a persistent LZ77 sliding window, with an x86 `CALL` post-transform.
//!
//! ## Block Types
//!
//! | Type | Value | Offsets |
//! |------|-------|---------|
//! | Verbatim | `1` | position slot + raw extra bits |
//! | Aligned | `2` | position slot + raw bits + aligned-offset tree symbol |
//! | Uncompressed | `3` | none, bytes are stored as-is |
//!
//! ## Example
//!
//! ```rust
//! use lzx_stream::LzxSession;
//!
//! // One session per logical file; all state persists between frames.
//! let mut session = LzxSession::new(0x10_0000).unwrap();
//!
//! // Feed each compressed frame in order with its declared output length.
//! // let frame = session.decompress(&compressed_frame, 0x8000)?;
//! # let _ = &mut session;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Compressed Frame
//!       ↓
//! ┌─────────────┐
//! │ BitReader   │ ← 16-bit little-endian words, MSB-first bits
//! └─────────────┘
//!       ↓
//! ┌─────────────┐
//! │ Huffman     │ ← main / length / aligned trees, pretree-coded lengths
//! └─────────────┘
//!       ↓
//! ┌─────────────┐
//! │ Window      │ ← literals, matches, repeated offsets
//! └─────────────┘
//!       ↓
//! ┌─────────────┐
//! │ E8          │ ← undo x86 CALL translation
//! └─────────────┘
//!       ↓
//! Decompressed Frame
//! ```
//!
//! ## Notes
//!
//! - Sessions are stateful and must see frames in order
//! - Window size is 32KB to 2MB (a power of two)
//! - Sessions are independent; decode separate files on separate threads

mod bit_reader;
mod block;
mod e8;
mod huffman;
mod lzx;
mod offsets;
mod tables;
mod window;


pub use bit_reader::BitReader;
pub use block::{Block, BlockKind};
pub use e8::{E8Translator, E8_FRAME_LIMIT};
pub use huffman::HuffmanTable;
pub use lzx::{LzxSession, SessionOptions, DEFAULT_FRAME_SIZE, MAX_GROWTH};
pub use offsets::RepeatedOffsets;
pub use window::SlidingWindow;

use std::fmt;

/// Decompression errors.
///
/// None of these are recovered from inside the codec. A caller extracting
/// many files should treat any of them as fatal for the current file only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecompressError {
    /// Window size is not a power of two in `2^15..=2^21`.
    InvalidWindowSize(usize),
    /// A frame asked for more output than the session was created for.
    OutputLargerThanAgreed { requested: usize, agreed: usize },
    /// A Huffman code-length set is neither complete nor empty.
    CorruptTable,
    /// The bit stream ran past the end of the supplied frame.
    TruncatedInput,
    /// Malformed stream contents.
    InvalidData(&'static str),
}

impl fmt::Display for DecompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWindowSize(size) => {
                write!(f, "Invalid LZX window size: 0x{:x}", size)
            }
            Self::OutputLargerThanAgreed { requested, agreed } => {
                write!(
                    f,
                    "Frame output of {} bytes is larger than the agreed {} bytes",
                    requested, agreed
                )
            }
            Self::CorruptTable => write!(f, "Corrupt Huffman table"),
            Self::TruncatedInput => write!(f, "Unexpected end of compressed data"),
            Self::InvalidData(reason) => write!(f, "Invalid LZX data: {}", reason),
        }
    }
}

impl std::error::Error for DecompressError {}

pub type Result<T> = std::result::Result<T, DecompressError>;
