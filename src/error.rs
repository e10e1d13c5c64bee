//! Error types for container parsing and extraction.
//!
//! This module provides the [`ExtractError`] type which covers everything
//! that can go wrong between reading a cabinet or recovery-control file and
//! handing back decompressed bytes. Codec failures are wrapped unchanged.
//!
//! ## Error Categories
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Format | [`InvalidSignature`], [`InvalidHeader`] | Not a cabinet, or a malformed record |
//! | Bounds | [`BufferTooSmall`], [`InvalidOffset`] | A record or range points past the data |
//! | Integrity | [`ChecksumMismatch`] | A cabinet data block is damaged |
//! | Decompression | [`UnsupportedCompression`], [`Decompress`] | Unknown method or corrupt LZX data |
//! | I/O | [`Io`] | Read errors |
//!
//! ## Example
//!
//! ```rust,ignore
//! use lzx_stream::{Cabinet, ExtractError};
//!
//! match Cabinet::parse(&bytes) {
//!     Ok(cab) => println!("{} files", cab.files().len()),
//!     Err(ExtractError::InvalidSignature) => eprintln!("Not a cabinet"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! [`InvalidSignature`]: ExtractError::InvalidSignature
//! [`InvalidHeader`]: ExtractError::InvalidHeader
//! [`BufferTooSmall`]: ExtractError::BufferTooSmall
//! [`InvalidOffset`]: ExtractError::InvalidOffset
//! [`ChecksumMismatch`]: ExtractError::ChecksumMismatch
//! [`UnsupportedCompression`]: ExtractError::UnsupportedCompression
//! [`Decompress`]: ExtractError::Decompress
//! [`Io`]: ExtractError::Io

use std::fmt;
use std::io;

use crate::decompress::DecompressError;

/// Error type for container operations.
#[derive(Debug)]
pub enum ExtractError {
    /// The data does not start with the cabinet signature `MSCF`.
    InvalidSignature,

    /// A record is malformed; the string names the offending field.
    InvalidHeader(&'static str),

    /// A record runs past the end of the available bytes.
    BufferTooSmall {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        have: usize,
    },

    /// A byte range lies outside the file it refers to.
    InvalidOffset {
        /// The requested offset.
        offset: u64,
        /// The actual file length.
        length: u64,
    },

    /// The folder compression type is neither stored nor LZX.
    ///
    /// The value is the low byte of the folder's `typeCompress` field:
    /// - `0`: stored - supported
    /// - `1`: MSZIP
    /// - `2`: Quantum
    /// - `3`: LZX - supported
    UnsupportedCompression(u16),

    /// A CFDATA block does not match its stored checksum.
    ChecksumMismatch {
        /// Checksum stored in the block header.
        expected: u32,
        /// Checksum computed over the block.
        actual: u32,
    },

    /// The LZX stream of a folder or entry is corrupt.
    Decompress(DecompressError),

    /// An I/O error occurred.
    Io(io::Error),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "Invalid cabinet signature"),
            Self::InvalidHeader(field) => write!(f, "Invalid or malformed header: {}", field),
            Self::BufferTooSmall { needed, have } => {
                write!(f, "Buffer too small: need {} bytes, have {}", needed, have)
            }
            Self::InvalidOffset { offset, length } => {
                write!(f, "Invalid offset: {} (file length: {})", offset, length)
            }
            Self::UnsupportedCompression(kind) => {
                write!(f, "Unsupported compression type: {}", kind)
            }
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "Checksum mismatch: expected 0x{:08x}, got 0x{:08x}",
                expected, actual
            ),
            Self::Decompress(e) => write!(f, "Decompression failed: {}", e),
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Decompress(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ExtractError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<DecompressError> for ExtractError {
    fn from(e: DecompressError) -> Self {
        Self::Decompress(e)
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_decompress_error_is_source() {
        let err = ExtractError::from(DecompressError::CorruptTable);
        assert!(matches!(err, ExtractError::Decompress(DecompressError::CorruptTable)));
        assert_eq!(err.to_string(), "Decompression failed: Corrupt Huffman table");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let err = ExtractError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(err, ExtractError::Io(_)));
        assert!(err.source().is_some());
        assert!(ExtractError::InvalidSignature.source().is_none());
    }
}
