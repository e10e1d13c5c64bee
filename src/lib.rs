//! LZX decompression for Xbox recovery media.
//!
//! Decodes the LZX streams found in Microsoft cabinet folders and in the
//! `recctrl.bin`/`recdata.bin` pairs shipped on Xbox recovery discs.
//!
//! - [`LzxSession`] - frame-by-frame LZX decoder with a persistent window
//! - [`Cabinet`] - single-volume CAB reader (stored and LZX folders)
//! - [`RecoveryPackage`] - recovery control file and per-entry extraction
//!
//! ## Features
//! - Core library depends only on `tracing`
//! - `async` - Async byte sources with tokio
//! - `parallel` - Batch extraction on the rayon thread pool

mod byte_search;
mod cabinet;
mod checksum;
pub mod decompress;
pub mod error;
mod file_media;
pub mod parsing;
mod recovery;

#[cfg(test)]
mod test_support;

pub use cabinet::{decompress_folder, scan_cabinets, Cabinet, CabinetOptions};
pub use checksum::data_block_checksum;
pub use error::ExtractError;
pub use file_media::{LocalFileMedia, ReadInterval};
pub use recovery::{decompress_entry, ExtractOptions, ExtractedEntry, RecoveryPackage};

#[cfg(feature = "async")]
pub use file_media::FileMedia;

// Re-export decompression types
pub use decompress::{DecompressError, LzxSession, SessionOptions};
