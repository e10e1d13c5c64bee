//! RecoveryPackage - extraction from a recovery control/data file pair.
//!
//! The control file (`recctrl.bin`) indexes the data file (`recdata.bin`).
//! Every entry is an independent LZX stream cut into frames of 0x8000
//! bytes, so entries can be decoded in any order and in parallel.

use std::path::Path;

use tracing::{debug, warn};

use crate::decompress::LzxSession;
use crate::error::{ExtractError, Result};
use crate::file_media::{LocalFileMedia, ReadInterval};
use crate::parsing::{ByteCursor, RecoveryControl, RecoveryControlParser, RecoveryEntry};

#[cfg(feature = "async")]
use crate::file_media::FileMedia;

/// Filter options for batch extraction.
#[derive(Default)]
pub struct ExtractOptions {
    /// Filter function over `(short path, entry index)`: return true to include an entry.
    pub filter: Option<Box<dyn Fn(&str, usize) -> bool + Send + Sync>>,
    /// Maximum number of entries to extract.
    pub max_files: Option<usize>,
}

/// Outcome of extracting one entry in a batch.
#[derive(Debug)]
pub struct ExtractedEntry {
    pub index: usize,
    /// `version\device\path`
    pub path: String,
    pub result: Result<Vec<u8>>,
}

/// A parsed recovery control file.
#[derive(Debug, Clone)]
pub struct RecoveryPackage {
    control: RecoveryControl,
}

impl RecoveryPackage {
    pub fn parse(control: &[u8]) -> Result<Self> {
        Ok(Self {
            control: RecoveryControlParser::parse(control)?,
        })
    }

    /// Read and parse a control file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let media = LocalFileMedia::new(path)?;
        Self::parse(&media.read_all_sync()?)
    }

    pub fn control(&self) -> &RecoveryControl {
        &self.control
    }

    pub fn entries(&self) -> &[RecoveryEntry] {
        &self.control.entries
    }

    /// LZX window size shared by every entry. Negative sizes map to 0,
    /// which the codec rejects.
    pub fn window_size(&self) -> usize {
        self.control.header.window_size.max(0) as usize
    }

    /// Indices of the entries accepted by `options`, in file order.
    pub fn select(&self, options: &ExtractOptions) -> Vec<usize> {
        let mut selected = Vec::new();
        for (index, entry) in self.control.entries.iter().enumerate() {
            if options.max_files.is_some_and(|max| selected.len() >= max) {
                break;
            }
            let include = options
                .filter
                .as_ref()
                .is_none_or(|filter| filter(&self.control.short_path(entry), index));
            if include {
                selected.push(index);
            }
        }
        selected
    }

    /// Extract one entry from the full contents of the data file.
    pub fn extract_entry(&self, entry: &RecoveryEntry, data: &[u8]) -> Result<Vec<u8>> {
        let start = entry.data_offset;
        let end = start + entry.compressed_size();
        if end > data.len() as u64 {
            return Err(ExtractError::InvalidOffset {
                offset: end,
                length: data.len() as u64,
            });
        }
        decompress_entry(
            self.window_size(),
            entry,
            &data[start as usize..end as usize],
        )
    }

    /// Extract one entry, reading only its byte range from the data file.
    pub fn extract_entry_from(
        &self,
        entry: &RecoveryEntry,
        media: &LocalFileMedia,
    ) -> Result<Vec<u8>> {
        let compressed = match Self::interval(entry) {
            Some(interval) => media.read_range_sync(interval)?,
            None => Vec::new(),
        };
        decompress_entry(self.window_size(), entry, &compressed)
    }

    /// Extract one entry through an async byte source.
    #[cfg(feature = "async")]
    #[cfg_attr(docsrs, doc(cfg(feature = "async")))]
    pub async fn extract_entry_async(
        &self,
        entry: &RecoveryEntry,
        media: &dyn FileMedia,
    ) -> Result<Vec<u8>> {
        let compressed = match Self::interval(entry) {
            Some(interval) => media.read_range(interval).await?,
            None => Vec::new(),
        };
        decompress_entry(self.window_size(), entry, &compressed)
    }

    /// Extract every selected entry. A failing entry is reported in its
    /// result and does not stop the batch.
    pub fn extract_all(&self, data: &[u8], options: &ExtractOptions) -> Vec<ExtractedEntry> {
        self.select(options)
            .into_iter()
            .map(|index| self.extract_indexed(index, data))
            .collect()
    }

    /// [`extract_all`](Self::extract_all) on the rayon thread pool, one
    /// LZX session per entry. Results keep file order.
    #[cfg(feature = "parallel")]
    #[cfg_attr(docsrs, doc(cfg(feature = "parallel")))]
    pub fn extract_all_parallel(
        &self,
        data: &[u8],
        options: &ExtractOptions,
    ) -> Vec<ExtractedEntry> {
        use rayon::prelude::*;

        self.select(options)
            .into_par_iter()
            .map(|index| self.extract_indexed(index, data))
            .collect()
    }

    fn extract_indexed(&self, index: usize, data: &[u8]) -> ExtractedEntry {
        let entry = &self.control.entries[index];
        let path = self.control.short_path(entry);
        let result = self.extract_entry(entry, data);
        if let Err(e) = &result {
            warn!(index, path = %path, error = %e, "failed to extract recovery entry");
        }
        ExtractedEntry {
            index,
            path,
            result,
        }
    }

    fn interval(entry: &RecoveryEntry) -> Option<ReadInterval> {
        ReadInterval::with_len(entry.data_offset, entry.compressed_size())
    }
}

/// Decode the frames of one entry with a fresh session.
///
/// The result is truncated or zero-extended to the entry's declared size.
pub fn decompress_entry(
    window_size: usize,
    entry: &RecoveryEntry,
    compressed: &[u8],
) -> Result<Vec<u8>> {
    let mut session = LzxSession::new(window_size)?;
    let mut cursor = ByteCursor::new(compressed);
    let mut out = Vec::with_capacity(entry.decompressed_size as usize);

    for (packed, unpacked) in entry.frame_sizes() {
        let frame = cursor.read_bytes(packed)?;
        if packed == 0 && unpacked == 0 {
            continue;
        }
        session.decompress_into(frame, unpacked, &mut out)?;
    }

    if out.len() != entry.decompressed_size as usize {
        debug!(
            path = %entry.path,
            decoded = out.len(),
            declared = entry.decompressed_size,
            "resizing entry to declared size"
        );
    }
    out.resize(entry.decompressed_size as usize, 0);
    Ok(out)
}
