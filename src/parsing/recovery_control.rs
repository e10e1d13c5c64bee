//! Recovery-control (`recctrl.bin`) parser.
//!
//! The control file describes every file stored in the matching
//! `recdata.bin`. Strings are a `u16` length plus ASCII bytes, padded so the
//! next field starts at an even file offset.
//!
//! ## Layout
//!
//! ```text
//! u16  version count (+1; index 0 is the implicit "all versions" entry)
//! str  version name * (count - 1)
//! u16  device count
//! str  device name, str device path   * count
//! i32  LZX window size
//! entry * (until end of file)
//! ```
//!
//! Each entry: `u16` version index, `u16` device index, `u32` decompressed
//! size, `u64` FILETIME, path string, a zero-terminated list of `u16`
//! compressed frame sizes (each inflating to 0x8000 bytes), then the final
//! frame's `u16` decompressed and `u16` compressed sizes.

use tracing::debug;

use super::cursor::ByteCursor;
use crate::decompress::DEFAULT_FRAME_SIZE;
use crate::error::{ExtractError, Result};

/// Name of version index 0, which applies to every version.
pub const ALL_VERSIONS: &str = "_All";

/// 100ns intervals between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_EPOCH: u64 = 116_444_736_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Short name, e.g. `flash`
    pub name: String,
    /// Device path, e.g. `\Device\Flash`
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryHeader {
    /// Version names; index 0 is [`ALL_VERSIONS`]
    pub versions: Vec<String>,
    pub devices: Vec<Device>,
    /// Raw LZX window size; validated when a session is created
    pub window_size: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryEntry {
    pub version_index: u16,
    pub device_index: u16,
    /// Size after trimming the decompressed frames
    pub decompressed_size: u32,
    /// Windows FILETIME
    pub file_time: u64,
    pub path: String,
    /// Compressed sizes of the full frames
    pub frames: Vec<u16>,
    pub final_uncompressed_size: u16,
    pub final_compressed_size: u16,
    /// Offset of the entry's data in the data file
    pub data_offset: u64,
}

impl RecoveryEntry {
    /// Bytes this entry occupies in the data file.
    pub fn compressed_size(&self) -> u64 {
        self.frames.iter().map(|&f| f as u64).sum::<u64>() + self.final_compressed_size as u64
    }

    /// `(compressed, uncompressed)` size of every frame, in order.
    pub fn frame_sizes(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.frames
            .iter()
            .map(|&f| (f as usize, DEFAULT_FRAME_SIZE))
            .chain(std::iter::once((
                self.final_compressed_size as usize,
                self.final_uncompressed_size as usize,
            )))
    }

    /// Modification time as seconds since the Unix epoch.
    pub fn unix_time(&self) -> i64 {
        let ticks = i128::from(self.file_time) - i128::from(FILETIME_UNIX_EPOCH);
        (ticks / 10_000_000) as i64
    }
}

/// A parsed control file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryControl {
    pub header: RecoveryHeader,
    pub entries: Vec<RecoveryEntry>,
}

impl RecoveryControl {
    /// `version\device-name\path`
    pub fn short_path(&self, entry: &RecoveryEntry) -> String {
        let device = &self.header.devices[entry.device_index as usize].name;
        self.join_path(entry, device)
    }

    /// `version\device-path\path`
    pub fn long_path(&self, entry: &RecoveryEntry) -> String {
        let device = &self.header.devices[entry.device_index as usize].path;
        self.join_path(entry, device)
    }

    fn join_path(&self, entry: &RecoveryEntry, device: &str) -> String {
        let version = &self.header.versions[entry.version_index as usize];
        let separator = if device.starts_with('\\') { "" } else { "\\" };
        format!("{}{}{}\\{}", version, separator, device, entry.path)
    }

    /// Entries belonging to a version index.
    pub fn entries_for_version(&self, version_index: u16) -> impl Iterator<Item = &RecoveryEntry> {
        self.entries
            .iter()
            .filter(move |e| e.version_index == version_index)
    }

    /// Entries stored for a device index.
    pub fn entries_for_device(&self, device_index: u16) -> impl Iterator<Item = &RecoveryEntry> {
        self.entries
            .iter()
            .filter(move |e| e.device_index == device_index)
    }
}

pub struct RecoveryControlParser;

impl RecoveryControlParser {
    /// Smallest possible file: empty version and device lists plus window size.
    pub const MIN_SIZE: usize = 8;

    pub fn parse(buffer: &[u8]) -> Result<RecoveryControl> {
        if buffer.len() < Self::MIN_SIZE {
            return Err(ExtractError::BufferTooSmall {
                needed: Self::MIN_SIZE,
                have: buffer.len(),
            });
        }

        let mut cursor = ByteCursor::new(buffer);
        let header = Self::read_header(&mut cursor)?;

        let mut entries = Vec::new();
        let mut data_offset = 0u64;
        while !cursor.is_empty() {
            let entry = Self::read_entry(&mut cursor, data_offset)?;
            if entry.version_index as usize >= header.versions.len() {
                return Err(ExtractError::InvalidHeader("entry version index out of range"));
            }
            if entry.device_index as usize >= header.devices.len() {
                return Err(ExtractError::InvalidHeader("entry device index out of range"));
            }
            data_offset += entry.compressed_size();
            entries.push(entry);
        }

        debug!(
            versions = header.versions.len() - 1,
            devices = header.devices.len(),
            entries = entries.len(),
            window_size = header.window_size,
            "parsed recovery control file"
        );

        Ok(RecoveryControl { header, entries })
    }

    fn read_header(cursor: &mut ByteCursor) -> Result<RecoveryHeader> {
        // The stored count includes the implicit "all versions" slot.
        let version_count = cursor.read_u16()?;
        let mut versions = vec![ALL_VERSIONS.to_string()];
        for _ in 1..version_count {
            versions.push(cursor.read_counted_string()?);
        }

        let device_count = cursor.read_u16()?;
        let mut devices = Vec::with_capacity(device_count as usize);
        for _ in 0..device_count {
            devices.push(Device {
                name: cursor.read_counted_string()?,
                path: cursor.read_counted_string()?,
            });
        }

        let window_size = cursor.read_i32()?;
        Ok(RecoveryHeader {
            versions,
            devices,
            window_size,
        })
    }

    fn read_entry(cursor: &mut ByteCursor, data_offset: u64) -> Result<RecoveryEntry> {
        let version_index = cursor.read_u16()?;
        let device_index = cursor.read_u16()?;
        let decompressed_size = cursor.read_u32()?;
        let file_time = cursor.read_u64()?;
        let path = cursor.read_counted_string()?;

        let mut frames = Vec::new();
        loop {
            match cursor.read_u16()? {
                0 => break,
                size => frames.push(size),
            }
        }

        let final_uncompressed_size = cursor.read_u16()?;
        let final_compressed_size = cursor.read_u16()?;

        Ok(RecoveryEntry {
            version_index,
            device_index,
            decompressed_size,
            file_time,
            path,
            frames,
            final_uncompressed_size,
            final_compressed_size,
            data_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_string(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(&(s.len() as u16).to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
        if buf.len() % 2 == 1 {
            buf.push(0);
        }
    }

    fn push_entry(buf: &mut Vec<u8>, version: u16, device: u16, path: &str, frames: &[u16], last: (u16, u16)) {
        buf.extend_from_slice(&version.to_le_bytes());
        buf.extend_from_slice(&device.to_le_bytes());
        let size = frames.len() as u32 * 0x8000 + last.0 as u32;
        buf.extend_from_slice(&size.to_le_bytes());
        buf.extend_from_slice(&FILETIME_UNIX_EPOCH.to_le_bytes());
        push_string(buf, path);
        for f in frames {
            buf.extend_from_slice(&f.to_le_bytes());
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&last.0.to_le_bytes());
        buf.extend_from_slice(&last.1.to_le_bytes());
    }

    fn control_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&3u16.to_le_bytes());
        push_string(&mut buf, "5960");
        push_string(&mut buf, "5829");
        buf.extend_from_slice(&2u16.to_le_bytes());
        push_string(&mut buf, "flash");
        push_string(&mut buf, "\\Device\\Flash");
        push_string(&mut buf, "hdd");
        push_string(&mut buf, "Device\\Harddisk0\\Partition2");
        buf.extend_from_slice(&0x10_0000i32.to_le_bytes());

        push_entry(&mut buf, 1, 0, "xboxkrnl.exe", &[1000, 2000], (100, 60));
        push_entry(&mut buf, 0, 1, "dash.xbe", &[], (10, 8));
        buf
    }

    #[test]
    fn test_parse_header() {
        let control = RecoveryControlParser::parse(&control_bytes()).unwrap();
        let header = &control.header;
        assert_eq!(header.versions, vec!["_All", "5960", "5829"]);
        assert_eq!(header.devices.len(), 2);
        assert_eq!(header.devices[0].name, "flash");
        assert_eq!(header.devices[1].path, "Device\\Harddisk0\\Partition2");
        assert_eq!(header.window_size, 0x10_0000);
    }

    #[test]
    fn test_parse_entries() {
        let control = RecoveryControlParser::parse(&control_bytes()).unwrap();
        assert_eq!(control.entries.len(), 2);

        let first = &control.entries[0];
        assert_eq!(first.path, "xboxkrnl.exe");
        assert_eq!(first.frames, vec![1000, 2000]);
        assert_eq!(first.final_uncompressed_size, 100);
        assert_eq!(first.final_compressed_size, 60);
        assert_eq!(first.compressed_size(), 3060);
        assert_eq!(first.data_offset, 0);
        assert_eq!(first.unix_time(), 0);
        assert_eq!(
            first.frame_sizes().collect::<Vec<_>>(),
            vec![(1000, 0x8000), (2000, 0x8000), (60, 100)]
        );

        let second = &control.entries[1];
        assert_eq!(second.data_offset, 3060);
        assert!(second.frames.is_empty());
        assert_eq!(second.compressed_size(), 8);
    }

    #[test]
    fn test_unix_time_full_range() {
        let control = RecoveryControlParser::parse(&control_bytes()).unwrap();
        let mut entry = control.entries[0].clone();

        entry.file_time = 0;
        assert_eq!(entry.unix_time(), -11_644_473_600);
        entry.file_time = 1 << 63;
        assert_eq!(entry.unix_time(), 910_692_730_085);
        entry.file_time = u64::MAX;
        assert_eq!(entry.unix_time(), 1_833_029_933_770);
    }

    #[test]
    fn test_paths() {
        let control = RecoveryControlParser::parse(&control_bytes()).unwrap();
        let first = &control.entries[0];
        assert_eq!(control.short_path(first), "5960\\flash\\xboxkrnl.exe");
        assert_eq!(control.long_path(first), "5960\\Device\\Flash\\xboxkrnl.exe");

        let second = &control.entries[1];
        assert_eq!(control.short_path(second), "_All\\hdd\\dash.xbe");
        assert_eq!(
            control.long_path(second),
            "_All\\Device\\Harddisk0\\Partition2\\dash.xbe"
        );
    }

    #[test]
    fn test_filters() {
        let control = RecoveryControlParser::parse(&control_bytes()).unwrap();
        assert_eq!(control.entries_for_version(1).count(), 1);
        assert_eq!(control.entries_for_version(2).count(), 0);
        assert_eq!(control.entries_for_device(1).count(), 1);
    }

    #[test]
    fn test_header_only() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0x8000i32.to_le_bytes());

        let control = RecoveryControlParser::parse(&buf).unwrap();
        assert_eq!(control.header.versions, vec!["_All"]);
        assert!(control.entries.is_empty());
    }

    #[test]
    fn test_truncated_entry() {
        let mut buf = control_bytes();
        buf.truncate(buf.len() - 3);
        assert!(matches!(
            RecoveryControlParser::parse(&buf),
            Err(ExtractError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_device_index_out_of_range() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0x8000i32.to_le_bytes());
        push_entry(&mut buf, 0, 0, "a", &[], (1, 1));

        assert!(matches!(
            RecoveryControlParser::parse(&buf),
            Err(ExtractError::InvalidHeader(_))
        ));
    }
}
