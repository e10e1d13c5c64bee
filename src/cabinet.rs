//! Cabinet - single-volume CAB reader with cached folder decompression.
//!
//! Folders are decompressed as a whole the first time one of their files is
//! requested; later files from the same folder are sliced out of the cache.
//! Only stored and LZX folders are supported.

use crate::byte_search;
use crate::checksum;
use crate::decompress::LzxSession;
use crate::error::{ExtractError, Result};
use crate::parsing::cabinet::{COMPRESSION_LZX, COMPRESSION_NONE};
use crate::parsing::{
    ByteCursor, CabinetFile, CabinetFileParser, CabinetFolder, CabinetFolderParser, CabinetHeader,
    CabinetHeaderParser, DataBlockParser,
};
use tracing::{debug, trace};

/// `MSCF` followed by the zeroed reserved field.
const SCAN_PATTERN: [u8; 8] = [b'M', b'S', b'C', b'F', 0, 0, 0, 0];

/// Options for opening a cabinet.
#[derive(Debug, Clone, Copy)]
pub struct CabinetOptions {
    /// Verify CFDATA checksums where the block carries one.
    pub verify_checksums: bool,
}

impl Default for CabinetOptions {
    fn default() -> Self {
        Self {
            verify_checksums: true,
        }
    }
}

/// A parsed cabinet over borrowed bytes.
pub struct Cabinet<'a> {
    data: &'a [u8],
    header: CabinetHeader,
    folders: Vec<CabinetFolder>,
    files: Vec<CabinetFile>,
    options: CabinetOptions,
    cache: Vec<Option<Vec<u8>>>,
}

impl<'a> Cabinet<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        Self::with_options(data, CabinetOptions::default())
    }

    pub fn with_options(data: &'a [u8], options: CabinetOptions) -> Result<Self> {
        let header = CabinetHeaderParser::parse(data)?;

        let mut cursor = ByteCursor::at(data, header.size)?;
        let folders = (0..header.folder_count)
            .map(|_| CabinetFolderParser::read(&mut cursor, header.folder_reserve))
            .collect::<Result<Vec<_>>>()?;

        cursor.seek(header.files_offset as usize)?;
        let files = (0..header.file_count)
            .map(|_| CabinetFileParser::read(&mut cursor))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            folders = folders.len(),
            files = files.len(),
            size = header.cabinet_size,
            "parsed cabinet"
        );

        Ok(Self {
            data,
            cache: vec![None; folders.len()],
            header,
            folders,
            files,
            options,
        })
    }

    pub fn header(&self) -> &CabinetHeader {
        &self.header
    }

    pub fn folders(&self) -> &[CabinetFolder] {
        &self.folders
    }

    pub fn files(&self) -> &[CabinetFile] {
        &self.files
    }

    /// Index of the first file called `name`.
    pub fn find_file(&self, name: &str, case_sensitive: bool) -> Option<usize> {
        self.files.iter().position(|f| {
            if case_sensitive {
                f.name == name
            } else {
                f.name.eq_ignore_ascii_case(name)
            }
        })
    }

    /// Decompressed contents of a folder, decoding it on first use.
    pub fn folder_data(&mut self, index: usize) -> Result<&[u8]> {
        let folder = *self
            .folders
            .get(index)
            .ok_or(ExtractError::InvalidHeader("folder index out of range"))?;
        let slot = &mut self.cache[index];
        if slot.is_none() {
            let data = decompress_folder(
                self.data,
                &folder,
                self.header.data_reserve,
                self.options.verify_checksums,
            )?;
            *slot = Some(data);
        }
        Ok(slot.as_deref().unwrap_or_default())
    }

    /// Extract the file at `index` in the file table.
    pub fn extract(&mut self, index: usize) -> Result<Vec<u8>> {
        let file = self
            .files
            .get(index)
            .ok_or(ExtractError::InvalidHeader("file index out of range"))?;
        if file.spans_cabinets() {
            return Err(ExtractError::InvalidHeader("file continues in another cabinet"));
        }
        let folder_index = file.folder_index as usize;
        let start = file.folder_offset as usize;
        let end = start + file.size as usize;

        let data = self.folder_data(folder_index)?;
        if end > data.len() {
            return Err(ExtractError::InvalidOffset {
                offset: end as u64,
                length: data.len() as u64,
            });
        }
        Ok(data[start..end].to_vec())
    }

    /// Extract the first file called `name`, if present.
    pub fn extract_by_name(&mut self, name: &str, case_sensitive: bool) -> Result<Option<Vec<u8>>> {
        match self.find_file(name, case_sensitive) {
            Some(index) => self.extract(index).map(Some),
            None => Ok(None),
        }
    }
}

/// Decompress every CFDATA block of `folder` into one buffer.
pub fn decompress_folder(
    data: &[u8],
    folder: &CabinetFolder,
    data_reserve: u8,
    verify_checksums: bool,
) -> Result<Vec<u8>> {
    let mut session = match folder.compression_type() {
        COMPRESSION_NONE => None,
        COMPRESSION_LZX => Some(LzxSession::new(1usize << folder.lzx_window_bits())?),
        other => return Err(ExtractError::UnsupportedCompression(other)),
    };

    let mut cursor = ByteCursor::at(data, folder.data_offset as usize)?;
    let mut out = Vec::new();

    for block_index in 0..folder.data_blocks {
        let block = DataBlockParser::read(&mut cursor, data_reserve)?;
        let payload = cursor.read_bytes(block.compressed_size as usize)?;
        trace!(
            block = block_index,
            packed = block.compressed_size,
            unpacked = block.uncompressed_size,
            "data block"
        );

        if block.uncompressed_size == 0 {
            return Err(ExtractError::InvalidHeader("data block continues in another cabinet"));
        }

        if verify_checksums && block.checksum != 0 {
            let actual = checksum::data_block_checksum(
                payload,
                block.compressed_size,
                block.uncompressed_size,
            );
            if actual != block.checksum {
                return Err(ExtractError::ChecksumMismatch {
                    expected: block.checksum,
                    actual,
                });
            }
        }

        match session.as_mut() {
            Some(lzx) => lzx.decompress_into(payload, block.uncompressed_size as usize, &mut out)?,
            None => out.extend_from_slice(payload),
        }
    }

    Ok(out)
}

/// Offsets of every embedded cabinet in `data` whose header parses.
///
/// Recovery executables carry their payload cabinets inline; this finds
/// them without knowing the executable layout.
pub fn scan_cabinets(data: &[u8]) -> Vec<usize> {
    byte_search::find_all(data, &SCAN_PATTERN)
        .into_iter()
        .filter(|&offset| {
            CabinetHeaderParser::parse(&data[offset..]).is_ok_and(|header| {
                offset as u64 + u64::from(header.cabinet_size) <= data.len() as u64
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::cabinet::FLAG_RESERVE_PRESENT;
    use crate::test_support::lzx_stored;

    struct CabBuilder {
        compression: u16,
        blocks: Vec<(Vec<u8>, u16)>,
        files: Vec<(String, u32, u32)>,
        checksums: bool,
        data_reserve: u8,
    }

    impl CabBuilder {
        fn new(compression: u16) -> Self {
            Self {
                compression,
                blocks: Vec::new(),
                files: Vec::new(),
                checksums: false,
                data_reserve: 0,
            }
        }

        fn block(mut self, payload: &[u8], uncompressed: u16) -> Self {
            self.blocks.push((payload.to_vec(), uncompressed));
            self
        }

        fn file(mut self, name: &str, offset: u32, size: u32) -> Self {
            self.files.push((name.to_string(), offset, size));
            self
        }

        fn build(&self) -> Vec<u8> {
            let reserve = self.data_reserve > 0;
            let header_size = 36 + if reserve { 4 } else { 0 };
            let folder_size = 8;
            let files_offset = header_size + folder_size;
            let files_size: usize = self.files.iter().map(|(n, _, _)| 16 + n.len() + 1).sum();
            let data_offset = files_offset + files_size;

            let mut out = Vec::new();
            out.extend_from_slice(b"MSCF");
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes()); // patched below
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&(files_offset as u32).to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&[3, 1]);
            out.extend_from_slice(&1u16.to_le_bytes());
            out.extend_from_slice(&(self.files.len() as u16).to_le_bytes());
            out.extend_from_slice(&(if reserve { FLAG_RESERVE_PRESENT } else { 0 }).to_le_bytes());
            out.extend_from_slice(&0x1234u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            if reserve {
                out.extend_from_slice(&0u16.to_le_bytes());
                out.push(0);
                out.push(self.data_reserve);
            }

            out.extend_from_slice(&(data_offset as u32).to_le_bytes());
            out.extend_from_slice(&(self.blocks.len() as u16).to_le_bytes());
            out.extend_from_slice(&self.compression.to_le_bytes());

            for (name, offset, size) in &self.files {
                out.extend_from_slice(&size.to_le_bytes());
                out.extend_from_slice(&offset.to_le_bytes());
                out.extend_from_slice(&0u16.to_le_bytes());
                out.extend_from_slice(&0x5A21u16.to_le_bytes());
                out.extend_from_slice(&0x6000u16.to_le_bytes());
                out.extend_from_slice(&0x20u16.to_le_bytes());
                out.extend_from_slice(name.as_bytes());
                out.push(0);
            }

            for (payload, uncompressed) in &self.blocks {
                let csum = if self.checksums {
                    checksum::data_block_checksum(payload, payload.len() as u16, *uncompressed)
                } else {
                    0
                };
                out.extend_from_slice(&csum.to_le_bytes());
                out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
                out.extend_from_slice(&uncompressed.to_le_bytes());
                out.extend(std::iter::repeat(0xEE).take(self.data_reserve as usize));
                out.extend_from_slice(payload);
            }

            let total = out.len() as u32;
            out[8..12].copy_from_slice(&total.to_le_bytes());
            out
        }
    }

    #[test]
    fn test_stored_folder() {
        let cab = CabBuilder::new(COMPRESSION_NONE)
            .block(b"hello world", 11)
            .file("a.txt", 0, 5)
            .file("b.txt", 6, 5)
            .build();

        let mut cabinet = Cabinet::parse(&cab).unwrap();
        assert_eq!(cabinet.files().len(), 2);
        assert_eq!(cabinet.folders().len(), 1);
        assert_eq!(cabinet.header().set_id, 0x1234);
        assert_eq!(cabinet.extract(0).unwrap(), b"hello");
        assert_eq!(cabinet.extract(1).unwrap(), b"world");
    }

    #[test]
    fn test_find_file_case() {
        let cab = CabBuilder::new(COMPRESSION_NONE)
            .block(b"data", 4)
            .file("Xbox.XBE", 0, 4)
            .build();

        let mut cabinet = Cabinet::parse(&cab).unwrap();
        assert_eq!(cabinet.find_file("Xbox.XBE", true), Some(0));
        assert_eq!(cabinet.find_file("xbox.xbe", true), None);
        assert_eq!(cabinet.find_file("xbox.xbe", false), Some(0));
        assert_eq!(cabinet.extract_by_name("xbox.xbe", false).unwrap().unwrap(), b"data");
        assert!(cabinet.extract_by_name("missing", false).unwrap().is_none());
    }

    #[test]
    fn test_lzx_folder() {
        let first = b"The quick brown fox ";
        let second = b"jumps over the lazy dog";
        // Window bits 15 in the parameter field.
        let cab = CabBuilder::new(COMPRESSION_LZX | (15 << 8))
            .block(&lzx_stored(first, true), first.len() as u16)
            .block(&lzx_stored(second, false), second.len() as u16)
            .file("fox.txt", 0, (first.len() + second.len()) as u32)
            .build();

        let mut cabinet = Cabinet::parse(&cab).unwrap();
        assert_eq!(cabinet.folders()[0].lzx_window_bits(), 15);
        let data = cabinet.extract(0).unwrap();
        assert_eq!(data, b"The quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn test_checksums_and_reserve() {
        let mut builder = CabBuilder::new(COMPRESSION_NONE)
            .block(b"checked payload", 15)
            .file("c.bin", 0, 15);
        builder.checksums = true;
        builder.data_reserve = 4;
        let mut cab = builder.build();

        let mut cabinet = Cabinet::parse(&cab).unwrap();
        assert_eq!(cabinet.header().data_reserve, 4);
        assert_eq!(cabinet.extract(0).unwrap(), b"checked payload");

        let last = cab.len() - 1;
        cab[last] ^= 0xFF;
        let mut damaged = Cabinet::parse(&cab).unwrap();
        assert!(matches!(
            damaged.extract(0),
            Err(ExtractError::ChecksumMismatch { .. })
        ));

        let mut unchecked = Cabinet::with_options(
            &cab,
            CabinetOptions {
                verify_checksums: false,
            },
        )
        .unwrap();
        assert_eq!(unchecked.extract(0).unwrap().len(), 15);
    }

    #[test]
    fn test_unsupported_compression() {
        let cab = CabBuilder::new(1).block(b"zz", 2).file("z", 0, 2).build();
        let mut cabinet = Cabinet::parse(&cab).unwrap();
        assert!(matches!(
            cabinet.extract(0),
            Err(ExtractError::UnsupportedCompression(1))
        ));

        // Only the low byte names the method; 0x13 is not LZX.
        let cab = CabBuilder::new(0x0013).block(b"zz", 2).file("z", 0, 2).build();
        let mut cabinet = Cabinet::parse(&cab).unwrap();
        assert!(matches!(
            cabinet.extract(0),
            Err(ExtractError::UnsupportedCompression(0x13))
        ));
    }

    #[test]
    fn test_file_past_folder_end() {
        let cab = CabBuilder::new(COMPRESSION_NONE)
            .block(b"short", 5)
            .file("long", 2, 10)
            .build();
        let mut cabinet = Cabinet::parse(&cab).unwrap();
        assert!(matches!(
            cabinet.extract(0),
            Err(ExtractError::InvalidOffset { offset: 12, length: 5 })
        ));
        assert!(cabinet.extract(7).is_err());
    }

    #[test]
    fn test_not_a_cabinet() {
        assert!(matches!(
            Cabinet::parse(&[0u8; 64]),
            Err(ExtractError::InvalidSignature)
        ));
    }

    #[test]
    fn test_scan_cabinets() {
        let cab = CabBuilder::new(COMPRESSION_NONE)
            .block(b"x", 1)
            .file("x", 0, 1)
            .build();

        let mut image = b"MZ\x90\0".to_vec();
        image.extend_from_slice(&[0u8; 60]);
        image.extend_from_slice(b"MSCF\0\0\0\0garbage");
        let first = image.len();
        image.extend_from_slice(&cab);
        image.extend_from_slice(&[0u8; 7]);
        let second = image.len();
        image.extend_from_slice(&cab);

        assert_eq!(scan_cabinets(&image), vec![first, second]);
        let mut embedded = Cabinet::parse(&image[second..]).unwrap();
        assert_eq!(embedded.extract(0).unwrap(), b"x");
    }
}
