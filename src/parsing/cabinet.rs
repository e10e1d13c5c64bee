//! Cabinet (CAB) record parsers.
//!
//! A cabinet starts with a CFHEADER, followed by its CFFOLDER records. The
//! CFFILE records live at `coffFiles`; each folder's CFDATA blocks start at
//! its `coffCabStart`. All offsets are relative to the CFHEADER.
//!
//! ## Layout
//!
//! | Record | Fixed size | Variable part |
//! |--------|-----------|---------------|
//! | CFHEADER | 36 | reserve sizes, reserve area, prev/next cabinet names |
//! | CFFOLDER | 8 | per-folder reserve |
//! | CFFILE | 16 | NUL-terminated name |
//! | CFDATA | 8 | per-block reserve, then `cbData` bytes |

use super::cursor::ByteCursor;
use crate::error::{ExtractError, Result};

/// `MSCF` read as a little-endian u32.
pub const CABINET_SIGNATURE: u32 = 0x4643_534D;

/// Header flags.
pub const FLAG_PREV_CABINET: u16 = 0x0001;
pub const FLAG_NEXT_CABINET: u16 = 0x0002;
pub const FLAG_RESERVE_PRESENT: u16 = 0x0004;

/// Folder compression types (low byte of `typeCompress`).
pub const COMPRESSION_MASK: u16 = 0x00FF;
pub const COMPRESSION_NONE: u16 = 0;
pub const COMPRESSION_MSZIP: u16 = 1;
pub const COMPRESSION_QUANTUM: u16 = 2;
pub const COMPRESSION_LZX: u16 = 3;

/// File attribute: the name is UTF-8 rather than the local code page.
pub const ATTRIB_NAME_IS_UTF: u16 = 0x80;

/// Folder index values for files that span cabinets.
pub const FOLDER_CONTINUED_FROM_PREV: u16 = 0xFFFD;
pub const FOLDER_CONTINUED_TO_NEXT: u16 = 0xFFFE;
pub const FOLDER_CONTINUED_PREV_AND_NEXT: u16 = 0xFFFF;

/// Name and disk label of a neighbouring cabinet in a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CabinetLink {
    pub cabinet: String,
    pub disk: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CabinetHeader {
    /// Total cabinet size in bytes
    pub cabinet_size: u32,
    /// Offset of the first CFFILE record
    pub files_offset: u32,
    pub version_minor: u8,
    pub version_major: u8,
    pub folder_count: u16,
    pub file_count: u16,
    pub flags: u16,
    pub set_id: u16,
    /// Position of this cabinet within its set
    pub cabinet_index: u16,
    /// Per-cabinet reserve area size
    pub header_reserve: u16,
    /// Extra bytes after each CFFOLDER
    pub folder_reserve: u8,
    /// Extra bytes after each CFDATA header
    pub data_reserve: u8,
    pub prev_cabinet: Option<CabinetLink>,
    pub next_cabinet: Option<CabinetLink>,
    /// Bytes consumed, where the CFFOLDER records begin
    pub size: usize,
}

pub struct CabinetHeaderParser;

impl CabinetHeaderParser {
    /// Fixed part of the header.
    pub const HEADER_SIZE: usize = 36;

    pub fn parse(buffer: &[u8]) -> Result<CabinetHeader> {
        if buffer.len() < Self::HEADER_SIZE {
            return Err(ExtractError::BufferTooSmall {
                needed: Self::HEADER_SIZE,
                have: buffer.len(),
            });
        }

        let mut cursor = ByteCursor::new(buffer);
        if cursor.read_u32()? != CABINET_SIGNATURE {
            return Err(ExtractError::InvalidSignature);
        }
        cursor.skip(4)?; // reserved1
        let cabinet_size = cursor.read_u32()?;
        cursor.skip(4)?; // reserved2
        let files_offset = cursor.read_u32()?;
        cursor.skip(4)?; // reserved3
        let version_minor = cursor.read_u8()?;
        let version_major = cursor.read_u8()?;
        let folder_count = cursor.read_u16()?;
        let file_count = cursor.read_u16()?;
        let flags = cursor.read_u16()?;
        let set_id = cursor.read_u16()?;
        let cabinet_index = cursor.read_u16()?;

        let (header_reserve, folder_reserve, data_reserve) = if flags & FLAG_RESERVE_PRESENT != 0 {
            let header_reserve = cursor.read_u16()?;
            let folder_reserve = cursor.read_u8()?;
            let data_reserve = cursor.read_u8()?;
            cursor.skip(header_reserve as usize)?;
            (header_reserve, folder_reserve, data_reserve)
        } else {
            (0, 0, 0)
        };

        let prev_cabinet = if flags & FLAG_PREV_CABINET != 0 {
            Some(Self::read_link(&mut cursor)?)
        } else {
            None
        };
        let next_cabinet = if flags & FLAG_NEXT_CABINET != 0 {
            Some(Self::read_link(&mut cursor)?)
        } else {
            None
        };

        Ok(CabinetHeader {
            cabinet_size,
            files_offset,
            version_minor,
            version_major,
            folder_count,
            file_count,
            flags,
            set_id,
            cabinet_index,
            header_reserve,
            folder_reserve,
            data_reserve,
            prev_cabinet,
            next_cabinet,
            size: cursor.position(),
        })
    }

    fn read_link(cursor: &mut ByteCursor) -> Result<CabinetLink> {
        Ok(CabinetLink {
            cabinet: cursor.read_cstring()?,
            disk: cursor.read_cstring()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CabinetFolder {
    /// Offset of the first CFDATA block
    pub data_offset: u32,
    pub data_blocks: u16,
    pub compression: u16,
}

impl CabinetFolder {
    /// Compression type without its parameter bits.
    pub fn compression_type(&self) -> u16 {
        self.compression & COMPRESSION_MASK
    }

    /// LZX window size exponent, stored in bits 8..=12.
    pub fn lzx_window_bits(&self) -> u32 {
        u32::from((self.compression >> 8) & 0x1F)
    }
}

pub struct CabinetFolderParser;

impl CabinetFolderParser {
    pub const HEADER_SIZE: usize = 8;

    pub fn parse(buffer: &[u8]) -> Result<CabinetFolder> {
        Self::read(&mut ByteCursor::new(buffer), 0)
    }

    /// Read one CFFOLDER and skip its reserve area.
    pub fn read(cursor: &mut ByteCursor, reserve: u8) -> Result<CabinetFolder> {
        let folder = CabinetFolder {
            data_offset: cursor.read_u32()?,
            data_blocks: cursor.read_u16()?,
            compression: cursor.read_u16()?,
        };
        cursor.skip(reserve as usize)?;
        Ok(folder)
    }
}

/// Date and time decoded from the DOS fields of a CFFILE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CabinetFile {
    /// Uncompressed size
    pub size: u32,
    /// Offset of the file within its folder's uncompressed data
    pub folder_offset: u32,
    pub folder_index: u16,
    pub date: u16,
    pub time: u16,
    pub attributes: u16,
    pub name: String,
}

impl CabinetFile {
    pub fn modified(&self) -> DosDateTime {
        DosDateTime {
            year: (self.date >> 9) + 1980,
            month: ((self.date >> 5) & 0x0F) as u8,
            day: (self.date & 0x1F) as u8,
            hour: (self.time >> 11) as u8,
            minute: ((self.time >> 5) & 0x3F) as u8,
            second: ((self.time & 0x1F) * 2) as u8,
        }
    }

    /// Whether the file's data starts or ends in another cabinet.
    pub fn spans_cabinets(&self) -> bool {
        matches!(
            self.folder_index,
            FOLDER_CONTINUED_FROM_PREV | FOLDER_CONTINUED_TO_NEXT | FOLDER_CONTINUED_PREV_AND_NEXT
        )
    }
}

pub struct CabinetFileParser;

impl CabinetFileParser {
    /// Fixed part before the name.
    pub const HEADER_SIZE: usize = 16;

    pub fn parse(buffer: &[u8]) -> Result<CabinetFile> {
        Self::read(&mut ByteCursor::new(buffer))
    }

    pub fn read(cursor: &mut ByteCursor) -> Result<CabinetFile> {
        Ok(CabinetFile {
            size: cursor.read_u32()?,
            folder_offset: cursor.read_u32()?,
            folder_index: cursor.read_u16()?,
            date: cursor.read_u16()?,
            time: cursor.read_u16()?,
            attributes: cursor.read_u16()?,
            name: cursor.read_cstring()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlockHeader {
    pub checksum: u32,
    /// Compressed bytes that follow the header and its reserve
    pub compressed_size: u16,
    /// Uncompressed size; 0 when the block continues in the next cabinet
    pub uncompressed_size: u16,
}

pub struct DataBlockParser;

impl DataBlockParser {
    pub const HEADER_SIZE: usize = 8;

    pub fn parse(buffer: &[u8]) -> Result<DataBlockHeader> {
        Self::read(&mut ByteCursor::new(buffer), 0)
    }

    /// Read a CFDATA header and skip its reserve area.
    pub fn read(cursor: &mut ByteCursor, reserve: u8) -> Result<DataBlockHeader> {
        let block = DataBlockHeader {
            checksum: cursor.read_u32()?,
            compressed_size: cursor.read_u16()?,
            uncompressed_size: cursor.read_u16()?,
        };
        cursor.skip(reserve as usize)?;
        Ok(block)
    }
}
