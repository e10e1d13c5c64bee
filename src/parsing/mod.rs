//! Container header parsing modules.

pub mod cabinet;
pub mod cursor;
pub mod recovery_control;

pub use cabinet::{
    CabinetFile, CabinetFileParser, CabinetFolder, CabinetFolderParser, CabinetHeader,
    CabinetHeaderParser, CabinetLink, DataBlockHeader, DataBlockParser, DosDateTime,
};
pub use cursor::ByteCursor;
pub use recovery_control::{
    Device, RecoveryControl, RecoveryControlParser, RecoveryEntry, RecoveryHeader,
};
