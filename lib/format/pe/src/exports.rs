//! Reading of the export directory.

use alloc::{string::String, vec::Vec};

use log::trace;

use crate::{
    decode::Decode,
    directory::DirectoryId,
    error::PeError,
    image::Image,
    raw::ExportDirectory,
    section::SectionDataKind,
    util::{MAX_WORD, is_sum_safe},
    width::Width,
};

/// The size, in bytes, of an entry of the function and name tables.
const TABLE_ENTRY_SIZE: u32 = 4;
/// The size, in bytes, of an entry of the name ordinal table.
const NAME_ORDINAL_SIZE: u32 = 2;

/// Summary information about the export directory of an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportDirectoryInfo {
    /// Reserved flags.
    pub characteristics: u32,
    /// The time the export data was created.
    pub time_date_stamp: u32,
    /// The major version number.
    pub major_version: u16,
    /// The minor version number.
    pub minor_version: u16,
    /// The name of the library.
    pub name: String,
    /// The ordinal of the first entry of the function table.
    pub ordinal_base: u32,
    /// The number of entries in the function table.
    pub number_of_functions: u32,
    /// The number of entries in the name and name ordinal tables.
    pub number_of_names: u32,
    /// The RVA of the function table.
    pub address_of_functions: u32,
    /// The RVA of the name table.
    pub address_of_names: u32,
    /// The RVA of the name ordinal table.
    pub address_of_name_ordinals: u32,
}

/// A single function exported by an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedFunction {
    /// The ordinal, which is the index into the function table plus the ordinal base.
    pub ordinal: u16,
    /// The RVA the function table holds for this function.
    pub rva: u32,
    /// The name of the function, if it is exported by name.
    pub name: Option<String>,
    /// The index into the function table recorded in the name ordinal table.
    pub name_ordinal: Option<u16>,
    /// The `library.function` string this export forwards to, if it is a forwarder.
    pub forwarded_name: Option<String>,
}

impl ExportedFunction {
    /// Returns `true` if the function forwards to another library.
    pub fn is_forwarded(&self) -> bool {
        self.forwarded_name.is_some()
    }
}

#[expect(clippy::missing_errors_doc)]
impl<W: Width> Image<W> {
    /// Reads the export directory header.
    ///
    /// Returns [`None`] if the image has no export directory. Every other failure is reported as
    /// [`PeError::IncorrectExportDirectory`].
    pub fn export_directory(&self) -> Result<Option<ExportDirectoryInfo>, PeError> {
        if !self.has_exports() {
            return Ok(None);
        }

        let exports = self.read_export_directory()?;
        let name = self.read_name(exports.name, PeError::IncorrectExportDirectory)?;

        Ok(Some(ExportDirectoryInfo {
            characteristics: exports.characteristics,
            time_date_stamp: exports.time_date_stamp,
            major_version: exports.major_version,
            minor_version: exports.minor_version,
            name,
            ordinal_base: exports.base,
            number_of_functions: exports.number_of_functions,
            number_of_names: exports.number_of_names,
            address_of_functions: exports.address_of_functions,
            address_of_names: exports.address_of_names,
            address_of_name_ordinals: exports.address_of_name_ordinals,
        }))
    }

    /// Returns every exported function in function table order.
    ///
    /// Function table slots holding a zero RVA are skipped. Returns an empty list if the image
    /// has no export directory. Every failure is reported as
    /// [`PeError::IncorrectExportDirectory`].
    pub fn exported_functions(&self) -> Result<Vec<ExportedFunction>, PeError> {
        const ERROR: PeError = PeError::IncorrectExportDirectory;

        let mut functions = Vec::new();
        if !self.has_exports() {
            return Ok(functions);
        }

        let directory = self.directory(DirectoryId::EXPORT)?;
        let exports = self.read_export_directory()?;
        if exports.number_of_functions == 0 {
            return Ok(functions);
        }

        validate_tables(&exports, directory.virtual_address, directory.size)?;

        let table_size = exports.number_of_functions * TABLE_ENTRY_SIZE;
        if self.available(exports.address_of_functions)? < table_size {
            return Err(ERROR);
        }
        if exports.address_of_names != 0 {
            let names_size = exports.number_of_names * TABLE_ENTRY_SIZE;
            let ordinals_size = exports.number_of_names * NAME_ORDINAL_SIZE;
            if self.available(exports.address_of_name_ordinals)? < ordinals_size
                || self.available(exports.address_of_names)? < names_size
            {
                return Err(ERROR);
            }
        }

        let forwarder_range = u64::from(directory.virtual_address)
            ..u64::from(directory.virtual_address) + u64::from(directory.size);

        for index in 0..exports.number_of_functions {
            let rva: u32 = self.read_table(exports.address_of_functions, index, TABLE_ENTRY_SIZE)?;
            if rva == 0 {
                continue;
            }

            if !is_sum_safe(exports.base, index) || exports.base + index > MAX_WORD {
                return Err(ERROR);
            }
            let ordinal = u16::try_from(exports.base + index).map_err(|_| ERROR)?;

            let mut name = None;
            let mut name_ordinal = None;
            for name_index in 0..exports.number_of_names {
                let candidate: u16 =
                    self.read_table(exports.address_of_name_ordinals, name_index, NAME_ORDINAL_SIZE)?;
                if u32::from(candidate) != index {
                    continue;
                }

                let name_rva: u32 =
                    self.read_table(exports.address_of_names, name_index, TABLE_ENTRY_SIZE)?;
                name = Some(self.read_name(name_rva, ERROR)?);
                name_ordinal = Some(candidate);
                break;
            }

            let forwarded_name = if forwarder_range.contains(&u64::from(rva)) {
                Some(self.read_name(rva, ERROR)?)
            } else {
                None
            };

            trace!("export {ordinal}: rva {rva:#x}, name {name:?}");
            functions.push(ExportedFunction {
                ordinal,
                rva,
                name,
                name_ordinal,
                forwarded_name,
            });
        }

        Ok(functions)
    }

    /// Reads the export directory structure, which must fit inside the region holding it.
    fn read_export_directory(&self) -> Result<ExportDirectory, PeError> {
        let rva = self.directory_rva(DirectoryId::EXPORT)?;
        if u64::from(self.available(rva)?) < ExportDirectory::SIZE {
            return Err(PeError::IncorrectExportDirectory);
        }

        self.read_at(rva, SectionDataKind::Virtual, true)
            .map_err(|_| PeError::IncorrectExportDirectory)
    }

    /// Returns the number of bytes available at `rva` in the zero-extended image.
    fn available(&self, rva: u32) -> Result<u32, PeError> {
        self.section_data_length_from_rva(rva, SectionDataKind::Virtual, true)
            .map_err(|_| PeError::IncorrectExportDirectory)
    }

    /// Reads entry `index` of the export table at `table`, whose entries are `entry_size` bytes.
    fn read_table<T: Decode>(&self, table: u32, index: u32, entry_size: u32) -> Result<T, PeError> {
        let rva = index
            .checked_mul(entry_size)
            .and_then(|offset| table.checked_add(offset))
            .ok_or(PeError::IncorrectExportDirectory)?;

        self.read_at(rva, SectionDataKind::Virtual, true)
            .map_err(|_| PeError::IncorrectExportDirectory)
    }
}

/// Checks the table fields of the export directory for consistency and overflow.
fn validate_tables(
    exports: &ExportDirectory,
    directory_rva: u32,
    directory_size: u32,
) -> Result<(), PeError> {
    let max_entries = u32::MAX / TABLE_ENTRY_SIZE;
    let valid = exports.number_of_names <= exports.number_of_functions
        && (exports.address_of_names == 0) == (exports.address_of_name_ordinals == 0)
        && exports.address_of_functions != 0
        && exports.number_of_functions < max_entries
        && exports.number_of_names <= max_entries
        && is_sum_safe(
            exports.address_of_functions,
            exports.number_of_functions * TABLE_ENTRY_SIZE,
        )
        && is_sum_safe(
            exports.address_of_names,
            exports.number_of_names * TABLE_ENTRY_SIZE,
        )
        && is_sum_safe(
            exports.address_of_name_ordinals,
            exports.number_of_names * NAME_ORDINAL_SIZE,
        )
        && is_sum_safe(directory_rva, directory_size);

    if valid {
        Ok(())
    } else {
        Err(PeError::IncorrectExportDirectory)
    }
}
