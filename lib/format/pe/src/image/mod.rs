//! A fully loaded PE image.
//!
//! [`Image`] owns every byte it needs once loading succeeds: the DOS header and stub, the NT
//! headers, the header region and the data of each section. Queries never touch the original
//! [`Medium`][crate::medium::Medium] again.

use alloc::vec::Vec;

use crate::{
    debug::DebugEntry,
    directory::DirectoryId,
    error::PeError,
    header::{FileCharacteristics, Subsystem},
    properties::Properties,
    raw::{DataDirectory, DosHeader},
    section::Section,
    width::{AnyWidth, Width},
};

mod access;
pub(crate) mod load;

/// Options that alter how an [`Image`] is loaded.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct LoadOptions {
    /// Read the entries of the debug directory, along with the data they point to, while loading.
    pub read_debug_raw_data: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            read_debug_raw_data: true,
        }
    }
}

/// A validated PE image and all of its section data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image<W: Width = AnyWidth> {
    /// The DOS header.
    dos_header: DosHeader,
    /// The bytes between the DOS header and the NT headers.
    dos_stub: Vec<u8>,
    /// The NT headers.
    properties: Properties<W>,
    /// The sections, in section table order.
    sections: Vec<Section>,
    /// The bytes of the header region.
    headers: Vec<u8>,
    /// The file offset of trailing data not covered by any section, if present.
    overlay_offset: Option<u64>,
    /// The prefetched debug directory entries.
    debug_entries: Vec<DebugEntry>,
}

impl<W: Width> Image<W> {
    /// Returns the DOS header.
    pub fn dos_header(&self) -> &DosHeader {
        &self.dos_header
    }

    /// Returns the bytes between the end of the DOS header and the start of the NT headers.
    ///
    /// This region holds the DOS stub program and the Rich header, when present.
    pub fn dos_stub(&self) -> &[u8] {
        &self.dos_stub
    }

    /// Returns the NT headers.
    pub fn properties(&self) -> &Properties<W> {
        &self.properties
    }

    /// Returns the [`Width`] of the image.
    pub fn width(&self) -> W {
        self.properties.width()
    }

    /// Returns the sections in section table order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Returns the bytes of the header region, as kept while loading.
    pub fn headers(&self) -> &[u8] {
        &self.headers
    }

    /// Returns `true` if the file continues past the raw data of every section.
    pub fn has_overlay(&self) -> bool {
        self.overlay_offset.is_some()
    }

    /// Returns the file offset at which the overlay starts, if the image has one.
    pub fn overlay_offset(&self) -> Option<u64> {
        self.overlay_offset
    }

    /// Returns the debug directory entries read while loading.
    ///
    /// Empty when the image has no debug directory or when loading was asked to skip it.
    pub fn debug_entries(&self) -> &[DebugEntry] {
        &self.debug_entries
    }

    /// Returns `true` if the directory `id` is declared and has a non-zero RVA.
    pub fn directory_exists(&self, id: DirectoryId) -> bool {
        self.properties.directory_exists(id)
    }

    /// Returns the directory `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PeError::DirectoryNotFound`] if the directory does not exist.
    pub fn directory(&self, id: DirectoryId) -> Result<DataDirectory, PeError> {
        self.properties.directory(id)
    }

    /// Returns the RVA of the directory `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PeError::DirectoryNotFound`] if the directory does not exist.
    pub fn directory_rva(&self, id: DirectoryId) -> Result<u32, PeError> {
        self.properties.directory_rva(id)
    }

    /// Returns the size of the directory `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PeError::DirectoryNotFound`] if the directory does not exist.
    pub fn directory_size(&self, id: DirectoryId) -> Result<u32, PeError> {
        self.properties.directory_size(id)
    }

    /// Returns `true` if the image has an export directory.
    pub fn has_exports(&self) -> bool {
        self.directory_exists(DirectoryId::EXPORT)
    }

    /// Returns `true` if the image has an import directory.
    pub fn has_imports(&self) -> bool {
        self.directory_exists(DirectoryId::IMPORT)
    }

    /// Returns `true` if the image has a resource directory.
    pub fn has_resources(&self) -> bool {
        self.directory_exists(DirectoryId::RESOURCE)
    }

    /// Returns `true` if the image has an exception directory.
    pub fn has_exceptions(&self) -> bool {
        self.directory_exists(DirectoryId::EXCEPTION)
    }

    /// Returns `true` if the image carries attribute certificates.
    pub fn has_security(&self) -> bool {
        self.directory_exists(DirectoryId::SECURITY)
    }

    /// Returns `true` if the image has base relocations that were not stripped.
    pub fn has_relocations(&self) -> bool {
        self.directory_exists(DirectoryId::BASE_RELOCATION)
            && !self
                .properties
                .characteristics()
                .contains(FileCharacteristics::RELOCS_STRIPPED)
    }

    /// Returns `true` if the image has a debug directory.
    pub fn has_debug(&self) -> bool {
        self.directory_exists(DirectoryId::DEBUG)
    }

    /// Returns `true` if the image has a thread local storage directory.
    pub fn has_tls(&self) -> bool {
        self.directory_exists(DirectoryId::TLS)
    }

    /// Returns `true` if the image has a load configuration directory.
    pub fn has_load_config(&self) -> bool {
        self.directory_exists(DirectoryId::LOAD_CONFIG)
    }

    /// Returns `true` if the image has a bound import directory.
    pub fn has_bound_imports(&self) -> bool {
        self.directory_exists(DirectoryId::BOUND_IMPORT)
    }

    /// Returns `true` if the image has an import address table directory.
    pub fn has_iat(&self) -> bool {
        self.directory_exists(DirectoryId::IAT)
    }

    /// Returns `true` if the image has a delay import directory.
    pub fn has_delay_imports(&self) -> bool {
        self.directory_exists(DirectoryId::DELAY_IMPORT)
    }

    /// Returns `true` if the image contains managed code.
    pub fn is_dot_net(&self) -> bool {
        self.directory_exists(DirectoryId::COM_DESCRIPTOR)
    }

    /// Returns `true` if the image targets the Windows character subsystem.
    pub fn is_console(&self) -> bool {
        self.properties.subsystem() == Subsystem::WINDOWS_CUI
    }

    /// Returns `true` if the image targets the Windows graphical subsystem.
    pub fn is_gui(&self) -> bool {
        self.properties.subsystem() == Subsystem::WINDOWS_GUI
    }

    /// Returns `true` if the image is a dynamic-link library.
    pub fn is_dll(&self) -> bool {
        self.properties
            .characteristics()
            .contains(FileCharacteristics::DLL)
    }

    // Edits are limited to fields that no load time check depends on, so the section layout
    // stays as validated.

    /// Sets the entry point RVA.
    pub fn set_entry_point(&mut self, entry_point: u32) {
        self.properties.set_entry_point(entry_point);
    }

    /// Sets the stored checksum. The checksum is not recomputed.
    pub fn set_checksum(&mut self, checksum: u32) {
        self.properties.set_checksum(checksum);
    }

    /// Sets the subsystem.
    pub fn set_subsystem(&mut self, subsystem: Subsystem) {
        self.properties.set_subsystem(subsystem);
    }
}
