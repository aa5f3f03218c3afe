//! Merged PE32 and PE32+ image parsing.

use crate::{
    medium::{Medium, MediumError},
    raw::{OptionalHeader32, OptionalHeader64},
    width::{
        OptionalHeader, UnsupportedWidthError, Width, width_32::Pe32, width_64::Pe64,
    },
};

/// An object offering methods for safe parsing of images whose width is chosen at runtime.
#[derive(Clone, Copy, Hash, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnyWidth {
    /// The image is a PE32 image.
    Pe32,
    /// The image is a PE32+ image.
    Pe64,
}

impl Width for AnyWidth {
    type Address = u64;
    type OptionalHeader = AnyOptionalHeader;

    fn from_magic(magic: u16) -> Result<Self, UnsupportedWidthError> {
        if Pe32::from_magic(magic).is_ok() {
            Ok(Self::Pe32)
        } else if Pe64::from_magic(magic).is_ok() {
            Ok(Self::Pe64)
        } else {
            Err(UnsupportedWidthError(magic))
        }
    }

    fn magic(self) -> u16 {
        match self {
            Self::Pe32 => Pe32.magic(),
            Self::Pe64 => Pe64.magic(),
        }
    }

    fn ordinal_flag(self) -> u64 {
        match self {
            Self::Pe32 => Pe32.ordinal_flag(),
            Self::Pe64 => Pe64.ordinal_flag(),
        }
    }

    fn thunk_size(self) -> u32 {
        match self {
            Self::Pe32 => Pe32.thunk_size(),
            Self::Pe64 => Pe64.thunk_size(),
        }
    }

    fn optional_header_size(self) -> u64 {
        match self {
            Self::Pe32 => Pe32.optional_header_size(),
            Self::Pe64 => Pe64.optional_header_size(),
        }
    }

    fn read_optional_header<M: Medium + ?Sized>(
        self,
        medium: &M,
        offset: u64,
    ) -> Result<Self::OptionalHeader, MediumError<M::Error>> {
        match self {
            Self::Pe32 => Pe32
                .read_optional_header(medium, offset)
                .map(AnyOptionalHeader::Pe32),
            Self::Pe64 => Pe64
                .read_optional_header(medium, offset)
                .map(AnyOptionalHeader::Pe64),
        }
    }

    fn read_address<M: Medium + ?Sized>(
        self,
        medium: &M,
        offset: u64,
    ) -> Result<Self::Address, MediumError<M::Error>> {
        match self {
            Self::Pe32 => Pe32.read_address(medium, offset).map(u64::from),
            Self::Pe64 => Pe64.read_address(medium, offset),
        }
    }

    fn checked_virtual_address(self, image_base: u64, rva: u32) -> Option<u64> {
        match self {
            Self::Pe32 => Pe32.checked_virtual_address(image_base, rva),
            Self::Pe64 => Pe64.checked_virtual_address(image_base, rva),
        }
    }
}

/// The fixed part of an optional header of either width.
#[derive(Clone, Copy, Hash, Debug, PartialEq, Eq)]
pub enum AnyOptionalHeader {
    /// A PE32 optional header.
    Pe32(OptionalHeader32),
    /// A PE32+ optional header.
    Pe64(OptionalHeader64),
}

/// Forwards an [`OptionalHeader`] method to the contained header.
macro_rules! dispatch {
    ($self:ident.$method:ident($($arg:expr),*)) => {
        match $self {
            AnyOptionalHeader::Pe32(header) => header.$method($($arg),*),
            AnyOptionalHeader::Pe64(header) => header.$method($($arg),*),
        }
    };
}

impl OptionalHeader for AnyOptionalHeader {
    fn magic(&self) -> u16 {
        dispatch!(self.magic())
    }

    fn linker_version(&self) -> (u8, u8) {
        dispatch!(self.linker_version())
    }

    fn size_of_code(&self) -> u32 {
        dispatch!(self.size_of_code())
    }

    fn size_of_initialized_data(&self) -> u32 {
        dispatch!(self.size_of_initialized_data())
    }

    fn size_of_uninitialized_data(&self) -> u32 {
        dispatch!(self.size_of_uninitialized_data())
    }

    fn entry_point(&self) -> u32 {
        dispatch!(self.entry_point())
    }

    fn set_entry_point(&mut self, entry_point: u32) {
        dispatch!(self.set_entry_point(entry_point))
    }

    fn base_of_code(&self) -> u32 {
        dispatch!(self.base_of_code())
    }

    fn base_of_data(&self) -> Option<u32> {
        dispatch!(self.base_of_data())
    }

    fn image_base(&self) -> u64 {
        dispatch!(self.image_base())
    }

    fn section_alignment(&self) -> u32 {
        dispatch!(self.section_alignment())
    }

    fn file_alignment(&self) -> u32 {
        dispatch!(self.file_alignment())
    }

    fn operating_system_version(&self) -> (u16, u16) {
        dispatch!(self.operating_system_version())
    }

    fn image_version(&self) -> (u16, u16) {
        dispatch!(self.image_version())
    }

    fn subsystem_version(&self) -> (u16, u16) {
        dispatch!(self.subsystem_version())
    }

    fn win32_version_value(&self) -> u32 {
        dispatch!(self.win32_version_value())
    }

    fn size_of_image(&self) -> u32 {
        dispatch!(self.size_of_image())
    }

    fn size_of_headers(&self) -> u32 {
        dispatch!(self.size_of_headers())
    }

    fn checksum(&self) -> u32 {
        dispatch!(self.checksum())
    }

    fn set_checksum(&mut self, checksum: u32) {
        dispatch!(self.set_checksum(checksum))
    }

    fn subsystem(&self) -> u16 {
        dispatch!(self.subsystem())
    }

    fn set_subsystem(&mut self, subsystem: u16) {
        dispatch!(self.set_subsystem(subsystem))
    }

    fn dll_characteristics(&self) -> u16 {
        dispatch!(self.dll_characteristics())
    }

    fn size_of_stack_reserve(&self) -> u64 {
        dispatch!(self.size_of_stack_reserve())
    }

    fn size_of_stack_commit(&self) -> u64 {
        dispatch!(self.size_of_stack_commit())
    }

    fn size_of_heap_reserve(&self) -> u64 {
        dispatch!(self.size_of_heap_reserve())
    }

    fn size_of_heap_commit(&self) -> u64 {
        dispatch!(self.size_of_heap_commit())
    }

    fn loader_flags(&self) -> u32 {
        dispatch!(self.loader_flags())
    }

    fn number_of_rva_and_sizes(&self) -> u32 {
        dispatch!(self.number_of_rva_and_sizes())
    }

    fn set_number_of_rva_and_sizes(&mut self, count: u32) {
        dispatch!(self.set_number_of_rva_and_sizes(count))
    }
}
