//! PE32+ image parsing.

use crate::{
    decode::Decode,
    medium::{Medium, MediumError},
    raw::OptionalHeader64,
    width::{UnsupportedWidthError, Width, impl_optional_header},
};

/// The optional header magic of a PE32+ image.
pub const PE64_MAGIC: u16 = 0x020B;

/// A zero-sized object offering methods for safe parsing of PE32+ images.
#[derive(Clone, Copy, Hash, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pe64;

impl Pe64 {
    /// The flag that marks an import thunk as an ordinal import.
    pub const ORDINAL_FLAG: u64 = 0x8000_0000_0000_0000;
    /// The size, in bytes, of an import thunk.
    pub const THUNK_SIZE: u32 = 8;
}

impl Width for Pe64 {
    type Address = u64;
    type OptionalHeader = OptionalHeader64;

    fn from_magic(magic: u16) -> Result<Self, UnsupportedWidthError> {
        if magic != PE64_MAGIC {
            return Err(UnsupportedWidthError(magic));
        }

        Ok(Self)
    }

    fn magic(self) -> u16 {
        PE64_MAGIC
    }

    fn ordinal_flag(self) -> u64 {
        Self::ORDINAL_FLAG
    }

    fn thunk_size(self) -> u32 {
        Self::THUNK_SIZE
    }

    fn optional_header_size(self) -> u64 {
        OptionalHeader64::SIZE
    }

    fn read_optional_header<M: Medium + ?Sized>(
        self,
        medium: &M,
        offset: u64,
    ) -> Result<Self::OptionalHeader, MediumError<M::Error>> {
        OptionalHeader64::decode(medium, offset)
    }

    fn read_address<M: Medium + ?Sized>(
        self,
        medium: &M,
        offset: u64,
    ) -> Result<Self::Address, MediumError<M::Error>> {
        u64::decode(medium, offset)
    }

    fn checked_virtual_address(self, image_base: u64, rva: u32) -> Option<u64> {
        image_base.checked_add(u64::from(rva))
    }
}

impl_optional_header!(OptionalHeader64, _header => None);
