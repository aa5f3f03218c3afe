//! PE32 image parsing.

use crate::{
    decode::Decode,
    medium::{Medium, MediumError},
    raw::OptionalHeader32,
    width::{UnsupportedWidthError, Width, impl_optional_header},
};

/// The optional header magic of a PE32 image.
pub const PE32_MAGIC: u16 = 0x010B;

/// A zero-sized object offering methods for safe parsing of PE32 images.
#[derive(Clone, Copy, Hash, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pe32;

impl Pe32 {
    /// The flag that marks an import thunk as an ordinal import.
    pub const ORDINAL_FLAG: u32 = 0x8000_0000;
    /// The size, in bytes, of an import thunk.
    pub const THUNK_SIZE: u32 = 4;
}

impl Width for Pe32 {
    type Address = u32;
    type OptionalHeader = OptionalHeader32;

    fn from_magic(magic: u16) -> Result<Self, UnsupportedWidthError> {
        if magic != PE32_MAGIC {
            return Err(UnsupportedWidthError(magic));
        }

        Ok(Self)
    }

    fn magic(self) -> u16 {
        PE32_MAGIC
    }

    fn ordinal_flag(self) -> u64 {
        u64::from(Self::ORDINAL_FLAG)
    }

    fn thunk_size(self) -> u32 {
        Self::THUNK_SIZE
    }

    fn optional_header_size(self) -> u64 {
        OptionalHeader32::SIZE
    }

    fn read_optional_header<M: Medium + ?Sized>(
        self,
        medium: &M,
        offset: u64,
    ) -> Result<Self::OptionalHeader, MediumError<M::Error>> {
        OptionalHeader32::decode(medium, offset)
    }

    fn read_address<M: Medium + ?Sized>(
        self,
        medium: &M,
        offset: u64,
    ) -> Result<Self::Address, MediumError<M::Error>> {
        u32::decode(medium, offset)
    }

    fn checked_virtual_address(self, image_base: u64, rva: u32) -> Option<u64> {
        u32::try_from(image_base)
            .ok()?
            .checked_add(rva)
            .map(u64::from)
    }
}

impl_optional_header!(OptionalHeader32, header => Some(header.base_of_data));

#[cfg(test)]
mod test {
    use super::{PE32_MAGIC, Pe32};
    use crate::width::{UnsupportedWidthError, Width};

    #[test]
    fn magic_selection() {
        assert_eq!(Pe32::from_magic(PE32_MAGIC), Ok(Pe32));
        assert_eq!(Pe32::from_magic(0x020B), Err(UnsupportedWidthError(0x020B)));
    }

    #[test]
    fn virtual_addresses_stay_in_32_bits() {
        assert_eq!(Pe32.checked_virtual_address(0x40_0000, 0x1000), Some(0x40_1000));
        assert_eq!(Pe32.checked_virtual_address(0xFFFF_0000, 0x1_0000), None);
        assert_eq!(Pe32.checked_virtual_address(0xFFFF_0000, 0xFFFF), Some(0xFFFF_FFFF));
    }
}
