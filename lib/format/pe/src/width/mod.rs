//! Width aware reading of the optional header.
//!
//! PE32 and PE32+ images share one operation set but differ in the layout of the optional
//! header and in the width of addresses, thunks and the import ordinal flag. A [`Width`]
//! selects between them, either statically ([`Pe32`], [`Pe64`]) or at runtime ([`AnyWidth`]).

use core::{error, fmt};

use crate::medium::{Medium, MediumError};

pub mod width_32;
pub mod width_64;
pub mod width_any;

pub use width_32::Pe32;
pub use width_64::Pe64;
pub use width_any::{AnyOptionalHeader, AnyWidth};

/// The base definitions of a width aware parser.
#[expect(
    clippy::missing_errors_doc,
    reason = "errors are documented in trait implementation"
)]
pub trait Width: Clone + Copy + fmt::Debug {
    /// An unsigned width sized integer.
    type Address: Copy + fmt::Debug + fmt::LowerHex + Eq + Ord + Into<u64>;
    /// The decoded fixed part of the optional header.
    type OptionalHeader: OptionalHeader + Clone + fmt::Debug + PartialEq + Eq;

    /// Returns the [`Width`] instance that corresponds with the given optional header `magic`.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedWidthError`] if `magic` is not supported by this [`Width`]
    /// implementation.
    fn from_magic(magic: u16) -> Result<Self, UnsupportedWidthError>;

    /// The optional header magic value expected for this [`Width`].
    fn magic(self) -> u16;

    /// The flag that marks an import thunk as an ordinal import.
    fn ordinal_flag(self) -> u64;

    /// The size, in bytes, of an import thunk.
    fn thunk_size(self) -> u32;

    /// The size, in bytes, of the fixed part of the optional header.
    fn optional_header_size(self) -> u64;

    /// Decodes the fixed part of the optional header at `offset` bytes into `medium`.
    fn read_optional_header<M: Medium + ?Sized>(
        self,
        medium: &M,
        offset: u64,
    ) -> Result<Self::OptionalHeader, MediumError<M::Error>>;

    /// Decodes a width sized address at `offset` bytes into `medium`.
    fn read_address<M: Medium + ?Sized>(
        self,
        medium: &M,
        offset: u64,
    ) -> Result<Self::Address, MediumError<M::Error>>;

    /// Returns `image_base + rva` if the sum is representable by this [`Width`].
    fn checked_virtual_address(self, image_base: u64, rva: u32) -> Option<u64>;
}

/// Width independent access to the fixed part of an optional header.
pub trait OptionalHeader {
    /// The magic value identifying the layout.
    fn magic(&self) -> u16;
    /// The `(major, minor)` linker version.
    fn linker_version(&self) -> (u8, u8);
    /// The combined size of all code sections.
    fn size_of_code(&self) -> u32;
    /// The combined size of all initialized data sections.
    fn size_of_initialized_data(&self) -> u32;
    /// The combined size of all uninitialized data sections.
    fn size_of_uninitialized_data(&self) -> u32;
    /// The RVA of the entry point.
    fn entry_point(&self) -> u32;
    /// Sets the RVA of the entry point.
    fn set_entry_point(&mut self, entry_point: u32);
    /// The RVA of the start of the code section.
    fn base_of_code(&self) -> u32;
    /// The RVA of the start of the data section, which only PE32 images record.
    fn base_of_data(&self) -> Option<u32>;
    /// The preferred load address.
    fn image_base(&self) -> u64;
    /// The in-memory alignment of sections.
    fn section_alignment(&self) -> u32;
    /// The on-disk alignment of section raw data.
    fn file_alignment(&self) -> u32;
    /// The `(major, minor)` required operating system version.
    fn operating_system_version(&self) -> (u16, u16);
    /// The `(major, minor)` image version.
    fn image_version(&self) -> (u16, u16);
    /// The `(major, minor)` subsystem version.
    fn subsystem_version(&self) -> (u16, u16);
    /// The reserved Win32 version value.
    fn win32_version_value(&self) -> u32;
    /// The size of the loaded image.
    fn size_of_image(&self) -> u32;
    /// The combined size of the headers, rounded to the file alignment.
    fn size_of_headers(&self) -> u32;
    /// The image checksum.
    fn checksum(&self) -> u32;
    /// Sets the image checksum.
    fn set_checksum(&mut self, checksum: u32);
    /// The required subsystem.
    fn subsystem(&self) -> u16;
    /// Sets the required subsystem.
    fn set_subsystem(&mut self, subsystem: u16);
    /// The loader attributes.
    fn dll_characteristics(&self) -> u16;
    /// The stack reservation size.
    fn size_of_stack_reserve(&self) -> u64;
    /// The initial stack commit size.
    fn size_of_stack_commit(&self) -> u64;
    /// The heap reservation size.
    fn size_of_heap_reserve(&self) -> u64;
    /// The initial heap commit size.
    fn size_of_heap_commit(&self) -> u64;
    /// The reserved loader flags.
    fn loader_flags(&self) -> u32;
    /// The number of data directory entries following the fixed part.
    fn number_of_rva_and_sizes(&self) -> u32;
    /// Sets the number of data directory entries following the fixed part.
    fn set_number_of_rva_and_sizes(&mut self, count: u32);
}

/// Implements [`OptionalHeader`] for a raw optional header whose field names follow the
/// shared layout.
macro_rules! impl_optional_header {
    ($ty:ty, $header:ident => $base_of_data:expr) => {
        impl $crate::width::OptionalHeader for $ty {
            fn magic(&self) -> u16 {
                self.magic
            }

            fn linker_version(&self) -> (u8, u8) {
                (self.linker_major_version, self.linker_minor_version)
            }

            fn size_of_code(&self) -> u32 {
                self.code_size
            }

            fn size_of_initialized_data(&self) -> u32 {
                self.initialized_data_size
            }

            fn size_of_uninitialized_data(&self) -> u32 {
                self.uninitialized_data_size
            }

            fn entry_point(&self) -> u32 {
                self.entry_point
            }

            fn set_entry_point(&mut self, entry_point: u32) {
                self.entry_point = entry_point;
            }

            fn base_of_code(&self) -> u32 {
                self.base_of_code
            }

            fn base_of_data(&self) -> Option<u32> {
                let $header = self;
                $base_of_data
            }

            fn image_base(&self) -> u64 {
                u64::from(self.image_base)
            }

            fn section_alignment(&self) -> u32 {
                self.section_alignment
            }

            fn file_alignment(&self) -> u32 {
                self.file_alignment
            }

            fn operating_system_version(&self) -> (u16, u16) {
                (
                    self.operating_system_major_version,
                    self.operating_system_minor_version,
                )
            }

            fn image_version(&self) -> (u16, u16) {
                (self.image_major_version, self.image_minor_version)
            }

            fn subsystem_version(&self) -> (u16, u16) {
                (self.subsystem_major_version, self.subsystem_minor_version)
            }

            fn win32_version_value(&self) -> u32 {
                self.win32_version_value
            }

            fn size_of_image(&self) -> u32 {
                self.image_size
            }

            fn size_of_headers(&self) -> u32 {
                self.header_size
            }

            fn checksum(&self) -> u32 {
                self.checksum
            }

            fn set_checksum(&mut self, checksum: u32) {
                self.checksum = checksum;
            }

            fn subsystem(&self) -> u16 {
                self.subsystem
            }

            fn set_subsystem(&mut self, subsystem: u16) {
                self.subsystem = subsystem;
            }

            fn dll_characteristics(&self) -> u16 {
                self.dll_characteristics
            }

            fn size_of_stack_reserve(&self) -> u64 {
                u64::from(self.size_of_stack_reserve)
            }

            fn size_of_stack_commit(&self) -> u64 {
                u64::from(self.size_of_stack_commit)
            }

            fn size_of_heap_reserve(&self) -> u64 {
                u64::from(self.size_of_heap_reserve)
            }

            fn size_of_heap_commit(&self) -> u64 {
                u64::from(self.size_of_heap_commit)
            }

            fn loader_flags(&self) -> u32 {
                self.loader_flags
            }

            fn number_of_rva_and_sizes(&self) -> u32 {
                self.number_of_rva_and_sizes
            }

            fn set_number_of_rva_and_sizes(&mut self, count: u32) {
                self.number_of_rva_and_sizes = count;
            }
        }
    };
}

pub(crate) use impl_optional_header;

/// An error that occurs when the code does not support a particular optional header magic.
#[derive(Clone, Copy, Hash, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnsupportedWidthError(pub u16);

impl fmt::Display for UnsupportedWidthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            width_32::PE32_MAGIC => write!(f, "PE32 image parsing not supported"),
            width_64::PE64_MAGIC => write!(f, "PE32+ image parsing not supported"),
            magic => write!(f, "unknown optional header magic({magic:#x}) not supported"),
        }
    }
}

impl error::Error for UnsupportedWidthError {}
