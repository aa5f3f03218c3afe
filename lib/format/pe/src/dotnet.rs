//! Reading of the CLR runtime header of managed images.

use crate::{
    directory::DirectoryId,
    error::PeError,
    header::flags,
    image::Image,
    raw::{Clr20Header, DataDirectory},
    section::SectionDataKind,
    width::Width,
};

flags! {
    /// Attributes of a managed image recorded in the CLR runtime header.
    ClrFlags(u32) {
        /// The image contains only IL code.
        ILONLY = 0x0000_0001,
        /// The image can only be loaded into a 32-bit process.
        REQUIRED_32BIT = 0x0000_0002,
        /// The image is an IL library.
        IL_LIBRARY = 0x0000_0004,
        /// The image has a strong name signature.
        STRONG_NAME_SIGNED = 0x0000_0008,
        /// The entry point is a native RVA rather than a managed token.
        NATIVE_ENTRYPOINT = 0x0000_0010,
        /// The loader and JIT track debug data.
        TRACK_DEBUG_DATA = 0x0001_0000,
    }
}

/// The decoded CLR runtime header of a managed image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DotNetHeader {
    /// The raw header.
    header: Clr20Header,
}

impl DotNetHeader {
    /// Returns the raw header.
    pub fn raw(&self) -> &Clr20Header {
        &self.header
    }

    /// The size of the header as recorded in the header.
    pub fn size(&self) -> u32 {
        self.header.cb
    }

    /// The minimum runtime version required, as `(major, minor)`.
    pub fn runtime_version(&self) -> (u16, u16) {
        (
            self.header.major_runtime_version,
            self.header.minor_runtime_version,
        )
    }

    /// The metadata directory.
    pub fn metadata(&self) -> DataDirectory {
        self.header.metadata
    }

    /// The runtime flags.
    pub fn flags(&self) -> ClrFlags {
        ClrFlags(self.header.flags)
    }

    /// The managed entry point token, or the native entry point RVA if
    /// [`DotNetHeader::is_native_entry_point()`].
    pub fn entry_point_token_or_rva(&self) -> u32 {
        self.header.entry_point_token
    }

    /// The managed resources directory.
    pub fn resources(&self) -> DataDirectory {
        self.header.resources
    }

    /// The strong name signature directory.
    pub fn strong_name_signature(&self) -> DataDirectory {
        self.header.strong_name_signature
    }

    /// The code manager table directory.
    pub fn code_manager_table(&self) -> DataDirectory {
        self.header.code_manager_table
    }

    /// The v-table fixups directory.
    pub fn vtable_fixups(&self) -> DataDirectory {
        self.header.vtable_fixups
    }

    /// The export address table jumps directory.
    pub fn export_address_table_jumps(&self) -> DataDirectory {
        self.header.export_address_table_jumps
    }

    /// The managed native header directory.
    pub fn managed_native_header(&self) -> DataDirectory {
        self.header.managed_native_header
    }

    /// Returns `true` if the image contains only IL code.
    pub fn is_il_only(&self) -> bool {
        self.flags().contains(ClrFlags::ILONLY)
    }

    /// Returns `true` if the image must run in a 32-bit process.
    pub fn is_32bit_required(&self) -> bool {
        self.flags().contains(ClrFlags::REQUIRED_32BIT)
    }

    /// Returns `true` if the image is an IL library.
    pub fn is_il_library(&self) -> bool {
        self.flags().contains(ClrFlags::IL_LIBRARY)
    }

    /// Returns `true` if the image carries a strong name signature.
    pub fn is_strong_name_signed(&self) -> bool {
        self.flags().contains(ClrFlags::STRONG_NAME_SIGNED)
    }

    /// Returns `true` if the entry point is native.
    pub fn is_native_entry_point(&self) -> bool {
        self.flags().contains(ClrFlags::NATIVE_ENTRYPOINT)
    }

    /// Returns `true` if debug data is tracked.
    pub fn tracks_debug_data(&self) -> bool {
        self.flags().contains(ClrFlags::TRACK_DEBUG_DATA)
    }
}

impl<W: Width> Image<W> {
    /// Reads the CLR runtime header.
    ///
    /// # Errors
    ///
    /// - [`PeError::ImageDoesNotHaveManagedCode`]: The image has no COM descriptor directory.
    /// - [`PeError::RvaNotFound`] or [`PeError::RvaDoesNotExist`]: The header does not fit
    ///   inside the image.
    pub fn dot_net_header(&self) -> Result<DotNetHeader, PeError> {
        if !self.is_dot_net() {
            return Err(PeError::ImageDoesNotHaveManagedCode);
        }

        let rva = self.directory_rva(DirectoryId::COM_DESCRIPTOR)?;
        let header = self.read_at(rva, SectionDataKind::Virtual, true)?;
        Ok(DotNetHeader { header })
    }
}

#[cfg(test)]
mod test {
    use crate::{
        directory::DirectoryId,
        error::PeError,
        image::Image,
        test_util::{ImageBuilder, TestSection, put_u16, put_u32},
        width::Pe32,
    };

    #[test]
    fn reads_clr_header() {
        let mut text = [0u8; 0x200];
        put_u32(&mut text, 0x08, 72);
        put_u16(&mut text, 0x0C, 2);
        put_u16(&mut text, 0x0E, 5);
        put_u32(&mut text, 0x10, 0x1100);
        put_u32(&mut text, 0x14, 0x80);
        put_u32(&mut text, 0x18, 0x0000_0009);
        put_u32(&mut text, 0x1C, 0x0600_0001);

        let bytes = ImageBuilder::pe32()
            .section(TestSection::new(*b".text\0\0\0", 0x1000, 0x200).data(&text))
            .directory(DirectoryId::COM_DESCRIPTOR, 0x1008, 72)
            .build();
        let image = Image::parse(&bytes[..], Pe32).unwrap();
        assert!(image.is_dot_net());

        let header = image.dot_net_header().unwrap();
        assert_eq!(header.size(), 72);
        assert_eq!(header.runtime_version(), (2, 5));
        assert_eq!(header.metadata().virtual_address, 0x1100);
        assert_eq!(header.metadata().size, 0x80);
        assert!(header.is_il_only());
        assert!(header.is_strong_name_signed());
        assert!(!header.is_32bit_required());
        assert!(!header.is_native_entry_point());
        assert_eq!(header.entry_point_token_or_rva(), 0x0600_0001);
    }

    #[test]
    fn native_images_have_no_clr_header() {
        let bytes = ImageBuilder::pe32()
            .section(TestSection::new(*b".text\0\0\0", 0x1000, 0x200))
            .build();
        let image = Image::parse(&bytes[..], Pe32).unwrap();

        assert_eq!(
            image.dot_net_header(),
            Err(PeError::ImageDoesNotHaveManagedCode)
        );
    }
}
