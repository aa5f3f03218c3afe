//! Width generic ownership of the NT headers.

use crate::{
    directory::{DirectoryId, NUMBER_OF_DIRECTORIES},
    error::PeError,
    header::{DllCharacteristics, FileCharacteristics, Machine, Subsystem},
    raw::{DataDirectory, FileHeader},
    util::u32_to_usize,
    width::{OptionalHeader, Width},
};

/// The decoded NT headers of an image: signature, COFF file header, the fixed part of the
/// optional header and the data directory array.
///
/// All header getters and setters of an [`Image`][crate::image::Image] delegate here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Properties<W: Width> {
    /// The [`Width`] used to decode the optional header.
    width: W,
    /// The `PE\0\0` signature.
    signature: u32,
    /// The COFF file header.
    file_header: FileHeader,
    /// The fixed part of the optional header.
    optional_header: W::OptionalHeader,
    /// The data directory slots. Slots at or past `number_of_rva_and_sizes` are ignored.
    data_directories: [DataDirectory; 16],
}

#[expect(clippy::missing_errors_doc)]
impl<W: Width> Properties<W> {
    /// Assembles [`Properties`] from decoded headers.
    pub fn new(
        width: W,
        signature: u32,
        file_header: FileHeader,
        optional_header: W::OptionalHeader,
        data_directories: [DataDirectory; 16],
    ) -> Self {
        Self {
            width,
            signature,
            file_header,
            optional_header,
            data_directories,
        }
    }

    /// Returns the [`Width`] of the image.
    pub fn width(&self) -> W {
        self.width
    }

    /// Returns the COFF file header.
    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    /// Returns the fixed part of the optional header.
    pub fn optional_header(&self) -> &W::OptionalHeader {
        &self.optional_header
    }

    /// Returns every data directory slot, including those past `number_of_rva_and_sizes`.
    pub fn data_directories(&self) -> &[DataDirectory; 16] {
        &self.data_directories
    }

    /// Returns `true` if the directory `id` is declared and has a non-zero RVA.
    pub fn directory_exists(&self, id: DirectoryId) -> bool {
        id.0 < self.number_of_rva_and_sizes()
            && self
                .data_directories
                .get(u32_to_usize(id.0))
                .is_some_and(|directory| directory.virtual_address != 0)
    }

    /// Returns the data directory `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PeError::DirectoryNotFound`] if the directory does not exist.
    pub fn directory(&self, id: DirectoryId) -> Result<DataDirectory, PeError> {
        if !self.directory_exists(id) {
            return Err(PeError::DirectoryNotFound);
        }

        self.data_directories
            .get(u32_to_usize(id.0))
            .copied()
            .ok_or(PeError::DirectoryNotFound)
    }

    /// Returns the RVA of the data directory `id`.
    pub fn directory_rva(&self, id: DirectoryId) -> Result<u32, PeError> {
        self.directory(id).map(|directory| directory.virtual_address)
    }

    /// Returns the size of the data directory `id`.
    pub fn directory_size(&self, id: DirectoryId) -> Result<u32, PeError> {
        self.directory(id).map(|directory| directory.size)
    }

    /// Converts the virtual address `va` into an RVA.
    ///
    /// # Errors
    ///
    /// Returns [`PeError::InvalidAddressConversion`] if `bound_check` is set and `va` lies below
    /// the image base or more than 4 GiB above it.
    pub fn va_to_rva(&self, va: u64, bound_check: bool) -> Result<u32, PeError> {
        let difference = va.wrapping_sub(self.image_base());
        if bound_check && difference > u64::from(u32::MAX) {
            return Err(PeError::InvalidAddressConversion);
        }

        #[expect(
            clippy::cast_possible_truncation,
            reason = "unchecked conversions keep the low 32 bits"
        )]
        let rva = difference as u32;
        Ok(rva)
    }

    /// Converts `rva` into a virtual address.
    ///
    /// # Errors
    ///
    /// Returns [`PeError::InvalidAddressConversion`] if the virtual address is not representable
    /// by the image's [`Width`].
    pub fn rva_to_va(&self, rva: u32) -> Result<u64, PeError> {
        self.width
            .checked_virtual_address(self.image_base(), rva)
            .ok_or(PeError::InvalidAddressConversion)
    }

    /// The `PE\0\0` signature.
    pub fn signature(&self) -> u32 {
        self.signature
    }

    /// The optional header magic.
    pub fn magic(&self) -> u16 {
        self.optional_header.magic()
    }

    /// The optional header magic expected for the image's [`Width`].
    pub fn expected_magic(&self) -> u16 {
        self.width.magic()
    }

    /// The flag that marks an import thunk as an ordinal import.
    pub fn ordinal_flag(&self) -> u64 {
        self.width.ordinal_flag()
    }

    /// The size, in bytes, of an import thunk.
    pub fn thunk_size(&self) -> u32 {
        self.width.thunk_size()
    }

    /// The targeted machine.
    pub fn machine(&self) -> Machine {
        Machine(self.file_header.machine)
    }

    /// The number of entries in the section table.
    pub fn number_of_sections(&self) -> u16 {
        self.file_header.number_of_sections
    }

    /// The link time stamp.
    pub fn time_date_stamp(&self) -> u32 {
        self.file_header.time_date_stamp
    }

    /// The size of the optional header, including the data directories.
    pub fn size_of_optional_header(&self) -> u16 {
        self.file_header.optional_header_size
    }

    /// The COFF characteristics.
    pub fn characteristics(&self) -> FileCharacteristics {
        FileCharacteristics(self.file_header.characteristics)
    }

    /// The `(major, minor)` linker version.
    pub fn linker_version(&self) -> (u8, u8) {
        self.optional_header.linker_version()
    }

    /// The combined size of all code sections.
    pub fn size_of_code(&self) -> u32 {
        self.optional_header.size_of_code()
    }

    /// The combined size of all initialized data sections.
    pub fn size_of_initialized_data(&self) -> u32 {
        self.optional_header.size_of_initialized_data()
    }

    /// The combined size of all uninitialized data sections.
    pub fn size_of_uninitialized_data(&self) -> u32 {
        self.optional_header.size_of_uninitialized_data()
    }

    /// The RVA of the entry point.
    pub fn entry_point(&self) -> u32 {
        self.optional_header.entry_point()
    }

    /// Sets the RVA of the entry point.
    pub fn set_entry_point(&mut self, entry_point: u32) {
        self.optional_header.set_entry_point(entry_point);
    }

    /// The RVA of the start of the code section.
    pub fn base_of_code(&self) -> u32 {
        self.optional_header.base_of_code()
    }

    /// The RVA of the start of the data section, recorded by PE32 images only.
    pub fn base_of_data(&self) -> Option<u32> {
        self.optional_header.base_of_data()
    }

    /// The preferred load address.
    pub fn image_base(&self) -> u64 {
        self.optional_header.image_base()
    }

    /// The in-memory alignment of sections.
    pub fn section_alignment(&self) -> u32 {
        self.optional_header.section_alignment()
    }

    /// The on-disk alignment of section raw data.
    pub fn file_alignment(&self) -> u32 {
        self.optional_header.file_alignment()
    }

    /// The size of the loaded image.
    pub fn size_of_image(&self) -> u32 {
        self.optional_header.size_of_image()
    }

    /// The combined size of the headers.
    pub fn size_of_headers(&self) -> u32 {
        self.optional_header.size_of_headers()
    }

    /// The image checksum.
    pub fn checksum(&self) -> u32 {
        self.optional_header.checksum()
    }

    /// Sets the image checksum.
    pub fn set_checksum(&mut self, checksum: u32) {
        self.optional_header.set_checksum(checksum);
    }

    /// The required subsystem.
    pub fn subsystem(&self) -> Subsystem {
        Subsystem(self.optional_header.subsystem())
    }

    /// Sets the required subsystem.
    pub fn set_subsystem(&mut self, subsystem: Subsystem) {
        self.optional_header.set_subsystem(subsystem.0);
    }

    /// The loader attributes.
    pub fn dll_characteristics(&self) -> DllCharacteristics {
        DllCharacteristics(self.optional_header.dll_characteristics())
    }

    /// The `(major, minor)` required operating system version.
    pub fn operating_system_version(&self) -> (u16, u16) {
        self.optional_header.operating_system_version()
    }

    /// The `(major, minor)` subsystem version.
    pub fn subsystem_version(&self) -> (u16, u16) {
        self.optional_header.subsystem_version()
    }

    /// The `(major, minor)` image version.
    pub fn image_version(&self) -> (u16, u16) {
        self.optional_header.image_version()
    }

    /// The reserved Win32 version value.
    pub fn win32_version_value(&self) -> u32 {
        self.optional_header.win32_version_value()
    }

    /// The reserved loader flags.
    pub fn loader_flags(&self) -> u32 {
        self.optional_header.loader_flags()
    }

    /// The stack reservation size.
    pub fn size_of_stack_reserve(&self) -> u64 {
        self.optional_header.size_of_stack_reserve()
    }

    /// The initial stack commit size.
    pub fn size_of_stack_commit(&self) -> u64 {
        self.optional_header.size_of_stack_commit()
    }

    /// The heap reservation size.
    pub fn size_of_heap_reserve(&self) -> u64 {
        self.optional_header.size_of_heap_reserve()
    }

    /// The initial heap commit size.
    pub fn size_of_heap_commit(&self) -> u64 {
        self.optional_header.size_of_heap_commit()
    }

    /// The number of declared data directories.
    pub fn number_of_rva_and_sizes(&self) -> u32 {
        self.optional_header.number_of_rva_and_sizes()
    }

    /// Sets the number of declared data directories, clamped to the 16 available slots.
    pub fn set_number_of_rva_and_sizes(&mut self, count: u32) {
        self.optional_header
            .set_number_of_rva_and_sizes(count.min(NUMBER_OF_DIRECTORIES));
    }
}

#[cfg(test)]
mod test {
    use super::Properties;
    use crate::{
        directory::DirectoryId,
        error::PeError,
        header::Subsystem,
        raw::{DataDirectory, FileHeader, OptionalHeader32, OptionalHeader64},
        width::{Pe32, Pe64},
    };

    fn pe32(image_base: u32, count: u32) -> Properties<Pe32> {
        let mut directories = [DataDirectory::default(); 16];
        directories[0] = DataDirectory {
            virtual_address: 0x2000,
            size: 0x100,
        };
        directories[3] = DataDirectory {
            virtual_address: 0x5000,
            size: 0x10,
        };

        Properties::new(
            Pe32,
            0x4550,
            FileHeader::default(),
            OptionalHeader32 {
                magic: 0x010B,
                image_base,
                number_of_rva_and_sizes: count,
                ..OptionalHeader32::default()
            },
            directories,
        )
    }

    fn pe64(image_base: u64) -> Properties<Pe64> {
        Properties::new(
            Pe64,
            0x4550,
            FileHeader::default(),
            OptionalHeader64 {
                magic: 0x020B,
                image_base,
                number_of_rva_and_sizes: 16,
                ..OptionalHeader64::default()
            },
            [DataDirectory::default(); 16],
        )
    }

    #[test]
    fn directory_existence_respects_declared_count() {
        let properties = pe32(0x40_0000, 2);

        assert!(properties.directory_exists(DirectoryId::EXPORT));
        assert!(!properties.directory_exists(DirectoryId::IMPORT));
        // Slot 3 holds stale data past the declared count.
        assert!(!properties.directory_exists(DirectoryId::EXCEPTION));
        assert_eq!(
            properties.directory_rva(DirectoryId::EXCEPTION),
            Err(PeError::DirectoryNotFound)
        );
        assert_eq!(properties.directory_rva(DirectoryId::EXPORT), Ok(0x2000));
        assert_eq!(properties.directory_size(DirectoryId::EXPORT), Ok(0x100));
    }

    #[test]
    fn out_of_range_directory_ids() {
        let properties = pe32(0x40_0000, 16);

        assert!(properties.directory_exists(DirectoryId::EXCEPTION));
        assert!(!properties.directory_exists(DirectoryId(16)));
        assert!(!properties.directory_exists(DirectoryId(u32::MAX)));
    }

    #[test]
    fn directory_count_setter_clamps() {
        let mut properties = pe32(0x40_0000, 16);

        properties.set_number_of_rva_and_sizes(100);
        assert_eq!(properties.number_of_rva_and_sizes(), 16);

        properties.set_number_of_rva_and_sizes(0);
        assert!(!properties.directory_exists(DirectoryId::EXPORT));
    }

    #[test]
    fn va_to_rva_bounds() {
        let properties = pe32(0x40_0000, 16);

        assert_eq!(properties.va_to_rva(0x40_1000, true), Ok(0x1000));
        assert_eq!(
            properties.va_to_rva(0x3F_F000, true),
            Err(PeError::InvalidAddressConversion)
        );
        assert_eq!(properties.va_to_rva(0x3F_F000, false), Ok(0xFFFF_F000));

        let properties = pe64(0x1_4000_0000);
        assert_eq!(properties.va_to_rva(0x1_4000_2000, true), Ok(0x2000));
        assert_eq!(
            properties.va_to_rva(0x2_4000_0000, true),
            Err(PeError::InvalidAddressConversion)
        );
    }

    #[test]
    fn rva_to_va_is_checked_for_both_widths() {
        assert_eq!(pe32(0x40_0000, 16).rva_to_va(0x1000), Ok(0x40_1000));
        assert_eq!(
            pe32(0xFFFF_0000, 16).rva_to_va(0x1_0000),
            Err(PeError::InvalidAddressConversion)
        );
        assert_eq!(pe64(0x1_4000_0000).rva_to_va(0x10), Ok(0x1_4000_0010));
        assert_eq!(
            pe64(u64::MAX).rva_to_va(1),
            Err(PeError::InvalidAddressConversion)
        );
    }

    #[test]
    fn setters_update_headers() {
        let mut properties = pe64(0x1_4000_0000);

        properties.set_entry_point(0x1500);
        properties.set_checksum(0xDEAD);
        properties.set_subsystem(Subsystem::WINDOWS_GUI);

        assert_eq!(properties.entry_point(), 0x1500);
        assert_eq!(properties.checksum(), 0xDEAD);
        assert_eq!(properties.subsystem(), Subsystem::WINDOWS_GUI);
        assert_eq!(properties.magic(), properties.expected_magic());
    }
}
