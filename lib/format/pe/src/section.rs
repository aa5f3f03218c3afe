//! Sections of a PE image and their raw and virtual data.

use alloc::vec::Vec;

use crate::{
    header::flags,
    medium::SectionView,
    raw::SectionHeader,
    util::{align_up, u32_to_usize, usize_to_u64},
};

flags! {
    /// Attributes of a section.
    SectionCharacteristics(u32) {
        /// The section contains executable code.
        CNT_CODE = 0x0000_0020,
        /// The section contains initialized data.
        CNT_INITIALIZED_DATA = 0x0000_0040,
        /// The section contains uninitialized data.
        CNT_UNINITIALIZED_DATA = 0x0000_0080,
        /// The section contains comments or other information.
        LNK_INFO = 0x0000_0200,
        /// The section will not become part of the image.
        LNK_REMOVE = 0x0000_0800,
        /// The section contains COMDAT data.
        LNK_COMDAT = 0x0000_1000,
        /// The section contains data referenced through the global pointer.
        GPREL = 0x0000_8000,
        /// The section contains extended relocations.
        LNK_NRELOC_OVFL = 0x0100_0000,
        /// The section can be discarded as needed.
        MEM_DISCARDABLE = 0x0200_0000,
        /// The section cannot be cached.
        MEM_NOT_CACHED = 0x0400_0000,
        /// The section is not pageable.
        MEM_NOT_PAGED = 0x0800_0000,
        /// The section can be shared in memory.
        MEM_SHARED = 0x1000_0000,
        /// The section can be executed as code.
        MEM_EXECUTE = 0x2000_0000,
        /// The section can be read.
        MEM_READ = 0x4000_0000,
        /// The section can be written to.
        MEM_WRITE = 0x8000_0000,
    }
}

/// Selects which form of a section's data an access operates on.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum SectionDataKind {
    /// The bytes stored in the file.
    #[default]
    Raw,
    /// The bytes as mapped by a loader, zero-extended to the aligned virtual size.
    Virtual,
}

/// The materialized form of a section's data.
#[derive(Clone, Debug, PartialEq, Eq)]
enum SectionData {
    /// Exactly the bytes stored in the file.
    Raw(Vec<u8>),
    /// The bytes stored in the file followed by zero padding.
    Virtual {
        /// The number of leading bytes that came from the file.
        original_length: usize,
        /// The file bytes and their padding.
        bytes: Vec<u8>,
    },
}

/// A single section: its header and the data read from the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    /// The section header.
    header: SectionHeader,
    /// The section data.
    data: SectionData,
}

impl Section {
    /// Creates a [`Section`] from its `header` and the `raw` bytes read from the file.
    pub fn new(header: SectionHeader, raw: Vec<u8>) -> Self {
        Self {
            header,
            data: SectionData::Raw(raw),
        }
    }

    /// Returns the section header.
    pub fn header(&self) -> &SectionHeader {
        &self.header
    }

    /// Returns the name up to, but excluding, its first zero byte.
    pub fn name(&self) -> &[u8] {
        let length = self
            .header
            .name
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(self.header.name.len());

        &self.header.name[..length]
    }

    /// Sets the name, truncating it or zero-padding it to 8 bytes.
    pub fn set_name(&mut self, name: &[u8]) {
        let length = name.len().min(self.header.name.len());

        self.header.name = [0; 8];
        self.header.name[..length].copy_from_slice(&name[..length]);
    }

    /// The size of the section when loaded.
    pub fn virtual_size(&self) -> u32 {
        self.header.virtual_size
    }

    /// Sets the size of the section when loaded.
    pub fn set_virtual_size(&mut self, virtual_size: u32) {
        self.header.virtual_size = virtual_size;
    }

    /// The RVA of the section.
    pub fn virtual_address(&self) -> u32 {
        self.header.virtual_address
    }

    /// Sets the RVA of the section.
    pub fn set_virtual_address(&mut self, virtual_address: u32) {
        self.header.virtual_address = virtual_address;
    }

    /// The size of the section data in the file.
    pub fn size_of_raw_data(&self) -> u32 {
        self.header.size_of_raw_data
    }

    /// Sets the size of the section data in the file.
    pub fn set_size_of_raw_data(&mut self, size: u32) {
        self.header.size_of_raw_data = size;
    }

    /// The file offset of the section data.
    pub fn pointer_to_raw_data(&self) -> u32 {
        self.header.pointer_to_raw_data
    }

    /// Sets the file offset of the section data.
    pub fn set_pointer_to_raw_data(&mut self, pointer: u32) {
        self.header.pointer_to_raw_data = pointer;
    }

    /// The section attributes.
    pub fn characteristics(&self) -> SectionCharacteristics {
        SectionCharacteristics(self.header.characteristics)
    }

    /// Sets the section attributes.
    pub fn set_characteristics(&mut self, characteristics: SectionCharacteristics) {
        self.header.characteristics = characteristics.0;
    }

    /// Sets or clears `flag` in the section attributes.
    fn set_flag(&mut self, flag: SectionCharacteristics, value: bool) {
        if value {
            self.header.characteristics |= flag.0;
        } else {
            self.header.characteristics &= !flag.0;
        }
    }

    /// Returns `true` if the section can be read.
    pub fn is_readable(&self) -> bool {
        self.characteristics()
            .contains(SectionCharacteristics::MEM_READ)
    }

    /// Marks the section as readable or not.
    pub fn set_readable(&mut self, readable: bool) {
        self.set_flag(SectionCharacteristics::MEM_READ, readable);
    }

    /// Returns `true` if the section can be written to.
    pub fn is_writable(&self) -> bool {
        self.characteristics()
            .contains(SectionCharacteristics::MEM_WRITE)
    }

    /// Marks the section as writable or not.
    pub fn set_writable(&mut self, writable: bool) {
        self.set_flag(SectionCharacteristics::MEM_WRITE, writable);
    }

    /// Returns `true` if the section can be executed.
    pub fn is_executable(&self) -> bool {
        self.characteristics()
            .contains(SectionCharacteristics::MEM_EXECUTE)
    }

    /// Marks the section as executable or not.
    pub fn set_executable(&mut self, executable: bool) {
        self.set_flag(SectionCharacteristics::MEM_EXECUTE, executable);
    }

    /// Returns `true` if the section can be shared.
    pub fn is_shared(&self) -> bool {
        self.characteristics()
            .contains(SectionCharacteristics::MEM_SHARED)
    }

    /// Marks the section as shared or not.
    pub fn set_shared(&mut self, shared: bool) {
        self.set_flag(SectionCharacteristics::MEM_SHARED, shared);
    }

    /// Returns `true` if the section can be discarded.
    pub fn is_discardable(&self) -> bool {
        self.characteristics()
            .contains(SectionCharacteristics::MEM_DISCARDABLE)
    }

    /// Marks the section as discardable or not.
    pub fn set_discardable(&mut self, discardable: bool) {
        self.set_flag(SectionCharacteristics::MEM_DISCARDABLE, discardable);
    }

    /// Returns `true` if the section contains code.
    pub fn contains_code(&self) -> bool {
        self.characteristics()
            .contains(SectionCharacteristics::CNT_CODE)
    }

    /// Returns `true` if the section contains initialized data.
    pub fn contains_initialized_data(&self) -> bool {
        self.characteristics()
            .contains(SectionCharacteristics::CNT_INITIALIZED_DATA)
    }

    /// Returns `true` if the section contains uninitialized data.
    pub fn contains_uninitialized_data(&self) -> bool {
        self.characteristics()
            .contains(SectionCharacteristics::CNT_UNINITIALIZED_DATA)
    }

    /// The virtual size rounded up to `section_alignment`.
    ///
    /// Sections with a zero virtual size but some raw data use the raw size instead.
    pub fn aligned_virtual_size(&self, section_alignment: u32) -> u32 {
        if self.header.virtual_size == 0 && self.header.size_of_raw_data != 0 {
            align_up(self.header.size_of_raw_data, section_alignment)
        } else {
            align_up(self.header.virtual_size, section_alignment)
        }
    }

    /// The raw size rounded up to `file_alignment`, or zero for sections without raw data.
    pub fn aligned_raw_size(&self, file_alignment: u32) -> u32 {
        if self.header.size_of_raw_data == 0 {
            0
        } else {
            align_up(self.header.size_of_raw_data, file_alignment)
        }
    }

    /// Returns `true` if `rva` falls inside the aligned virtual extent of the section.
    pub fn contains_rva(&self, rva: u32, section_alignment: u32) -> bool {
        let start = u64::from(self.header.virtual_address);
        let end = start + u64::from(self.aligned_virtual_size(section_alignment));

        (start..end).contains(&u64::from(rva))
    }

    /// Returns `true` if `offset` falls inside the raw data of the section.
    pub fn contains_file_offset(&self, offset: u32) -> bool {
        let start = u64::from(self.header.pointer_to_raw_data);
        let end = start + u64::from(self.header.size_of_raw_data);

        (start..end).contains(&u64::from(offset))
    }

    /// Returns `true` if no bytes were read from the file for this section.
    pub fn is_empty(&self) -> bool {
        self.file_bytes().is_empty()
    }

    /// Returns `true` if the data is currently held in its zero-extended form.
    pub fn is_virtual_mapped(&self) -> bool {
        matches!(self.data, SectionData::Virtual { .. })
    }

    /// Returns the bytes read from the file, regardless of the current form.
    fn file_bytes(&self) -> &[u8] {
        match &self.data {
            SectionData::Raw(bytes) => bytes,
            SectionData::Virtual {
                original_length,
                bytes,
            } => &bytes[..*original_length],
        }
    }

    /// Returns the bytes read from the file, collapsing a zero-extended form first.
    pub fn raw_data(&mut self) -> &[u8] {
        if let SectionData::Virtual {
            original_length,
            bytes,
        } = &mut self.data
        {
            let mut bytes = core::mem::take(bytes);
            bytes.truncate(*original_length);
            self.data = SectionData::Raw(bytes);
        }

        self.file_bytes()
    }

    /// Returns the bytes zero-extended to [`Section::aligned_virtual_size()`].
    ///
    /// Calling this repeatedly with the same alignment does not pad again.
    pub fn virtual_data(&mut self, section_alignment: u32) -> &[u8] {
        let target = u32_to_usize(self.aligned_virtual_size(section_alignment));
        let mut bytes = match core::mem::replace(&mut self.data, SectionData::Raw(Vec::new())) {
            SectionData::Raw(bytes) => bytes,
            SectionData::Virtual {
                original_length,
                mut bytes,
            } => {
                bytes.truncate(original_length);
                bytes
            }
        };

        let original_length = bytes.len();
        if target > original_length {
            bytes.resize(target, 0);
            self.data = SectionData::Virtual {
                original_length,
                bytes,
            };
        } else {
            self.data = SectionData::Raw(bytes);
        }

        match &self.data {
            SectionData::Raw(bytes) | SectionData::Virtual { bytes, .. } => bytes,
        }
    }

    /// Returns a borrowed view of the requested form without changing the stored form.
    pub fn view(&self, kind: SectionDataKind, section_alignment: u32) -> SectionView<'_> {
        match kind {
            SectionDataKind::Raw => SectionView::new(self.file_bytes()),
            SectionDataKind::Virtual => SectionView::zero_extended(
                self.file_bytes(),
                u64::from(self.aligned_virtual_size(section_alignment)),
            ),
        }
    }

    /// Returns the length of the requested form.
    pub fn data_length(&self, kind: SectionDataKind, section_alignment: u32) -> u64 {
        match kind {
            SectionDataKind::Raw => usize_to_u64(self.file_bytes().len()),
            SectionDataKind::Virtual => usize_to_u64(self.file_bytes().len())
                .max(u64::from(self.aligned_virtual_size(section_alignment))),
        }
    }
}

#[cfg(test)]
mod test {
    use alloc::{format, vec};

    use super::{Section, SectionCharacteristics, SectionDataKind};
    use crate::{medium::Medium, raw::SectionHeader};

    fn section(virtual_size: u32, raw: &[u8]) -> Section {
        let header = SectionHeader {
            name: *b".text\0\0\0",
            virtual_size,
            virtual_address: 0x1000,
            size_of_raw_data: u32::try_from(raw.len()).unwrap(),
            pointer_to_raw_data: 0x400,
            ..SectionHeader::default()
        };

        Section::new(header, raw.to_vec())
    }

    #[test]
    fn aligned_sizes() {
        let text = section(0x1234, &[0xCC; 0x300]);

        assert_eq!(text.aligned_virtual_size(0x1000), 0x2000);
        assert_eq!(text.aligned_raw_size(0x200), 0x400);

        let bss = section(0x10, &[]);
        assert_eq!(bss.aligned_raw_size(0x200), 0);

        let unsized_text = section(0, &[0xCC; 0x300]);
        assert_eq!(unsized_text.aligned_virtual_size(0x1000), 0x1000);
    }

    #[test]
    fn virtual_data_expands_once() {
        let mut text = section(0x20, &[1, 2, 3, 4]);

        assert_eq!(text.virtual_data(0x10).len(), 0x20);
        assert!(text.is_virtual_mapped());
        assert_eq!(text.virtual_data(0x10).len(), 0x20);
        assert_eq!(&text.virtual_data(0x10)[..6], &[1, 2, 3, 4, 0, 0]);
        assert!(!text.is_empty());
    }

    #[test]
    fn raw_data_collapses_virtual_form() {
        let mut text = section(0x20, &[1, 2, 3, 4]);

        text.virtual_data(0x10);
        assert_eq!(text.raw_data(), &[1, 2, 3, 4]);
        assert!(!text.is_virtual_mapped());
    }

    #[test]
    fn switching_alignment_re_expands_from_raw() {
        let mut text = section(0x20, &[1, 2, 3, 4]);

        assert_eq!(text.virtual_data(0x100).len(), 0x100);
        assert_eq!(text.virtual_data(0x10).len(), 0x20);
        assert_eq!(text.raw_data().len(), 4);
    }

    #[test]
    fn empty_reports_file_bytes() {
        let mut bss = section(0x100, &[]);

        assert!(bss.is_empty());
        bss.virtual_data(0x100);
        assert!(bss.is_empty());
        assert_eq!(bss.virtual_data(0x100), vec![0u8; 0x100].as_slice());
    }

    #[test]
    fn views_do_not_mutate() {
        let text = section(0x20, &[1, 2, 3, 4]);
        let raw = text.view(SectionDataKind::Raw, 0x10);
        let mapped = text.view(SectionDataKind::Virtual, 0x10);

        assert_eq!(raw.size(), 4);
        assert_eq!(mapped.size(), 0x20);
        assert_eq!(mapped.read_byte(0x1F).unwrap(), 0);
        assert!(!text.is_virtual_mapped());
        assert_eq!(text.data_length(SectionDataKind::Virtual, 0x10), 0x20);
    }

    #[test]
    fn names_are_truncated_and_padded() {
        let mut text = section(0x10, &[]);

        assert_eq!(text.name(), b".text");
        text.set_name(b".averylongname");
        assert_eq!(text.name(), b".averylo");
        text.set_name(b"a");
        assert_eq!(text.header().name, *b"a\0\0\0\0\0\0\0");
    }

    #[test]
    fn characteristic_flags() {
        let mut text = section(0x10, &[]);

        text.set_characteristics(
            SectionCharacteristics::CNT_CODE | SectionCharacteristics::MEM_EXECUTE,
        );
        assert!(text.contains_code());
        assert!(text.is_executable());
        assert!(!text.is_readable());

        text.set_readable(true);
        text.set_executable(false);
        assert!(text.is_readable());
        assert!(!text.is_executable());
        assert!(!text.is_writable());
        assert!(!text.is_shared());
        assert!(!text.is_discardable());
    }

    #[test]
    fn rva_and_offset_containment() {
        let text = section(0x1234, &[0; 0x200]);

        assert!(text.contains_rva(0x1000, 0x1000));
        assert!(text.contains_rva(0x2FFF, 0x1000));
        assert!(!text.contains_rva(0x3000, 0x1000));
        assert!(text.contains_file_offset(0x400));
        assert!(text.contains_file_offset(0x5FF));
        assert!(!text.contains_file_offset(0x600));
    }

    #[test]
    fn high_flags_print_names() {
        let data = SectionCharacteristics::CNT_INITIALIZED_DATA
            | SectionCharacteristics::MEM_READ
            | SectionCharacteristics::MEM_WRITE;

        assert_eq!(
            format!("{data:?}"),
            "{CNT_INITIALIZED_DATA, MEM_READ, MEM_WRITE}"
        );
        assert_eq!(
            format!("{:?}", SectionCharacteristics(0x8000_0001)),
            "{MEM_WRITE, 0x1}"
        );
    }
}
