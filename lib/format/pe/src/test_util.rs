//! Synthetic image construction for unit tests.

use alloc::vec::Vec;

use crate::{
    directory::{DirectoryId, NUMBER_OF_DIRECTORIES},
    header::{DOS_SIGNATURE, FileCharacteristics, Machine, PE_SIGNATURE, Subsystem},
    image::Image,
    util::u32_to_usize,
    width::{
        Width,
        width_32::{PE32_MAGIC, Pe32},
        width_64::{PE64_MAGIC, Pe64},
    },
};

/// Writes `value` in little endian at `offset`.
pub fn put_u16(buffer: &mut [u8], offset: usize, value: u16) {
    buffer[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Writes `value` in little endian at `offset`.
pub fn put_u32(buffer: &mut [u8], offset: usize, value: u32) {
    buffer[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Writes `value` in little endian at `offset`.
pub fn put_u64(buffer: &mut [u8], offset: usize, value: u64) {
    buffer[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Rounds `value` up to a multiple of `alignment`, wrapping on overflow.
fn round_up(value: u32, alignment: u32) -> u32 {
    if alignment == 0 {
        return value;
    }

    value.div_ceil(alignment).wrapping_mul(alignment)
}

/// A section to be laid out by [`ImageBuilder`].
#[derive(Clone, Debug)]
pub struct TestSection {
    /// The section name.
    name: [u8; 8],
    /// The virtual size.
    virtual_size: u32,
    /// The raw size.
    raw_size: u32,
    /// The raw bytes, padded or cut to `raw_size`.
    data: Vec<u8>,
    /// An explicit virtual address.
    address: Option<u32>,
}

impl TestSection {
    /// A zero filled section.
    pub fn new(name: [u8; 8], virtual_size: u32, raw_size: u32) -> Self {
        Self {
            name,
            virtual_size,
            raw_size,
            data: Vec::new(),
            address: None,
        }
    }

    /// Places `data` at the start of the raw bytes.
    pub fn data(mut self, data: &[u8]) -> Self {
        self.data = data.to_vec();
        self
    }

    /// Places the section at `virtual_address`. Later sections follow it.
    pub fn at(mut self, virtual_address: u32) -> Self {
        self.address = Some(virtual_address);
        self
    }
}

/// Lays out a PE image in memory.
///
/// Sections are assigned virtual addresses from `0x1000` onwards and raw data directly after the
/// headers, both contiguous. Header overrides only change the recorded fields, never the layout.
#[derive(Clone, Debug)]
pub struct ImageBuilder {
    /// The optional header magic to lay out.
    magic: u16,
    /// The magic recorded in the optional header.
    recorded_magic: Option<u16>,
    /// The offset of the NT headers.
    lfanew: u32,
    /// The file characteristics.
    characteristics: FileCharacteristics,
    /// The subsystem.
    subsystem: Subsystem,
    /// The preferred load address.
    image_base: u64,
    /// The section alignment.
    section_alignment: u32,
    /// The file alignment.
    file_alignment: u32,
    /// The recorded size of the image.
    size_of_image: Option<u32>,
    /// The recorded size of the headers.
    size_of_headers: Option<u32>,
    /// The recorded number of sections.
    number_of_sections: Option<u16>,
    /// The recorded number of data directories.
    directory_count: u32,
    /// Data directories as `(id, rva, size)`.
    directories: Vec<(DirectoryId, u32, u32)>,
    /// The sections in table order.
    sections: Vec<TestSection>,
    /// Bytes appended after the last section.
    overlay: Vec<u8>,
}

impl ImageBuilder {
    /// Starts a PE32 image.
    pub fn pe32() -> Self {
        Self::new(PE32_MAGIC, 0x0040_0000)
    }

    /// Starts a PE32+ image.
    pub fn pe64() -> Self {
        Self::new(PE64_MAGIC, 0x1_4000_0000)
    }

    /// Starts an image of the width named by `magic`.
    fn new(magic: u16, image_base: u64) -> Self {
        Self {
            magic,
            recorded_magic: None,
            lfanew: 0x80,
            characteristics: FileCharacteristics::EXECUTABLE_IMAGE,
            subsystem: Subsystem::WINDOWS_GUI,
            image_base,
            section_alignment: 0x1000,
            file_alignment: 0x200,
            size_of_image: None,
            size_of_headers: None,
            number_of_sections: None,
            directory_count: NUMBER_OF_DIRECTORIES,
            directories: Vec::new(),
            sections: Vec::new(),
            overlay: Vec::new(),
        }
    }

    /// Records `magic` in the optional header without changing the layout.
    pub fn magic(mut self, magic: u16) -> Self {
        self.recorded_magic = Some(magic);
        self
    }

    /// Places the NT headers at `lfanew`.
    pub fn lfanew(mut self, lfanew: u32) -> Self {
        self.lfanew = lfanew;
        self
    }

    /// Sets the file characteristics.
    pub fn characteristics(mut self, characteristics: FileCharacteristics) -> Self {
        self.characteristics = characteristics;
        self
    }

    /// Sets the subsystem.
    pub fn subsystem(mut self, subsystem: Subsystem) -> Self {
        self.subsystem = subsystem;
        self
    }

    /// Sets the preferred load address.
    pub fn image_base(mut self, image_base: u64) -> Self {
        self.image_base = image_base;
        self
    }

    /// Sets the section alignment.
    pub fn section_alignment(mut self, alignment: u32) -> Self {
        self.section_alignment = alignment;
        self
    }

    /// Sets the file alignment.
    pub fn file_alignment(mut self, alignment: u32) -> Self {
        self.file_alignment = alignment;
        self
    }

    /// Records `size` as the size of the image.
    pub fn size_of_image(mut self, size: u32) -> Self {
        self.size_of_image = Some(size);
        self
    }

    /// Records `size` as the size of the headers.
    pub fn size_of_headers(mut self, size: u32) -> Self {
        self.size_of_headers = Some(size);
        self
    }

    /// Records `count` as the number of sections.
    pub fn number_of_sections(mut self, count: u16) -> Self {
        self.number_of_sections = Some(count);
        self
    }

    /// Records `count` as the number of data directories.
    pub fn directory_count(mut self, count: u32) -> Self {
        self.directory_count = count;
        self
    }

    /// Sets the data directory `id`.
    pub fn directory(mut self, id: DirectoryId, rva: u32, size: u32) -> Self {
        self.directories.push((id, rva, size));
        self
    }

    /// Appends a section.
    pub fn section(mut self, section: TestSection) -> Self {
        self.sections.push(section);
        self
    }

    /// Appends `data` after the last section.
    pub fn overlay(mut self, data: &[u8]) -> Self {
        self.overlay.extend_from_slice(data);
        self
    }

    /// Lays out the image.
    pub fn build(self) -> Vec<u8> {
        let wide = self.magic == PE64_MAGIC;
        let (fixed_size, machine) = if wide {
            (Pe64.optional_header_size(), Machine::AMD64)
        } else {
            (Pe32.optional_header_size(), Machine::I386)
        };
        let fixed_size = u32::try_from(fixed_size).unwrap();
        let optional_size = fixed_size + NUMBER_OF_DIRECTORIES * 8;

        let nt = self.lfanew;
        let file_header = nt + 4;
        let optional = file_header + 20;
        let table = optional + optional_size;
        let section_count = u32::try_from(self.sections.len()).unwrap();
        let table_end = table + section_count * 40;
        let headers_end = round_up(table_end, self.file_alignment).max(table_end);

        let mut headers = Vec::new();
        let mut next_address = round_up(headers_end, self.section_alignment);
        let mut next_pointer = headers_end;
        for section in &self.sections {
            let address = section.address.unwrap_or(next_address);
            let extent = if section.virtual_size == 0 {
                section.raw_size
            } else {
                section.virtual_size
            };
            next_address = address.wrapping_add(round_up(extent, self.section_alignment));

            let pointer = if section.raw_size == 0 { 0 } else { next_pointer };
            next_pointer = next_pointer.wrapping_add(round_up(section.raw_size, self.file_alignment));

            headers.push((address, pointer));
        }

        let mut bytes = alloc::vec![0u8; u32_to_usize(next_pointer)];
        put_u16(&mut bytes, 0, DOS_SIGNATURE);
        put_u32(&mut bytes, 0x3C, self.lfanew);
        for (index, byte) in bytes[0x40..u32_to_usize(nt)].iter_mut().enumerate() {
            *byte = u8::try_from(index % 0x100).unwrap();
        }

        let nt = u32_to_usize(nt);
        put_u32(&mut bytes, nt, PE_SIGNATURE);

        let file_header = u32_to_usize(file_header);
        put_u16(&mut bytes, file_header, machine.0);
        put_u16(
            &mut bytes,
            file_header + 2,
            self.number_of_sections
                .unwrap_or(u16::try_from(section_count).unwrap()),
        );
        put_u16(
            &mut bytes,
            file_header + 16,
            u16::try_from(optional_size).unwrap(),
        );
        put_u16(&mut bytes, file_header + 18, self.characteristics.0);

        let size_of_image = self.size_of_image.unwrap_or(if self.sections.is_empty() {
            round_up(headers_end, self.section_alignment)
        } else {
            next_address
        });

        let optional = u32_to_usize(optional);
        put_u16(&mut bytes, optional, self.recorded_magic.unwrap_or(self.magic));
        if wide {
            put_u64(&mut bytes, optional + 24, self.image_base);
        } else {
            put_u32(
                &mut bytes,
                optional + 28,
                u32::try_from(self.image_base).unwrap(),
            );
        }
        put_u32(&mut bytes, optional + 32, self.section_alignment);
        put_u32(&mut bytes, optional + 36, self.file_alignment);
        put_u32(&mut bytes, optional + 56, size_of_image);
        put_u32(
            &mut bytes,
            optional + 60,
            self.size_of_headers.unwrap_or(headers_end),
        );
        put_u16(&mut bytes, optional + 68, self.subsystem.0);

        let fixed_size = u32_to_usize(fixed_size);
        put_u32(&mut bytes, optional + fixed_size - 4, self.directory_count);
        for (id, rva, size) in &self.directories {
            let slot = optional + fixed_size + u32_to_usize(id.0) * 8;
            put_u32(&mut bytes, slot, *rva);
            put_u32(&mut bytes, slot + 4, *size);
        }

        let mut entry = u32_to_usize(table);
        for (section, (address, pointer)) in self.sections.iter().zip(headers) {
            bytes[entry..entry + 8].copy_from_slice(&section.name);
            put_u32(&mut bytes, entry + 8, section.virtual_size);
            put_u32(&mut bytes, entry + 12, address);
            put_u32(&mut bytes, entry + 16, section.raw_size);
            put_u32(&mut bytes, entry + 20, pointer);
            put_u32(&mut bytes, entry + 36, 0xC000_0040);

            let start = u32_to_usize(pointer);
            let length = section.data.len().min(u32_to_usize(section.raw_size));
            bytes[start..start + length].copy_from_slice(&section.data[..length]);
            entry += 40;
        }

        bytes.extend_from_slice(&self.overlay);
        bytes
    }

    /// Loads `bytes` with default options, panicking on failure.
    pub fn parse<W: Width>(bytes: &[u8], width: W) -> Image<W> {
        Image::parse(bytes, width).unwrap()
    }
}
