//! Validation and loading of an [`Image`] from a [`Medium`].

use alloc::{vec, vec::Vec};

use log::{debug, trace};

use crate::{
    debug::read_debug_entries,
    decode::Decode,
    directory::NUMBER_OF_DIRECTORIES,
    error::PeError,
    header::{DOS_SIGNATURE, PE_SIGNATURE, PE_SIGNATURE_SIZE},
    image::{Image, LoadOptions},
    medium::{Medium, MediumError, check_bounds},
    properties::Properties,
    raw::{DataDirectory, DosHeader, FileHeader, SectionHeader},
    section::Section,
    util::{
        MAXIMUM_NUMBER_OF_SECTIONS, MINIMUM_FILE_ALIGNMENT, TWO_GB, align_down, align_up,
        is_power_of_two, is_sum_safe, u32_to_usize,
    },
    width::{OptionalHeader, Width},
};

impl<W: Width> Image<W> {
    /// Loads and validates an image of the given `width` from `medium` with default
    /// [`LoadOptions`].
    ///
    /// # Errors
    ///
    /// Returns the [`PeError`] of the first validation step that fails.
    pub fn parse<M: Medium + ?Sized>(medium: &M, width: W) -> Result<Self, PeError> {
        Self::parse_with_options(medium, width, LoadOptions::default())
    }

    /// Loads and validates an image of the given `width` from `medium`.
    ///
    /// # Errors
    ///
    /// Returns the [`PeError`] of the first validation step that fails.
    pub fn parse_with_options<M: Medium + ?Sized>(
        medium: &M,
        width: W,
        options: LoadOptions,
    ) -> Result<Self, PeError> {
        let file_size = medium.size();

        let dos_header = read_dos_header(medium)?;
        let properties = read_nt_headers(medium, &dos_header, width)?;
        validate_properties(&properties)?;
        let dos_stub = read_dos_stub(medium, &dos_header)?;

        let (sections, raw_end) = read_sections(medium, &dos_header, &properties)?;
        validate_section_layout(&properties, &sections)?;

        let overlay_offset = raw_end.filter(|&end| file_size > end);
        if let Some(offset) = overlay_offset {
            debug!("overlay of {} bytes at {offset:#x}", file_size - offset);
        }

        let headers = read_headers(medium, &properties, &sections)?;

        let mut image = Self {
            dos_header,
            dos_stub,
            properties,
            sections,
            headers,
            overlay_offset,
            debug_entries: Vec::new(),
        };

        if options.read_debug_raw_data && image.has_debug() {
            image.debug_entries = read_debug_entries(&image, medium);
        }

        trace!(
            "loaded {:?} image with {} sections",
            image.width(),
            image.sections.len()
        );
        Ok(image)
    }
}

/// Reads the DOS header and checks its signature and the alignment of the NT header offset.
pub(crate) fn read_dos_header<M: Medium + ?Sized>(medium: &M) -> Result<DosHeader, PeError> {
    let dos_header = DosHeader::decode(medium, 0).map_err(|_| PeError::BadDosHeader)?;
    if dos_header.magic != DOS_SIGNATURE {
        return Err(PeError::IncorrectPeSignature);
    }
    if dos_header.lfanew % 4 != 0 {
        return Err(PeError::BadDosHeader);
    }

    Ok(dos_header)
}

/// The parts of the NT headers that identify an image without committing to a [`Width`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct NtPrefix {
    /// The `PE\0\0` signature.
    pub signature: u32,
    /// The COFF file header.
    pub file_header: FileHeader,
    /// The magic value at the start of the optional header.
    pub magic: u16,
}

/// Reads the signature, the COFF file header and the optional header magic at `lfanew`.
pub(crate) fn read_nt_prefix<M: Medium + ?Sized>(
    medium: &M,
    dos_header: &DosHeader,
) -> Result<NtPrefix, PeError> {
    let nt_offset = u64::from(dos_header.lfanew);
    if nt_offset > medium.size() {
        return Err(PeError::NtHeadersNotFound);
    }

    let file_header_offset = nt_offset + u64::from(PE_SIGNATURE_SIZE);
    let optional_header_offset = file_header_offset + FileHeader::SIZE;

    let signature = u32::decode(medium, nt_offset).map_err(|_| PeError::ErrorReadingNtHeaders)?;
    let file_header = FileHeader::decode(medium, file_header_offset)
        .map_err(|_| PeError::ErrorReadingNtHeaders)?;
    let magic = u16::decode(medium, optional_header_offset)
        .map_err(|_| PeError::ErrorReadingNtHeaders)?;

    Ok(NtPrefix {
        signature,
        file_header,
        magic,
    })
}

/// Reads the NT headers and the declared data directories.
fn read_nt_headers<M: Medium + ?Sized, W: Width>(
    medium: &M,
    dos_header: &DosHeader,
    width: W,
) -> Result<Properties<W>, PeError> {
    let NtPrefix {
        signature,
        file_header,
        ..
    } = read_nt_prefix(medium, dos_header)?;

    let optional_header_offset =
        u64::from(dos_header.lfanew) + u64::from(PE_SIGNATURE_SIZE) + FileHeader::SIZE;
    let mut optional_header = width
        .read_optional_header(medium, optional_header_offset)
        .map_err(|_| PeError::ErrorReadingNtHeaders)?;

    if signature != PE_SIGNATURE {
        return Err(PeError::IncorrectPeSignature);
    }

    let declared = optional_header.number_of_rva_and_sizes();
    if declared > NUMBER_OF_DIRECTORIES {
        debug!("clamping {declared} declared data directories to {NUMBER_OF_DIRECTORIES}");
        optional_header.set_number_of_rva_and_sizes(NUMBER_OF_DIRECTORIES);
    }

    let mut data_directories = [DataDirectory::default(); 16];
    let mut offset = optional_header_offset + width.optional_header_size();
    let count = u32_to_usize(optional_header.number_of_rva_and_sizes());
    for directory in data_directories.iter_mut().take(count) {
        *directory = DataDirectory::decode(medium, offset)
            .map_err(|_| PeError::ErrorReadingDataDirectories)?;
        offset += DataDirectory::SIZE;
    }

    Ok(Properties::new(
        width,
        signature,
        file_header,
        optional_header,
        data_directories,
    ))
}

/// Checks the section count, the optional header magic, the alignments and the image size.
fn validate_properties<W: Width>(properties: &Properties<W>) -> Result<(), PeError> {
    if properties.number_of_sections() > MAXIMUM_NUMBER_OF_SECTIONS {
        return Err(PeError::TooManySections);
    }

    if properties.magic() != properties.expected_magic() {
        return Err(PeError::IncorrectPeSignature);
    }

    let section_alignment = properties.section_alignment();
    let file_alignment = properties.file_alignment();
    if !is_power_of_two(section_alignment) {
        return Err(PeError::IncorrectSectionAlignment);
    }
    if !is_power_of_two(file_alignment) {
        return Err(PeError::IncorrectFileAlignment);
    }
    if file_alignment != section_alignment
        && (file_alignment < MINIMUM_FILE_ALIGNMENT || file_alignment > section_alignment)
    {
        return Err(PeError::IncorrectFileAlignment);
    }

    if align_up(properties.size_of_image(), section_alignment) == 0 {
        return Err(PeError::IncorrectSizeOfImage);
    }

    Ok(())
}

/// Reads the bytes between the DOS header and the NT headers.
fn read_dos_stub<M: Medium + ?Sized>(
    medium: &M,
    dos_header: &DosHeader,
) -> Result<Vec<u8>, PeError> {
    let start = DosHeader::SIZE;
    let end = u64::from(dos_header.lfanew);
    if end <= start {
        return Ok(Vec::new());
    }

    read_bytes(medium, start, end - start).map_err(|_| PeError::ErrorReadingDosOverlay)
}

/// Reads and validates every section header along with its raw data.
///
/// Also returns the furthest file offset reached by any section's raw data, as declared before
/// any clamping.
fn read_sections<M: Medium + ?Sized, W: Width>(
    medium: &M,
    dos_header: &DosHeader,
    properties: &Properties<W>,
) -> Result<(Vec<Section>, Option<u64>), PeError> {
    let file_size = medium.size();
    let section_alignment = properties.section_alignment();
    let file_alignment = properties.file_alignment();
    let image_end = u64::from(align_up(properties.size_of_image(), section_alignment));

    let count = properties.number_of_sections();
    let table_offset = u64::from(dos_header.lfanew)
        + u64::from(PE_SIGNATURE_SIZE)
        + FileHeader::SIZE
        + u64::from(properties.size_of_optional_header());
    if count != 0 && table_offset > file_size {
        return Err(PeError::ImageSectionHeaderNotFound);
    }

    let mut sections = Vec::with_capacity(usize::from(count));
    let mut raw_end = None;
    for index in 0..u64::from(count) {
        let mut header = SectionHeader::decode(medium, table_offset + index * SectionHeader::SIZE)
            .map_err(|_| PeError::ImageSectionErrorReadingHeader)?;

        if header.virtual_size == 0 && header.size_of_raw_data == 0 {
            return Err(PeError::ImageSectionZeroSizes);
        }
        if !is_sum_safe(header.virtual_address, header.virtual_size)
            || header.virtual_size > TWO_GB
            || !is_sum_safe(header.pointer_to_raw_data, header.size_of_raw_data)
            || header.size_of_raw_data > TWO_GB
        {
            return Err(PeError::ImageSectionIncorrectAddressOrSizes);
        }

        let mut raw = Vec::new();
        if header.size_of_raw_data != 0 {
            let declared_end =
                u64::from(header.pointer_to_raw_data) + u64::from(header.size_of_raw_data);
            raw_end = raw_end.max(Some(declared_end));

            if align_up(header.size_of_raw_data, file_alignment)
                > align_up(header.virtual_size, section_alignment)
            {
                debug!(
                    "section {index}: clamping raw size {:#x} to virtual size {:#x}",
                    header.size_of_raw_data, header.virtual_size
                );
                header.size_of_raw_data = header.virtual_size;
            }

            let data_offset = align_down(header.pointer_to_raw_data, file_alignment);
            let virtual_end = u64::from(header.virtual_address)
                + u64::from(align_up(header.virtual_size, section_alignment));
            let data_end = u64::from(data_offset) + u64::from(header.size_of_raw_data);
            if virtual_end > image_end || data_end > file_size {
                return Err(PeError::ImageSectionIncorrectAddressOrSizes);
            }

            raw = read_bytes(
                medium,
                u64::from(data_offset),
                u64::from(header.size_of_raw_data),
            )
            .map_err(|error| match error {
                MediumError::BoundsError { .. } => PeError::ImageSectionDataNotFound,
                MediumError::UnderlyingError(_) => PeError::ImageSectionErrorReadingSectionData,
            })?;
        }

        let section = Section::new(header, raw);
        let virtual_end = u64::from(section.virtual_address())
            + u64::from(section.aligned_virtual_size(section_alignment));
        if virtual_end > image_end {
            return Err(PeError::ImageSectionIncorrectAddressOrSizes);
        }

        trace!(
            "section {index}: rva {:#x}, virtual size {:#x}, raw size {:#x}",
            section.virtual_address(),
            section.virtual_size(),
            section.size_of_raw_data()
        );
        sections.push(section);
    }

    Ok((sections, raw_end))
}

/// Checks the header size against the first section and the contiguity of the section table.
fn validate_section_layout<W: Width>(
    properties: &Properties<W>,
    sections: &[Section],
) -> Result<(), PeError> {
    let Some(first) = sections.first() else {
        return Ok(());
    };

    if properties.size_of_headers() > first.virtual_address() {
        return Err(PeError::IncorrectSizeOfHeaders);
    }

    if sections.len() > 2 {
        let section_alignment = properties.section_alignment();
        for pair in sections.windows(2) {
            let expected = u64::from(pair[0].virtual_address())
                + u64::from(pair[0].aligned_virtual_size(section_alignment));
            if expected != u64::from(pair[1].virtual_address()) {
                return Err(PeError::SectionTableIncorrect);
            }
        }
    }

    Ok(())
}

/// Reads the header region: `SizeOfHeaders` bytes, bounded by the file and by the raw data of
/// the first section that has any.
fn read_headers<M: Medium + ?Sized, W: Width>(
    medium: &M,
    properties: &Properties<W>,
    sections: &[Section],
) -> Result<Vec<u8>, PeError> {
    let mut length = u64::from(properties.size_of_headers()).min(medium.size());
    if let Some(first) = sections.iter().find(|section| !section.is_empty()) {
        length = length.min(u64::from(first.pointer_to_raw_data()));
    }

    read_bytes(medium, 0, length).map_err(|_| PeError::ErrorReadingFile)
}

/// Reads `length` bytes at `offset`, checking bounds before allocating.
pub(crate) fn read_bytes<M: Medium + ?Sized>(
    medium: &M,
    offset: u64,
    length: u64,
) -> Result<Vec<u8>, MediumError<M::Error>> {
    check_bounds(medium.size(), offset, length)?;

    let Ok(length) = usize::try_from(length) else {
        return Err(MediumError::BoundsError {
            offset,
            length,
            size: medium.size(),
        });
    };
    let mut bytes = vec![0; length];
    medium.read_slice(offset, &mut bytes)?;
    Ok(bytes)
}
