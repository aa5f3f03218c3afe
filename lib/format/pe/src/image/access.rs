//! Address translation and typed reads over a loaded [`Image`].

use alloc::string::String;

use crate::{
    decode::Decode,
    directory::DirectoryId,
    error::PeError,
    image::Image,
    medium::{Medium, SectionView},
    section::{Section, SectionDataKind},
    width::Width,
};

#[expect(clippy::missing_errors_doc)]
impl<W: Width> Image<W> {
    /// Returns the first section whose aligned virtual extent contains `rva`.
    pub fn section_from_rva(&self, rva: u32) -> Result<&Section, PeError> {
        let section_alignment = self.properties.section_alignment();
        self.sections
            .iter()
            .find(|section| section.contains_rva(rva, section_alignment))
            .ok_or(PeError::RvaNotFound)
    }

    /// Returns the section containing the virtual address `va`.
    pub fn section_from_va(&self, va: u64) -> Result<&Section, PeError> {
        let rva = self.va_to_rva(va, true)?;
        self.section_from_rva(rva)
    }

    /// Returns the section containing the start of the directory `id`.
    pub fn section_from_directory(&self, id: DirectoryId) -> Result<&Section, PeError> {
        let rva = self.directory_rva(id)?;
        self.section_from_rva(rva)
    }

    /// Returns the first section whose raw data contains the file offset `offset`.
    pub fn section_from_file_offset(&self, offset: u32) -> Result<&Section, PeError> {
        self.sections
            .iter()
            .find(|section| section.contains_file_offset(offset))
            .ok_or(PeError::NoSectionFound)
    }

    /// Converts an RVA into a file offset.
    ///
    /// RVAs inside the header region map to themselves.
    pub fn rva_to_file_offset(&self, rva: u32) -> Result<u32, PeError> {
        if rva < self.properties.size_of_headers() {
            return Ok(rva);
        }

        let section = self
            .section_from_rva(rva)
            .map_err(|_| PeError::NoSectionFound)?;
        (rva - section.virtual_address())
            .checked_add(section.pointer_to_raw_data())
            .ok_or(PeError::InvalidAddressConversion)
    }

    /// Converts a file offset into an RVA.
    ///
    /// Offsets inside the header region map to themselves.
    pub fn file_offset_to_rva(&self, offset: u32) -> Result<u32, PeError> {
        if offset < self.properties.size_of_headers() {
            return Ok(offset);
        }

        let section = self.section_from_file_offset(offset)?;
        (offset - section.pointer_to_raw_data())
            .checked_add(section.virtual_address())
            .ok_or(PeError::InvalidAddressConversion)
    }

    /// Converts a virtual address into an RVA. See [`Properties::va_to_rva()`].
    ///
    /// [`Properties::va_to_rva()`]: crate::properties::Properties::va_to_rva
    pub fn va_to_rva(&self, va: u64, bound_check: bool) -> Result<u32, PeError> {
        self.properties.va_to_rva(va, bound_check)
    }

    /// Converts an RVA into a virtual address.
    pub fn rva_to_va(&self, rva: u32) -> Result<u64, PeError> {
        self.properties.rva_to_va(rva)
    }

    /// Returns the RVA of the byte `offset` bytes into `section`.
    pub fn rva_from_section_offset(&self, section: &Section, offset: u32) -> Result<u32, PeError> {
        section
            .virtual_address()
            .checked_add(offset)
            .ok_or(PeError::InvalidAddressConversion)
    }

    /// Resolves `rva` to the region holding it and the offset of `rva` inside that region.
    ///
    /// The header region is used when `include_headers` is set and `length` bytes at `rva` fit
    /// inside it. Otherwise the section containing `rva` is used in its `kind` form, and the
    /// `length` bytes must fit inside that form.
    fn region(
        &self,
        rva: u32,
        length: u64,
        kind: SectionDataKind,
        include_headers: bool,
    ) -> Result<(SectionView<'_>, u64), PeError> {
        let start = u64::from(rva);
        if include_headers {
            let headers = SectionView::new(&self.headers);
            if start < headers.size() && start + length <= headers.size() {
                return Ok((headers, start));
            }
        }

        let section = self.section_from_rva(rva)?;
        let view = section.view(kind, self.properties.section_alignment());
        let offset = u64::from(rva - section.virtual_address());
        if offset >= view.size() || offset + length > view.size() {
            return Err(PeError::RvaDoesNotExist);
        }

        Ok((view, offset))
    }

    /// Returns the number of bytes available from `rva` to the end of the region containing it.
    pub fn section_data_length_from_rva(
        &self,
        rva: u32,
        kind: SectionDataKind,
        include_headers: bool,
    ) -> Result<u32, PeError> {
        let (view, offset) = self.region(rva, 0, kind, include_headers)?;
        Ok(u32::try_from(view.remaining(offset)).unwrap_or(u32::MAX))
    }

    /// Returns the region containing `rva` along with the offset of `rva` inside it.
    pub fn section_data_from_rva(
        &self,
        rva: u32,
        kind: SectionDataKind,
        include_headers: bool,
    ) -> Result<(SectionView<'_>, u64), PeError> {
        self.region(rva, 0, kind, include_headers)
    }

    /// Decodes a `T` at `rva`.
    ///
    /// Fails with [`PeError::RvaDoesNotExist`] when `T` does not fit entirely inside the region
    /// containing `rva`.
    pub fn read_at<T: Decode>(
        &self,
        rva: u32,
        kind: SectionDataKind,
        include_headers: bool,
    ) -> Result<T, PeError> {
        let (view, offset) = self.region(rva, T::SIZE, kind, include_headers)?;
        T::decode(&view, offset).map_err(|_| PeError::RvaDoesNotExist)
    }

    /// Decodes a `T` at the virtual address `va`.
    pub fn read_at_va<T: Decode>(
        &self,
        va: u64,
        kind: SectionDataKind,
        include_headers: bool,
    ) -> Result<T, PeError> {
        let rva = self.va_to_rva(va, true)?;
        self.read_at(rva, kind, include_headers)
    }

    /// Decodes a width sized address at `rva`.
    pub fn read_address_at(
        &self,
        rva: u32,
        kind: SectionDataKind,
        include_headers: bool,
    ) -> Result<W::Address, PeError> {
        let width = self.width();
        let (view, offset) =
            self.region(rva, u64::from(width.thunk_size()), kind, include_headers)?;
        width
            .read_address(&view, offset)
            .map_err(|_| PeError::RvaDoesNotExist)
    }

    /// Returns the bytes of the C string at `rva`, excluding the terminator.
    ///
    /// The string must be terminated inside the region containing `rva`.
    pub fn read_c_string(
        &self,
        rva: u32,
        kind: SectionDataKind,
        include_headers: bool,
    ) -> Result<&[u8], PeError> {
        let (view, offset) = self.region(rva, 1, kind, include_headers)?;
        view.c_str_at(offset).ok_or(PeError::RvaDoesNotExist)
    }

    /// Reads the name at `rva` from the zero-extended image, reporting every failure as `error`.
    ///
    /// At least two bytes must remain in the region holding `rva`.
    pub(crate) fn read_name(&self, rva: u32, error: PeError) -> Result<String, PeError> {
        let available = self
            .section_data_length_from_rva(rva, SectionDataKind::Virtual, true)
            .map_err(|_| error)?;
        if available < 2 {
            return Err(error);
        }

        let name = self
            .read_c_string(rva, SectionDataKind::Virtual, true)
            .map_err(|_| error)?;
        Ok(String::from_utf8_lossy(name).into_owned())
    }
}
