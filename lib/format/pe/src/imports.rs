//! Reading of the import directory.

use alloc::{string::String, vec::Vec};

use log::trace;

use crate::{
    decode::Decode,
    directory::DirectoryId,
    error::PeError,
    image::Image,
    raw::ImportDescriptor,
    section::SectionDataKind,
    width::Width,
};

/// The size, in bytes, of the hint that precedes an imported function name.
const HINT_SIZE: u32 = 2;

/// How an imported function is identified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportKind {
    /// Imported by ordinal.
    Ordinal(u16),
    /// Imported by name.
    Name {
        /// The index into the export name table the linker suggested.
        hint: u16,
        /// The name of the function.
        name: String,
    },
}

/// A single imported function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportedFunction {
    /// How the function is identified.
    pub kind: ImportKind,
    /// The value stored in the import address table.
    pub iat_va: u64,
}

impl ImportedFunction {
    /// Returns the name of the function if it is imported by name.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ImportKind::Name { name, .. } => Some(name),
            ImportKind::Ordinal(_) => None,
        }
    }

    /// Returns the ordinal of the function if it is imported by ordinal.
    pub fn ordinal(&self) -> Option<u16> {
        match self.kind {
            ImportKind::Ordinal(ordinal) => Some(ordinal),
            ImportKind::Name { .. } => None,
        }
    }
}

/// A library an image imports functions from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportedLibrary {
    /// The name of the library.
    pub name: String,
    /// The time stamp recorded in the import descriptor.
    pub time_date_stamp: u32,
    /// The RVA of the import address table.
    pub iat_rva: u32,
    /// The RVA of the import lookup table, zero if the linker omitted it.
    pub original_iat_rva: u32,
    /// The imported functions, in table order.
    pub functions: Vec<ImportedFunction>,
}

#[expect(clippy::missing_errors_doc)]
impl<W: Width> Image<W> {
    /// Returns every imported library along with its imported functions.
    ///
    /// When a descriptor has no import lookup table, the import address table is walked in its
    /// place. Returns an empty list if the image has no import directory. Every failure is
    /// reported as [`PeError::IncorrectImportDirectory`].
    pub fn imported_libraries(&self) -> Result<Vec<ImportedLibrary>, PeError> {
        const ERROR: PeError = PeError::IncorrectImportDirectory;

        let mut libraries = Vec::new();
        if !self.has_imports() {
            return Ok(libraries);
        }

        let mut descriptor_rva = self.directory_rva(DirectoryId::IMPORT)?;
        let mut descriptor: ImportDescriptor = self.read_import(descriptor_rva)?;
        while descriptor.name != 0 {
            let name = self.read_name(descriptor.name, ERROR)?;
            let functions = self.read_import_thunks(&descriptor)?;
            trace!("import {name}: {} functions", functions.len());

            libraries.push(ImportedLibrary {
                name,
                time_date_stamp: descriptor.time_date_stamp,
                iat_rva: descriptor.first_thunk,
                original_iat_rva: descriptor.original_first_thunk,
                functions,
            });

            descriptor_rva = descriptor_rva
                .checked_add(u32::try_from(ImportDescriptor::SIZE).map_err(|_| ERROR)?)
                .ok_or(ERROR)?;
            descriptor = self.read_import(descriptor_rva)?;
        }

        Ok(libraries)
    }

    /// Walks the thunks of one import descriptor.
    fn read_import_thunks(
        &self,
        descriptor: &ImportDescriptor,
    ) -> Result<Vec<ImportedFunction>, PeError> {
        const ERROR: PeError = PeError::IncorrectImportDirectory;

        let mut functions = Vec::new();
        let thunk_size = self.width().thunk_size();
        let ordinal_flag = self.width().ordinal_flag();

        let mut iat_rva = descriptor.first_thunk;
        let mut lookup_rva = if descriptor.original_first_thunk == 0 {
            descriptor.first_thunk
        } else {
            descriptor.original_first_thunk
        };

        let first_address: u32 = self.read_import(iat_rva)?;
        let first_lookup: u32 = self.read_import(lookup_rva)?;
        if first_address == 0 || first_lookup == 0 {
            return Ok(functions);
        }

        loop {
            let address = self.read_thunk(iat_rva)?;
            iat_rva = iat_rva.checked_add(thunk_size).ok_or(ERROR)?;
            if address == 0 {
                break;
            }

            let lookup = self.read_thunk(lookup_rva)?;
            lookup_rva = lookup_rva.checked_add(thunk_size).ok_or(ERROR)?;

            let kind = if lookup & ordinal_flag != 0 {
                ImportKind::Ordinal(u16::try_from(lookup & 0xFFFF).map_err(|_| ERROR)?)
            } else {
                let hint_rva = u32::try_from(lookup).map_err(|_| ERROR)?;
                let name_rva = hint_rva.checked_add(HINT_SIZE).ok_or(ERROR)?;
                let name = self.read_name(name_rva, ERROR)?;
                let hint = self.read_import(hint_rva)?;
                ImportKind::Name { hint, name }
            };

            functions.push(ImportedFunction {
                kind,
                iat_va: address,
            });
        }

        Ok(functions)
    }

    /// Reads a `T` at `rva` from the zero-extended image.
    fn read_import<T: Decode>(&self, rva: u32) -> Result<T, PeError> {
        self.read_at(rva, SectionDataKind::Virtual, true)
            .map_err(|_| PeError::IncorrectImportDirectory)
    }

    /// Reads a width sized thunk at `rva` from the zero-extended image.
    fn read_thunk(&self, rva: u32) -> Result<u64, PeError> {
        self.read_address_at(rva, SectionDataKind::Virtual, true)
            .map(Into::into)
            .map_err(|_| PeError::IncorrectImportDirectory)
    }
}

#[cfg(test)]
mod test {
    use alloc::vec::Vec;

    use crate::{
        directory::DirectoryId,
        error::PeError,
        image::Image,
        imports::ImportKind,
        test_util::{ImageBuilder, TestSection, put_u16, put_u32, put_u64},
        width::{Pe32, Pe64},
    };

    /// Descriptors at 0x1000, lookup table at 0x1040, IAT at 0x1060, strings from 0x1080.
    fn idata32(original_first_thunk: u32) -> [u8; 0x200] {
        let mut idata = [0u8; 0x200];
        put_u32(&mut idata, 0x00, original_first_thunk);
        put_u32(&mut idata, 0x04, 0x1234);
        put_u32(&mut idata, 0x0C, 0x1080);
        put_u32(&mut idata, 0x10, 0x1060);

        put_u32(&mut idata, 0x40, 0x1090);
        put_u32(&mut idata, 0x44, 0x8000_0007);
        put_u32(&mut idata, 0x60, 0x1090);
        put_u32(&mut idata, 0x64, 0x8000_0007);

        idata[0x80..0x8D].copy_from_slice(b"kernel32.dll\0");
        put_u16(&mut idata, 0x90, 0x2A);
        idata[0x92..0x9E].copy_from_slice(b"ExitProcess\0");
        idata
    }

    fn build(idata: &[u8]) -> Vec<u8> {
        ImageBuilder::pe32()
            .section(TestSection::new(*b".idata\0\0", 0x1000, 0x200).data(idata))
            .section(TestSection::new(*b".text\0\0\0", 0x1000, 0x200))
            .directory(DirectoryId::IMPORT, 0x1000, 0x28)
            .build()
    }

    #[test]
    fn walks_lookup_table() {
        let bytes = build(&idata32(0x1040));
        let image = Image::parse(&bytes[..], Pe32).unwrap();
        let libraries = image.imported_libraries().unwrap();

        assert_eq!(libraries.len(), 1);
        let library = &libraries[0];
        assert_eq!(library.name, "kernel32.dll");
        assert_eq!(library.time_date_stamp, 0x1234);
        assert_eq!(library.iat_rva, 0x1060);
        assert_eq!(library.original_iat_rva, 0x1040);
        assert_eq!(library.functions.len(), 2);
        assert_eq!(
            library.functions[0].kind,
            ImportKind::Name {
                hint: 0x2A,
                name: "ExitProcess".into()
            }
        );
        assert_eq!(library.functions[0].iat_va, 0x1090);
        assert_eq!(library.functions[1].ordinal(), Some(7));
        assert_eq!(library.functions[1].name(), None);
    }

    #[test]
    fn falls_back_to_iat_without_lookup_table() {
        let bytes = build(&idata32(0));
        let image = Image::parse(&bytes[..], Pe32).unwrap();
        let libraries = image.imported_libraries().unwrap();

        let functions = &libraries[0].functions;
        assert_eq!(libraries[0].original_iat_rva, 0);
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name(), Some("ExitProcess"));
        assert_eq!(functions[1].kind, ImportKind::Ordinal(7));
        assert_eq!(functions[1].iat_va, 0x8000_0007);
    }

    #[test]
    fn reads_wide_thunks() {
        let mut idata = [0u8; 0x200];
        put_u32(&mut idata, 0x00, 0x1040);
        put_u32(&mut idata, 0x0C, 0x1080);
        put_u32(&mut idata, 0x10, 0x1060);
        put_u64(&mut idata, 0x40, 0x8000_0000_0000_0010);
        put_u64(&mut idata, 0x60, 0x8000_0000_0000_0010);
        idata[0x80..0x88].copy_from_slice(b"ws2.dll\0");

        let bytes = ImageBuilder::pe64()
            .section(TestSection::new(*b".idata\0\0", 0x1000, 0x200).data(&idata))
            .directory(DirectoryId::IMPORT, 0x1000, 0x28)
            .build();
        let image = Image::parse(&bytes[..], Pe64).unwrap();
        let libraries = image.imported_libraries().unwrap();

        assert_eq!(libraries[0].functions.len(), 1);
        assert_eq!(libraries[0].functions[0].ordinal(), Some(0x10));
        assert_eq!(libraries[0].functions[0].iat_va, 0x8000_0000_0000_0010);
    }

    #[test]
    fn rejects_unreachable_names() {
        let mut idata = idata32(0x1040);
        put_u32(&mut idata, 0x0C, 0x5000);

        let bytes = build(&idata);
        let image = Image::parse(&bytes[..], Pe32).unwrap();
        assert_eq!(
            image.imported_libraries(),
            Err(PeError::IncorrectImportDirectory)
        );
    }

    #[test]
    fn no_directory_means_no_imports() {
        let bytes = ImageBuilder::pe32()
            .section(TestSection::new(*b".text\0\0\0", 0x1000, 0x200))
            .build();
        let image = Image::parse(&bytes[..], Pe32).unwrap();

        assert!(!image.has_imports());
        assert_eq!(image.imported_libraries(), Ok(Vec::new()));
    }
}
