//! Entries of the debug directory and the data they point to.

use alloc::{collections::TryReserveError, vec::Vec};
use core::fmt;

use log::{debug, trace};

use crate::{
    decode::Decode,
    directory::DirectoryId,
    error::PeError,
    image::Image,
    medium::Medium,
    raw::DebugDirectory,
    section::SectionDataKind,
    util::{is_null_terminated, u32_to_usize},
    width::Width,
};

/// The format of the data a debug directory entry points to.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct DebugType(pub u32);

impl DebugType {
    /// Unknown format.
    pub const UNKNOWN: Self = Self(0);
    /// COFF debug information.
    pub const COFF: Self = Self(1);
    /// Visual C++ debug information, usually a PDB reference.
    pub const CODEVIEW: Self = Self(2);
    /// Frame pointer omission information.
    pub const FPO: Self = Self(3);
    /// Location of a DBG file.
    pub const MISC: Self = Self(4);
    /// A copy of the exception directory.
    pub const EXCEPTION: Self = Self(5);
    /// Reserved.
    pub const FIXUP: Self = Self(6);
    /// Mapping from an RVA in the image to an RVA in the source image.
    pub const OMAP_TO_SRC: Self = Self(7);
    /// Mapping from an RVA in the source image to an RVA in the image.
    pub const OMAP_FROM_SRC: Self = Self(8);
    /// Reserved for Borland.
    pub const BORLAND: Self = Self(9);
    /// Reserved.
    pub const RESERVED10: Self = Self(10);
    /// Reserved.
    pub const CLSID: Self = Self(11);
    /// Visual C++ feature data.
    pub const VC_FEATURE: Self = Self(12);
    /// Profile guided optimization data.
    pub const POGO: Self = Self(13);
    /// Incremental link time code generation data.
    pub const ILTCG: Self = Self(14);
    /// Intel MPX data.
    pub const MPX: Self = Self(15);
    /// The image was built to be reproducible.
    pub const REPRO: Self = Self(16);
    /// Extended DLL characteristics.
    pub const EX_DLLCHARACTERISTICS: Self = Self(20);
}

impl fmt::Debug for DebugType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNKNOWN => f.pad("Unknown"),
            Self::COFF => f.pad("Coff"),
            Self::CODEVIEW => f.pad("CodeView"),
            Self::FPO => f.pad("Fpo"),
            Self::MISC => f.pad("Misc"),
            Self::EXCEPTION => f.pad("Exception"),
            Self::FIXUP => f.pad("Fixup"),
            Self::OMAP_TO_SRC => f.pad("OmapToSrc"),
            Self::OMAP_FROM_SRC => f.pad("OmapFromSrc"),
            Self::BORLAND => f.pad("Borland"),
            Self::RESERVED10 => f.pad("Reserved10"),
            Self::CLSID => f.pad("Clsid"),
            Self::VC_FEATURE => f.pad("VcFeature"),
            Self::POGO => f.pad("Pogo"),
            Self::ILTCG => f.pad("Iltcg"),
            Self::MPX => f.pad("Mpx"),
            Self::REPRO => f.pad("Repro"),
            Self::EX_DLLCHARACTERISTICS => f.pad("ExDllCharacteristics"),
            kind => f.debug_tuple("DebugType").field(&kind.0).finish(),
        }
    }
}

/// The `RSDS` signature of a CodeView PDB 7.0 record.
const CODEVIEW_RSDS_SIGNATURE: u32 = 0x5344_5352;
/// The offset of the PDB path inside a CodeView PDB 7.0 record.
const CODEVIEW_RSDS_PATH_OFFSET: usize = 24;
/// The longest PDB path accepted from a CodeView record.
const MAX_PDB_PATH_LENGTH: usize = 260;

/// A single debug directory entry and the data it points to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugEntry {
    /// The directory entry.
    header: DebugDirectory,
    /// The data at `pointer_to_raw_data`, empty if it was absent or unreadable.
    data: Vec<u8>,
}

impl DebugEntry {
    /// Returns the raw directory entry.
    pub fn header(&self) -> &DebugDirectory {
        &self.header
    }

    /// Returns the format of the entry's data.
    pub fn kind(&self) -> DebugType {
        DebugType(self.header.kind)
    }

    /// Returns the data the entry points to.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the PDB path of a CodeView PDB 7.0 record.
    pub fn pdb_path(&self) -> Option<&[u8]> {
        if self.kind() != DebugType::CODEVIEW {
            return None;
        }

        let signature = u32::decode(self.data.as_slice(), 0).ok()?;
        if signature != CODEVIEW_RSDS_SIGNATURE {
            return None;
        }

        let path = self.data.get(CODEVIEW_RSDS_PATH_OFFSET..)?;
        if !is_null_terminated(path, MAX_PDB_PATH_LENGTH) {
            return None;
        }

        path.split(|&byte| byte == 0).next()
    }
}

/// The reasons prefetching stops early.
#[derive(Debug)]
enum PrefetchError {
    /// An entry could not be located or decoded.
    Structure(PeError),
    /// Memory for an entry could not be reserved.
    Allocation(TryReserveError),
    /// The data of all entries read so far would exceed the size of the file.
    Budget,
}

impl From<PeError> for PrefetchError {
    fn from(value: PeError) -> Self {
        Self::Structure(value)
    }
}

impl From<TryReserveError> for PrefetchError {
    fn from(value: TryReserveError) -> Self {
        Self::Allocation(value)
    }
}

impl fmt::Display for PrefetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structure(error) => write!(f, "{error}"),
            Self::Allocation(error) => write!(f, "{error}"),
            Self::Budget => f.write_str("debug data exceeds the size of the file"),
        }
    }
}

/// Reads every entry of the debug directory of `image`, taking entry data from `medium`.
///
/// Reading is best effort: the entries read before the first failure are returned. The data
/// of all entries together never exceeds the size of `medium`.
pub(crate) fn read_debug_entries<W: Width, M: Medium + ?Sized>(
    image: &Image<W>,
    medium: &M,
) -> Vec<DebugEntry> {
    let mut entries = Vec::new();
    if let Err(error) = collect_debug_entries(image, medium, &mut entries) {
        debug!(
            "stopped reading debug directory after {} entries: {error}",
            entries.len()
        );
    }

    entries
}

/// Appends debug entries to `entries` until the directory is exhausted or an entry fails.
fn collect_debug_entries<W: Width, M: Medium + ?Sized>(
    image: &Image<W>,
    medium: &M,
    entries: &mut Vec<DebugEntry>,
) -> Result<(), PrefetchError> {
    let rva = image.directory_rva(DirectoryId::DEBUG)?;
    let size = image.directory_size(DirectoryId::DEBUG)?;
    let count = u64::from(size) / DebugDirectory::SIZE;
    let mut budget = medium.size();

    for index in 0..count {
        let entry_rva = u64::from(rva) + index * DebugDirectory::SIZE;
        let entry_rva = u32::try_from(entry_rva).map_err(|_| PeError::RvaDoesNotExist)?;
        let header: DebugDirectory = image.read_at(entry_rva, SectionDataKind::Raw, true)?;

        let data = read_entry_data(&header, medium, &mut budget)?;
        trace!(
            "debug entry {index}: {:?} with {} bytes",
            DebugType(header.kind),
            data.len()
        );

        entries.try_reserve(1)?;
        entries.push(DebugEntry { header, data });
    }

    Ok(())
}

/// Reads the data an entry points to, or nothing if the entry has no data in the file.
///
/// The length read is taken from `budget`.
fn read_entry_data<M: Medium + ?Sized>(
    header: &DebugDirectory,
    medium: &M,
    budget: &mut u64,
) -> Result<Vec<u8>, PrefetchError> {
    if header.pointer_to_raw_data == 0 || header.size_of_data == 0 {
        return Ok(Vec::new());
    }

    let offset = u64::from(header.pointer_to_raw_data);
    let length = u64::from(header.size_of_data);
    if offset
        .checked_add(length)
        .is_none_or(|end| end > medium.size())
    {
        return Err(PrefetchError::Structure(PeError::ErrorReadingFile));
    }
    *budget = budget.checked_sub(length).ok_or(PrefetchError::Budget)?;

    let mut data = Vec::new();
    data.try_reserve_exact(u32_to_usize(header.size_of_data))?;
    data.resize(u32_to_usize(header.size_of_data), 0);
    medium
        .read_slice(offset, &mut data)
        .map_err(|_| PeError::ErrorReadingFile)?;

    Ok(data)
}

#[cfg(test)]
mod test {
    use alloc::vec::Vec;

    use super::{DebugType, read_debug_entries};
    use crate::{
        directory::DirectoryId,
        image::{Image, LoadOptions},
        test_util::{ImageBuilder, TestSection, put_u32},
        width::Pe32,
    };

    /// Builds an image whose `.rdata` section holds `count` debug entries, the first of which
    /// points to a CodeView record stored in the same section.
    fn image_with_debug(count: u32, directory_size: u32) -> Vec<u8> {
        let mut rdata = [0u8; 0x200];
        for index in 0..count {
            let base = usize::try_from(index * 28).unwrap();
            put_u32(&mut rdata, base + 12, 2);
            put_u32(&mut rdata, base + 16, 0x20);
            put_u32(&mut rdata, base + 20, 0x2100);
            put_u32(&mut rdata, base + 24, 0x500);
        }
        rdata[0x100..0x104].copy_from_slice(b"RSDS");
        rdata[0x118..0x120].copy_from_slice(b"app.pdb\0");

        ImageBuilder::pe32()
            .section(TestSection::new(*b".text\0\0\0", 0x1000, 0x200))
            .section(TestSection::new(*b".rdata\0\0", 0x1000, 0x200).data(&rdata))
            .directory(DirectoryId::DEBUG, 0x2000, directory_size)
            .build()
    }

    #[test]
    fn prefetches_entries_and_data() {
        let bytes = image_with_debug(1, 28);
        let image = Image::parse(&bytes[..], Pe32).unwrap();

        let entries = image.debug_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind(), DebugType::CODEVIEW);
        assert_eq!(entries[0].data().len(), 0x20);
        assert_eq!(entries[0].pdb_path(), Some(&b"app.pdb"[..]));
    }

    #[test]
    fn skipped_when_disabled() {
        let bytes = image_with_debug(1, 28);
        let image = Image::parse_with_options(
            &bytes[..],
            Pe32,
            LoadOptions {
                read_debug_raw_data: false,
            },
        )
        .unwrap();

        assert!(image.debug_entries().is_empty());
        assert_eq!(read_debug_entries(&image, &bytes[..]).len(), 1);
    }

    #[test]
    fn stops_at_first_unreadable_entry() {
        let mut bytes = image_with_debug(2, 56);
        // Point the second entry past the end of the file.
        let second = 0x400 + 28 + 24;
        bytes[second..second + 4].copy_from_slice(&0x00FF_0000u32.to_le_bytes());

        let image = Image::parse(&bytes[..], Pe32).unwrap();
        assert_eq!(image.debug_entries().len(), 1);
    }

    #[test]
    fn load_survives_broken_directory() {
        let bytes = image_with_debug(1, 28 * 200);
        let image = Image::parse(&bytes[..], Pe32).unwrap();

        assert!(!image.debug_entries().is_empty());
        assert!(image.debug_entries().len() < 200);
    }

    #[test]
    fn total_data_is_bounded_by_file_size() {
        let mut bytes = image_with_debug(3, 84);
        // Every entry claims 0x300 bytes starting at `.text`, half of the 0x600 byte file.
        for index in 0..3 {
            let entry = 0x400 + index * 28;
            bytes[entry + 16..entry + 20].copy_from_slice(&0x300u32.to_le_bytes());
            bytes[entry + 24..entry + 28].copy_from_slice(&0x200u32.to_le_bytes());
        }

        let image = Image::parse(&bytes[..], Pe32).unwrap();
        assert_eq!(bytes.len(), 0x600);
        assert_eq!(image.debug_entries().len(), 2);
    }
}
