//! Errors produced while loading and querying PE images.

use core::{error, fmt};

use crate::width::UnsupportedWidthError;

/// Every failure that loading or querying an image can produce.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum PeError {
    /// The DOS header could not be read or points at a misaligned NT header.
    BadDosHeader,
    /// A signature or optional header magic did not match its expected value.
    IncorrectPeSignature,
    /// The NT headers lie outside of the file.
    NtHeadersNotFound,
    /// The NT headers were truncated.
    ErrorReadingNtHeaders,
    /// The data directory array was truncated.
    ErrorReadingDataDirectories,
    /// The image declares more sections than a loader accepts.
    TooManySections,
    /// The section alignment is not a power of two.
    IncorrectSectionAlignment,
    /// The file alignment is not a power of two or is inconsistent with the section alignment.
    IncorrectFileAlignment,
    /// The aligned size of the image is zero.
    IncorrectSizeOfImage,
    /// The bytes between the DOS header and the NT headers were truncated.
    ErrorReadingDosOverlay,
    /// The headers extend past the first section.
    IncorrectSizeOfHeaders,
    /// The sections are not laid out contiguously in ascending order.
    SectionTableIncorrect,
    /// The header region of the file could not be read.
    ErrorReadingFile,
    /// A section declares neither a virtual size nor a raw size.
    ImageSectionZeroSizes,
    /// A section declares addresses or sizes that overflow or leave the image.
    ImageSectionIncorrectAddressOrSizes,
    /// The raw data of a section lies outside of the file.
    ImageSectionDataNotFound,
    /// The raw data of a section could not be read.
    ImageSectionErrorReadingSectionData,
    /// The section table lies outside of the file.
    ImageSectionHeaderNotFound,
    /// A section header was truncated.
    ImageSectionErrorReadingHeader,
    /// No section contains the requested RVA.
    RvaNotFound,
    /// The requested data does not fit within the region containing the RVA.
    RvaDoesNotExist,
    /// No section contains the requested address or file offset.
    NoSectionFound,
    /// The requested data directory is not present.
    DirectoryNotFound,
    /// A virtual address could not be converted to or from an RVA.
    InvalidAddressConversion,
    /// The export directory is malformed.
    IncorrectExportDirectory,
    /// The import directory is malformed.
    IncorrectImportDirectory,
    /// The image has no CLR runtime header.
    ImageDoesNotHaveManagedCode,
}

impl From<UnsupportedWidthError> for PeError {
    fn from(_: UnsupportedWidthError) -> Self {
        Self::IncorrectPeSignature
    }
}

impl fmt::Display for PeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::BadDosHeader => "bad DOS header",
            Self::IncorrectPeSignature => "incorrect PE signature",
            Self::NtHeadersNotFound => "cannot reach NT headers",
            Self::ErrorReadingNtHeaders => "error reading NT headers",
            Self::ErrorReadingDataDirectories => "error reading data directories",
            Self::TooManySections => "too many sections",
            Self::IncorrectSectionAlignment => "incorrect section alignment",
            Self::IncorrectFileAlignment => "incorrect file alignment",
            Self::IncorrectSizeOfImage => "incorrect size of image",
            Self::ErrorReadingDosOverlay => "error reading rich and DOS stub overlay",
            Self::IncorrectSizeOfHeaders => "incorrect size of headers",
            Self::SectionTableIncorrect => "section table is incorrect",
            Self::ErrorReadingFile => "error reading file",
            Self::ImageSectionZeroSizes => "section virtual and raw sizes are both zero",
            Self::ImageSectionIncorrectAddressOrSizes => "incorrect section addresses or sizes",
            Self::ImageSectionDataNotFound => "cannot reach section data",
            Self::ImageSectionErrorReadingSectionData => "error reading section data",
            Self::ImageSectionHeaderNotFound => "cannot reach section header",
            Self::ImageSectionErrorReadingHeader => "error reading section header",
            Self::RvaNotFound => "RVA not found inside any section",
            Self::RvaDoesNotExist => "RVA and requested data size do not exist inside section",
            Self::NoSectionFound => "no section found",
            Self::DirectoryNotFound => "directory not found",
            Self::InvalidAddressConversion => "invalid address conversion",
            Self::IncorrectExportDirectory => "incorrect export directory",
            Self::IncorrectImportDirectory => "incorrect import directory",
            Self::ImageDoesNotHaveManagedCode => "image does not have managed code",
        };

        f.write_str(message)
    }
}

impl error::Error for PeError {}
