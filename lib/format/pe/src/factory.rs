//! Detection of the image width and construction of the matching [`Image`].

use log::debug;

use crate::{
    error::PeError,
    header::PE_SIGNATURE,
    image::{
        Image, LoadOptions,
        load::{read_dos_header, read_nt_prefix},
    },
    medium::Medium,
    width::{AnyWidth, Width},
};

/// Determines whether `medium` holds a PE32 or a PE32+ image.
///
/// Only the DOS header and the start of the NT headers are inspected.
///
/// # Errors
///
/// - [`PeError::BadDosHeader`]: The DOS header is truncated or the NT header offset is
///   misaligned.
/// - [`PeError::IncorrectPeSignature`]: A signature is wrong or the optional header magic names
///   neither width.
/// - [`PeError::NtHeadersNotFound`] or [`PeError::ErrorReadingNtHeaders`]: The NT headers are
///   unreachable or truncated.
pub fn detect_width<M: Medium + ?Sized>(medium: &M) -> Result<AnyWidth, PeError> {
    let dos_header = read_dos_header(medium)?;
    let prefix = read_nt_prefix(medium, &dos_header)?;
    if prefix.signature != PE_SIGNATURE {
        return Err(PeError::IncorrectPeSignature);
    }

    let width = AnyWidth::from_magic(prefix.magic)?;
    debug!("detected {width:?} image");
    Ok(width)
}

/// Detects the width of the image in `medium` and loads it with default [`LoadOptions`].
///
/// # Errors
///
/// Returns any [`PeError`] produced by [`detect_width()`] or [`Image::parse()`].
pub fn parse<M: Medium + ?Sized>(medium: &M) -> Result<Image, PeError> {
    parse_with_options(medium, LoadOptions::default())
}

/// Detects the width of the image in `medium` and loads it with `options`.
///
/// # Errors
///
/// Returns any [`PeError`] produced by [`detect_width()`] or [`Image::parse_with_options()`].
pub fn parse_with_options<M: Medium + ?Sized>(
    medium: &M,
    options: LoadOptions,
) -> Result<Image, PeError> {
    let width = detect_width(medium)?;
    Image::parse_with_options(medium, width, options)
}

/// Detects and loads the image read from `stream`.
///
/// The stream position is the same after the call as before it, whether or not loading
/// succeeds.
///
/// # Errors
///
/// Returns [`PeError::ErrorReadingFile`] if the stream cannot be measured, or any [`PeError`]
/// produced by [`parse_with_options()`].
#[cfg(feature = "std")]
pub fn parse_stream<R: std::io::Read + std::io::Seek>(
    stream: &mut R,
    options: LoadOptions,
) -> Result<Image, PeError> {
    let medium = crate::medium::StreamMedium::new(stream).map_err(|error| {
        debug!("failed to measure stream: {error}");
        PeError::ErrorReadingFile
    })?;

    parse_with_options(&medium, options)
}
