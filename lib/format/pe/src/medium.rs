//! Generic API over immutable byte sources that PE images are parsed from.

use core::{error, fmt};

use crate::util::{u64_to_usize, usize_to_u64};

/// Generic API over various immutable and contiguous byte sources.
///
/// The medium must be immutable. This means that byte values never change between reads and the
/// value of [`Medium::size()`] also never changes.
///
/// # Implementors
///
/// Implementations must treat any overflow in `offset + length` as a bounds error (a helpful
/// utility function is provided as [`check_bounds()`]).
pub trait Medium {
    /// Any errors that might need to be propagated up through the [`Medium`] abstraction.
    type Error;

    /// The number of bytes available to be retrieved.
    fn size(&self) -> u64;

    /// Read a single byte from `offset`.
    ///
    /// # Errors
    ///
    /// - [`MediumError::BoundsError`]: Requested region is outside of the bounds of [`Medium`].
    /// - [`MediumError::UnderlyingError`]: The underlying source returned an error when accessing
    ///   it.
    fn read_byte(&self, offset: u64) -> Result<u8, MediumError<Self::Error>> {
        let mut val = 0;

        self.read_slice(offset, core::array::from_mut(&mut val))?;
        Ok(val)
    }

    /// Read `slice.len()` bytes into `slice` from `offset`.
    ///
    /// # Errors
    ///
    /// - [`MediumError::BoundsError`]: Requested region is outside of the bounds of [`Medium`].
    /// - [`MediumError::UnderlyingError`]: The underlying source returned an error when accessing
    ///   it.
    fn read_slice(&self, offset: u64, slice: &mut [u8]) -> Result<(), MediumError<Self::Error>>;
}

/// Various errors that can occur when interacting with a [`Medium`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediumError<E> {
    /// Requested region is outside of the bounds of [`Medium`].
    BoundsError {
        /// The offset, in bytes, of the start of the requested region in the [`Medium`].
        offset: u64,
        /// The size, in bytes, of the requested region.
        length: u64,
        /// The actual size of the [`Medium`].
        size: u64,
    },
    /// An error that might occur when accessing the medium.
    UnderlyingError(E),
}

impl<E> From<E> for MediumError<E> {
    fn from(value: E) -> Self {
        Self::UnderlyingError(value)
    }
}

impl<E: fmt::Display> fmt::Display for MediumError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoundsError {
                offset,
                length,
                size,
            } => write!(
                f,
                "requested region at {offset} bytes with a length of {length} \
                does not fit inside medium of {size} bytes"
            ),
            Self::UnderlyingError(error) => write!(f, "error accessing underlying medium: {error}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> error::Error for MediumError<E> {}

/// Utility function to centralize [`Medium`] bounds checking.
#[expect(clippy::missing_errors_doc)]
pub fn check_bounds<E>(size: u64, offset: u64, length: u64) -> Result<(), MediumError<E>> {
    let max_offset = offset.checked_add(length).ok_or(MediumError::BoundsError {
        offset,
        length,
        size,
    })?;
    if max_offset > size {
        return Err(MediumError::BoundsError {
            offset,
            length,
            size,
        });
    }

    Ok(())
}

impl Medium for [u8] {
    type Error = core::convert::Infallible;

    fn size(&self) -> u64 {
        usize_to_u64(self.len())
    }

    fn read_slice(&self, offset: u64, slice: &mut [u8]) -> Result<(), MediumError<Self::Error>> {
        check_bounds(self.size(), offset, usize_to_u64(slice.len()))?;

        // Bounds checking succeeded against a `usize` length, so the offset fits in a `usize`.
        let start = u64_to_usize(offset).unwrap_or(self.len());
        slice.copy_from_slice(&self[start..][..slice.len()]);
        Ok(())
    }
}

impl<M: Medium + ?Sized> Medium for &M {
    type Error = M::Error;

    fn size(&self) -> u64 {
        M::size(*self)
    }

    fn read_byte(&self, offset: u64) -> Result<u8, MediumError<Self::Error>> {
        M::read_byte(*self, offset)
    }

    fn read_slice(&self, offset: u64, slice: &mut [u8]) -> Result<(), MediumError<Self::Error>> {
        M::read_slice(*self, offset, slice)
    }
}

/// A window over a section's bytes that behaves as if it were zero-extended to `size` bytes.
///
/// Reads past the end of the backing bytes but within `size` produce zeros, which is how the
/// virtual (loader mapped) view of a section is exposed without materializing the padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectionView<'data> {
    /// The bytes backed by the file.
    bytes: &'data [u8],
    /// The logical size of the view.
    size: u64,
}

impl<'data> SectionView<'data> {
    /// Creates a [`SectionView`] over exactly `bytes`.
    pub fn new(bytes: &'data [u8]) -> Self {
        Self {
            bytes,
            size: usize_to_u64(bytes.len()),
        }
    }

    /// Creates a [`SectionView`] over `bytes` that is zero-extended up to `size` bytes.
    ///
    /// A `size` smaller than `bytes.len()` leaves the view at `bytes.len()`.
    pub fn zero_extended(bytes: &'data [u8], size: u64) -> Self {
        Self {
            bytes,
            size: size.max(usize_to_u64(bytes.len())),
        }
    }

    /// Returns the bytes backed by the file.
    pub fn backed_bytes(&self) -> &'data [u8] {
        self.bytes
    }

    /// Returns the number of bytes available from `offset` to the end of the view.
    pub fn remaining(&self, offset: u64) -> u64 {
        self.size.saturating_sub(offset)
    }

    /// Returns the bytes of the C string starting at `offset`, excluding its terminator.
    ///
    /// Returns [`None`] if no terminator occurs before the end of the view. The implicit zero
    /// padding of a zero-extended view counts as a terminator.
    pub fn c_str_at(&self, offset: u64) -> Option<&'data [u8]> {
        if offset >= self.size {
            return None;
        }

        let start = u64_to_usize(offset)?;
        if start >= self.bytes.len() {
            // Entirely within the zero padding.
            return Some(&[]);
        }

        let tail = &self.bytes[start..];
        match tail.iter().position(|&byte| byte == 0) {
            Some(length) => Some(&tail[..length]),
            None if self.size > usize_to_u64(self.bytes.len()) => Some(tail),
            None => None,
        }
    }
}

impl Medium for SectionView<'_> {
    type Error = core::convert::Infallible;

    fn size(&self) -> u64 {
        self.size
    }

    fn read_slice(&self, offset: u64, slice: &mut [u8]) -> Result<(), MediumError<Self::Error>> {
        check_bounds(self.size, offset, usize_to_u64(slice.len()))?;

        slice.fill(0);
        let Some(start) = u64_to_usize(offset) else {
            return Ok(());
        };
        if start < self.bytes.len() {
            let backed = &self.bytes[start..];
            let count = backed.len().min(slice.len());
            slice[..count].copy_from_slice(&backed[..count]);
        }

        Ok(())
    }
}

#[cfg(feature = "std")]
pub use stream::StreamMedium;

#[cfg(feature = "std")]
mod stream {
    //! [`Medium`] adapter for seekable [`std::io`] streams.

    use std::{
        cell::RefCell,
        io::{self, Read, Seek, SeekFrom},
    };

    use crate::medium::{Medium, MediumError, check_bounds};
    use crate::util::usize_to_u64;

    /// A [`Medium`] backed by a seekable stream.
    ///
    /// Every read seeks to an absolute offset. The cursor position that was current when the
    /// [`StreamMedium`] was created is restored when it is dropped, on both success and failure
    /// paths of whatever parsing used it.
    pub struct StreamMedium<'stream, R: Read + Seek> {
        /// The borrowed stream.
        stream: RefCell<&'stream mut R>,
        /// The cursor position at creation.
        saved_position: u64,
        /// The total length of the stream.
        size: u64,
    }

    impl<'stream, R: Read + Seek> StreamMedium<'stream, R> {
        /// Wraps `stream`, recording its current position and measuring its length.
        ///
        /// # Errors
        ///
        /// Returns any [`io::Error`] that occurs while querying the stream position or length.
        pub fn new(stream: &'stream mut R) -> io::Result<Self> {
            let saved_position = stream.stream_position()?;
            let size = match stream.seek(SeekFrom::End(0)) {
                Ok(size) => size,
                Err(error) => {
                    let _ = stream.seek(SeekFrom::Start(saved_position));
                    return Err(error);
                }
            };
            stream.seek(SeekFrom::Start(saved_position))?;

            Ok(Self {
                stream: RefCell::new(stream),
                saved_position,
                size,
            })
        }
    }

    impl<R: Read + Seek> Medium for StreamMedium<'_, R> {
        type Error = io::Error;

        fn size(&self) -> u64 {
            self.size
        }

        fn read_slice(
            &self,
            offset: u64,
            slice: &mut [u8],
        ) -> Result<(), MediumError<Self::Error>> {
            check_bounds(self.size, offset, usize_to_u64(slice.len()))?;

            let mut stream = self.stream.borrow_mut();
            stream.seek(SeekFrom::Start(offset))?;
            stream.read_exact(slice)?;
            Ok(())
        }
    }

    impl<R: Read + Seek> Drop for StreamMedium<'_, R> {
        fn drop(&mut self) {
            let stream = self.stream.get_mut();
            if let Err(error) = stream.seek(SeekFrom::Start(self.saved_position)) {
                log::warn!("failed to restore stream position: {error}");
            }
        }
    }
}
