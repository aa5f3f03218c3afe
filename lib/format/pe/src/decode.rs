//! Little-endian decoding of PE values and structures.
//!
//! Every on-disk structure is decoded field by field at its `#[repr(C)]` offset, so values are
//! read byte-exact regardless of host endianness or alignment.

use crate::{
    medium::{Medium, MediumError, check_bounds},
    util::usize_to_u64,
};

/// A value that can be decoded from a [`Medium`] at an arbitrary offset.
///
/// # Implementors
///
/// Implementations must read exactly [`Decode::SIZE`] bytes starting at `offset`.
pub trait Decode: Sized {
    /// The number of bytes occupied by the encoded value.
    const SIZE: u64;

    /// Decodes the value located at `offset` bytes into `medium`.
    ///
    /// # Errors
    ///
    /// Returns a [`MediumError`] when the [`Medium`] cannot provide [`Decode::SIZE`] bytes at
    /// `offset`.
    fn decode<M: Medium + ?Sized>(medium: &M, offset: u64) -> Result<Self, MediumError<M::Error>>;
}

/// Reads an array of bytes located at `offset` bytes from the start of `medium`.
fn read_array<M: Medium + ?Sized, const N: usize>(
    medium: &M,
    offset: u64,
) -> Result<[u8; N], MediumError<M::Error>> {
    let mut arr = [0; N];
    medium.read_slice(offset, &mut arr)?;
    Ok(arr)
}

/// Generates [`Decode`] implementations for primitive integers.
macro_rules! decode_primitive {
    ($($kind:ident),* $(,)?) => {
        $(
            impl Decode for $kind {
                const SIZE: u64 = usize_to_u64(core::mem::size_of::<$kind>());

                fn decode<M: Medium + ?Sized>(
                    medium: &M,
                    offset: u64,
                ) -> Result<Self, MediumError<M::Error>> {
                    read_array(medium, offset).map($kind::from_le_bytes)
                }
            }
        )*
    };
}

decode_primitive!(u8, u16, u32, u64);

impl<T: Decode + Copy + Default, const N: usize> Decode for [T; N] {
    const SIZE: u64 = T::SIZE * usize_to_u64(N);

    fn decode<M: Medium + ?Sized>(medium: &M, offset: u64) -> Result<Self, MediumError<M::Error>> {
        check_bounds(medium.size(), offset, Self::SIZE)?;

        let mut values = [T::default(); N];
        let mut element_offset = offset;
        for value in &mut values {
            *value = T::decode(medium, element_offset)?;
            element_offset += T::SIZE;
        }

        Ok(values)
    }
}

/// Generates a [`Decode`] implementation for a `#[repr(C)]` structure by decoding each listed
/// field at its `offset_of!` position. The field list must be complete.
macro_rules! decode_struct {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::decode::Decode for $ty {
            const SIZE: u64 = $crate::util::usize_to_u64(core::mem::size_of::<$ty>());

            fn decode<M: $crate::medium::Medium + ?Sized>(
                medium: &M,
                offset: u64,
            ) -> Result<Self, $crate::medium::MediumError<M::Error>> {
                $crate::medium::check_bounds(medium.size(), offset, Self::SIZE)?;

                Ok($ty {
                    $(
                        $field: $crate::decode::Decode::decode(
                            medium,
                            offset + $crate::util::usize_to_u64(core::mem::offset_of!($ty, $field)),
                        )?,
                    )*
                })
            }
        }
    };
}

pub(crate) use decode_struct;
