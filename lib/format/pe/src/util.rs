//! Arithmetic and scanning primitives shared by every stage of PE parsing.
//!
//! All alignment helpers use wrapping arithmetic: an alignment that overflows the 32-bit range
//! produces a value that later validation rejects instead of a panic.

/// The maximum number of sections an image may declare.
pub const MAXIMUM_NUMBER_OF_SECTIONS: u16 = 0x60;
/// The smallest file alignment accepted when it differs from the section alignment.
pub const MINIMUM_FILE_ALIGNMENT: u32 = 512;
/// The largest raw or virtual size a single section may declare.
pub const TWO_GB: u32 = 0x8000_0000;
/// The largest value representable by a PE `WORD`.
pub const MAX_WORD: u32 = 0xFFFF;

/// Returns `true` if `value` has at most one bit set.
///
/// Zero is reported as a power of two, so callers that must reject a zero alignment do so
/// through a later check.
pub const fn is_power_of_two(value: u32) -> bool {
    value & value.wrapping_sub(1) == 0
}

/// Rounds `value` down to a multiple of `alignment`.
///
/// `alignment` is expected to be a power of two.
pub const fn align_down(value: u32, alignment: u32) -> u32 {
    value & !alignment.wrapping_sub(1)
}

/// Rounds `value` up to a multiple of `alignment`.
///
/// `alignment` is expected to be a power of two. Results that do not fit in 32 bits wrap.
pub const fn align_up(value: u32, alignment: u32) -> u32 {
    if value & alignment.wrapping_sub(1) == 0 {
        value
    } else {
        align_down(value, alignment).wrapping_add(alignment)
    }
}

/// Returns `true` if `a + b` does not overflow a `u32`.
pub const fn is_sum_safe(a: u32, b: u32) -> bool {
    a <= u32::MAX - b
}

/// Returns `true` if a zero element occurs within the first `max_length` bytes of `data`.
///
/// At most `max_length / size_of::<T>()` elements are inspected, and never more than
/// `data.len()`.
pub fn is_null_terminated<T: Copy + Default + PartialEq>(data: &[T], max_length: usize) -> bool {
    let element_size = core::mem::size_of::<T>().max(1);
    let limit = (max_length / element_size).min(data.len());

    data[..limit].contains(&T::default())
}

/// Converts a `usize` into a `u64` relying on compile time code checking.
#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
pub const fn usize_to_u64(value: usize) -> u64 {
    value as u64
}

/// Converts a `u32` into a `usize` relying on compile time code checking.
#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
pub const fn u32_to_usize(value: u32) -> usize {
    value as usize
}

/// Converts a `u64` into a `usize`, returning [`None`] if it does not fit.
pub fn u64_to_usize(value: u64) -> Option<usize> {
    usize::try_from(value).ok()
}

#[cfg(test)]
mod test {
    use super::{align_down, align_up, is_null_terminated, is_power_of_two, is_sum_safe};

    #[test]
    fn power_of_two_detection() {
        for shift in 0..32 {
            assert!(is_power_of_two(1 << shift));
        }

        assert!(!is_power_of_two(3));
        assert!(!is_power_of_two(0x1001));
        assert!(!is_power_of_two(u32::MAX));
    }

    #[test]
    fn zero_counts_as_power_of_two() {
        assert!(is_power_of_two(0));
    }

    #[test]
    fn align_brackets_value() {
        let values = [0, 1, 2, 0x1FF, 0x200, 0x201, 0x1000, 0x12345, 0x7FFF_FFFF, 0xFFFF_0000];

        for shift in 0..16 {
            let alignment = 1u32 << shift;
            for &value in &values {
                let down = align_down(value, alignment);
                let up = align_up(value, alignment);

                assert!(down <= value);
                assert!(value <= up);
                assert!(up - down == 0 || up - down == alignment);
                assert_eq!(down % alignment, 0);
                assert_eq!(up % alignment, 0);
            }
        }
    }

    #[test]
    fn align_keeps_aligned_values() {
        assert_eq!(align_up(0x2000, 0x1000), 0x2000);
        assert_eq!(align_down(0x2000, 0x1000), 0x2000);
        assert_eq!(align_up(0, 0x200), 0);
    }

    #[test]
    fn align_up_wraps_at_top_of_range() {
        assert_eq!(align_up(0xFFFF_F001, 0x1000), 0);
    }

    #[test]
    fn zero_alignment_collapses_to_zero() {
        assert_eq!(align_up(0x1234, 0), 0);
        assert_eq!(align_down(0x1234, 0), 0);
    }

    #[test]
    fn sum_safety_boundaries() {
        assert!(is_sum_safe(0xFFFF_FFFF, 0));
        assert!(!is_sum_safe(0xFFFF_FFFF, 1));
        assert!(is_sum_safe(0x8000_0000, 0x7FFF_FFFF));
        assert!(!is_sum_safe(0x8000_0000, 0x8000_0000));
        assert!(is_sum_safe(0, u32::MAX));
    }

    #[test]
    fn sum_safety_matches_wide_addition() {
        let samples = [0, 1, 0x7FFF_FFFF, 0x8000_0000, 0xFFFF_0000, 0xFFFF_FFFE, u32::MAX];

        for &a in &samples {
            for &b in &samples {
                let fits = u64::from(a) + u64::from(b) <= u64::from(u32::MAX);
                assert_eq!(is_sum_safe(a, b), fits, "{a:#x} + {b:#x}");
            }
        }
    }

    #[test]
    fn null_termination_bounded_by_max_length() {
        let data = b"kernel32.dll\0";

        assert!(is_null_terminated(data.as_slice(), data.len()));
        assert!(!is_null_terminated(data.as_slice(), data.len() - 1));
        assert!(!is_null_terminated(b"abc".as_slice(), 100));
        assert!(!is_null_terminated(b"\0".as_slice(), 0));
    }

    #[test]
    fn null_termination_of_wide_elements() {
        let data: [u16; 4] = [0x41, 0x42, 0, 0x43];

        assert!(is_null_terminated(&data, 6));
        assert!(!is_null_terminated(&data, 5));
    }
}
