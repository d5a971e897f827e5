//! Header and region sizing.
//!
//! A caller-supplied byte region is laid out as a fixed-size header
//! followed by element slots:
//!
//! ```text
//! | Header (HEADER_SIZE bytes) | pad to align_of::<T>() | T | T | ... |
//! ```
//!
//! The buffer tracks its header out of band, but the bytes are still
//! reserved so that region sizes computed with [`size_for`] mean the same
//! thing regardless of where the bookkeeping lives.

use std::alloc::Layout;
use std::mem::size_of;

use crate::error::BufError;

/// Bookkeeping for one buffer: how many slots exist and how many are live.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Header {
    /// Number of element slots in the current storage.
    pub capacity: usize,
    /// Number of live elements; never exceeds `capacity`.
    pub len: usize,
}

/// Bytes reserved for the header at the front of an attached byte region.
pub const HEADER_SIZE: usize = size_of::<Header>();

/// Byte length of a region that holds exactly `count` elements of `T`.
///
/// Assumes the region starts on an address aligned for both `T` and
/// `usize`, which is what [`capacity_for`] expects as well.
///
/// # Panics
///
/// Panics on arithmetic overflow (at compile time when used in a const
/// context).
pub const fn size_for<T>(count: usize) -> usize {
    size_of::<T>() * count + HEADER_SIZE
}

/// Number of `T` slots an aligned region of `byte_len` bytes provides.
///
/// Returns `None` when the region cannot hold the header plus at least
/// one element, or when `T` is zero-sized.
pub const fn capacity_for<T>(byte_len: usize) -> Option<usize> {
    let elem = size_of::<T>();
    if elem == 0 || byte_len < elem + HEADER_SIZE {
        return None;
    }
    Some((byte_len - HEADER_SIZE) / elem)
}

/// Allocation layout for `capacity` elements of `T`.
pub(crate) fn array<T>(capacity: usize) -> Result<Layout, BufError> {
    Layout::array::<T>(capacity).map_err(|_| BufError::CapacityOverflow {
        requested: capacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_two_words() {
        assert_eq!(HEADER_SIZE, 2 * size_of::<usize>());
    }

    #[test]
    fn size_for_adds_header() {
        assert_eq!(size_for::<i32>(30), 30 * 4 + HEADER_SIZE);
        assert_eq!(size_for::<u64>(0), HEADER_SIZE);
    }

    #[test]
    fn capacity_for_inverts_size_for() {
        for count in 1..64 {
            assert_eq!(capacity_for::<i32>(size_for::<i32>(count)), Some(count));
            assert_eq!(capacity_for::<[u8; 3]>(size_for::<[u8; 3]>(count)), Some(count));
        }
    }

    #[test]
    fn capacity_for_rounds_down() {
        assert_eq!(capacity_for::<u32>(size_for::<u32>(5) + 3), Some(5));
    }

    #[test]
    fn capacity_for_rejects_region_without_room_for_one_element() {
        assert_eq!(capacity_for::<u64>(HEADER_SIZE + 7), None);
        assert_eq!(capacity_for::<u64>(0), None);
        assert_eq!(capacity_for::<u64>(HEADER_SIZE + 8), Some(1));
    }

    #[test]
    fn capacity_for_rejects_zero_sized_elements() {
        assert_eq!(capacity_for::<()>(1024), None);
    }

    #[test]
    fn array_layout_overflow_is_reported() {
        let err = array::<u64>(usize::MAX).unwrap_err();
        assert_eq!(
            err,
            BufError::CapacityOverflow {
                requested: usize::MAX
            }
        );
    }
}
