//! Storage ownership tagging.
//!
//! A buffer's element storage is in exactly one of three states. The
//! state decides which primitive may touch it: external storage is never
//! reallocated or freed, heap storage always is, and unallocated storage
//! has no memory at all.

#![allow(unsafe_code)]

use std::fmt;
use std::ptr::NonNull;

/// Where a buffer's elements currently live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// No storage yet: capacity 0, length 0.
    Unallocated,
    /// Caller-owned region; borrowed, never resized or freed.
    External,
    /// Allocated through the buffer's allocator and owned by it.
    Heap,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unallocated => "unallocated",
            Self::External => "external",
            Self::Heap => "heap",
        };
        f.write_str(name)
    }
}

/// Element storage plus the capacity it was created with.
///
/// `ptr` is always aligned for `T` and valid for `capacity` slots.
pub(crate) enum Storage<T> {
    Unallocated,
    External { ptr: NonNull<T>, capacity: usize },
    Heap { ptr: NonNull<T>, capacity: usize },
}

impl<T> Storage<T> {
    pub(crate) fn kind(&self) -> StorageKind {
        match self {
            Self::Unallocated => StorageKind::Unallocated,
            Self::External { .. } => StorageKind::External,
            Self::Heap { .. } => StorageKind::Heap,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        match *self {
            Self::Unallocated => 0,
            Self::External { capacity, .. } | Self::Heap { capacity, .. } => capacity,
        }
    }

    pub(crate) fn ptr(&self) -> Option<NonNull<T>> {
        match *self {
            Self::Unallocated => None,
            Self::External { ptr, .. } | Self::Heap { ptr, .. } => Some(ptr),
        }
    }

    /// The first `len` slots as a slice.
    ///
    /// # Safety
    ///
    /// `len` must not exceed the capacity, and every slot below `len` must
    /// have been written.
    pub(crate) unsafe fn slice(&self, len: usize) -> &[T] {
        match self.ptr() {
            // SAFETY: caller guarantees `len` initialised slots behind ptr.
            Some(ptr) => unsafe { std::slice::from_raw_parts(ptr.as_ptr(), len) },
            None => &[],
        }
    }

    /// Mutable counterpart of [`Storage::slice`].
    ///
    /// # Safety
    ///
    /// Same as [`Storage::slice`].
    pub(crate) unsafe fn slice_mut(&mut self, len: usize) -> &mut [T] {
        match self.ptr() {
            // SAFETY: caller guarantees `len` initialised slots behind ptr,
            // and `&mut self` makes the access unique.
            Some(ptr) => unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), len) },
            None => &mut [],
        }
    }
}
