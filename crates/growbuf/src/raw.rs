//! Raw allocation primitives behind heap-owned storage.
//!
//! [`RawAlloc`] is the seam between the buffer engine and the system
//! allocator. Every method reports failure as `None` instead of aborting,
//! which is what lets growth fail without losing data.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Source of heap memory for a [`GrowBuf`](crate::GrowBuf).
///
/// The buffer never asks for zero-sized blocks and always hands back
/// blocks with the layout they were obtained with.
///
/// # Safety
///
/// Implementors must return blocks that are valid for reads and writes of
/// the requested layout. `reallocate` must preserve the first
/// `min(old.size(), new_size)` bytes, and on failure must leave the
/// original block allocated and unchanged.
pub unsafe trait RawAlloc {
    /// Allocate a block for `layout`, or `None` if memory is unavailable.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Resize a block to `new_size` bytes, keeping its alignment.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator for `old`, and
    /// `new_size` must be non-zero and form a valid layout with
    /// `old.align()`.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>>;

    /// Return a block to the allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator for `layout` and
    /// must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process-wide allocator from `std::alloc`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Global;

unsafe impl RawAlloc for Global {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: layout has a non-zero size.
        NonNull::new(unsafe { alloc::alloc(layout) })
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: forwarded caller contract; std::alloc::realloc leaves the
        // block intact when it returns null.
        NonNull::new(unsafe { alloc::realloc(ptr.as_ptr(), old, new_size) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

unsafe impl<A: RawAlloc + ?Sized> RawAlloc for &A {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate(layout)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).reallocate(ptr, old, new_size) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded caller contract.
        unsafe { (**self).deallocate(ptr, layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_request_is_refused() {
        let layout = Layout::from_size_align(0, 8).unwrap();
        assert!(Global.allocate(layout).is_none());
    }

    #[test]
    fn allocate_reallocate_deallocate_preserves_prefix() {
        let old = Layout::array::<u32>(4).unwrap();
        let ptr = Global.allocate(old).unwrap();
        unsafe {
            let words = ptr.cast::<u32>().as_ptr();
            for i in 0..4 {
                words.add(i).write(i as u32 * 10);
            }
            let grown = Global
                .reallocate(ptr, old, Layout::array::<u32>(16).unwrap().size())
                .unwrap();
            let words = grown.cast::<u32>().as_ptr();
            for i in 0..4 {
                assert_eq!(words.add(i).read(), i as u32 * 10);
            }
            Global.deallocate(grown, Layout::array::<u32>(16).unwrap());
        }
    }

    #[test]
    fn reference_forwards_to_allocator() {
        let alloc = &Global;
        let layout = Layout::new::<u64>();
        let ptr = alloc.allocate(layout).unwrap();
        unsafe { alloc.deallocate(ptr, layout) };
    }
}
