//! The growable buffer engine.
//!
//! [`GrowBuf`] owns a length, a tagged `Storage` and an allocator. All
//! capacity changes funnel through one private routine, so the rules for
//! external regions (copy out, never free) and heap blocks (reallocate in
//! place, free on release) live in a single `match`.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, align_of, size_of, MaybeUninit};
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

use tracing::{debug, warn};

use crate::error::{BufError, GrowFailure};
use crate::growth;
use crate::layout::{self, Header, HEADER_SIZE};
use crate::raw::{Global, RawAlloc};
use crate::storage::{Storage, StorageKind};

/// A growable array of `Copy` elements with optional external storage.
///
/// A buffer starts either unallocated ([`GrowBuf::new`]) or inside a
/// caller-supplied region ([`GrowBuf::attach`], [`GrowBuf::attach_bytes`]).
/// When it runs out of room it moves to heap storage obtained from `A`;
/// an external region is copied out of, never resized or freed.
///
/// Elements are copied bit-for-bit and never dropped, hence `T: Copy`.
/// Zero-sized element types are rejected at construction.
///
/// The buffer is not internally synchronised. Every mutation takes
/// `&mut self`, so references into the old storage cannot outlive a
/// reallocation.
pub struct GrowBuf<'a, T, A: RawAlloc = Global> {
    storage: Storage<T>,
    len: usize,
    alloc: A,
    _region: PhantomData<&'a mut [T]>,
}

// SAFETY: the buffer is the only path to its storage, whether owned or
// borrowed for 'a, so it may move between threads with its elements.
unsafe impl<T: Send, A: RawAlloc + Send> Send for GrowBuf<'_, T, A> {}

// SAFETY: `&GrowBuf` only hands out `&[T]`.
unsafe impl<T: Sync, A: RawAlloc + Sync> Sync for GrowBuf<'_, T, A> {}

impl<'a, T: Copy> GrowBuf<'a, T> {
    /// Create an unallocated buffer backed by the global allocator.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    /// Create a buffer with room for at least `capacity` elements.
    ///
    /// A `capacity` of zero yields an unallocated buffer.
    pub fn with_capacity(capacity: usize) -> Result<Self, BufError> {
        let mut buf = Self::new();
        if capacity > 0 {
            buf.reserve(capacity)?;
        }
        Ok(buf)
    }

    /// Start a buffer inside caller-owned typed slots.
    ///
    /// The buffer begins empty with capacity `slots.len()`. The slots stay
    /// borrowed for `'a` and are never freed by the buffer.
    pub fn attach(slots: &'a mut [MaybeUninit<T>]) -> Result<Self, BufError> {
        Self::attach_in(slots, Global)
    }

    /// Start a buffer inside a caller-owned byte region.
    ///
    /// The first [`HEADER_SIZE`] bytes are reserved; elements follow at
    /// the next address aligned for `T`. Size regions with
    /// [`size_for`](crate::layout::size_for).
    ///
    /// The region is taken as `MaybeUninit<u8>` because element writes
    /// leave any padding bytes of `T` uninitialised.
    pub fn attach_bytes(region: &'a mut [MaybeUninit<u8>]) -> Result<Self, BufError> {
        Self::attach_bytes_in(region, Global)
    }
}

impl<T: Copy> Default for GrowBuf<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T, A: RawAlloc> GrowBuf<'a, T, A> {
    /// Number of elements the current storage can hold.
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Where the elements currently live.
    pub fn storage_kind(&self) -> StorageKind {
        self.storage.kind()
    }

    /// Whether the elements live in a caller-supplied region.
    pub fn is_external(&self) -> bool {
        self.storage.kind() == StorageKind::External
    }

    /// Whether the elements live in heap storage owned by the buffer.
    pub fn is_heap(&self) -> bool {
        self.storage.kind() == StorageKind::Heap
    }

    /// Snapshot of capacity and length.
    pub fn header(&self) -> Header {
        Header {
            capacity: self.capacity(),
            len: self.len,
        }
    }

    /// The allocator used for heap storage.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// The live elements.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: slots below `len` are always initialised and len <= capacity.
        unsafe { self.storage.slice(self.len) }
    }

    /// The live elements, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as for `as_slice`.
        unsafe { self.storage.slice_mut(self.len) }
    }

    /// Free heap storage or detach external storage.
    ///
    /// Afterwards the buffer is unallocated with length 0 and may be
    /// reused. Releasing an unallocated buffer does nothing, so calling
    /// this twice is harmless. Dropping the buffer releases it too.
    pub fn release(&mut self) {
        match mem::replace(&mut self.storage, Storage::Unallocated) {
            Storage::Heap { ptr, capacity } => {
                // The layout was valid when the block was obtained.
                if let Ok(layout) = layout::array::<T>(capacity) {
                    // SAFETY: ptr came from `self.alloc` with this layout and
                    // is unreachable now that storage is Unallocated.
                    unsafe { self.alloc.deallocate(ptr.cast(), layout) };
                }
                debug!(capacity, "heap storage released");
            }
            Storage::External { capacity, .. } => {
                debug!(capacity, "external region detached");
            }
            Storage::Unallocated => {}
        }
        self.len = 0;
    }
}

impl<'a, T: Copy, A: RawAlloc> GrowBuf<'a, T, A> {
    /// Create an unallocated buffer that allocates from `alloc`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    pub fn new_in(alloc: A) -> Self {
        assert_sized::<T>();
        Self {
            storage: Storage::Unallocated,
            len: 0,
            alloc,
            _region: PhantomData,
        }
    }

    /// [`GrowBuf::attach`] with a custom allocator for later growth.
    pub fn attach_in(slots: &'a mut [MaybeUninit<T>], alloc: A) -> Result<Self, BufError> {
        assert_sized::<T>();
        if slots.is_empty() {
            return Err(BufError::InsufficientBuffer {
                provided: 0,
                required: size_of::<T>(),
            });
        }
        let capacity = slots.len();
        let ptr = NonNull::from(slots).cast::<T>();
        Ok(Self::external(ptr, capacity, alloc))
    }

    /// [`GrowBuf::attach_bytes`] with a custom allocator for later growth.
    pub fn attach_bytes_in(region: &'a mut [MaybeUninit<u8>], alloc: A) -> Result<Self, BufError> {
        assert_sized::<T>();
        let provided = region.len();
        let required = layout::size_for::<T>(1);
        if provided < required {
            return Err(BufError::InsufficientBuffer { provided, required });
        }

        let pad = region[HEADER_SIZE..].as_ptr().align_offset(align_of::<T>());
        let capacity = (provided - HEADER_SIZE)
            .checked_sub(pad)
            .map_or(0, |usable| usable / size_of::<T>());
        if capacity == 0 {
            return Err(BufError::InsufficientBuffer {
                provided,
                required: required.saturating_add(pad),
            });
        }

        let ptr = NonNull::from(&mut region[HEADER_SIZE + pad..]).cast::<T>();
        Ok(Self::external(ptr, capacity, alloc))
    }

    fn external(ptr: NonNull<T>, capacity: usize, alloc: A) -> Self {
        debug!(capacity, elem_size = size_of::<T>(), "attached external region");
        Self {
            storage: Storage::External { ptr, capacity },
            len: 0,
            alloc,
            _region: PhantomData,
        }
    }

    /// Append `value`, growing the storage if needed.
    ///
    /// On failure nothing is written and the buffer is unchanged.
    pub fn push(&mut self, value: T) -> Result<(), BufError> {
        let base = self.ensure_capacity(1)?;
        // SAFETY: ensure_capacity leaves at least one free slot at `len`.
        unsafe { base.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        let last = self.as_slice().last().copied()?;
        self.len -= 1;
        Some(last)
    }

    /// Drop up to `count` elements from the end.
    ///
    /// Saturates at zero. Capacity is kept and the removed slots are not
    /// overwritten; the next push reuses them.
    pub fn truncate_by(&mut self, count: usize) {
        self.len = self.len.saturating_sub(count);
    }

    /// Make room for `additional` more elements without changing length.
    ///
    /// Zero on an allocated buffer is a no-op; on an unallocated buffer it
    /// allocates a single slot. On failure the buffer is unchanged.
    pub fn reserve(&mut self, additional: usize) -> Result<(), BufError> {
        if additional == 0 && self.storage.ptr().is_some() {
            return Ok(());
        }
        self.ensure_capacity(additional).map(|_| ())
    }

    /// Reduce heap capacity to the current length.
    ///
    /// External and unallocated storage are left alone. A heap buffer with
    /// no elements releases its block and becomes unallocated. On failure
    /// the buffer is unchanged.
    pub fn shrink_to_fit(&mut self) -> Result<(), BufError> {
        let Storage::Heap { capacity, .. } = self.storage else {
            return Ok(());
        };
        if self.len == capacity {
            return Ok(());
        }
        if self.len == 0 {
            self.release();
            return Ok(());
        }
        self.resize_storage(self.len).map(|_| ())
    }

    /// Consuming form of [`GrowBuf::reserve`].
    ///
    /// On failure the untouched buffer comes back inside the error.
    pub fn reserved(mut self, additional: usize) -> Result<Self, GrowFailure<Self>> {
        match self.reserve(additional) {
            Ok(()) => Ok(self),
            Err(error) => Err(GrowFailure::new(self, error)),
        }
    }

    /// Consuming form of [`GrowBuf::shrink_to_fit`].
    pub fn shrunk(mut self) -> Result<Self, GrowFailure<Self>> {
        match self.shrink_to_fit() {
            Ok(()) => Ok(self),
            Err(error) => Err(GrowFailure::new(self, error)),
        }
    }

    /// Grow if `additional` more elements would leave no spare slot.
    ///
    /// Returns the element base pointer of the (possibly new) storage.
    fn ensure_capacity(&mut self, additional: usize) -> Result<NonNull<T>, BufError> {
        let capacity = self.capacity();
        if let Some(base) = self.storage.ptr() {
            if !growth::needs_growth(self.len, capacity, additional) {
                return Ok(base);
            }
        }
        let target = growth::grown_capacity(capacity, additional).ok_or(
            BufError::CapacityOverflow {
                requested: capacity.saturating_add(additional),
            },
        )?;
        self.resize_storage(target)
    }

    /// Move the elements into heap storage of exactly `new_capacity` slots.
    fn resize_storage(&mut self, new_capacity: usize) -> Result<NonNull<T>, BufError> {
        debug_assert!(new_capacity > 0 && new_capacity >= self.len);
        let new_layout = layout::array::<T>(new_capacity)?;

        let ptr = match self.storage {
            Storage::Unallocated => {
                let block = self
                    .alloc
                    .allocate(new_layout)
                    .ok_or_else(|| self.refused(new_layout))?;
                debug!(capacity = new_capacity, "heap storage allocated");
                block.cast::<T>()
            }
            Storage::External {
                ptr: region,
                capacity,
            } => {
                let block = self
                    .alloc
                    .allocate(new_layout)
                    .ok_or_else(|| self.refused(new_layout))?
                    .cast::<T>();
                // SAFETY: the first `len` region slots are initialised, the
                // fresh block has room for new_capacity >= len slots, and a
                // new allocation cannot overlap caller memory.
                unsafe { ptr::copy_nonoverlapping(region.as_ptr(), block.as_ptr(), self.len) };
                debug!(
                    from = capacity,
                    to = new_capacity,
                    len = self.len,
                    "external region outgrown, moved to heap"
                );
                block
            }
            Storage::Heap { ptr, capacity } => {
                let old_layout = layout::array::<T>(capacity)?;
                // SAFETY: ptr came from `self.alloc` with old_layout, and the
                // new size is non-zero with the same alignment.
                let block = unsafe {
                    self.alloc
                        .reallocate(ptr.cast(), old_layout, new_layout.size())
                }
                .ok_or_else(|| self.refused(new_layout))?;
                debug!(
                    from = capacity,
                    to = new_capacity,
                    len = self.len,
                    "heap storage resized"
                );
                block.cast::<T>()
            }
        };

        self.storage = Storage::Heap {
            ptr,
            capacity: new_capacity,
        };
        Ok(ptr)
    }

    fn refused(&self, layout: Layout) -> BufError {
        warn!(
            requested_bytes = layout.size(),
            capacity = self.capacity(),
            len = self.len,
            storage = %self.storage.kind(),
            "allocation refused, buffer left unchanged"
        );
        BufError::AllocationFailed {
            requested_bytes: layout.size(),
        }
    }
}

fn assert_sized<T>() {
    assert!(
        size_of::<T>() != 0,
        "GrowBuf does not support zero-sized element types"
    );
}

impl<T, A: RawAlloc> Drop for GrowBuf<'_, T, A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T, A: RawAlloc> Deref for GrowBuf<'_, T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: RawAlloc> DerefMut for GrowBuf<'_, T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug, A: RawAlloc> fmt::Debug for GrowBuf<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrowBuf")
            .field("storage", &self.storage_kind())
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("elements", &self.as_slice())
            .finish()
    }
}
