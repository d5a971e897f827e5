//! Allocator and region fixtures.

use std::alloc::Layout;
use std::mem::MaybeUninit;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use growbuf::{Global, RawAlloc};

const UNLIMITED: usize = usize::MAX;

/// Allocator that fails deterministically and counts every call.
///
/// Successful requests are served by [`Global`]. Allocation and
/// reallocation consume one unit of budget each; once the budget is spent
/// (or [`set_failing`](FailingAlloc::set_failing) is on) they return
/// `None` without touching the original block. Deallocation always
/// succeeds. Counters are atomics so the allocator can be shared by
/// reference across buffers.
pub struct FailingAlloc {
    budget: AtomicUsize,
    failing: AtomicBool,
    allocations: AtomicUsize,
    reallocations: AtomicUsize,
    deallocations: AtomicUsize,
    refusals: AtomicUsize,
}

impl FailingAlloc {
    /// An allocator that never fails on its own.
    pub fn new() -> Self {
        Self::with_budget(UNLIMITED)
    }

    /// An allocator that refuses every request.
    pub fn failing() -> Self {
        let alloc = Self::new();
        alloc.set_failing(true);
        alloc
    }

    /// An allocator that serves `succeed_count` requests, then refuses.
    pub fn fail_after(succeed_count: usize) -> Self {
        Self::with_budget(succeed_count)
    }

    fn with_budget(budget: usize) -> Self {
        Self {
            budget: AtomicUsize::new(budget),
            failing: AtomicBool::new(false),
            allocations: AtomicUsize::new(0),
            reallocations: AtomicUsize::new(0),
            deallocations: AtomicUsize::new(0),
            refusals: AtomicUsize::new(0),
        }
    }

    /// Force every following request to fail (or stop forcing it).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Stop failing and lift any remaining budget limit.
    pub fn allow_all(&self) {
        self.set_failing(false);
        self.budget.store(UNLIMITED, Ordering::Relaxed);
    }

    /// Successful `allocate` calls.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Successful `reallocate` calls.
    pub fn reallocations(&self) -> usize {
        self.reallocations.load(Ordering::Relaxed)
    }

    /// `deallocate` calls.
    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::Relaxed)
    }

    /// Requests refused, of either kind.
    pub fn refusals(&self) -> usize {
        self.refusals.load(Ordering::Relaxed)
    }

    /// Blocks handed out and not yet returned.
    pub fn live_blocks(&self) -> usize {
        self.allocations() - self.deallocations()
    }

    fn permit(&self) -> bool {
        let granted = !self.failing.load(Ordering::Relaxed)
            && self
                .budget
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |b| {
                    if b == UNLIMITED {
                        Some(b)
                    } else {
                        b.checked_sub(1)
                    }
                })
                .is_ok();
        if !granted {
            self.refusals.fetch_add(1, Ordering::Relaxed);
        }
        granted
    }
}

impl Default for FailingAlloc {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: every block comes from `Global`, which upholds the contract; a
// refused request never reaches it.
#[allow(unsafe_code)]
unsafe impl RawAlloc for FailingAlloc {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if !self.permit() {
            return None;
        }
        let block = Global.allocate(layout)?;
        self.allocations.fetch_add(1, Ordering::Relaxed);
        Some(block)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        if !self.permit() {
            return None;
        }
        // SAFETY: forwarded caller contract; the block came from Global.
        let block = unsafe { Global.reallocate(ptr, old, new_size) }?;
        self.reallocations.fetch_add(1, Ordering::Relaxed);
        Some(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.deallocations.fetch_add(1, Ordering::Relaxed);
        // SAFETY: forwarded caller contract.
        unsafe { Global.deallocate(ptr, layout) }
    }
}

/// Zeroed byte region aligned to 16 bytes.
///
/// Starting on a 16-byte boundary makes the capacity `attach_bytes`
/// computes equal `(N - HEADER_SIZE) / size_of::<T>()` for any element
/// type with alignment up to 16.
#[repr(C, align(16))]
pub struct AlignedRegion<const N: usize>([MaybeUninit<u8>; N]);

impl<const N: usize> AlignedRegion<N> {
    pub fn new() -> Self {
        Self([MaybeUninit::new(0); N])
    }

    /// The whole region.
    pub fn bytes_mut(&mut self) -> &mut [MaybeUninit<u8>] {
        &mut self.0
    }

    /// The region minus its first `skip` bytes, for misalignment tests.
    pub fn offset_mut(&mut self, skip: usize) -> &mut [MaybeUninit<u8>] {
        &mut self.0[skip..]
    }

    pub fn len(&self) -> usize {
        N
    }

    pub fn is_empty(&self) -> bool {
        N == 0
    }
}

impl<const N: usize> Default for AlignedRegion<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    fn word() -> Layout {
        Layout::new::<u64>()
    }

    #[test]
    fn budget_counts_down_then_refuses() {
        let alloc = FailingAlloc::fail_after(2);
        let a = alloc.allocate(word()).unwrap();
        let b = alloc.allocate(word()).unwrap();
        assert!(alloc.allocate(word()).is_none());
        assert_eq!(alloc.allocations(), 2);
        assert_eq!(alloc.refusals(), 1);
        unsafe {
            alloc.deallocate(a, word());
            alloc.deallocate(b, word());
        }
        assert_eq!(alloc.live_blocks(), 0);
    }

    #[test]
    fn failing_refuses_until_allowed() {
        let alloc = FailingAlloc::failing();
        assert!(alloc.allocate(word()).is_none());
        alloc.allow_all();
        let block = alloc.allocate(word()).unwrap();
        unsafe { alloc.deallocate(block, word()) };
        assert_eq!(alloc.deallocations(), 1);
    }

    #[test]
    fn refused_reallocation_keeps_block() {
        let alloc = FailingAlloc::fail_after(1);
        let block = alloc.allocate(word()).unwrap();
        unsafe {
            block.cast::<u64>().as_ptr().write(0xfeed);
            assert!(alloc.reallocate(block, word(), 64).is_none());
            assert_eq!(block.cast::<u64>().as_ptr().read(), 0xfeed);
            alloc.deallocate(block, word());
        }
        assert_eq!(alloc.reallocations(), 0);
    }

    #[test]
    fn aligned_region_is_aligned() {
        let mut region = AlignedRegion::<64>::new();
        assert_eq!(region.bytes_mut().as_ptr() as usize % 16, 0);
        assert_eq!(region.offset_mut(3).len(), 61);
        assert_eq!(region.len(), 64);
    }
}
