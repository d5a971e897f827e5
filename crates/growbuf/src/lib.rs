//! Growable array with optional caller-supplied backing storage.
//!
//! A [`GrowBuf`] behaves like a vector of `Copy` elements that can start
//! inside memory the caller already owns (a stack array, a static, a slab
//! carved out elsewhere) and moves to the heap only when it outgrows it.
//! This crate contains `unsafe` code only in the modules that touch raw
//! memory (`buffer`, `storage`, `raw`).
//!
//! # Architecture
//!
//! ```text
//! GrowBuf<'a, T, A>
//! ├── len
//! ├── Storage<T>            tagged: Unallocated | External | Heap
//! │   └── External borrows the caller's region for 'a, never freed
//! ├── A: RawAlloc           allocate / reallocate / deallocate, failure = None
//! └── growth                needs_growth + grown_capacity (cap + cap/2 + 1)
//! ```
//!
//! # Example
//!
//! ```
//! use std::mem::MaybeUninit;
//!
//! use growbuf::{layout, BufError, GrowBuf};
//!
//! #[repr(C, align(16))]
//! struct Region([MaybeUninit<u8>; layout::size_for::<u32>(8)]);
//!
//! let mut region = Region([MaybeUninit::uninit(); layout::size_for::<u32>(8)]);
//! let mut buf = GrowBuf::<u32>::attach_bytes(&mut region.0)?;
//! assert_eq!(buf.capacity(), 8);
//!
//! for i in 0..7 {
//!     buf.push(i)?;
//! }
//! assert!(buf.is_external());
//!
//! // The push that would leave no spare slot moves the data to the heap.
//! buf.push(7)?;
//! assert!(buf.is_heap());
//! assert_eq!(buf.as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7]);
//! # Ok::<(), BufError>(())
//! ```
//!
//! # Failure
//!
//! Growth never aborts. If the allocator refuses, the operation returns
//! [`BufError::AllocationFailed`] and the buffer keeps its previous
//! storage, length and contents.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod error;
pub mod growth;
pub mod layout;
pub mod raw;
pub mod storage;

// Public re-exports for the primary API surface.
pub use buffer::GrowBuf;
pub use error::{BufError, GrowFailure};
pub use layout::{Header, HEADER_SIZE};
pub use raw::{Global, RawAlloc};
pub use storage::StorageKind;

#[cfg(doctest)]
#[doc = include_str!("../README.md")]
pub struct ReadmeDoctests;
