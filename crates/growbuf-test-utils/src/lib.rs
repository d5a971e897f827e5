//! Test utilities for growbuf development.
//!
//! - [`FailingAlloc`]: a [`RawAlloc`] that refuses requests on demand
//!   and counts every call, for exercising the fail-soft growth path.
//! - [`AlignedRegion`]: a byte array aligned for any common element
//!   type, for `attach_bytes` tests that need exact capacities.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{AlignedRegion, FailingAlloc};
pub use growbuf::RawAlloc;
