//! Benchmark workloads and the walkthrough driver for growbuf.
//!
//! - [`fill`]: push a run of integers into any buffer
//! - [`walkthrough`]: the canonical push / reserve / shrink / pop sequence
//!   over an attached region, recorded step by step

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::mem::MaybeUninit;

use growbuf::layout;
use growbuf::{BufError, GrowBuf, Header, RawAlloc, StorageKind};

/// Elements the walkthrough's attached region is sized for.
pub const WALKTHROUGH_REGION_ELEMS: usize = 300;

/// Bytes needed for the walkthrough's region.
pub const WALKTHROUGH_REGION_BYTES: usize = layout::size_for::<i32>(WALKTHROUGH_REGION_ELEMS);

/// Push `0..count` onto `buf`.
pub fn fill<A: RawAlloc>(buf: &mut GrowBuf<'_, i32, A>, count: i32) -> Result<(), BufError> {
    for i in 0..count {
        buf.push(i)?;
    }
    Ok(())
}

/// One recorded point in the walkthrough.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub label: &'static str,
    pub header: Header,
    pub storage: StorageKind,
}

impl Step {
    fn record<A: RawAlloc>(label: &'static str, buf: &GrowBuf<'_, i32, A>) -> Self {
        Self {
            label,
            header: buf.header(),
            storage: buf.storage_kind(),
        }
    }
}

/// Run the walkthrough and return a step after each operation.
///
/// Part one pushes 500 integers into a heap buffer. Part two attaches
/// `region` (which must be aligned for `i32` and `usize`), fills it,
/// reserves past it, then alternates pops and shrinks.
pub fn walkthrough(region: &mut [MaybeUninit<u8>]) -> Result<Vec<Step>, BufError> {
    let mut steps = Vec::new();

    let mut heap = GrowBuf::<i32>::new();
    fill(&mut heap, 500)?;
    steps.push(Step::record("push 500 from empty", &heap));
    heap.release();

    let mut buf = GrowBuf::<i32>::attach_bytes(region)?;
    steps.push(Step::record("attach region", &buf));

    fill(&mut buf, 200)?;
    steps.push(Step::record("push 200", &buf));

    buf.reserve(50)?;
    steps.push(Step::record("reserve 50", &buf));

    buf.reserve(200)?;
    steps.push(Step::record("reserve 200", &buf));

    buf.shrink_to_fit()?;
    steps.push(Step::record("shrink", &buf));

    for _ in 0..20 {
        buf.truncate_by(1);
    }
    steps.push(Step::record("pop 20 x 1", &buf));

    buf.shrink_to_fit()?;
    steps.push(Step::record("shrink", &buf));

    for _ in 0..10 {
        buf.truncate_by(3);
    }
    steps.push(Step::record("pop 10 x 3", &buf));

    buf.shrink_to_fit()?;
    steps.push(Step::record("shrink", &buf));

    buf.release();
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(16))]
    struct Region([MaybeUninit<u8>; WALKTHROUGH_REGION_BYTES]);

    fn summary(steps: &[Step]) -> Vec<(&'static str, usize, usize, StorageKind)> {
        steps
            .iter()
            .map(|s| (s.label, s.header.capacity, s.header.len, s.storage))
            .collect()
    }

    #[test]
    fn walkthrough_sequence() {
        let mut region = Region([MaybeUninit::uninit(); WALKTHROUGH_REGION_BYTES]);
        let steps = walkthrough(&mut region.0).unwrap();
        use StorageKind::{External, Heap};
        assert_eq!(
            summary(&steps),
            vec![
                ("push 500 from empty", 709, 500, Heap),
                ("attach region", 300, 0, External),
                ("push 200", 300, 200, External),
                ("reserve 50", 300, 200, External),
                ("reserve 200", 500, 200, Heap),
                ("shrink", 200, 200, Heap),
                ("pop 20 x 1", 200, 180, Heap),
                ("shrink", 180, 180, Heap),
                ("pop 10 x 3", 180, 150, Heap),
                ("shrink", 150, 150, Heap),
            ]
        );
    }

    #[test]
    fn fill_pushes_sequence() {
        let mut buf = GrowBuf::new();
        fill(&mut buf, 5).unwrap();
        assert_eq!(buf.as_slice(), &[0, 1, 2, 3, 4]);
    }
}
