//! Walk a buffer through attach, growth, reserve, shrink and pop.
//!
//! Run with `RUST_LOG=growbuf=debug` to see each allocation and the move
//! from the attached region to the heap.

use std::mem::MaybeUninit;

use growbuf_bench::{walkthrough, WALKTHROUGH_REGION_BYTES};
use tracing_subscriber::EnvFilter;

#[repr(C, align(16))]
struct Region([MaybeUninit<u8>; WALKTHROUGH_REGION_BYTES]);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== growbuf walkthrough ===\n");
    println!("region: {WALKTHROUGH_REGION_BYTES} bytes\n");

    let mut region = Region([MaybeUninit::uninit(); WALKTHROUGH_REGION_BYTES]);
    let steps = match walkthrough(&mut region.0) {
        Ok(steps) => steps,
        Err(err) => {
            eprintln!("walkthrough failed: {err}");
            std::process::exit(1);
        }
    };

    for step in &steps {
        println!(
            "-- {:<20} capacity {:>4}  len {:>4}  ({})",
            step.label, step.header.capacity, step.header.len, step.storage
        );
    }
}
