#![allow(missing_docs)]
//! Two threads increment a shared counter under a [`Mutex`].
//!
//! Each thread adds one thousand times. Because every increment happens
//! while holding the lock, the final value is always 2000.
//!
//! Usage:
//!   cargo run --example counter

use lockwork::sync::Mutex;
use std::sync::Arc;
use std::thread;

const THREADS: usize = 2;
const INCREMENTS: u64 = 1_000;

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let count = Arc::new(Mutex::new(0u64));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let count = Arc::clone(&count);
            thread::spawn(move || {
                for _ in 0..INCREMENTS {
                    let mut guard = count.lock();
                    *guard += 1;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("incrementer panicked");
    }

    let total = *count.lock();
    println!("Printing count: {total}");
    assert_eq!(total, THREADS as u64 * INCREMENTS);
}
