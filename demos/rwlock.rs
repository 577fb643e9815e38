#![allow(missing_docs)]
//! Readers and writers sharing a counter through an [`RwLock`].
//!
//! Four readers print the value they see; two writers each add three. Every
//! printed value is 0, 3 or 6: readers never observe a write in progress.
//!
//! Usage:
//!   cargo run --example rwlock

use lockwork::sync::RwLock;
use std::sync::Arc;
use std::thread;

fn read_value(count: &RwLock<u32>) {
    let guard = count.read();
    println!("Reading value {}", *guard);
}

fn write_value(count: &RwLock<u32>) {
    let mut guard = count.write();
    *guard += 3;
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let count = Arc::new(RwLock::new(0u32));
    let roles = [true, false, true, true, false, true];

    let handles: Vec<_> = roles
        .into_iter()
        .map(|is_reader| {
            let count = Arc::clone(&count);
            thread::spawn(move || {
                if is_reader {
                    read_value(&count);
                } else {
                    write_value(&count);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("demo thread panicked");
    }

    println!("Final value {}", *count.read());
}
