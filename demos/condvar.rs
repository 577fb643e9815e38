#![allow(missing_docs)]
//! Condition variable rendezvous.
//!
//! Two threads each increment a counter; the one that brings it to two
//! notifies. A third thread waits until the counter equals two and prints
//! it. The waiter may start before or after the incrementers; it never
//! returns early and never misses the notification.
//!
//! Usage:
//!   cargo run --example condvar

use lockwork::sync::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;

const TARGET: u32 = 2;

struct Shared {
    count: Mutex<u32>,
    reached: Condvar,
}

fn add_count_and_notify(shared: &Shared) {
    let mut guard = shared.count.lock();
    *guard += 1;
    if *guard == TARGET {
        shared.reached.notify_one(&guard);
    }
}

fn waiter_thread(shared: &Shared) {
    let mut guard = shared.count.lock();
    shared.reached.wait_until(&mut guard, |count| *count == TARGET);
    println!("Printing count: {}", *guard);
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let shared = Arc::new(Shared {
        count: Mutex::new(0),
        reached: Condvar::new(),
    });

    let handles = [
        thread::spawn({
            let shared = Arc::clone(&shared);
            move || add_count_and_notify(&shared)
        }),
        thread::spawn({
            let shared = Arc::clone(&shared);
            move || waiter_thread(&shared)
        }),
        thread::spawn({
            let shared = Arc::clone(&shared);
            move || add_count_and_notify(&shared)
        }),
    ];

    for handle in handles {
        handle.join().expect("demo thread panicked");
    }
}
