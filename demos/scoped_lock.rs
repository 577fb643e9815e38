#![allow(missing_docs)]
//! Scoped locking: the guard releases the mutex when it leaves scope.
//!
//! The worker returns early from its critical section on every other call
//! and panics on one call; the lock is released on each of those paths.
//!
//! Usage:
//!   cargo run --example scoped_lock

use lockwork::sync::Mutex;
use std::panic;
use std::sync::Arc;
use std::thread;

fn add_count(count: &Mutex<u64>, step: u64) -> Result<u64, String> {
    let mut guard = count.lock();
    if step % 2 == 1 {
        // Early return still drops the guard.
        return Err(format!("skipped odd step {step}"));
    }
    if step == 4 {
        panic!("step {step} fails inside the critical section");
    }
    *guard += 1;
    Ok(*guard)
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();
    // Keep the demo output readable; the panic is expected.
    panic::set_hook(Box::new(|info| println!("worker panicked: {info}")));

    let count = Arc::new(Mutex::new(0u64));
    let handles: Vec<_> = (0..6u64)
        .map(|step| {
            let count = Arc::clone(&count);
            thread::spawn(move || add_count(&count, step))
        })
        .collect();

    for (step, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(Ok(value)) => println!("step {step}: count is now {value}"),
            Ok(Err(reason)) => println!("step {step}: {reason}"),
            Err(_) => println!("step {step}: thread unwound, lock released"),
        }
    }

    let _ = panic::take_hook();
    println!("Printing count: {}", *count.lock());
    println!("mutex still locked: {}", count.is_locked());
}
