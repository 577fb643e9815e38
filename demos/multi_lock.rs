#![allow(missing_docs)]
//! Transfers between accounts with a deadlock-free multi-lock.
//!
//! Each transfer locks the source and destination together. Threads name
//! the accounts in opposite orders, which would deadlock with nested
//! `lock` calls; the multi-lock releases and retries instead.
//!
//! Usage:
//!   RUST_LOG=trace cargo run --example multi_lock

use lockwork::config::BackoffConfig;
use lockwork::sync::{MultiLock, Mutex, lock_set};
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

const ACCOUNTS: usize = 3;
const TRANSFERS: usize = 1_000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let accounts: Arc<Vec<Mutex<i64>>> =
        Arc::new((0..ACCOUNTS).map(|_| Mutex::new(1_000)).collect());
    let multi = MultiLock::with_config(BackoffConfig::aggressive()).expect("valid backoff");

    let handles: Vec<_> = (0..ACCOUNTS)
        .map(|from| {
            let accounts = Arc::clone(&accounts);
            let multi = multi.clone();
            thread::spawn(move || {
                let to = (from + 1) % ACCOUNTS;
                let mut rounds = 0u64;
                for n in 0..TRANSFERS {
                    // Alternate the order the pair is named in.
                    let pair = if n % 2 == 0 {
                        [&accounts[from], &accounts[to]]
                    } else {
                        [&accounts[to], &accounts[from]]
                    };
                    let mut guards = multi.lock_all(&pair);
                    rounds += u64::from(guards.attempts());
                    let (src, dst) = if n % 2 == 0 { (0, 1) } else { (1, 0) };
                    *guards[src] -= 1;
                    *guards[dst] += 1;
                }
                rounds
            })
        })
        .collect();

    for (from, handle) in handles.into_iter().enumerate() {
        let rounds = handle.join().expect("transfer thread panicked");
        println!("account {from}: {TRANSFERS} transfers in {rounds} rounds");
    }

    let (a, b, c) = lock_set((&accounts[0], &accounts[1], &accounts[2]));
    println!("balances: {} {} {} (total {})", *a, *b, *c, *a + *b + *c);
}
