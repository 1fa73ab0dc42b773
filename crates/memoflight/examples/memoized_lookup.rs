// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Demonstrates memoizing a slow lookup with a time-to-live.
//!
//! Five concurrent requests for the same user share one lookup. Once the cached value
//! expires, the next request runs the lookup again.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use memoflight::Memoizer;
use tick::Clock;

#[tokio::main]
async fn main() -> Result<(), memoflight::Error<String>> {
    let lookups = Arc::new(AtomicUsize::new(0));

    let memo = Arc::new(
        Memoizer::builder(Clock::new_tokio(), {
            let lookups = Arc::clone(&lookups);
            move |(tenant, user): (String, u64)| {
                let count = lookups.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    println!("  looking up {tenant}/{user} (lookup #{count})");
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    Ok::<_, String>(format!("User(tenant: {tenant}, id: {user}, lookup: {count})"))
                }
            }
        })
        .ttl(Duration::from_millis(500))
        .name("user_lookup")
        .build(),
    );

    println!("Starting 5 concurrent requests for contoso/123...\n");

    let handles: Vec<_> = (1..=5)
        .map(|i| {
            let memo = Arc::clone(&memo);
            tokio::spawn(async move {
                let start = tokio::time::Instant::now();
                let result = memo.call(("contoso".to_string(), 123)).await;
                println!("  [request {i}] {:?} after {:?}", result, start.elapsed());
            })
        })
        .collect();

    for handle in handles {
        if let Err(e) = handle.await {
            eprintln!("request task failed: {e}");
        }
    }

    println!("\nCached: {}", memo.call(("contoso".to_string(), 123)).await?);

    tokio::time::sleep(Duration::from_millis(600)).await;
    println!("After expiry: {}", memo.call(("contoso".to_string(), 123)).await?);

    println!("\nTotal lookups: {}", lookups.load(Ordering::SeqCst));
    Ok(())
}
