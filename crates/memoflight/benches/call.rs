// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Performance benchmarks for memoflight.
//!
//! Run with: cargo bench -p memoflight
//! Save baseline: cargo bench -p memoflight -- --save-baseline main
//! Compare to baseline: cargo bench -p memoflight -- --baseline main

#![allow(missing_docs, reason = "benchmark code")]

use std::future::Ready;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use criterion::{Criterion, criterion_group, criterion_main};
use memoflight::{Fingerprint, Memoizer};
use tick::Clock;

type Echo = fn(u64) -> Ready<Result<u64, String>>;

static KEY_COUNTER: AtomicU64 = AtomicU64::new(0);

fn echo(id: u64) -> Ready<Result<u64, String>> {
    std::future::ready(Ok(id))
}

fn unique_key() -> u64 {
    KEY_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Cost of deriving a key from a typical argument tuple.
fn bench_fingerprint(c: &mut Criterion) {
    let args = ("tenant-42".to_string(), 7_u64, true);

    c.bench_function("fingerprint_tuple", |b| {
        b.iter(|| Fingerprint::of(std::hint::black_box(&args)));
    });
}

/// A fresh cached value: fingerprint, store lookup, clone.
fn bench_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let memo = Memoizer::new(Clock::new_frozen(), echo as Echo);
    rt.block_on(memo.call(1)).expect("warm-up call failed");

    c.bench_function("hit", |b| {
        b.to_async(&rt).iter(|| memo.call(1));
    });
}

/// Every call misses: entry creation plus a producer call.
fn bench_miss(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let memo = Memoizer::new(Clock::new_frozen(), echo as Echo);

    c.bench_function("miss", |b| {
        b.to_async(&rt).iter(|| memo.call(unique_key()));
    });
}

/// 100 concurrent tasks on the same fresh key, one producer call each round.
fn bench_high_contention(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let memo = Arc::new(Memoizer::new(Clock::new_frozen(), |id: u64| async move {
        tokio::task::yield_now().await;
        Ok::<_, String>(id)
    }));

    c.bench_function("high_contention_100", |b| {
        b.to_async(&rt).iter(|| {
            let memo = Arc::clone(&memo);
            async move {
                let key = unique_key();
                let tasks: Vec<_> = (0..100)
                    .map(|_| {
                        let memo = Arc::clone(&memo);
                        tokio::spawn(async move { memo.call(key).await })
                    })
                    .collect();

                for task in tasks {
                    task.await.expect("Task panicked").expect("producer failed");
                }
            }
        });
    });
}

criterion_group!(benches, bench_fingerprint, bench_hit, bench_miss, bench_high_contention);
criterion_main!(benches);
