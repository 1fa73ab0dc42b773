// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Memoizes async producers with TTL expiry and single-flight call coalescing.
//!
//! A [`Memoizer`] wraps an asynchronous, fallible function (a [`Producer`]) and caches its
//! successful results by argument value:
//!
//! - **Single flight**: concurrent calls with the same arguments share one producer call, and
//!   every caller receives a clone of its outcome, success or failure.
//! - **Time-to-live**: a cached value is served until it is older than the configured TTL.
//!   Without a TTL it is served until flushed.
//! - **Failures are not cached**: the next call after a failure runs the producer again.
//! - **Explicit invalidation**: [`Memoizer::flush`], [`Memoizer::flush_all`] and
//!   [`Memoizer::force`].
//!
//! Arguments are keyed by a [`Fingerprint`] of their serialized form, so any `A: Serialize`
//! works, typically a tuple of the producer's parameters.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! use memoflight::Memoizer;
//! use tick::Clock;
//! # futures::executor::block_on(async {
//!
//! let lookups = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&lookups);
//!
//! let memo = Memoizer::builder(Clock::new_frozen(), move |(region, id): (String, u64)| {
//!     counter.fetch_add(1, Ordering::Relaxed);
//!     async move { Ok::<_, std::io::Error>(format!("{region}/{id}")) }
//! })
//! .ttl(Duration::from_secs(60))
//! .build();
//!
//! let first = memo.call(("eu".to_string(), 7)).await?;
//! let second = memo.call(("eu".to_string(), 7)).await?;
//!
//! assert_eq!(first, "eu/7");
//! assert_eq!(second, "eu/7");
//! assert_eq!(lookups.load(Ordering::Relaxed), 1);
//! # Ok::<(), memoflight::Error<std::io::Error>>(())
//! # });
//! ```
//!
//! # Cancellation and Panic Safety
//!
//! The call that runs the producer may be dropped, or the producer may panic. In both cases
//! the entry is released without caching anything, and one of the waiting calls runs the
//! producer in its place. Waiting calls never hang.
//!
//! # Thread Safety
//!
//! [`Memoizer`] is `Send` and `Sync` when its producer, value and error types are, so it can
//! be shared across runtime threads behind an `Arc`. No lock is held across an `.await`.
//!
//! # Features
//!
//! - **`logs`**: emits a `tracing` event named `memo.event` for every hit, miss, join,
//!   production, failure and flush, when enabled with [`MemoizerBuilder::enable_logs`].
//! - **`tokio`**: enables `tick::Clock::new_tokio` for production wiring.

mod builder;
mod entry;
mod error;
mod fingerprint;
mod memoizer;
mod producer;
mod store;
mod telemetry;

#[doc(inline)]
pub use builder::MemoizerBuilder;
#[doc(inline)]
pub use entry::EntryStatus;
#[doc(inline)]
pub use error::{Error, FingerprintError};
#[doc(inline)]
pub use fingerprint::Fingerprint;
#[doc(inline)]
pub use memoizer::Memoizer;
#[doc(inline)]
pub use producer::Producer;
