// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Auto-trait guarantees of the public types.

use std::future::Ready;

use memoflight::{EntryStatus, Error, Fingerprint, FingerprintError, Memoizer, MemoizerBuilder};
use static_assertions::{assert_impl_all, assert_not_impl_any};

type Lookup = fn(u64) -> Ready<Result<String, std::io::ErrorKind>>;

assert_impl_all!(Memoizer<u64, Lookup>: Send, Sync, std::fmt::Debug);
assert_impl_all!(MemoizerBuilder<u64, Lookup>: Send, Sync, std::fmt::Debug);
assert_impl_all!(Fingerprint: Send, Sync, Copy, Eq, std::hash::Hash, std::fmt::Display);
assert_impl_all!(EntryStatus: Send, Sync, Copy, Eq);
assert_impl_all!(FingerprintError: Send, Sync, Clone, std::error::Error);
assert_impl_all!(Error<std::io::Error>: Send, Sync, std::error::Error);
assert_impl_all!(Error<String>: Clone, std::fmt::Debug, std::fmt::Display);

// A memoizer is shared by reference, never cloned.
assert_not_impl_any!(Memoizer<u64, Lookup>: Clone);

#[test]
fn memoizer_can_be_shared_across_tasks() {
    fn assert_static_send<T: Send + Sync + 'static>(_: &T) {}

    let memo = Memoizer::new(tick::Clock::new_frozen(), (|id: u64| std::future::ready(Ok::<_, std::io::ErrorKind>(id.to_string()))) as Lookup);
    assert_static_send(&std::sync::Arc::new(memo));
}
