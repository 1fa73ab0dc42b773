// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The entry store: one entry per fingerprint, created on demand.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Fingerprint;
use crate::entry::Entry;

type Entries<V, E> = HashMap<Fingerprint, Arc<Entry<V, E>>, ahash::RandomState>;

/// Keyed storage of cache entries.
///
/// Entries are never evicted automatically; they live until removed. Removing an entry only
/// detaches it from the store: an executor already running against it still settles the
/// detached entry and releases the waiters registered on it.
pub(crate) struct EntryStore<V, E> {
    entries: Mutex<Entries<V, E>>,
}

impl<V, E> EntryStore<V, E> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::default()),
        }
    }

    /// Returns the entry for `key`, inserting a fresh one if absent.
    pub(crate) fn get_or_create(&self, key: Fingerprint) -> Arc<Entry<V, E>> {
        Arc::clone(self.entries.lock().entry(key).or_insert_with(|| Arc::new(Entry::new())))
    }

    pub(crate) fn get(&self, key: Fingerprint) -> Option<Arc<Entry<V, E>>> {
        self.entries.lock().get(&key).map(Arc::clone)
    }

    /// Removes the entry for `key`, returning whether one was present.
    pub(crate) fn remove(&self, key: Fingerprint) -> bool {
        self.entries.lock().remove(&key).is_some()
    }

    /// Removes the entry for `key` unless a producer call is in flight on it.
    ///
    /// Returns whether an entry was removed.
    pub(crate) fn remove_unless_loading(&self, key: Fingerprint) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(&key) {
            Some(entry) if !entry.is_loading() => entries.remove(&key).is_some(),
            _ => false,
        }
    }

    /// Removes every entry, returning how many were removed.
    pub(crate) fn remove_all(&self) -> usize {
        let drained = std::mem::take(&mut *self.entries.lock());
        drained.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<V, E> fmt::Debug for EntryStore<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryStore").field("len", &self.len()).finish()
    }
}
