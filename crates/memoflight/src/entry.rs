// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-key cache entries and their state machine.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_channel::oneshot;
use parking_lot::Mutex;

/// The outcome of one producer call, as handed to every caller of that attempt.
///
/// Failures are shared rather than cloned, so every caller sees the same error value.
pub(crate) type Outcome<V, E> = Result<V, Arc<E>>;

/// A pending caller waiting on the in-flight producer call of an entry.
type Waiter<V, E> = oneshot::Sender<Outcome<V, E>>;

/// The observable state of a cache entry.
///
/// ```text
/// Cold ──► Loading ──► Fresh ──(ttl elapses)──► Stale ──► Loading ──► ...
///             │                                   ▲
///             └──────────────(failure)────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    /// No value has ever been produced for this entry.
    Cold,
    /// A producer call is in flight; callers arriving now wait for it.
    Loading,
    /// A value is cached and has not outlived the time-to-live.
    Fresh,
    /// The cached value has expired, or the last production attempt failed.
    Stale,
}

struct State<V, E> {
    result: Option<V>,
    result_at: Option<Instant>,
    loading: bool,
    waiters: VecDeque<Waiter<V, E>>,
}

impl<V, E> State<V, E> {
    fn is_fresh(&self, ttl: Option<Duration>, now: Instant) -> bool {
        match (self.result_at, ttl) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(result_at), Some(ttl)) => now.saturating_duration_since(result_at) < ttl,
        }
    }

    fn status(&self, ttl: Option<Duration>, now: Instant) -> EntryStatus {
        if self.loading {
            EntryStatus::Loading
        } else if self.is_fresh(ttl, now) {
            EntryStatus::Fresh
        } else if self.result.is_none() {
            EntryStatus::Cold
        } else {
            EntryStatus::Stale
        }
    }
}

/// The cache record for one key.
///
/// All transitions happen under the entry's own lock, which is never held across an
/// `.await`. Waiters are signaled only after the lock is released, so anyone observing the
/// entry after a settlement sees its final state before any waiter resumes.
pub(crate) struct Entry<V, E> {
    state: Mutex<State<V, E>>,
}

/// What a caller should do after being admitted to an entry.
pub(crate) enum Admission<V, E> {
    /// The entry holds a fresh value.
    Hit(V),
    /// A producer call is in flight; await its outcome.
    Join(oneshot::Receiver<Outcome<V, E>>),
    /// The caller is now the executor and must run the producer.
    Execute(ExecutionGuard<V, E>),
}

impl<V, E> Entry<V, E> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                result: None,
                result_at: None,
                loading: false,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// Decides, atomically, whether the caller joins, hits or executes.
    ///
    /// On `Execute` the entry is marked as loading before the lock is released.
    pub(crate) fn admit(self: &Arc<Self>, ttl: Option<Duration>, now: Instant) -> Admission<V, E>
    where
        V: Clone,
    {
        let mut state = self.state.lock();

        if state.loading {
            let (sender, receiver) = oneshot::channel();
            state.waiters.push_back(sender);
            return Admission::Join(receiver);
        }

        if state.is_fresh(ttl, now) {
            if let Some(value) = &state.result {
                return Admission::Hit(value.clone());
            }
        }

        let previous = state.status(ttl, now);
        state.loading = true;

        Admission::Execute(ExecutionGuard {
            entry: Some(Arc::clone(self)),
            previous,
        })
    }

    pub(crate) fn status(&self, ttl: Option<Duration>, now: Instant) -> EntryStatus {
        self.state.lock().status(ttl, now)
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    #[cfg(test)]
    pub(crate) fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Publishes the outcome of a producer call and releases every waiter with it.
    ///
    /// Returns the number of waiters that received the outcome.
    fn settle(&self, outcome: &Outcome<V, E>, now: Instant) -> usize
    where
        V: Clone,
    {
        let waiters = {
            let mut state = self.state.lock();
            match outcome {
                Ok(value) => {
                    state.result = Some(value.clone());
                    state.result_at = Some(now);
                }
                Err(_) => state.result_at = None,
            }
            state.loading = false;
            std::mem::take(&mut state.waiters)
        };

        waiters.into_iter().fold(0, |released, waiter| {
            if waiter.send(outcome.clone()).is_ok() {
                released + 1
            } else {
                released
            }
        })
    }

    /// Clears the loading flag after the executor went away without an outcome.
    ///
    /// Waiters are dropped unsignaled; each of them sees a closed channel and retries.
    fn abandon(&self) {
        let waiters = {
            let mut state = self.state.lock();
            state.loading = false;
            std::mem::take(&mut state.waiters)
        };
        drop(waiters);
    }
}

impl<V, E> fmt::Debug for Entry<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Entry")
            .field("has_result", &state.result.is_some())
            .field("result_at", &state.result_at)
            .field("loading", &state.loading)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

/// Held by the executor while the producer runs.
///
/// Dropping the guard without calling [`settle`](Self::settle) (the executor's future was
/// dropped, or the producer panicked) clears the loading flag so a waiter can take over.
pub(crate) struct ExecutionGuard<V, E> {
    entry: Option<Arc<Entry<V, E>>>,
    previous: EntryStatus,
}

impl<V, E> ExecutionGuard<V, E> {
    /// The status the entry had before this executor took it over.
    pub(crate) fn previous(&self) -> EntryStatus {
        self.previous
    }

    /// Settles the entry with the producer's outcome, returning how many waiters were released.
    pub(crate) fn settle(mut self, outcome: &Outcome<V, E>, now: Instant) -> usize
    where
        V: Clone,
    {
        self.entry.take().map_or(0, |entry| entry.settle(outcome, now))
    }
}

impl<V, E> Drop for ExecutionGuard<V, E> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            entry.abandon();
        }
    }
}

impl<V, E> fmt::Debug for ExecutionGuard<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionGuard")
            .field("armed", &self.entry.is_some())
            .field("previous", &self.previous)
            .finish()
    }
}
