// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The memoizer: a producer wrapped with an entry store.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures_channel::oneshot;
use serde::Serialize;
use tick::Clock;

use crate::builder::MemoizerBuilder;
use crate::entry::{Admission, EntryStatus, ExecutionGuard};
use crate::store::EntryStore;
use crate::telemetry::{MemoActivity, MemoTelemetry};
use crate::{Error, Fingerprint, FingerprintError, Producer};

/// How call arguments map to cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keying {
    /// Each distinct serialized argument value gets its own entry.
    PerArguments,
    /// Every call shares one entry, whatever its arguments.
    Single,
}

/// Memoizes an asynchronous producer.
///
/// Calls with the same arguments share one cached result for as long as it is fresh. While a
/// producer call is in flight for some arguments, further calls with those arguments wait for
/// it instead of starting their own, and all of them receive a clone of its outcome.
///
/// Failures are never cached: a failed call is handed to everyone who waited on it, and the
/// next call runs the producer again. The error is shared behind an `Arc` rather than cloned,
/// so any error type works, `std::io::Error` included. Successful values are cloned to every
/// caller, so `P::Value` must be `Clone`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use memoflight::Memoizer;
/// use tick::Clock;
/// # futures::executor::block_on(async {
///
/// let memo = Memoizer::builder(Clock::new_frozen(), |(a, b): (u32, u32)| async move {
///     Ok::<_, String>(a + b)
/// })
/// .ttl(Duration::from_secs(30))
/// .build();
///
/// assert_eq!(memo.call((1, 2)).await.unwrap(), 3);
/// assert_eq!(memo.len(), 1);
/// # });
/// ```
pub struct Memoizer<A, P: Producer<A>> {
    producer: P,
    store: EntryStore<P::Value, P::Error>,
    ttl: Option<Duration>,
    clock: Clock,
    keying: Keying,
    telemetry: MemoTelemetry,
    _args: PhantomData<fn(A)>,
}

impl<A, P: Producer<A>> Memoizer<A, P> {
    /// Starts building a memoizer around `producer`.
    ///
    /// The clock is the time source for freshness checks; use `Clock::new_tokio()` in
    /// production and a `tick::ClockControl` in tests.
    pub fn builder(clock: Clock, producer: P) -> MemoizerBuilder<A, P> {
        MemoizerBuilder::new(clock, producer)
    }

    /// Creates a memoizer whose successful results never expire.
    ///
    /// Equivalent to `Memoizer::builder(clock, producer).build()`.
    pub fn new(clock: Clock, producer: P) -> Self {
        Self::builder(clock, producer).build()
    }

    pub(crate) fn from_parts(
        producer: P,
        clock: Clock,
        ttl: Option<Duration>,
        keying: Keying,
        telemetry: MemoTelemetry,
    ) -> Self {
        Self {
            producer,
            store: EntryStore::new(),
            ttl,
            clock,
            keying,
            telemetry,
            _args: PhantomData,
        }
    }

    /// Returns the memoized result for `args`, running the producer if needed.
    ///
    /// - A fresh cached value is returned immediately.
    /// - If a producer call for the same key is in flight, this call waits for it and returns
    ///   a clone of its outcome.
    /// - Otherwise this call runs the producer, caches a success, and hands the outcome to
    ///   every call that queued up meanwhile.
    ///
    /// If the call running the producer is dropped or panics, one of the waiting calls takes
    /// over and runs the producer itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Producer`] when the producer fails, and [`Error::Fingerprint`] when
    /// `args` cannot be serialized into a key.
    pub async fn call(&self, args: A) -> Result<P::Value, Error<P::Error>>
    where
        A: Serialize,
        P::Value: Clone,
    {
        let key = self.fingerprint(&args)?;
        self.call_keyed(key, args).await
    }

    /// Discards the cached value for `args`, then calls the producer.
    ///
    /// If a producer call for the same key is already in flight, it is joined instead of
    /// starting a second one.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub async fn force(&self, args: A) -> Result<P::Value, Error<P::Error>>
    where
        A: Serialize,
        P::Value: Clone,
    {
        let key = self.fingerprint(&args)?;
        if self.store.remove_unless_loading(key) {
            self.telemetry.record(MemoActivity::Flushed, Some(key), None);
        }
        self.call_keyed(key, args).await
    }

    /// Removes the entry for `args`.
    ///
    /// A producer call already running for it still completes and is delivered to the calls
    /// waiting on it, but its result is not cached. The next call starts afresh.
    ///
    /// # Errors
    ///
    /// Returns an error when `args` cannot be serialized into a key.
    pub fn flush(&self, args: &A) -> Result<(), FingerprintError>
    where
        A: Serialize,
    {
        let key = self.fingerprint(args)?;
        if self.store.remove(key) {
            self.telemetry.record(MemoActivity::Flushed, Some(key), None);
        }
        Ok(())
    }

    /// Removes every entry, returning how many were removed.
    ///
    /// In-flight producer calls behave as described for [`flush`](Self::flush).
    pub fn flush_all(&self) -> usize {
        let removed = self.store.remove_all();
        self.telemetry.record(MemoActivity::FlushedAll, None, None);
        removed
    }

    /// Reports the state of the entry for `args`, or `None` if there is no entry.
    ///
    /// # Errors
    ///
    /// Returns an error when `args` cannot be serialized into a key.
    pub fn status(&self, args: &A) -> Result<Option<EntryStatus>, FingerprintError>
    where
        A: Serialize,
    {
        let key = self.fingerprint(args)?;
        Ok(self.store.get(key).map(|entry| entry.status(self.ttl, self.clock.instant())))
    }

    /// Returns the key `args` are cached under.
    ///
    /// In single-key mode this is always [`Fingerprint::SINGLE`].
    ///
    /// # Errors
    ///
    /// Returns an error when `args` cannot be serialized.
    pub fn fingerprint(&self, args: &A) -> Result<Fingerprint, FingerprintError>
    where
        A: Serialize,
    {
        match self.keying {
            Keying::PerArguments => Fingerprint::of(args),
            Keying::Single => Ok(Fingerprint::SINGLE),
        }
    }

    /// The number of entries, including cold and loading ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The time-to-live of cached values; `None` means they never expire.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// The name reported in log events.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.telemetry.name()
    }

    /// The clock used for freshness checks.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    async fn call_keyed(&self, key: Fingerprint, args: A) -> Result<P::Value, Error<P::Error>>
    where
        P::Value: Clone,
    {
        loop {
            let admission = self.store.get_or_create(key).admit(self.ttl, self.clock.instant());

            match admission {
                Admission::Hit(value) => {
                    self.telemetry.record(MemoActivity::Hit, Some(key), None);
                    return Ok(value);
                }
                Admission::Join(receiver) => {
                    self.telemetry.record(MemoActivity::Joined, Some(key), None);
                    match receiver.await {
                        Ok(outcome) => return outcome.map_err(Error::Producer),
                        Err(oneshot::Canceled) => {
                            self.telemetry.record(MemoActivity::Abandoned, Some(key), None);
                        }
                    }
                }
                Admission::Execute(guard) => return self.execute(guard, key, args).await,
            }
        }
    }

    async fn execute(
        &self,
        guard: ExecutionGuard<P::Value, P::Error>,
        key: Fingerprint,
        args: A,
    ) -> Result<P::Value, Error<P::Error>>
    where
        P::Value: Clone,
    {
        let activity = match guard.previous() {
            EntryStatus::Stale => MemoActivity::Expired,
            _ => MemoActivity::Miss,
        };
        self.telemetry.record(activity, Some(key), None);

        let stopwatch = self.clock.stopwatch();
        let outcome = self.producer.produce(args).await.map_err(Arc::new);
        let elapsed = stopwatch.elapsed();

        guard.settle(&outcome, self.clock.instant());

        let activity = if outcome.is_ok() {
            MemoActivity::Produced
        } else {
            MemoActivity::Failed
        };
        self.telemetry.record(activity, Some(key), Some(elapsed));

        outcome.map_err(Error::Producer)
    }
}

impl<A, P: Producer<A>> fmt::Debug for Memoizer<A, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoizer")
            .field("name", &self.telemetry.name())
            .field("ttl", &self.ttl)
            .field("keying", &self.keying)
            .field("entries", &self.store.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::executor::block_on;
    use tick::ClockControl;

    use super::*;
    use crate::telemetry::testing::LogCapture;

    fn counting_producer(calls: &Arc<AtomicUsize>) -> impl Fn(u32) -> std::future::Ready<Result<String, String>> + use<> {
        let calls = Arc::clone(calls);
        move |id| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(Ok(format!("{id}-{n}")))
        }
    }

    #[test]
    fn hit_after_miss() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memo = Memoizer::new(Clock::new_frozen(), counting_producer(&calls));

        assert_eq!(block_on(memo.call(7)).unwrap(), "7-1");
        assert_eq!(block_on(memo.call(7)).unwrap(), "7-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.status(&7).unwrap(), Some(EntryStatus::Fresh));
    }

    #[test]
    fn status_does_not_create_entries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memo = Memoizer::new(Clock::new_frozen(), counting_producer(&calls));

        assert_eq!(memo.status(&1).unwrap(), None);
        assert!(memo.is_empty());
    }

    #[test]
    fn expired_value_is_reproduced() {
        let control = ClockControl::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let memo = Memoizer::builder(control.to_clock(), counting_producer(&calls))
            .ttl(Duration::from_millis(10))
            .build();

        assert_eq!(block_on(memo.call(1)).unwrap(), "1-1");
        control.advance(Duration::from_millis(10));
        assert_eq!(memo.status(&1).unwrap(), Some(EntryStatus::Stale));
        assert_eq!(block_on(memo.call(1)).unwrap(), "1-2");
    }

    #[test]
    fn single_key_ignores_arguments() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memo = Memoizer::builder(Clock::new_frozen(), counting_producer(&calls))
            .single_key()
            .build();

        assert_eq!(block_on(memo.call(1)).unwrap(), "1-1");
        assert_eq!(block_on(memo.call(2)).unwrap(), "1-1");
        assert_eq!(memo.fingerprint(&2).unwrap(), Fingerprint::SINGLE);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn force_reruns_producer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memo = Memoizer::new(Clock::new_frozen(), counting_producer(&calls));

        assert_eq!(block_on(memo.call(3)).unwrap(), "3-1");
        assert_eq!(block_on(memo.force(3)).unwrap(), "3-2");
        assert_eq!(block_on(memo.call(3)).unwrap(), "3-2");
    }

    #[test]
    fn flush_and_flush_all() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memo = Memoizer::new(Clock::new_frozen(), counting_producer(&calls));

        block_on(memo.call(1)).unwrap();
        block_on(memo.call(2)).unwrap();

        memo.flush(&1).unwrap();
        assert_eq!(memo.status(&1).unwrap(), None);
        assert_eq!(memo.status(&2).unwrap(), Some(EntryStatus::Fresh));

        assert_eq!(memo.flush_all(), 1);
        assert!(memo.is_empty());
    }

    #[test]
    fn accessors_reflect_configuration() {
        let memo = Memoizer::builder(Clock::new_frozen(), |(): ()| async { Ok::<u8, String>(1) })
            .ttl(Duration::from_secs(5))
            .name("accessors")
            .build();

        assert_eq!(memo.ttl(), Some(Duration::from_secs(5)));
        assert_eq!(memo.name(), "accessors");
        let _clock: &Clock = memo.clock();

        let debug_str = format!("{memo:?}");
        assert!(debug_str.contains("accessors"), "got: {debug_str}");
        assert!(debug_str.contains("entries: 0"), "got: {debug_str}");
    }

    #[test]
    fn non_clone_errors_are_shared() {
        let memo = Memoizer::new(Clock::new_frozen(), |path: String| async move {
            Err::<u64, _>(std::io::Error::new(std::io::ErrorKind::NotFound, path))
        });

        let error = block_on(memo.call("missing.toml".to_string())).unwrap_err();
        assert_eq!(error.producer().map(std::io::Error::kind), Some(std::io::ErrorKind::NotFound));
        assert_eq!(error.to_string(), "missing.toml");
    }

    #[test]
    fn logs_activity_when_enabled() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let memo = Memoizer::builder(Clock::new_frozen(), |id: u32| async move {
            if id == 0 { Err("zero".to_string()) } else { Ok(id) }
        })
        .name("logged")
        .enable_logs(true)
        .build();

        block_on(memo.call(1)).unwrap();
        block_on(memo.call(1)).unwrap();
        block_on(memo.call(0)).unwrap_err();
        memo.flush(&1).unwrap();
        memo.flush_all();

        capture.assert_contains("memo.name=\"logged\"");
        for activity in ["memo.miss", "memo.produced", "memo.hit", "memo.failed", "memo.flushed", "memo.flushed_all"] {
            capture.assert_contains(&format!("memo.activity=\"{activity}\""));
        }
    }

    #[test]
    fn logs_are_off_by_default() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let memo = Memoizer::new(Clock::new_frozen(), |id: u32| async move { Ok::<_, String>(id) });
        block_on(memo.call(1)).unwrap();

        assert!(capture.output().is_empty());
    }
}
