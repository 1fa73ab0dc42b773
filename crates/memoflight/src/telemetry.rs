// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logging of memoizer activity.
//!
//! With the `logs` feature enabled, every memoizer decision is emitted as a `tracing` event
//! named `memo.event`, carrying the memoizer name, the activity, the key and, for producer
//! calls, the duration.

use std::time::Duration;

use crate::Fingerprint;

#[cfg(test)]
pub(crate) const MEMO_NAME: &str = "memo.name";
#[cfg(test)]
pub(crate) const MEMO_ACTIVITY: &str = "memo.activity";
#[cfg(test)]
pub(crate) const MEMO_KEY: &str = "memo.key";
#[cfg(test)]
pub(crate) const MEMO_EVENT: &str = "memo.event";

/// What a memoizer did in response to one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemoActivity {
    /// A fresh cached value was returned.
    Hit,
    /// No value was cached; the caller became the executor.
    Miss,
    /// The cached value was stale; the caller became the executor.
    Expired,
    /// The caller joined an in-flight producer call.
    Joined,
    /// The producer succeeded.
    Produced,
    /// The producer failed.
    Failed,
    /// The executor the caller was waiting on went away; the caller retries.
    Abandoned,
    /// One entry was flushed.
    Flushed,
    /// All entries were flushed.
    FlushedAll,
}

#[cfg(any(feature = "logs", test))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

#[cfg(any(feature = "logs", test))]
impl MemoActivity {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "memo.hit",
            Self::Miss => "memo.miss",
            Self::Expired => "memo.expired",
            Self::Joined => "memo.joined",
            Self::Produced => "memo.produced",
            Self::Failed => "memo.failed",
            Self::Abandoned => "memo.abandoned",
            Self::Flushed => "memo.flushed",
            Self::FlushedAll => "memo.flushed_all",
        }
    }

    pub(crate) fn level(self) -> Level {
        match self {
            Self::Hit | Self::Miss | Self::Joined | Self::Produced => Level::Debug,
            Self::Expired | Self::Flushed | Self::FlushedAll => Level::Info,
            Self::Abandoned => Level::Warn,
            Self::Failed => Level::Error,
        }
    }
}

/// Records memoizer activity for one memoizer instance.
#[derive(Debug, Clone)]
pub(crate) struct MemoTelemetry {
    name: &'static str,
    #[cfg_attr(not(any(feature = "logs", test)), expect(dead_code, reason = "only read when logs are compiled in"))]
    logging_enabled: bool,
}

impl MemoTelemetry {
    pub(crate) fn new(name: &'static str, logging_enabled: bool) -> Self {
        Self { name, logging_enabled }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// Records one activity.
    ///
    /// `key` is absent for store-wide operations; `duration` is present for producer calls.
    #[inline]
    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, reason = "nothing to record without the logs feature")
    )]
    pub(crate) fn record(&self, activity: MemoActivity, key: Option<Fingerprint>, duration: Option<Duration>) {
        #[cfg(any(feature = "logs", test))]
        if self.logging_enabled {
            Self::emit(self.name, activity, key, duration);
        }
    }

    #[cfg(any(feature = "logs", test))]
    fn emit(name: &'static str, activity: MemoActivity, key: Option<Fingerprint>, duration: Option<Duration>) {
        let activity_name = activity.as_str();
        let key = key.map(|key| key.to_string());
        let duration_ns = duration.map(|d| d.as_nanos());

        // Tracing levels must be constant, so the macro picks the event per level.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    memo.name = name,
                    memo.activity = activity_name,
                    memo.key = key.as_deref(),
                    memo.duration_ns = ?duration_ns,
                    "memo.event"
                )
            };
        }

        match activity.level() {
            Level::Debug => emit_event!(debug),
            Level::Info => emit_event!(info),
            Level::Warn => emit_event!(warn),
            Level::Error => emit_event!(error),
        }
    }
}
