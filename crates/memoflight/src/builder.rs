// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring a [`Memoizer`].

use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use tick::Clock;

use crate::memoizer::Keying;
use crate::telemetry::MemoTelemetry;
use crate::{Memoizer, Producer};

const DEFAULT_NAME: &str = "memoflight";

/// Configures and creates a [`Memoizer`].
///
/// Created by [`Memoizer::builder`]. By default cached values never expire, every distinct
/// argument value gets its own entry, and no log events are emitted.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use memoflight::Memoizer;
/// use tick::Clock;
///
/// let memo = Memoizer::builder(Clock::new_frozen(), |(): ()| async { Ok::<_, String>(42) })
///     .ttl(Duration::from_secs(60))
///     .single_key()
///     .name("answer")
///     .build();
///
/// assert_eq!(memo.name(), "answer");
/// ```
pub struct MemoizerBuilder<A, P> {
    producer: P,
    clock: Clock,
    ttl: Option<Duration>,
    keying: Keying,
    name: &'static str,
    logging_enabled: bool,
    _args: PhantomData<fn(A)>,
}

impl<A, P: Producer<A>> MemoizerBuilder<A, P> {
    pub(crate) fn new(clock: Clock, producer: P) -> Self {
        Self {
            producer,
            clock,
            ttl: None,
            keying: Keying::PerArguments,
            name: DEFAULT_NAME,
            logging_enabled: false,
            _args: PhantomData,
        }
    }

    /// Cached values expire once they are `ttl` old.
    ///
    /// A zero TTL still coalesces concurrent calls but never serves a cached value.
    #[must_use]
    pub fn ttl(self, ttl: Duration) -> Self {
        self.ttl_opt(Some(ttl))
    }

    /// Sets the time-to-live, or disables expiry with `None`.
    #[must_use]
    pub fn ttl_opt(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Caches a single result shared by all calls, whatever their arguments.
    ///
    /// Suits producers that take no meaningful arguments, such as a configuration loader.
    #[must_use]
    pub fn single_key(mut self) -> Self {
        self.keying = Keying::Single;
        self
    }

    /// Sets the name reported in log events. Defaults to `"memoflight"`.
    #[must_use]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Turns log events on or off.
    ///
    /// Events are only emitted when the crate is built with the `logs` feature.
    #[must_use]
    pub fn enable_logs(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    /// Creates the memoizer.
    #[must_use]
    pub fn build(self) -> Memoizer<A, P> {
        Memoizer::from_parts(
            self.producer,
            self.clock,
            self.ttl,
            self.keying,
            MemoTelemetry::new(self.name, self.logging_enabled),
        )
    }
}

impl<A, P> fmt::Debug for MemoizerBuilder<A, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizerBuilder")
            .field("ttl", &self.ttl)
            .field("keying", &self.keying)
            .field("name", &self.name)
            .field("logging_enabled", &self.logging_enabled)
            .finish_non_exhaustive()
    }
}
