// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for memoized calls.

use std::fmt;
use std::sync::Arc;

/// The arguments of a memoized call could not be fingerprinted.
///
/// Fingerprinting serializes the arguments, so this error is raised when serialization
/// fails. The serializer's error is kept as the cause.
///
/// # Example
///
/// ```
/// use memoflight::Fingerprint;
/// use serde::{Serialize, Serializer};
///
/// struct Secret;
///
/// impl Serialize for Secret {
///     fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
///         Err(serde::ser::Error::custom("secrets are not serializable"))
///     }
/// }
///
/// assert!(Fingerprint::of(&Secret).is_err());
/// ```
#[ohno::error]
#[derive(Clone)]
pub struct FingerprintError {}

/// The error returned by a memoized call.
///
/// A memoized call fails either because the wrapped producer failed, or because its
/// arguments could not be turned into a cache key. Producer failures are passed through
/// untouched: the executor and every caller that waited on the same attempt share the one
/// error value the producer returned, so `E` does not need to be `Clone`.
pub enum Error<E> {
    /// The producer failed. All callers of the same attempt hold the same `Arc`.
    Producer(Arc<E>),
    /// The call arguments could not be fingerprinted; the producer was not invoked.
    Fingerprint(FingerprintError),
}

impl<E> Error<E> {
    /// Returns the producer error, if this is one.
    #[must_use]
    pub fn producer(&self) -> Option<&E> {
        match self {
            Self::Producer(error) => Some(&**error),
            Self::Fingerprint(_) => None,
        }
    }

    /// Consumes the error and returns the shared producer error, if this is one.
    #[must_use]
    pub fn into_producer(self) -> Option<Arc<E>> {
        match self {
            Self::Producer(error) => Some(error),
            Self::Fingerprint(_) => None,
        }
    }

    /// Returns `true` if the producer failed.
    #[must_use]
    pub fn is_producer(&self) -> bool {
        matches!(self, Self::Producer(_))
    }
}

impl<E> Clone for Error<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Producer(error) => Self::Producer(Arc::clone(error)),
            Self::Fingerprint(error) => Self::Fingerprint(error.clone()),
        }
    }
}

impl<E> From<FingerprintError> for Error<E> {
    fn from(error: FingerprintError) -> Self {
        Self::Fingerprint(error)
    }
}

impl<E: fmt::Debug> fmt::Debug for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer(error) => f.debug_tuple("Producer").field(error).finish(),
            Self::Fingerprint(error) => f.debug_tuple("Fingerprint").field(error).finish(),
        }
    }
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer(error) => fmt::Display::fmt(&**error, f),
            Self::Fingerprint(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl<E> std::error::Error for Error<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Producer(error) => Some(&**error),
            Self::Fingerprint(error) => Some(error),
        }
    }
}
