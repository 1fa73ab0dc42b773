// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Argument fingerprinting.
//!
//! Every memoized call is keyed by a [`Fingerprint`] of its arguments: the argument value is
//! encoded with `bincode` and the bytes are hashed into a 128-bit XXH3 digest.
//!
//! The encoding is structural and order-sensitive, so `(1, 2)` and `(2, 1)` produce different
//! fingerprints while two equal tuples always produce the same one. It is also lossless: floats
//! are encoded by their bit pattern (`NaN`, `inf` and `-inf` stay apart) and every `Option`
//! layer carries its own tag (`None` and `Some(None)` stay apart).
//!
//! # Unordered collections
//!
//! Collections without a defined iteration order (`HashMap`, `HashSet`) are serialized in
//! whatever order they iterate. Two equal hash maps may therefore produce different
//! fingerprints. Normalize such arguments before calling, for example by converting them
//! into a `BTreeMap`.
//!
//! Sequences and maps must know their length up front. A custom `Serialize` implementation
//! that streams an iterator of unknown length cannot be fingerprinted.

use std::fmt;

use serde::Serialize;
use xxhash_rust::xxh3::xxh3_128;

use crate::FingerprintError;

/// A fixed-length digest identifying one argument list.
///
/// # Examples
///
/// ```
/// use memoflight::Fingerprint;
///
/// let a = Fingerprint::of(&(11, 21))?;
/// let b = Fingerprint::of(&(11, 21))?;
/// let c = Fingerprint::of(&(21, 11))?;
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// # Ok::<(), memoflight::FingerprintError>(())
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// The implicit key shared by every call of a single-key memoizer.
    pub const SINGLE: Self = Self(0);

    /// Computes the fingerprint of an argument value.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError`] if the value cannot be serialized, for example when a
    /// sequence has no known length or a custom `Serialize` implementation reports an error.
    pub fn of<A>(args: &A) -> Result<Self, FingerprintError>
    where
        A: Serialize + ?Sized,
    {
        let bytes = bincode::serialize(args).map_err(FingerprintError::caused_by)?;
        Ok(Self(xxh3_128(&bytes)))
    }

    /// Creates a fingerprint from a raw digest.
    #[must_use]
    pub const fn from_u128(digest: u128) -> Self {
        Self(digest)
    }

    /// Returns the raw digest.
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fingerprint").field(&format_args!("{self}")).finish()
    }
}
