//! Newtype wrappers for identifiers.
//!
//! Transaction ids are assigned by the remote store; user ids come from the
//! authentication layer and double as the cache slot key.

use serde::{Deserialize, Serialize};

/// Unique identifier for a transaction, assigned by the remote store on
/// insert and stable across updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(i64);

impl TransactionId {
    /// Creates a new identifier from the given value.
    #[inline]
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Consumes the wrapper and returns the inner value.
    #[inline]
    #[must_use]
    pub const fn into_inner(self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for TransactionId {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for TransactionId {
    #[inline]
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl core::str::FromStr for TransactionId {
    type Err = core::num::ParseIntError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Identifier of the user owning a transaction set (usually an auth UUID).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new identifier from the given string.
    #[inline]
    #[must_use]
    pub fn new<T: Into<String>>(value: T) -> Self {
        Self(value.into())
    }

    /// Returns a reference to the inner string.
    #[inline]
    #[must_use]
    pub fn as_inner(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner string.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for UserId {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<String> for UserId {
    #[inline]
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    #[inline]
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
