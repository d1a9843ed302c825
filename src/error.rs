//! Error types for the fintrack library.

use crate::models::TransactionId;

/// All errors that can occur when loading, mutating, or caching
/// transactions.
#[derive(Debug, thiserror::Error)]
pub enum FinTrackError {
    /// Transport-level failure talking to the remote store.
    #[cfg(any(feature = "async", feature = "blocking"))]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote store answered with a non-success status.
    #[error("remote store error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or a short description.
        message: String,
    },

    /// The remote store reported itself unreachable.
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// The mutation target does not exist remotely.
    #[error("transaction {id} not found")]
    NotFound {
        /// Identifier that was targeted.
        id: TransactionId,
    },

    /// A required field is missing or malformed. Raised before any remote
    /// call is attempted.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local cache backend failed.
    #[error("cache storage error: {0}")]
    Storage(Box<dyn core::error::Error + Send + Sync>),

    /// A builder was finalized without a required setting.
    #[error("missing configuration: {field}")]
    MissingConfig {
        /// Name of the missing setting.
        field: &'static str,
    },

    /// No API key was supplied for the remote store.
    #[error("no API key configured for the remote store")]
    MissingCredentials,

    /// The configured base URL could not be parsed.
    #[cfg(any(feature = "async", feature = "blocking"))]
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl FinTrackError {
    /// Returns `true` for network and store failures, the errors that make
    /// a read fall back to the local cache.
    #[inline]
    #[must_use]
    pub const fn is_remote_failure(&self) -> bool {
        match *self {
            #[cfg(any(feature = "async", feature = "blocking"))]
            Self::Http(_) => true,
            Self::Api { .. } | Self::Unavailable(_) => true,
            Self::NotFound { .. }
            | Self::Validation { .. }
            | Self::Serialization(_)
            | Self::Storage(_)
            | Self::MissingConfig { .. }
            | Self::MissingCredentials => false,
            #[cfg(any(feature = "async", feature = "blocking"))]
            Self::InvalidUrl(_) => false,
        }
    }

    /// Returns `true` if the mutation target was absent remotely.
    #[inline]
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(*self, Self::NotFound { .. })
    }

    /// Returns `true` if the error was raised by local validation.
    #[inline]
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(*self, Self::Validation { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, FinTrackError>;
