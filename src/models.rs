//! Data models for transaction records.
//!
//! This module contains the stored [`Transaction`] shape, the edit buffers
//! used to create and update records, newtype ID wrappers, enumeration
//! types for constrained values, and the filters remote stores understand.

mod draft;
mod enums;
mod ids;
mod query;
mod transaction;

pub use draft::{TransactionDraft, TransactionPatch};
pub use enums::{Currency, Freshness, TransactionType, UnknownVariant};
pub use ids::{TransactionId, UserId};
pub use query::{Filter, OrderBy, OrderColumn};
pub use transaction::{Transaction, UNCATEGORIZED, parse_timestamp};
