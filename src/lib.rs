//! Transaction aggregation and offline-resilient cache sync for a personal
//! finance tracker.
//!
//! The crate has two halves:
//!
//! - [`aggregate`]: pure functions that turn an unordered transaction set
//!   into totals, a zero-filled monthly expense series, per-category
//!   expense totals and a spending suggestion.
//! - [`sync`]: a service that reads a user's transactions from a remote
//!   store, mirrors them into a durable local cache, serves the cached copy
//!   when the store is unreachable, and keeps the cache in step with every
//!   confirmed create, update and delete.
//!
//! Remote stores implement [`remote::RemoteStore`] (async) or
//! [`remote::BlockingRemoteStore`]; the bundled PostgREST client lives in
//! `client`. Caches implement [`cache::CacheStore`] or
//! [`cache::BlockingCacheStore`], with in-memory and file-backed versions
//! provided.

pub mod aggregate;
pub mod cache;
#[cfg(any(feature = "async", feature = "blocking"))]
pub mod client;
pub mod error;
pub mod models;
pub mod remote;
pub mod sync;
