//! Cache-backed access to a user's transaction set.
//!
//! Combines a remote store with a local [`crate::cache`] backend. Reads
//! fall back to the cached copy when the remote store fails; mutations go
//! to the remote store first and touch the cache only after the store has
//! confirmed them, so the cache never holds a record the store does not.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Freshness, Transaction, TransactionId};

/// Transactions returned by `load`, tagged with where they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loaded {
    /// The user's transactions, newest id first.
    pub transactions: Vec<Transaction>,
    /// Whether the list was fetched just now or served from the cache.
    pub freshness: Freshness,
}

impl Loaded {
    /// Wraps a list fetched from the remote store.
    #[inline]
    #[must_use]
    pub const fn fresh(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            freshness: Freshness::Fresh,
        }
    }

    /// Wraps a list served from the cache after a failed fetch.
    #[inline]
    #[must_use]
    pub const fn stale(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            freshness: Freshness::Stale,
        }
    }

    /// Returns `true` if the list came from the remote store.
    #[inline]
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.freshness == Freshness::Fresh
    }
}

/// Decodes a cache slot. An empty slot is an empty list.
fn decode_slot(bytes: Option<Vec<u8>>) -> Result<Vec<Transaction>> {
    bytes.map_or_else(
        || Ok(Vec::new()),
        |raw| Ok(serde_json::from_slice(&raw)?),
    )
}

/// Encodes a list for the cache.
fn encode_slot(transactions: &[Transaction]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(transactions)?)
}

/// Puts `record` in place of the first entry sharing its id, dropping any
/// later duplicates; appends it if no entry matches.
fn upsert_by_id(list: &mut Vec<Transaction>, record: Transaction) {
    let id = record.id;
    let mut pending = Some(record);
    list.retain_mut(|existing| {
        if existing.id != id {
            return true;
        }
        pending.take().is_some_and(|replacement| {
            *existing = replacement;
            true
        })
    });
    if let Some(record) = pending {
        list.push(record);
    }
}

/// Removes every entry with `id`.
fn remove_by_id(list: &mut Vec<Transaction>, id: TransactionId) {
    list.retain(|existing| existing.id != id);
}

/// Generates a cache-backed transaction service (async or blocking).
macro_rules! define_cache_sync {
    (
        sync_name: $sync:ident,
        builder_name: $builder:ident,
        remote_trait: $remote_trait:ident,
        cache_trait: $cache_trait:ident,
        sync_doc: $sync_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder<R: $remote_trait, C: $cache_trait> {
            /// Remote store.
            remote: Option<R>,
            /// Local cache backend.
            cache: Option<C>,
        }

        impl<R: $remote_trait, C: $cache_trait> $builder<R, C> {
            /// Sets the remote store.
            #[inline]
            #[must_use]
            pub fn remote(mut self, remote: R) -> Self {
                self.remote = Some(remote);
                self
            }

            /// Sets the local cache backend.
            #[inline]
            #[must_use]
            pub fn cache(mut self, cache: C) -> Self {
                self.cache = Some(cache);
                self
            }

            /// Builds the service.
            ///
            /// # Errors
            ///
            /// Returns [`FinTrackError::MissingConfig`] if the remote store or
            /// the cache backend was not provided.
            #[inline]
            pub fn build(self) -> Result<$sync<R, C>> {
                let remote = self
                    .remote
                    .ok_or(FinTrackError::MissingConfig { field: "remote" })?;
                let cache = self
                    .cache
                    .ok_or(FinTrackError::MissingConfig { field: "cache" })?;
                Ok($sync { remote, cache })
            }
        }

        #[doc = $sync_doc]
        #[derive(Debug)]
        pub struct $sync<R: $remote_trait, C: $cache_trait> {
            /// Remote store, the source of truth.
            remote: R,
            /// Local mirror of the last confirmed remote state.
            cache: C,
        }

        impl<R: $remote_trait, C: $cache_trait> $sync<R, C> {
            /// Creates a new builder for configuring the service.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder<R, C> {
                $builder {
                    remote: None,
                    cache: None,
                }
            }

            /// Fetches the user's transactions, newest id first.
            ///
            /// On success the cache slot is overwritten with the fetched
            /// list and the result is [`Freshness::Fresh`](crate::models::Freshness::Fresh). If the fetch
            /// fails, the cached list (or an empty one) is returned as
            /// [`Freshness::Stale`](crate::models::Freshness::Stale) and the cache is left as it was. Cache
            /// problems on this path are logged, never returned.
            #[tracing::instrument(skip_all, fields(user = %user))]
            pub $($async_kw)? fn load(&self, user: &UserId) -> Loaded {
                let filter = Filter::new().user(user.clone());
                match self.remote.select(&filter, OrderBy::id_desc()) $( .$await_ext )? {
                    Ok(transactions) => {
                        tracing::debug!(count = transactions.len(), "fetched transactions");
                        let persisted = match encode_slot(&transactions) {
                            Ok(bytes) => self.cache.set(user, bytes) $( .$await_ext )?,
                            Err(err) => Err(err),
                        };
                        if let Err(err) = persisted {
                            tracing::warn!(error = %err, "failed to refresh cache slot");
                        }
                        Loaded::fresh(transactions)
                    }
                    Err(fetch_err) => {
                        tracing::warn!(error = %fetch_err, "fetch failed, serving cached transactions");
                        let transactions = self.cached(user) $( .$await_ext )?
                            .unwrap_or_else(|err| {
                                tracing::warn!(error = %err, "cache slot unreadable");
                                Vec::new()
                            });
                        Loaded::stale(transactions)
                    }
                }
            }

            /// Returns the cached list for `user` without contacting the
            /// remote store.
            ///
            /// # Errors
            ///
            /// Returns an error if the cache backend fails to read or the
            /// slot does not decode.
            #[inline]
            pub $($async_kw)? fn cached(&self, user: &UserId) -> Result<Vec<Transaction>> {
                let bytes = self.cache.get(user) $( .$await_ext )? ?;
                decode_slot(bytes)
            }

            /// Creates a transaction remotely, then records the returned
            /// row (with its assigned id) in the cache.
            ///
            /// # Errors
            ///
            /// Returns [`FinTrackError::Validation`] before any remote call
            /// if the draft is invalid, the remote error if the insert
            /// fails (the cache is untouched), or a cache error if the
            /// confirmed row could not be recorded locally.
            #[tracing::instrument(skip_all, fields(user = %user))]
            pub $($async_kw)? fn create(
                &self,
                user: &UserId,
                draft: &TransactionDraft,
            ) -> Result<Transaction> {
                draft.validate()?;
                let created = self
                    .remote
                    .insert(user, draft)
                    $( .$await_ext )?
                    .inspect_err(|err| tracing::warn!(error = %err, "remote insert failed"))?;
                tracing::debug!(id = %created.id, "transaction created");
                let record = created.clone();
                self.reconcile(user, move |list| upsert_by_id(list, record)) $( .$await_ext )? ?;
                Ok(created)
            }

            /// Updates a transaction remotely, then replaces the cached
            /// copy with the returned row (appending it if the cache had
            /// missed it).
            ///
            /// # Errors
            ///
            /// Returns [`FinTrackError::Validation`] before any remote call
            /// if the patch is empty or invalid,
            /// [`FinTrackError::NotFound`] if the id does not exist
            /// remotely, any other remote error (the cache is untouched in
            /// every case), or a cache error if the confirmed row could not
            /// be recorded locally.
            #[tracing::instrument(skip_all, fields(user = %user, id = %id))]
            pub $($async_kw)? fn update(
                &self,
                user: &UserId,
                id: TransactionId,
                patch: &TransactionPatch,
            ) -> Result<Transaction> {
                patch.validate()?;
                let filter = Filter::new().user(user.clone()).id(id);
                let updated = self
                    .remote
                    .update(&filter, patch)
                    $( .$await_ext )?
                    .inspect_err(|err| tracing::warn!(error = %err, "remote update failed"))?;
                tracing::debug!("transaction updated");
                let record = updated.clone();
                self.reconcile(user, move |list| upsert_by_id(list, record)) $( .$await_ext )? ?;
                Ok(updated)
            }

            /// Deletes a transaction remotely, then drops it from the
            /// cache.
            ///
            /// # Errors
            ///
            /// Returns [`FinTrackError::NotFound`] if the id does not exist
            /// remotely, any other remote error (the cache is untouched in
            /// every case), or a cache error if the local copy could not be
            /// dropped.
            #[tracing::instrument(skip_all, fields(user = %user, id = %id))]
            pub $($async_kw)? fn remove(&self, user: &UserId, id: TransactionId) -> Result<()> {
                let filter = Filter::new().user(user.clone()).id(id);
                self.remote
                    .delete(&filter)
                    $( .$await_ext )?
                    .inspect_err(|err| tracing::warn!(error = %err, "remote delete failed"))?;
                tracing::debug!("transaction removed");
                self.reconcile(user, move |list| remove_by_id(list, id)) $( .$await_ext )?
            }

            /// Returns a reference to the remote store.
            #[inline]
            #[must_use]
            pub const fn remote(&self) -> &R {
                &self.remote
            }

            /// Returns a reference to the cache backend.
            #[inline]
            #[must_use]
            pub const fn cache(&self) -> &C {
                &self.cache
            }

            /// Ends the service and hands back its collaborators.
            #[inline]
            #[must_use]
            pub fn close(self) -> (R, C) {
                (self.remote, self.cache)
            }

            /// Rewrites the user's cache slot after a confirmed mutation.
            ///
            /// A slot that no longer decodes is discarded and rebuilt from
            /// the confirmed row alone.
            $($async_kw)? fn reconcile<F>(&self, user: &UserId, edit: F) -> Result<()>
            where
                F: FnOnce(&mut Vec<Transaction>),
            {
                let bytes = self.cache.get(user) $( .$await_ext )? ?;
                let mut slot = decode_slot(bytes).unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "discarding unreadable cache slot");
                    Vec::new()
                });
                edit(&mut slot);
                let encoded = encode_slot(&slot)?;
                self.cache.set(user, encoded) $( .$await_ext )?
            }
        }
    };
}

// ── Async variant ───────────────────────────────────────────────────────

#[cfg(feature = "async")]
mod async_sync {
    //! Async cache-backed service.

    use crate::cache::CacheStore;
    use crate::error::{FinTrackError, Result};
    use crate::models::{
        Filter, OrderBy, Transaction, TransactionDraft, TransactionId, TransactionPatch, UserId,
    };
    use crate::remote::RemoteStore;

    use super::{Loaded, decode_slot, encode_slot, remove_by_id, upsert_by_id};

    define_cache_sync! {
        sync_name: CacheSync,
        builder_name: CacheSyncBuilder,
        remote_trait: RemoteStore,
        cache_trait: CacheStore,
        sync_doc: "Async cache-backed transaction service.\n\nUse [`CacheSync::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`CacheSync`].",
        async_kw: async,
        await_kw: await,
    }
}

// ── Blocking variant ────────────────────────────────────────────────────

#[cfg(feature = "blocking")]
mod blocking_sync {
    //! Blocking cache-backed service.

    use crate::cache::BlockingCacheStore;
    use crate::error::{FinTrackError, Result};
    use crate::models::{
        Filter, OrderBy, Transaction, TransactionDraft, TransactionId, TransactionPatch, UserId,
    };
    use crate::remote::BlockingRemoteStore;

    use super::{Loaded, decode_slot, encode_slot, remove_by_id, upsert_by_id};

    define_cache_sync! {
        sync_name: CacheSyncBlocking,
        builder_name: CacheSyncBlockingBuilder,
        remote_trait: BlockingRemoteStore,
        cache_trait: BlockingCacheStore,
        sync_doc: "Blocking cache-backed transaction service.\n\nUse [`CacheSyncBlocking::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`CacheSyncBlocking`].",
    }
}

#[cfg(feature = "async")]
pub use async_sync::{CacheSync, CacheSyncBuilder};
#[cfg(feature = "blocking")]
pub use blocking_sync::{CacheSyncBlocking, CacheSyncBlockingBuilder};
