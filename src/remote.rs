//! Remote transaction store interface.
//!
//! This module defines the [`RemoteStore`] (async) and
//! [`BlockingRemoteStore`] (blocking) traits via a shared macro, mirroring
//! the client generation pattern in [`crate::client`]. The REST clients in
//! [`crate::client`] and the [`InMemoryRemote`] test double implement them.

mod memory;

pub use memory::InMemoryRemote;

use crate::error::{FinTrackError, Result};
use crate::models::{Filter, TransactionId};

/// Generates a remote store trait (async or blocking).
///
/// Uses `@methods` to define the method list once, and `@method` to render
/// each method in async (`impl Future + Send`) or blocking (`fn`) style.
macro_rules! define_remote_store {
    // ── Entry points ────────────────────────────────────────────────
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: $mode:ident,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_remote_store!(@methods $mode);
        }
    };

    // ── Single method list (shared between both variants) ───────────
    (@methods $mode:ident) => {
        define_remote_store!(@method $mode, select,
            "Returns every row matching `filter`, sorted by `order`.\n\n# Errors\n\nReturns a remote failure if the store cannot be reached or rejects the query.",
            filter: &Filter, order: OrderBy, -> Result<Vec<Transaction>>);
        define_remote_store!(@method $mode, insert,
            "Inserts a new row owned by `user` and returns it with its assigned id.\n\n# Errors\n\nReturns a remote failure if the store cannot be reached or rejects the row.",
            user: &UserId, draft: &TransactionDraft, -> Result<Transaction>);
        define_remote_store!(@method $mode, update,
            "Applies `patch` to the row matching `filter` and returns the stored result.\n\n`filter` must name an id.\n\n# Errors\n\nReturns [`FinTrackError::NotFound`](crate::error::FinTrackError::NotFound) if no row matches,\n[`FinTrackError::Validation`](crate::error::FinTrackError::Validation) if `filter` has no id,\nor a remote failure.",
            filter: &Filter, patch: &TransactionPatch, -> Result<Transaction>);
        define_remote_store!(@method $mode, delete,
            "Deletes the row matching `filter`.\n\n`filter` must name an id.\n\n# Errors\n\nReturns [`FinTrackError::NotFound`](crate::error::FinTrackError::NotFound) if no row matches,\n[`FinTrackError::Validation`](crate::error::FinTrackError::Validation) if `filter` has no id,\nor a remote failure.",
            filter: &Filter, -> Result<()>);
    };

    // ── Blocking method renderer ────────────────────────────────────
    (@method blocking, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*) -> $ret;
    };

    // ── Async method renderer (returns impl Future + Send) ──────────
    (@method async_mode, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*)
            -> impl core::future::Future<Output = $ret> + Send;
    };
}

#[cfg(feature = "async")]
mod async_remote {
    //! Async remote store trait definition.

    use crate::error::Result;
    use crate::models::{Filter, OrderBy, Transaction, TransactionDraft, TransactionPatch, UserId};

    define_remote_store! {
        trait_name: RemoteStore,
        trait_doc: "Async remote table of transactions.\n\nAll methods take `&self`; implementations use interior mutability\nwhere they hold state.",
        mode: async_mode,
    }
}

#[cfg(feature = "blocking")]
mod blocking_remote {
    //! Blocking remote store trait definition.

    use crate::error::Result;
    use crate::models::{Filter, OrderBy, Transaction, TransactionDraft, TransactionPatch, UserId};

    define_remote_store! {
        trait_name: BlockingRemoteStore,
        trait_doc: "Blocking remote table of transactions.\n\nAll methods take `&self`; implementations use interior mutability\nwhere they hold state.",
        mode: blocking,
    }
}

#[cfg(feature = "async")]
pub use async_remote::RemoteStore;
#[cfg(feature = "blocking")]
pub use blocking_remote::BlockingRemoteStore;

/// Returns the id a mutation filter targets.
///
/// Mutations keyed only by user would touch the whole set, so they are
/// refused before reaching the store.
pub(crate) fn target_id(filter: &Filter) -> Result<TransactionId> {
    filter.id.ok_or(FinTrackError::Validation {
        field: "id",
        reason: "mutations must target a single transaction id",
    })
}
