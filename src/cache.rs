//! Durable local key-value stores for cached transaction sets.
//!
//! This module defines the [`CacheStore`] (async) and
//! [`BlockingCacheStore`] (blocking) traits via a shared macro, mirroring
//! the remote store generation pattern in [`crate::remote`]. Keys are user
//! ids; values are opaque bytes (the sync layer stores a JSON list).

#[cfg(feature = "storage-file")]
mod file;
mod memory;

#[cfg(feature = "storage-file")]
pub use file::FileCache;
pub use memory::InMemoryCache;

/// Generates a cache store trait (async or blocking).
macro_rules! define_cache_store {
    // ── Entry point ─────────────────────────────────────────────────
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: $mode:ident,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_cache_store!(@method $mode, get,
                "Returns the bytes stored under `key`, or `Ok(None)` if the slot is empty.\n\n# Errors\n\nReturns an error if the backend fails to read.",
                key: &UserId, -> Result<Option<Vec<u8>>>);
            define_cache_store!(@method $mode, set,
                "Replaces the bytes stored under `key`.\n\n# Errors\n\nReturns an error if the backend fails to write.",
                key: &UserId, value: Vec<u8>, -> Result<()>);
        }
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
mod async_cache {
    //! Async cache store trait definition.

    use crate::error::Result;
    use crate::models::UserId;

    define_cache_store! {
        trait_name: CacheStore,
        trait_doc: "Async durable key-value store holding one serialized transaction list per user.\n\nAll methods take `&self`; implementations use interior mutability.",
        mode: async_mode,
    }
}

#[cfg(feature = "blocking")]
mod blocking_cache {
    //! Blocking cache store trait definition.

    use crate::error::Result;
    use crate::models::UserId;

    define_cache_store! {
        trait_name: BlockingCacheStore,
        trait_doc: "Blocking durable key-value store holding one serialized transaction list per user.\n\nAll methods take `&self`; implementations use interior mutability.",
        mode: blocking,
    }
}

#[cfg(feature = "async")]
pub use async_cache::CacheStore;
#[cfg(feature = "blocking")]
pub use blocking_cache::BlockingCacheStore;
