//! In-memory cache backend for testing.

use std::collections::HashMap;
use std::sync::Mutex;

#[cfg(feature = "async")]
use core::future::{self, Future};

use crate::error::{FinTrackError, Result};
use crate::models::UserId;

/// Thread-safe in-memory cache.
///
/// This type implements both [`super::CacheStore`] (async) and
/// [`super::BlockingCacheStore`] (blocking). Contents are lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    /// Slots keyed by user.
    slots: Mutex<HashMap<UserId, Vec<u8>>>,
}

impl InMemoryCache {
    /// Creates a new empty cache.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock and applies a closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut HashMap<UserId, Vec<u8>>) -> R) -> Result<R> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|err| FinTrackError::Storage(err.to_string().into()))?;
        Ok(f(&mut slots))
    }

    /// Reads a slot.
    fn read(&self, key: &UserId) -> Result<Option<Vec<u8>>> {
        self.with_lock(|slots| slots.get(key).cloned())
    }

    /// Replaces a slot.
    fn write(&self, key: &UserId, value: Vec<u8>) -> Result<()> {
        self.with_lock(|slots| {
            let _old = slots.insert(key.clone(), value);
        })
    }
}

#[cfg(feature = "blocking")]
impl super::BlockingCacheStore for InMemoryCache {
    #[inline]
    fn get(&self, key: &UserId) -> Result<Option<Vec<u8>>> {
        self.read(key)
    }

    #[inline]
    fn set(&self, key: &UserId, value: Vec<u8>) -> Result<()> {
        self.write(key, value)
    }
}

#[cfg(feature = "async")]
impl super::CacheStore for InMemoryCache {
    #[inline]
    fn get(&self, key: &UserId) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send {
        future::ready(self.read(key))
    }

    #[inline]
    fn set(&self, key: &UserId, value: Vec<u8>) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.write(key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "blocking")]
    mod blocking {
        use super::*;
        use crate::cache::BlockingCacheStore;

        #[test]
        fn empty_slot_reads_none() {
            let cache = InMemoryCache::new();
            assert!(cache.get(&UserId::new("u-1")).unwrap().is_none());
        }

        #[test]
        fn set_replaces_slot() {
            let cache = InMemoryCache::new();
            let key = UserId::new("u-1");
            cache.set(&key, b"one".to_vec()).unwrap();
            cache.set(&key, b"two".to_vec()).unwrap();
            assert_eq!(cache.get(&key).unwrap(), Some(b"two".to_vec()));
        }

        #[test]
        fn slots_are_isolated_per_user() {
            let cache = InMemoryCache::new();
            cache.set(&UserId::new("a"), b"a".to_vec()).unwrap();
            assert!(cache.get(&UserId::new("b")).unwrap().is_none());
        }
    }

    #[cfg(feature = "async")]
    mod async_tests {
        use super::*;
        use crate::cache::CacheStore;

        #[tokio::test]
        async fn set_then_get() {
            let cache = InMemoryCache::new();
            let key = UserId::new("u-1");
            cache.set(&key, b"[]".to_vec()).await.unwrap();
            assert_eq!(cache.get(&key).await.unwrap(), Some(b"[]".to_vec()));
        }
    }
}
