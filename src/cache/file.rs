//! JSON-file-based cache backend.
//!
//! Stores each user's slot in its own file under a configurable directory
//! (default: the platform cache directory joined with `fintrack`).

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

#[cfg(feature = "async")]
use core::future::Future;

use crate::error::{FinTrackError, Result};
use crate::models::UserId;

/// Application name used for the platform cache directory.
const APP_NAME: &str = "fintrack";

/// Extension of slot files.
const SLOT_EXTENSION: &str = "json";

/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "cache.lock";

/// File-backed cache that persists one slot per user.
///
/// # Concurrency
///
/// Thread safety within a single process is provided by an in-process
/// [`Mutex`]. Cross-process safety is achieved via an advisory file lock
/// on `cache.lock` (using [`std::fs::File::lock`] /
/// [`std::fs::File::lock_shared`]).
///
/// Reads acquire a shared lock, writes an exclusive one. Writes go to a
/// temporary file that is then renamed over the slot, so a crash never
/// leaves a half-written slot behind.
///
/// # File layout
///
/// ```text
/// <dir>/
///   cache.lock            (cross-process lock sentinel)
///   <escaped-user-id>.json
/// ```
///
/// User ids are escaped so that only `[A-Za-z0-9_-]` reach the file name;
/// every other byte is written as `%XX`.
#[derive(Debug)]
pub struct FileCache {
    /// Directory containing the slot files.
    dir: PathBuf,
    /// Mutex serializing concurrent in-process access.
    lock: Mutex<()>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
}

impl FileCache {
    /// Creates a new file cache rooted at the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist, and opens
    /// (or creates) the `cache.lock` sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            lock_file,
        })
    }

    /// Returns the default cache directory for this application.
    ///
    /// On Linux: `$XDG_CACHE_HOME/fintrack/` (typically
    /// `~/.cache/fintrack/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cache directory cannot be
    /// determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::cache_dir()
            .map(|cache_path| cache_path.join(APP_NAME))
            .ok_or_else(|| {
                FinTrackError::Storage("could not determine platform cache directory".into())
            })
    }

    /// Returns the directory holding the slot files.
    #[inline]
    #[must_use]
    pub const fn dir(&self) -> &PathBuf {
        &self.dir
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// Returns the slot path for `key`.
    fn slot_path(&self, key: &UserId) -> Result<PathBuf> {
        if key.as_inner().is_empty() {
            return Err(FinTrackError::Validation {
                field: "user_id",
                reason: "must not be empty",
            });
        }
        Ok(self
            .dir
            .join(format!("{}.{SLOT_EXTENSION}", escape_key(key))))
    }

    /// Acquires an in-process mutex guard and a shared (read) file lock,
    /// executes `op`, then releases the file lock.
    fn with_shared_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Acquires an in-process mutex guard and an exclusive (write) file
    /// lock, executes `op`, then releases the file lock.
    fn with_exclusive_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Reads a slot. A missing file is an empty slot.
    fn read_slot(&self, key: &UserId) -> Result<Option<Vec<u8>>> {
        let path = self.slot_path(key)?;
        self.with_shared_lock(|| match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(storage_io_error(err)),
        })
    }

    /// Atomically replaces a slot (write-to-tmp then rename).
    fn write_slot(&self, key: &UserId, value: &[u8]) -> Result<()> {
        let path = self.slot_path(key)?;
        let tmp_path = path.with_extension(format!("{SLOT_EXTENSION}.tmp"));
        self.with_exclusive_lock(|| {
            fs::write(&tmp_path, value).map_err(storage_io_error)?;
            fs::rename(&tmp_path, &path).map_err(storage_io_error)
        })
    }
}

// ── Free-standing helpers ───────────────────────────────────────────────

/// Escapes a user id into a portable file stem.
fn escape_key(key: &UserId) -> String {
    let raw = key.as_inner();
    let mut escaped = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            escaped.push(char::from(byte));
        } else {
            escaped.push('%');
            for nibble in [byte >> 4_u8, byte & 0x0f] {
                escaped.extend(
                    char::from_digit(u32::from(nibble), 16).map(|digit| digit.to_ascii_uppercase()),
                );
            }
        }
    }
    escaped
}

/// Wraps an I/O error into a [`FinTrackError::Storage`].
fn storage_io_error(err: std::io::Error) -> FinTrackError {
    FinTrackError::Storage(Box::new(err))
}

/// Wraps a mutex poison error into a [`FinTrackError::Storage`].
fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> FinTrackError {
    FinTrackError::Storage(err.to_string().into())
}

// ── BlockingCacheStore implementation ───────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingCacheStore for FileCache {
    #[inline]
    fn get(&self, key: &UserId) -> Result<Option<Vec<u8>>> {
        self.read_slot(key)
    }

    #[inline]
    fn set(&self, key: &UserId, value: Vec<u8>) -> Result<()> {
        self.write_slot(key, &value)
    }
}

// ── CacheStore (async) implementation ───────────────────────────────────

#[cfg(feature = "async")]
impl super::CacheStore for FileCache {
    #[inline]
    fn get(&self, key: &UserId) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send {
        core::future::ready(self.read_slot(key))
    }

    #[inline]
    fn set(&self, key: &UserId, value: Vec<u8>) -> impl Future<Output = Result<()>> + Send {
        core::future::ready(self.write_slot(key, &value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to create a [`FileCache`] in a temporary directory.
    fn temp_cache() -> (FileCache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf()).unwrap();
        (cache, dir)
    }

    #[test]
    fn escape_keeps_safe_characters() {
        assert_eq!(
            escape_key(&UserId::new("550e8400-e29b_41d4")),
            "550e8400-e29b_41d4"
        );
    }

    #[test]
    fn escape_encodes_path_separators() {
        assert_eq!(escape_key(&UserId::new("../a b")), "%2E%2E%2Fa%20b");
        assert_eq!(escape_key(&UserId::new("\u{e9}")), "%C3%A9");
    }

    #[test]
    fn new_creates_directory_and_lock() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let cache = FileCache::new(nested.clone()).unwrap();
        assert_eq!(cache.dir(), &nested);
        assert!(nested.join(LOCK_FILE).exists());
    }

    #[test]
    fn missing_slot_reads_none() {
        let (cache, _dir) = temp_cache();
        assert!(cache.read_slot(&UserId::new("u-1")).unwrap().is_none());
    }

    #[test]
    fn write_then_read_slot() {
        let (cache, dir) = temp_cache();
        let key = UserId::new("u-1");
        cache.write_slot(&key, b"[1]").unwrap();
        assert_eq!(cache.read_slot(&key).unwrap(), Some(b"[1]".to_vec()));
        assert!(dir.path().join("u-1.json").exists());
        assert!(!dir.path().join("u-1.json.tmp").exists());
    }

    #[test]
    fn hostile_key_stays_inside_directory() {
        let (cache, dir) = temp_cache();
        let key = UserId::new("../escape");
        cache.write_slot(&key, b"x").unwrap();
        assert!(dir.path().join("%2E%2E%2Fescape.json").exists());
        assert_eq!(cache.read_slot(&key).unwrap(), Some(b"x".to_vec()));
    }

    #[test]
    fn empty_key_is_rejected() {
        let (cache, _dir) = temp_cache();
        assert!(
            cache
                .read_slot(&UserId::new(""))
                .unwrap_err()
                .is_validation()
        );
    }

    #[test]
    fn slots_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let key = UserId::new("u-1");
        {
            let cache = FileCache::new(dir.path().to_path_buf()).unwrap();
            cache.write_slot(&key, b"persisted").unwrap();
        }
        let reopened = FileCache::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            reopened.read_slot(&key).unwrap(),
            Some(b"persisted".to_vec())
        );
    }

    #[cfg(feature = "blocking")]
    mod blocking {
        use super::*;
        use crate::cache::BlockingCacheStore;

        #[test]
        fn trait_roundtrip() {
            let (cache, _dir) = temp_cache();
            let key = UserId::new("u-1");
            cache.set(&key, b"[]".to_vec()).unwrap();
            assert_eq!(cache.get(&key).unwrap(), Some(b"[]".to_vec()));
        }
    }

    #[cfg(feature = "async")]
    mod async_tests {
        use super::*;
        use crate::cache::CacheStore;

        #[tokio::test]
        async fn trait_roundtrip() {
            let (cache, _dir) = temp_cache();
            let key = UserId::new("u-2");
            cache.set(&key, b"[]".to_vec()).await.unwrap();
            assert_eq!(cache.get(&key).await.unwrap(), Some(b"[]".to_vec()));
        }
    }
}
