//! In-memory remote store for tests and offline demos.
//!
//! Provides [`InMemoryRemote`], a thread-safe implementation of the remote
//! store traits that assigns ids the way a database sequence would and can
//! be switched offline to simulate network failures.

use std::sync::Mutex;

use chrono::Utc;

#[cfg(feature = "async")]
use core::future::{self, Future};

use crate::error::{FinTrackError, Result};
use crate::models::{
    Filter, OrderBy, Transaction, TransactionDraft, TransactionId, TransactionPatch, UserId,
};

/// Thread-safe in-memory remote table.
///
/// This type implements both [`super::RemoteStore`] (async) and
/// [`super::BlockingRemoteStore`] (blocking).
///
/// While offline every call fails with [`FinTrackError::Unavailable`] and
/// leaves the rows untouched.
///
/// # Example
///
/// ```rust
/// use fintrack::remote::InMemoryRemote;
///
/// let remote = InMemoryRemote::new();
/// remote.set_offline(true).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    /// All state behind a single mutex for thread-safe interior mutability.
    inner: Mutex<Inner>,
}

/// Inner mutable state.
#[derive(Debug)]
struct Inner {
    /// Stored rows in insertion order.
    rows: Vec<Transaction>,
    /// Next id handed out by `insert`.
    next_id: i64,
    /// Whether calls currently fail.
    offline: bool,
}

impl Default for Inner {
    #[inline]
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
            offline: false,
        }
    }
}

impl InMemoryRemote {
    /// Creates an empty, online store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `rows`. New ids continue after the
    /// largest seeded id.
    #[inline]
    #[must_use]
    pub fn with_rows(rows: Vec<Transaction>) -> Self {
        let next_id = rows
            .iter()
            .map(|row| row.id.into_inner())
            .max()
            .map_or(1, |max| max.saturating_add(1));
        Self {
            inner: Mutex::new(Inner {
                rows,
                next_id,
                offline: false,
            }),
        }
    }

    /// Switches failure simulation on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    #[inline]
    pub fn set_offline(&self, offline: bool) -> Result<()> {
        self.with_lock(|inner| {
            inner.offline = offline;
            Ok(())
        })
    }

    /// Returns a copy of every stored row, ignoring the offline switch.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    #[inline]
    pub fn rows(&self) -> Result<Vec<Transaction>> {
        self.with_lock(|inner| Ok(inner.rows.clone()))
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut Inner) -> Result<R>) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        f(&mut inner)
    }
}

impl Inner {
    /// Fails while offline.
    fn ensure_online(&self) -> Result<()> {
        if self.offline {
            return Err(FinTrackError::Unavailable(
                "in-memory remote is offline".to_owned(),
            ));
        }
        Ok(())
    }

    /// Filters and sorts rows.
    fn select(&self, filter: &Filter, order: OrderBy) -> Result<Vec<Transaction>> {
        self.ensure_online()?;
        let mut rows: Vec<Transaction> = self
            .rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        order.sort(&mut rows);
        Ok(rows)
    }

    /// Appends a row built from `draft` with the next id.
    fn insert(&mut self, user: &UserId, draft: &TransactionDraft) -> Result<Transaction> {
        self.ensure_online()?;
        let id = TransactionId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let row = Transaction::from_draft(id, user.clone(), draft, Utc::now());
        self.rows.push(row.clone());
        Ok(row)
    }

    /// Patches the single row matching `filter`.
    fn update(&mut self, filter: &Filter, patch: &TransactionPatch) -> Result<Transaction> {
        self.ensure_online()?;
        let id = super::target_id(filter)?;
        let row = self
            .rows
            .iter_mut()
            .find(|row| filter.matches(row))
            .ok_or(FinTrackError::NotFound { id })?;
        row.apply(patch);
        Ok(row.clone())
    }

    /// Removes every row matching `filter`.
    fn delete(&mut self, filter: &Filter) -> Result<()> {
        self.ensure_online()?;
        let id = super::target_id(filter)?;
        let before = self.rows.len();
        self.rows.retain(|row| !filter.matches(row));
        if self.rows.len() == before {
            return Err(FinTrackError::NotFound { id });
        }
        Ok(())
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> FinTrackError {
    FinTrackError::Storage(err.to_string().into())
}

// ── BlockingRemoteStore implementation ──────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingRemoteStore for InMemoryRemote {
    #[inline]
    fn select(&self, filter: &Filter, order: OrderBy) -> Result<Vec<Transaction>> {
        self.with_lock(|inner| inner.select(filter, order))
    }

    #[inline]
    fn insert(&self, user: &UserId, draft: &TransactionDraft) -> Result<Transaction> {
        self.with_lock(|inner| inner.insert(user, draft))
    }

    #[inline]
    fn update(&self, filter: &Filter, patch: &TransactionPatch) -> Result<Transaction> {
        self.with_lock(|inner| inner.update(filter, patch))
    }

    #[inline]
    fn delete(&self, filter: &Filter) -> Result<()> {
        self.with_lock(|inner| inner.delete(filter))
    }
}

// ── RemoteStore (async) implementation ──────────────────────────────────

#[cfg(feature = "async")]
impl super::RemoteStore for InMemoryRemote {
    #[inline]
    fn select(
        &self,
        filter: &Filter,
        order: OrderBy,
    ) -> impl Future<Output = Result<Vec<Transaction>>> + Send {
        future::ready(self.with_lock(|inner| inner.select(filter, order)))
    }

    #[inline]
    fn insert(
        &self,
        user: &UserId,
        draft: &TransactionDraft,
    ) -> impl Future<Output = Result<Transaction>> + Send {
        future::ready(self.with_lock(|inner| inner.insert(user, draft)))
    }

    #[inline]
    fn update(
        &self,
        filter: &Filter,
        patch: &TransactionPatch,
    ) -> impl Future<Output = Result<Transaction>> + Send {
        future::ready(self.with_lock(|inner| inner.update(filter, patch)))
    }

    #[inline]
    fn delete(&self, filter: &Filter) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.with_lock(|inner| inner.delete(filter)))
    }
}
