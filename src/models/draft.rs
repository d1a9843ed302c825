//! Edit buffers for create and update.
//!
//! A draft or patch is never a [`super::Transaction`]: it has no id and is
//! never written to the cache. Only the record the remote store returns is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Currency, TransactionType};
use crate::error::{FinTrackError, Result};

/// Input for creating a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    /// Display label; must not be blank.
    pub title: String,
    /// Non-negative magnitude.
    pub amount: f64,
    /// Direction of the transaction.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Free-text category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Display-only currency label.
    #[serde(default)]
    pub currency: Currency,
    /// Date the transaction happened; the store stamps `created_at` either
    /// way.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Optional longer note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TransactionDraft {
    /// Creates a draft with the required fields and default currency.
    #[inline]
    #[must_use]
    pub fn new<T: Into<String>>(title: T, amount: f64, kind: TransactionType) -> Self {
        Self {
            title: title.into(),
            amount,
            kind,
            category: None,
            currency: Currency::default(),
            date: None,
            description: None,
        }
    }

    /// Sets the category.
    #[inline]
    #[must_use]
    pub fn category<T: Into<String>>(mut self, category: T) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the currency label.
    #[inline]
    #[must_use]
    pub const fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Sets the transaction date.
    #[inline]
    #[must_use]
    pub const fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the description.
    #[inline]
    #[must_use]
    pub fn description<T: Into<String>>(mut self, description: T) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks the required fields.
    ///
    /// # Errors
    ///
    /// Returns [`FinTrackError::Validation`] if the title is blank or the
    /// amount is negative or not finite.
    #[inline]
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_amount(self.amount)
    }
}

/// Partial update for an existing transaction. Present fields replace the
/// stored values; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPatch {
    /// New display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// New direction.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    /// New category. An empty string clears it to uncategorized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// New currency label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    /// New transaction date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TransactionPatch {
    /// Creates an empty patch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the title.
    #[inline]
    #[must_use]
    pub fn title<T: Into<String>>(mut self, title: T) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces the amount.
    #[inline]
    #[must_use]
    pub const fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Replaces the direction.
    #[inline]
    #[must_use]
    pub const fn kind(mut self, kind: TransactionType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Replaces the category.
    #[inline]
    #[must_use]
    pub fn category<T: Into<String>>(mut self, category: T) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Replaces the currency label.
    #[inline]
    #[must_use]
    pub const fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    /// Replaces the transaction date.
    #[inline]
    #[must_use]
    pub const fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Replaces the description.
    #[inline]
    #[must_use]
    pub fn description<T: Into<String>>(mut self, description: T) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns `true` if no field would change.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.amount.is_none()
            && self.kind.is_none()
            && self.category.is_none()
            && self.currency.is_none()
            && self.date.is_none()
            && self.description.is_none()
    }

    /// Checks the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns [`FinTrackError::Validation`] if the patch is empty, sets a
    /// blank title, or sets a negative or non-finite amount.
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(FinTrackError::Validation {
                field: "patch",
                reason: "no fields to update",
            });
        }
        if let Some(title) = self.title.as_deref() {
            validate_title(title)?;
        }
        self.amount.map_or(Ok(()), validate_amount)
    }
}

/// Rejects blank titles.
fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(FinTrackError::Validation {
            field: "title",
            reason: "must not be empty",
        });
    }
    Ok(())
}

/// Rejects amounts that are not a finite magnitude.
fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(FinTrackError::Validation {
            field: "amount",
            reason: "must be a finite, non-negative number",
        });
    }
    Ok(())
}
