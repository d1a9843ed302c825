//! Transaction model.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{Currency, TransactionDraft, TransactionId, TransactionPatch, TransactionType, UserId};

/// Label used for transactions whose category is absent or blank.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A single income or expense record as stored by the remote table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identifier assigned by the remote store.
    pub id: TransactionId,
    /// Owner of the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Display label. A missing or non-text title decodes as empty.
    #[serde(default, deserialize_with = "lenient_title")]
    pub title: String,
    /// Magnitude of the transaction. Malformed values decode as `0`.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    /// Direction of the transaction. Anything other than `expense` decodes
    /// as income.
    #[serde(rename = "type", default = "income", deserialize_with = "lenient_kind")]
    pub kind: TransactionType,
    /// Free-text category label.
    #[serde(default)]
    pub category: Option<String>,
    /// Display-only currency label. Null or unknown codes decode as the
    /// default currency.
    #[serde(default, deserialize_with = "lenient_currency")]
    pub currency: Currency,
    /// Date the transaction happened.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub date: Option<DateTime<Utc>>,
    /// Time the remote row was created.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// Optional longer note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Transaction {
    /// Builds the record a remote store returns after inserting `draft`.
    #[inline]
    #[must_use]
    pub fn from_draft(
        id: TransactionId,
        user: UserId,
        draft: &TransactionDraft,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: Some(user),
            title: draft.title.clone(),
            amount: draft.amount,
            kind: draft.kind,
            category: draft.category.clone(),
            currency: draft.currency,
            date: draft.date,
            created_at: Some(created_at),
            description: draft.description.clone(),
        }
    }

    /// Returns the amount as a finite, non-negative number.
    ///
    /// Non-finite values count as zero; a stray negative sign is dropped.
    #[inline]
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        if self.amount.is_finite() {
            self.amount.abs()
        } else {
            0.0
        }
    }

    /// Returns `true` for expense records.
    #[inline]
    #[must_use]
    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }

    /// Returns the category used for grouping: blank or missing categories
    /// become [`UNCATEGORIZED`]. The record itself is left as stored.
    #[inline]
    #[must_use]
    pub fn normalized_category(&self) -> &str {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .unwrap_or(UNCATEGORIZED)
    }

    /// Returns the timestamp used for month bucketing: `date`, then
    /// `created_at`, then `now`.
    #[inline]
    #[must_use]
    pub fn effective_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.date.or(self.created_at).unwrap_or(now)
    }

    /// Replaces every field that is present in `patch`.
    #[inline]
    pub fn apply(&mut self, patch: &TransactionPatch) {
        if let Some(title) = patch.title.as_ref() {
            self.title.clone_from(title);
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(category) = patch.category.as_ref() {
            self.category = Some(category.clone());
        }
        if let Some(currency) = patch.currency {
            self.currency = currency;
        }
        if let Some(date) = patch.date {
            self.date = Some(date);
        }
        if let Some(description) = patch.description.as_ref() {
            self.description = Some(description.clone());
        }
    }
}

/// Raw shapes an `amount` column can arrive in.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    /// A JSON number.
    Number(f64),
    /// A numeric string, as `numeric` columns are often rendered.
    Text(String),
    /// Anything else.
    Other(#[allow(dead_code, reason = "only the variant is inspected")] serde::de::IgnoredAny),
}

/// Decodes an amount, coercing anything unusable to `0`.
fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let raw = Option::<RawAmount>::deserialize(deserializer)?;
    let value = match raw {
        Some(RawAmount::Number(number)) => number,
        Some(RawAmount::Text(text)) => text.trim().parse::<f64>().unwrap_or(0.0),
        Some(RawAmount::Other(_)) | None => 0.0,
    };
    Ok(if value.is_finite() { value } else { 0.0 })
}

/// Decodes a text column, treating null and non-text values as empty.
fn lenient_title<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default())
}

/// Direction assumed when the `type` column is missing.
const fn income() -> TransactionType {
    TransactionType::Income
}

/// Decodes a direction. Only `expense` counts as an expense.
fn lenient_kind<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TransactionType, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|text| text.parse::<TransactionType>().ok())
        .unwrap_or(TransactionType::Income))
}

/// Decodes a currency code, falling back to the default for null or
/// unknown codes.
fn lenient_currency<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Currency, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|text| text.parse::<Currency>().ok())
        .unwrap_or_default())
}

/// Decodes a timestamp, treating anything unparseable as absent.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(serde_json::Value::as_str).and_then(parse_timestamp))
}

/// Parses the timestamp formats the remote table produces.
///
/// Accepts RFC 3339, PostgreSQL `timestamptz` text (`2024-01-15
/// 10:00:00+00`), zone-less timestamps (taken as UTC), and bare dates
/// (midnight UTC).
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
