//! Pure aggregation over transaction sets.
//!
//! Every function here takes a slice of [`Transaction`] values in any order
//! and derives new, independent structures from it. Inputs are never
//! mutated. Duplicate ids are collapsed before summing: the last record
//! for a given id wins.
//!
//! Monthly and category views count expense amounts only; overall totals
//! count both directions.

use core::num::NonZeroU32;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Transaction, TransactionId, TransactionType};

/// Income and expense sums over a transaction set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of income amounts.
    pub income: f64,
    /// Sum of expense amounts.
    pub expense: f64,
    /// `income - expense`.
    pub balance: f64,
}

/// Calendar month label, rendered as `YYYY-MM`.
///
/// Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    /// Calendar year.
    year: i32,
    /// Month of the year, `1..=12`.
    month: u32,
}

impl MonthKey {
    /// Creates a key, or `None` if `month` is not in `1..=12`.
    #[inline]
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if month >= 1 && month <= 12 {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Returns the month containing `at` (UTC).
    #[inline]
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    /// Returns the calendar year.
    #[inline]
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Returns the month of the year, `1..=12`.
    #[inline]
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// Returns the month before this one.
    #[inline]
    #[must_use]
    pub const fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Returns the month after this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Returns the first day of the month.
    #[inline]
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl core::fmt::Display for MonthKey {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Error returned when a month label is not `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month key: {0:?}")]
pub struct InvalidMonthKey(String);

impl core::str::FromStr for MonthKey {
    type Err = InvalidMonthKey;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMonthKey(s.to_owned());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_err| invalid())?;
        let month = month.parse::<u32>().map_err(|_err| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = InvalidMonthKey;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    #[inline]
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

/// Expense sum for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    /// The month.
    pub month: MonthKey,
    /// Sum of expense amounts dated in that month.
    pub total: f64,
}

/// Expense sum for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// Normalized category label.
    pub category: String,
    /// Sum of expense amounts in that category.
    pub total: f64,
}

/// Rule-based spending classification. Message text is left to the
/// presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Suggestion {
    /// Expenses exceed income.
    Overspent,
    /// Expenses are under half of income.
    Underspent,
    /// Expenses are under income but at least half of it.
    Balanced,
    /// Nothing to suggest.
    None,
}

/// Dashboard view of a transaction set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Overall income and expense.
    pub totals: Totals,
    /// Expense series over the lookback window.
    pub monthly: Vec<MonthlyTotal>,
    /// Expense per category, sorted by name.
    pub categories: Vec<CategoryTotal>,
    /// Classification of `totals`.
    pub suggestion: Suggestion,
}

/// Collapses duplicate ids, keeping the first position and the last value.
fn unique_by_id(transactions: &[Transaction]) -> Vec<&Transaction> {
    let mut slots: HashMap<TransactionId, usize> = HashMap::with_capacity(transactions.len());
    let mut unique: Vec<&Transaction> = Vec::with_capacity(transactions.len());
    for tx in transactions {
        match slots.entry(tx.id) {
            Entry::Occupied(slot) => {
                if let Some(existing) = unique.get_mut(*slot.get()) {
                    *existing = tx;
                }
            }
            Entry::Vacant(slot) => {
                let _index = slot.insert(unique.len());
                unique.push(tx);
            }
        }
    }
    unique
}

/// Sums amounts by direction. Empty input yields all zeros.
#[must_use]
pub fn totals_by_type(transactions: &[Transaction]) -> Totals {
    let mut totals = Totals::default();
    for tx in unique_by_id(transactions) {
        match tx.kind {
            TransactionType::Income => totals.income += tx.magnitude(),
            TransactionType::Expense => totals.expense += tx.magnitude(),
        }
    }
    totals.balance = totals.income - totals.expense;
    totals
}

/// Longest monthly window built, one hundred years. Larger lookbacks are
/// clamped to it.
pub const MAX_LOOKBACK_MONTHS: u32 = 1200;

/// Sums expenses per month over the `lookback` months ending at the
/// current month.
#[inline]
#[must_use]
pub fn monthly_totals(transactions: &[Transaction], lookback: NonZeroU32) -> Vec<MonthlyTotal> {
    monthly_totals_at(transactions, lookback, Utc::now())
}

/// Sums expenses per month over the `lookback` months ending at the month
/// containing `now`.
///
/// Always returns exactly `lookback` entries (at most
/// [`MAX_LOOKBACK_MONTHS`]) in chronological order; months without
/// activity are zero. Records dated outside the window are
/// ignored. Records with no date fall into the month of `now`.
#[must_use]
pub fn monthly_totals_at(
    transactions: &[Transaction],
    lookback: NonZeroU32,
    now: DateTime<Utc>,
) -> Vec<MonthlyTotal> {
    let mut buckets: BTreeMap<MonthKey, f64> = BTreeMap::new();
    let mut key = MonthKey::from_datetime(now);
    for _ in 0..lookback.get().min(MAX_LOOKBACK_MONTHS) {
        let _old = buckets.insert(key, 0.0);
        key = key.previous();
    }

    for tx in unique_by_id(transactions) {
        if !tx.is_expense() {
            continue;
        }
        let month = MonthKey::from_datetime(tx.effective_date(now));
        if let Some(total) = buckets.get_mut(&month) {
            *total += tx.magnitude();
        }
    }

    buckets
        .into_iter()
        .map(|(month, total)| MonthlyTotal { month, total })
        .collect()
}

/// Sums expenses per normalized category.
///
/// Every category present in the input appears exactly once, sorted by
/// name; a category holding only income reports `0`.
#[must_use]
pub fn category_totals(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut buckets: BTreeMap<&str, f64> = BTreeMap::new();
    for tx in unique_by_id(transactions) {
        let total = buckets.entry(tx.normalized_category()).or_insert(0.0);
        if tx.is_expense() {
            *total += tx.magnitude();
        }
    }
    buckets
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_owned(),
            total,
        })
        .collect()
}

/// Classifies spending against income. The first matching rule wins:
///
/// 1. `expense > income` is [`Suggestion::Overspent`]
/// 2. `expense < income / 2` is [`Suggestion::Underspent`]
/// 3. `expense < income` is [`Suggestion::Balanced`]
/// 4. anything else is [`Suggestion::None`]
#[inline]
#[must_use]
pub fn spending_suggestion(income: f64, expense: f64) -> Suggestion {
    if expense > income {
        Suggestion::Overspent
    } else if expense < income * 0.5 {
        Suggestion::Underspent
    } else if expense < income {
        Suggestion::Balanced
    } else {
        Suggestion::None
    }
}

/// Builds the dashboard view with the window ending at the current month.
#[inline]
#[must_use]
pub fn summarize(transactions: &[Transaction], lookback: NonZeroU32) -> Summary {
    summarize_at(transactions, lookback, Utc::now())
}

/// Builds the dashboard view with the window ending at the month of `now`.
#[must_use]
pub fn summarize_at(
    transactions: &[Transaction],
    lookback: NonZeroU32,
    now: DateTime<Utc>,
) -> Summary {
    let totals = totals_by_type(transactions);
    Summary {
        totals,
        monthly: monthly_totals_at(transactions, lookback, now),
        categories: category_totals(transactions),
        suggestion: spending_suggestion(totals.income, totals.expense),
    }
}
