//! Filters and ordering understood by remote stores.

use super::{Transaction, TransactionId, UserId};

/// Equality filter on `user_id` and/or `id`.
///
/// Both conditions must hold when both are set; an empty filter matches
/// every row.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Owner to match.
    pub user_id: Option<UserId>,
    /// Transaction id to match.
    pub id: Option<TransactionId>,
}

impl Filter {
    /// Creates an empty filter.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to rows owned by `user`.
    #[inline]
    #[must_use]
    pub fn user(mut self, user: UserId) -> Self {
        self.user_id = Some(user);
        self
    }

    /// Restricts to the row with `id`.
    #[inline]
    #[must_use]
    pub const fn id(mut self, id: TransactionId) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns `true` if the row satisfies every set condition.
    #[inline]
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.user_id
            .as_ref()
            .is_none_or(|user| tx.user_id.as_ref() == Some(user))
            && self.id.is_none_or(|id| tx.id == id)
    }
}

/// Column a select can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderColumn {
    /// The store-assigned id.
    Id,
    /// The transaction date.
    Date,
}

impl OrderColumn {
    /// Returns the column name on the remote table.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Date => "date",
        }
    }
}

/// Ordering applied to a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderBy {
    /// Column to sort by.
    pub column: OrderColumn,
    /// `true` for ascending order.
    pub ascending: bool,
}

impl OrderBy {
    /// Newest ids first. Ids never collide, so this is a total order.
    #[inline]
    #[must_use]
    pub const fn id_desc() -> Self {
        Self {
            column: OrderColumn::Id,
            ascending: false,
        }
    }

    /// Most recent dates first.
    #[inline]
    #[must_use]
    pub const fn date_desc() -> Self {
        Self {
            column: OrderColumn::Date,
            ascending: false,
        }
    }

    /// Renders the PostgREST `order` parameter, e.g. `id.desc`.
    #[inline]
    #[must_use]
    pub fn to_query_value(self) -> String {
        let direction = if self.ascending { "asc" } else { "desc" };
        format!("{}.{direction}", self.column.as_str())
    }

    /// Sorts rows in place. Date ties (and missing dates) fall back to id
    /// in the same direction so the result is deterministic.
    #[inline]
    pub fn sort(self, rows: &mut [Transaction]) {
        rows.sort_by(|left, right| {
            let ordering = match self.column {
                OrderColumn::Id => left.id.cmp(&right.id),
                OrderColumn::Date => left.date.cmp(&right.date).then(left.id.cmp(&right.id)),
            };
            if self.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
    }
}
