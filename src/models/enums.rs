//! Enumeration types for constrained transaction values.

use serde::{Deserialize, Serialize};

/// Direction of a transaction. The amount is always a magnitude; this is
/// the only place direction is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
}

impl TransactionType {
    /// Returns the wire name of the variant.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl core::fmt::Display for TransactionType {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransactionType {
    type Err = UnknownVariant;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(UnknownVariant("transaction type")),
        }
    }
}

/// Display-only currency label. Never used in arithmetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Indian rupee.
    #[default]
    Inr,
    /// US dollar.
    Usd,
    /// Euro.
    Eur,
    /// Pound sterling.
    Gbp,
    /// Japanese yen.
    Jpy,
}

impl Currency {
    /// Every supported currency, in display order.
    pub const ALL: [Self; 5] = [Self::Inr, Self::Usd, Self::Eur, Self::Gbp, Self::Jpy];

    /// Returns the ISO 4217 code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Inr => "INR",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Jpy => "JPY",
        }
    }

    /// Returns the conventional symbol.
    #[inline]
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Inr => "\u{20b9}",
            Self::Usd => "$",
            Self::Eur => "\u{20ac}",
            Self::Gbp => "\u{a3}",
            Self::Jpy => "\u{a5}",
        }
    }
}

impl core::fmt::Display for Currency {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl core::str::FromStr for Currency {
    type Err = UnknownVariant;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|currency| currency.code().eq_ignore_ascii_case(wanted))
            .ok_or(UnknownVariant("currency"))
    }
}

/// Whether a returned transaction list came from a successful remote fetch
/// or from the local fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Fetched from the remote store just now.
    Fresh,
    /// Served from the local cache after a failed fetch.
    Stale,
}

/// Error returned when parsing an enum from text fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown {0}")]
pub struct UnknownVariant(&'static str);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_serde() {
        let json = serde_json::to_string(&TransactionType::Expense).unwrap();
        assert_eq!(json, r#""expense""#);
        let deserialized: TransactionType = serde_json::from_str(r#""income""#).unwrap();
        assert_eq!(deserialized, TransactionType::Income);
    }

    #[test]
    fn invalid_transaction_type_fails() {
        let result = serde_json::from_str::<TransactionType>(r#""transfer""#);
        assert!(result.is_err());
    }

    #[test]
    fn transaction_type_from_str_ignores_case() {
        assert_eq!(
            "Expense".parse::<TransactionType>(),
            Ok(TransactionType::Expense)
        );
        assert!("refund".parse::<TransactionType>().is_err());
    }

    #[test]
    fn currency_serde_uses_codes() {
        for currency in Currency::ALL {
            let json = serde_json::to_string(&currency).unwrap();
            assert_eq!(json, format!("\"{}\"", currency.code()));
            let deserialized: Currency = serde_json::from_str(&json).unwrap();
            assert_eq!(deserialized, currency);
        }
    }

    #[test]
    fn currency_from_str() {
        assert_eq!("usd".parse::<Currency>(), Ok(Currency::Usd));
        let err = "XYZ".parse::<Currency>().unwrap_err();
        assert_eq!(err.to_string(), "unknown currency");
    }

    #[test]
    fn currency_defaults_to_rupee() {
        assert_eq!(Currency::default(), Currency::Inr);
        assert_eq!(Currency::default().symbol(), "\u{20b9}");
    }

    #[test]
    fn freshness_serde() {
        assert_eq!(
            serde_json::to_string(&Freshness::Stale).unwrap(),
            r#""stale""#
        );
    }
}
