//! Trade entity and its input shapes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ValidationError;

    /// Only the exact lowercase spellings are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            _ => Err(ValidationError::new(
                "side",
                "Invalid trade side. Must be 'buy' or 'sell'",
            )),
        }
    }
}

/// A persisted journal entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub id: i64,
    pub symbol: String,
    pub side: Side,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub lot_size: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub exit_price: Option<Decimal>,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_reason: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub stop_loss: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub take_profit: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float")]
    pub fees: Decimal,
    pub notes: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub pnl: Option<Decimal>,
    pub checklist_grade: Option<String>,
    pub checklist_score: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trade {
    /// Closed once both exit price and exit time are recorded
    pub fn is_closed(&self) -> bool {
        self.exit_price.is_some() && self.exit_time.is_some()
    }

    /// Holding time in seconds, closed trades only
    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.is_closed(), self.exit_time) {
            (true, Some(exit_time)) => Some((exit_time - self.entry_time).num_seconds()),
            _ => None,
        }
    }
}

/// Validated input for a new trade
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub lot_size: Decimal,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub exit_price: Option<Decimal>,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_reason: Option<String>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub fees: Decimal,
    pub notes: Option<String>,
    pub checklist_grade: Option<String>,
    pub checklist_score: Option<i32>,
}

/// Partial update: `None` keeps the stored value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeUpdate {
    pub symbol: Option<String>,
    pub side: Option<Side>,
    pub quantity: Option<Decimal>,
    pub lot_size: Option<Decimal>,
    pub entry_price: Option<Decimal>,
    pub entry_time: Option<DateTime<Utc>>,
    pub exit_price: Option<Decimal>,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_reason: Option<String>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub fees: Option<Decimal>,
    pub notes: Option<String>,
    pub checklist_grade: Option<String>,
    pub checklist_score: Option<i32>,
    /// Caller-computed P&L, stored verbatim when present
    pub pnl: Option<Decimal>,
}

/// Filter and page window for listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeFilter {
    pub symbol: Option<String>,
    pub side: Option<Side>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for TradeFilter {
    fn default() -> Self {
        Self {
            symbol: None,
            side: None,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 500;

/// One page of trades plus the total matching the filter
#[derive(Debug, Clone)]
pub struct TradePage {
    pub trades: Vec<Trade>,
    pub total: i64,
    pub filter: TradeFilter,
}

impl TradePage {
    /// 1-based page number of this window
    pub fn page(&self) -> i64 {
        self.filter.offset / self.filter.limit + 1
    }

    pub fn pages(&self) -> i64 {
        (self.total + self.filter.limit - 1) / self.filter.limit
    }

    pub fn has_next(&self) -> bool {
        self.filter.offset + self.filter.limit < self.total
    }

    pub fn has_prev(&self) -> bool {
        self.filter.offset > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn page(total: i64, limit: i64, offset: i64) -> TradePage {
        TradePage {
            trades: Vec::new(),
            total,
            filter: TradeFilter {
                limit,
                offset,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_side_parsing_is_exact() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("sell".parse::<Side>().unwrap(), Side::Sell);

        let err = "BUY".parse::<Side>().unwrap_err();
        assert_eq!(err.field, "side");
        assert!(" sell".parse::<Side>().is_err());
        assert!("long".parse::<Side>().is_err());
    }

    #[test]
    fn test_pagination_metadata() {
        let empty = page(0, 50, 0);
        assert_eq!(empty.page(), 1);
        assert_eq!(empty.pages(), 0);
        assert!(!empty.has_next());
        assert!(!empty.has_prev());

        let middle = page(120, 50, 50);
        assert_eq!(middle.page(), 2);
        assert_eq!(middle.pages(), 3);
        assert!(middle.has_next());
        assert!(middle.has_prev());

        let last = page(120, 50, 100);
        assert_eq!(last.page(), 3);
        assert!(!last.has_next());
    }

    #[test]
    fn test_duration_only_when_closed() {
        let entry = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let exit = Utc.with_ymd_and_hms(2024, 1, 16, 14, 45, 0).unwrap();
        let mut trade = Trade {
            id: 1,
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            quantity: Decimal::ONE,
            lot_size: Decimal::ONE,
            entry_price: Decimal::new(15050, 2),
            entry_time: entry,
            exit_price: Some(Decimal::new(15575, 2)),
            exit_time: None,
            exit_reason: None,
            stop_loss: None,
            take_profit: None,
            fees: Decimal::ZERO,
            notes: None,
            pnl: None,
            checklist_grade: None,
            checklist_score: None,
            created_at: entry,
            updated_at: entry,
        };

        assert!(!trade.is_closed());
        assert_eq!(trade.duration_seconds(), None);

        trade.exit_time = Some(exit);
        assert!(trade.is_closed());
        assert_eq!(trade.duration_seconds(), Some(28 * 3600 + 15 * 60));
    }
}
