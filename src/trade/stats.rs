//! Journal summary over stored trades

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::models::Trade;

/// Realized P&L for one calendar month of exits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPnl {
    /// `YYYY-MM`
    pub month: String,
    pub trades: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeCount {
    pub grade: String,
    pub count: usize,
}

/// Win/loss summary. Only closed trades with a P&L count toward results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub closed_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_pnl: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub avg_pnl: Option<Decimal>,
    pub win_rate: Option<f64>,
    pub monthly: Vec<MonthlyPnl>,
    pub grades: Vec<GradeCount>,
}

/// Totals saturate at the `Decimal` range instead of overflowing
pub fn summarize(trades: &[Trade]) -> TradeStats {
    let mut closed_trades = 0;
    let mut winning_trades = 0;
    let mut losing_trades = 0;
    let mut total_pnl = Decimal::ZERO;
    let mut monthly: BTreeMap<String, (usize, Decimal)> = BTreeMap::new();
    let mut grades: BTreeMap<String, usize> = BTreeMap::new();

    for trade in trades {
        if let Some(grade) = &trade.checklist_grade {
            *grades.entry(grade.clone()).or_default() += 1;
        }

        let (Some(pnl), Some(exit_time)) = (trade.pnl, trade.exit_time) else {
            continue;
        };
        if !trade.is_closed() {
            continue;
        }

        closed_trades += 1;
        total_pnl = total_pnl.saturating_add(pnl);
        if pnl > Decimal::ZERO {
            winning_trades += 1;
        } else if pnl < Decimal::ZERO {
            losing_trades += 1;
        }

        let month = monthly
            .entry(exit_time.format("%Y-%m").to_string())
            .or_insert((0, Decimal::ZERO));
        month.0 += 1;
        month.1 = month.1.saturating_add(pnl);
    }

    let avg_pnl = (closed_trades > 0).then(|| total_pnl / Decimal::from(closed_trades));
    let win_rate = (closed_trades > 0).then(|| winning_trades as f64 / closed_trades as f64);

    TradeStats {
        total_trades: trades.len(),
        closed_trades,
        winning_trades,
        losing_trades,
        total_pnl,
        avg_pnl,
        win_rate,
        monthly: monthly
            .into_iter()
            .map(|(month, (trades, pnl))| MonthlyPnl { month, trades, pnl })
            .collect(),
        grades: grades
            .into_iter()
            .map(|(grade, count)| GradeCount { grade, count })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::models::Side;
    use chrono::{TimeZone, Utc};

    fn trade(id: i64, month: u32, pnl: Option<i64>, grade: Option<&str>) -> Trade {
        let entry_time = Utc.with_ymd_and_hms(2024, month, 3, 10, 0, 0).unwrap();
        let closed = pnl.is_some();
        Trade {
            id,
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            quantity: Decimal::ONE,
            lot_size: Decimal::ONE,
            entry_price: Decimal::new(100, 0),
            entry_time,
            exit_price: closed.then(|| Decimal::new(110, 0)),
            exit_time: closed.then(|| entry_time + chrono::Duration::days(2)),
            exit_reason: None,
            stop_loss: None,
            take_profit: None,
            fees: Decimal::ZERO,
            notes: None,
            pnl: pnl.map(Decimal::from),
            checklist_grade: grade.map(str::to_string),
            checklist_score: None,
            created_at: entry_time,
            updated_at: entry_time,
        }
    }

    #[test]
    fn test_empty_journal() {
        let stats = summarize(&[]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.total_pnl, Decimal::ZERO);
        assert_eq!(stats.avg_pnl, None);
        assert_eq!(stats.win_rate, None);
        assert!(stats.monthly.is_empty());
    }

    #[test]
    fn test_summary_counts_closed_trades_only() {
        let trades = vec![
            trade(1, 1, Some(100), Some("A")),
            trade(2, 1, Some(-40), Some("B+")),
            trade(3, 2, Some(10), Some("A")),
            trade(4, 2, None, None),
        ];

        let stats = summarize(&trades);

        assert_eq!(stats.total_trades, 4);
        assert_eq!(stats.closed_trades, 3);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.total_pnl, Decimal::from(70));
        assert_eq!(stats.avg_pnl, Some(Decimal::from(70) / Decimal::from(3)));
        assert_eq!(stats.win_rate, Some(2.0 / 3.0));

        assert_eq!(
            stats.monthly,
            vec![
                MonthlyPnl { month: "2024-01".to_string(), trades: 2, pnl: Decimal::from(60) },
                MonthlyPnl { month: "2024-02".to_string(), trades: 1, pnl: Decimal::from(10) },
            ]
        );
        assert_eq!(
            stats.grades,
            vec![
                GradeCount { grade: "A".to_string(), count: 2 },
                GradeCount { grade: "B+".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_totals_saturate() {
        let mut big = trade(1, 3, Some(0), None);
        big.pnl = Some(Decimal::MAX);
        let mut bigger = trade(2, 3, Some(0), None);
        bigger.pnl = Some(Decimal::MAX);

        let stats = summarize(&[big, bigger]);

        assert_eq!(stats.total_pnl, Decimal::MAX);
        assert_eq!(stats.monthly[0].pnl, Decimal::MAX);
        assert_eq!(stats.winning_trades, 2);
    }
}
