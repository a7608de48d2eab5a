//! Sample journal data for demos and chart testing
//!
//! Trades are spread over the last few calendar months, 8 to 20 per month,
//! each closed at either its take profit or its stop loss.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rand::{seq::SliceRandom, Rng};
use rust_decimal::Decimal;
use tracing::info;

use crate::error::ServiceError;
use crate::trade::{NewTrade, Side, TradeRepository, TradeService, TradeStats};

struct SampleSymbol {
    symbol: &'static str,
    lot_size: u32,
    price_range: (f64, f64),
    /// Decimal places kept on generated prices
    precision: u32,
}

const SYMBOLS: &[SampleSymbol] = &[
    SampleSymbol { symbol: "AAPL", lot_size: 100, price_range: (150.0, 200.0), precision: 2 },
    SampleSymbol { symbol: "GOOGL", lot_size: 100, price_range: (100.0, 150.0), precision: 2 },
    SampleSymbol { symbol: "MSFT", lot_size: 100, price_range: (300.0, 400.0), precision: 2 },
    SampleSymbol { symbol: "TSLA", lot_size: 100, price_range: (200.0, 300.0), precision: 2 },
    SampleSymbol { symbol: "AMZN", lot_size: 100, price_range: (120.0, 180.0), precision: 2 },
    SampleSymbol { symbol: "META", lot_size: 100, price_range: (250.0, 350.0), precision: 2 },
    SampleSymbol { symbol: "NVDA", lot_size: 100, price_range: (400.0, 600.0), precision: 2 },
    SampleSymbol { symbol: "NFLX", lot_size: 100, price_range: (400.0, 500.0), precision: 2 },
    SampleSymbol { symbol: "AMD", lot_size: 100, price_range: (80.0, 120.0), precision: 2 },
    SampleSymbol { symbol: "INTC", lot_size: 100, price_range: (30.0, 50.0), precision: 2 },
    SampleSymbol { symbol: "BTCUSD", lot_size: 1, price_range: (40000.0, 70000.0), precision: 2 },
    SampleSymbol { symbol: "ETHUSD", lot_size: 1, price_range: (2000.0, 4000.0), precision: 2 },
    SampleSymbol { symbol: "EURUSD", lot_size: 100_000, price_range: (1.05, 1.15), precision: 5 },
    SampleSymbol { symbol: "GBPUSD", lot_size: 100_000, price_range: (1.20, 1.30), precision: 5 },
    SampleSymbol { symbol: "XAUUSD", lot_size: 100, price_range: (1800.0, 2100.0), precision: 2 },
];

/// Checklist grades with weights in percent, skewed towards good setups
const GRADES: [(&str, u32); 8] = [
    ("A+", 15),
    ("A", 25),
    ("B+", 20),
    ("B", 20),
    ("C+", 10),
    ("C", 5),
    ("D+", 3),
    ("D", 2),
];

const TAKE_PROFIT_HIT_RATE: f64 = 0.65;

/// Generate closed sample trades for the `months` calendar months before `now`.
///
/// Anything that would enter or exit at or after `now` is skipped.
pub fn generate_trades<R: Rng>(rng: &mut R, now: DateTime<Utc>, months: u32) -> Vec<NewTrade> {
    let mut trades = Vec::new();
    let start = now - Duration::days(30 * i64::from(months));
    let mut month = first_of_month(start.year(), start.month());

    while let Some(first) = month {
        if first.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()).map_or(true, |dt| dt >= now) {
            break;
        }

        let next = next_month(first);
        let last_day = next
            .and_then(|n| n.pred_opt())
            .map(|d| d.day())
            .unwrap_or(28);

        let count = rng.gen_range(8..=20);
        for _ in 0..count {
            if let Some(trade) = sample_trade(rng, first, last_day, now) {
                trades.push(trade);
            }
        }

        month = next;
    }

    trades
}

fn sample_trade<R: Rng>(rng: &mut R, month: NaiveDate, last_day: u32, now: DateTime<Utc>) -> Option<NewTrade> {
    let entry_time = month
        .with_day(rng.gen_range(1..=last_day))?
        .and_hms_opt(rng.gen_range(9..=16), rng.gen_range(0..=59), 0)?
        .and_utc();
    if entry_time >= now {
        return None;
    }

    let sample = SYMBOLS.choose(rng)?;
    let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
    let quantity = Decimal::from(rng.gen_range(1..=10_i64));

    let entry = rng.gen_range(sample.price_range.0..=sample.price_range.1);
    let (sl_band, tp_band) = match side {
        Side::Buy => ((0.95, 0.98), (1.02, 1.08)),
        Side::Sell => ((1.02, 1.05), (0.92, 0.98)),
    };
    let stop_loss = entry * rng.gen_range(sl_band.0..=sl_band.1);
    let take_profit = entry * rng.gen_range(tp_band.0..=tp_band.1);

    let exit_time = entry_time + Duration::days(rng.gen_range(1..=30));
    if exit_time >= now {
        return None;
    }

    let (exit, exit_reason) = if rng.gen_bool(TAKE_PROFIT_HIT_RATE) {
        (take_profit, "take_profit")
    } else {
        (stop_loss, "stop_loss")
    };

    let price = |value: f64| Decimal::from_f64_retain(value).map(|d| d.round_dp(sample.precision));
    let fees = Decimal::from_f64_retain(rng.gen_range(0.5..=5.0))?.round_dp(2);

    Some(NewTrade {
        symbol: sample.symbol.to_string(),
        side,
        quantity,
        lot_size: Decimal::from(sample.lot_size),
        entry_price: price(entry)?,
        entry_time,
        exit_price: Some(price(exit)?),
        exit_time: Some(exit_time),
        exit_reason: Some(exit_reason.to_string()),
        stop_loss: Some(price(stop_loss)?),
        take_profit: Some(price(take_profit)?),
        fees,
        notes: Some(format!("Sample trade for {} (lot {})", sample.symbol, sample.lot_size)),
        checklist_grade: Some(pick_grade(rng).to_string()),
        checklist_score: Some(rng.gen_range(20..=100)),
    })
}

fn pick_grade<R: Rng>(rng: &mut R) -> &'static str {
    let total: u32 = GRADES.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (grade, weight) in GRADES {
        if roll < weight {
            return grade;
        }
        roll -= weight;
    }
    GRADES[GRADES.len() - 1].0
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        first_of_month(date.year() + 1, 1)
    } else {
        first_of_month(date.year(), date.month() + 1)
    }
}

/// Store generated trades through the service, optionally wiping the journal first
pub async fn seed_journal<S: TradeRepository, R: Rng>(
    service: &TradeService<S>,
    rng: &mut R,
    months: u32,
    keep_existing: bool,
) -> Result<TradeStats, ServiceError> {
    if !keep_existing {
        let removed = service.clear_trades().await?;
        info!("Cleared {} existing trades", removed);
    }

    let trades = generate_trades(rng, Utc::now(), months);
    let generated = trades.len();
    for trade in trades {
        service.record(trade).await?;
    }
    info!("Created {} sample trades spanning {} months", generated, months);

    service.stats().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::validation::check_price_levels;
    use crate::trade::{MemoryTradeRepository, ValidationPolicy};
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_generated_trades_are_valid_and_closed() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = fixed_now();
        let trades = generate_trades(&mut rng, now, 6);

        assert!(!trades.is_empty());
        for trade in &trades {
            let sample = SYMBOLS.iter().find(|s| s.symbol == trade.symbol).unwrap();
            assert_eq!(trade.lot_size, Decimal::from(sample.lot_size));

            let exit_time = trade.exit_time.unwrap();
            assert!(trade.entry_time < exit_time);
            assert!(exit_time < now);

            assert!(check_price_levels(trade.side, trade.entry_price, trade.stop_loss, trade.take_profit).is_ok());
            let exit = trade.exit_price.unwrap();
            assert!(exit == trade.stop_loss.unwrap() || exit == trade.take_profit.unwrap());

            let score = trade.checklist_score.unwrap();
            assert!((20..=100).contains(&score));
        }
    }

    #[test]
    fn test_first_month_is_fully_populated() {
        let mut rng = StdRng::seed_from_u64(11);
        let trades = generate_trades(&mut rng, fixed_now(), 6);

        // six months back from mid July lands in January
        let january = trades.iter().filter(|t| t.entry_time.month() == 1).count();
        assert!(january >= 1);
        assert!(trades.iter().all(|t| t.entry_time.year() == 2024));
    }

    #[test]
    fn test_grade_weights_cover_every_roll() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let grade = pick_grade(&mut rng);
            assert!(GRADES.iter().any(|(g, _)| *g == grade));
        }
    }

    #[test]
    fn test_next_month_rolls_over_year() {
        let december = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        assert_eq!(next_month(december), NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[tokio::test]
    async fn test_seed_journal_records_every_trade() {
        let service = TradeService::new(MemoryTradeRepository::new(), ValidationPolicy::default());
        let mut rng = StdRng::seed_from_u64(42);

        let stats = seed_journal(&service, &mut rng, 3, false).await.unwrap();

        assert!(stats.total_trades > 0);
        assert_eq!(stats.total_trades, stats.closed_trades);
        assert_eq!(stats.winning_trades + stats.losing_trades, stats.closed_trades);
    }
}
