//! Postgres trade store
//!
//! Every statement is a fixed, parameterized query. Optional filters use
//! `($n::text IS NULL OR column = $n)` so one prepared statement covers every
//! filter combination.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{query, query_as, query_scalar, FromRow, PgPool};

use super::{SchemaStatus, TradeRepository};
use crate::error::StorageError;
use crate::trade::models::{NewTrade, Side, Trade, TradeFilter};

/// Columns in the `trades` table once every migration has run
pub const TRADE_COLUMN_COUNT: i64 = 19;

macro_rules! trade_columns {
    () => {
        "id, symbol, side, quantity, lot_size, entry_price, entry_time, \
         exit_price, exit_time, exit_reason, stop_loss, take_profit, fees, \
         notes, pnl, checklist_grade, checklist_score, created_at, updated_at"
    };
}

/// Raw `trades` row, before `side` is parsed
#[derive(Debug, FromRow)]
struct TradeRow {
    id: i64,
    symbol: String,
    side: String,
    quantity: Decimal,
    lot_size: Decimal,
    entry_price: Decimal,
    entry_time: DateTime<Utc>,
    exit_price: Option<Decimal>,
    exit_time: Option<DateTime<Utc>>,
    exit_reason: Option<String>,
    stop_loss: Option<Decimal>,
    take_profit: Option<Decimal>,
    fees: Decimal,
    notes: Option<String>,
    pnl: Option<Decimal>,
    checklist_grade: Option<String>,
    checklist_score: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TradeRow> for Trade {
    type Error = StorageError;

    fn try_from(row: TradeRow) -> Result<Self, Self::Error> {
        let side = row.side.parse::<Side>().map_err(|_| StorageError::CorruptRow {
            id: row.id,
            reason: format!("unknown side '{}'", row.side),
        })?;

        Ok(Trade {
            id: row.id,
            symbol: row.symbol,
            side,
            quantity: row.quantity,
            lot_size: row.lot_size,
            entry_price: row.entry_price,
            entry_time: row.entry_time,
            exit_price: row.exit_price,
            exit_time: row.exit_time,
            exit_reason: row.exit_reason,
            stop_loss: row.stop_loss,
            take_profit: row.take_profit,
            fees: row.fees,
            notes: row.notes,
            pnl: row.pnl,
            checklist_grade: row.checklist_grade,
            checklist_score: row.checklist_score,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_trades(rows: Vec<TradeRow>) -> Result<Vec<Trade>, StorageError> {
    rows.into_iter().map(Trade::try_from).collect()
}

#[derive(Debug, Clone)]
pub struct PgTradeRepository {
    pool: PgPool,
}

impl PgTradeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl TradeRepository for PgTradeRepository {
    async fn insert(&self, trade: &NewTrade, pnl: Option<Decimal>) -> Result<Trade, StorageError> {
        let q = concat!(
            "insert into trades (
                symbol, side, quantity, lot_size, entry_price, entry_time,
                exit_price, exit_time, exit_reason, stop_loss, take_profit,
                fees, notes, pnl, checklist_grade, checklist_score
            ) values (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16
            )
            returning ",
            trade_columns!()
        );

        let row: TradeRow = query_as(q)
            .bind(&trade.symbol)
            .bind(trade.side.as_str())
            .bind(trade.quantity)
            .bind(trade.lot_size)
            .bind(trade.entry_price)
            .bind(trade.entry_time)
            .bind(trade.exit_price)
            .bind(trade.exit_time)
            .bind(&trade.exit_reason)
            .bind(trade.stop_loss)
            .bind(trade.take_profit)
            .bind(trade.fees)
            .bind(&trade.notes)
            .bind(pnl)
            .bind(&trade.checklist_grade)
            .bind(trade.checklist_score)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn get(&self, id: i64) -> Result<Option<Trade>, StorageError> {
        let q = concat!("select ", trade_columns!(), " from trades where id = $1");

        let row: Option<TradeRow> = query_as(q).bind(id).fetch_optional(&self.pool).await?;
        row.map(Trade::try_from).transpose()
    }

    async fn list(&self, filter: &TradeFilter) -> Result<Vec<Trade>, StorageError> {
        let q = concat!(
            "select ",
            trade_columns!(),
            " from trades
            where ($1::text is null or symbol = $1)
              and ($2::text is null or side = $2)
            order by entry_time desc, id desc
            limit $3 offset $4"
        );

        let rows: Vec<TradeRow> = query_as(q)
            .bind(&filter.symbol)
            .bind(filter.side.map(|s| s.as_str()))
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        into_trades(rows)
    }

    async fn count(&self, filter: &TradeFilter) -> Result<i64, StorageError> {
        let q = r#"
            select count(*) from trades
            where ($1::text is null or symbol = $1)
              and ($2::text is null or side = $2)
            "#;

        let total: i64 = query_scalar(q)
            .bind(&filter.symbol)
            .bind(filter.side.map(|s| s.as_str()))
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    async fn all(&self) -> Result<Vec<Trade>, StorageError> {
        let q = concat!(
            "select ",
            trade_columns!(),
            " from trades order by entry_time desc, id desc"
        );

        let rows: Vec<TradeRow> = query_as(q).fetch_all(&self.pool).await?;
        into_trades(rows)
    }

    async fn update(&self, trade: &Trade) -> Result<Option<Trade>, StorageError> {
        let q = concat!(
            "update trades
            set
                symbol = $1,
                side = $2,
                quantity = $3,
                lot_size = $4,
                entry_price = $5,
                entry_time = $6,
                exit_price = $7,
                exit_time = $8,
                exit_reason = $9,
                stop_loss = $10,
                take_profit = $11,
                fees = $12,
                notes = $13,
                pnl = $14,
                checklist_grade = $15,
                checklist_score = $16,
                updated_at = now()
            where
                id = $17
            returning ",
            trade_columns!()
        );

        let row: Option<TradeRow> = query_as(q)
            .bind(&trade.symbol)
            .bind(trade.side.as_str())
            .bind(trade.quantity)
            .bind(trade.lot_size)
            .bind(trade.entry_price)
            .bind(trade.entry_time)
            .bind(trade.exit_price)
            .bind(trade.exit_time)
            .bind(&trade.exit_reason)
            .bind(trade.stop_loss)
            .bind(trade.take_profit)
            .bind(trade.fees)
            .bind(&trade.notes)
            .bind(trade.pnl)
            .bind(&trade.checklist_grade)
            .bind(trade.checklist_score)
            .bind(trade.id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Trade::try_from).transpose()
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        let res = query("delete from trades where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        let res = query("delete from trades").execute(&self.pool).await?;
        Ok(res.rows_affected())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let _: i32 = query_scalar("select 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn schema_status(&self) -> Result<SchemaStatus, StorageError> {
        let total_tables: i64 = query_scalar(
            "select count(*) from information_schema.tables where table_schema = 'public'",
        )
        .fetch_one(&self.pool)
        .await?;

        let trades_columns: i64 = query_scalar(
            "select count(*) from information_schema.columns
             where table_schema = 'public' and table_name = 'trades'",
        )
        .fetch_one(&self.pool)
        .await?;

        let trades_table_exists = trades_columns > 0;

        Ok(SchemaStatus {
            trades_table_exists,
            total_tables,
            trades_columns,
            schema_ready: trades_table_exists && trades_columns >= TRADE_COLUMN_COUNT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MIGRATIONS;
    use crate::trade::validation::{amount_limit, AMOUNT_SCALE};
    use chrono::TimeZone;

    fn columns() -> Vec<&'static str> {
        trade_columns!().split(',').map(str::trim).collect()
    }

    fn row(side: &str) -> TradeRow {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        TradeRow {
            id: 9,
            symbol: "AAPL".to_string(),
            side: side.to_string(),
            quantity: Decimal::new(2, 0),
            lot_size: Decimal::new(100, 0),
            entry_price: Decimal::new(15000, 2),
            entry_time: at,
            exit_price: None,
            exit_time: None,
            exit_reason: None,
            stop_loss: None,
            take_profit: None,
            fees: Decimal::ZERO,
            notes: None,
            pnl: None,
            checklist_grade: None,
            checklist_score: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_column_list_matches_schema() {
        let columns = columns();
        assert_eq!(columns.len() as i64, TRADE_COLUMN_COUNT);

        let schema: String = MIGRATIONS.iter().map(|m| m.sql.to_lowercase()).collect();
        for column in columns {
            assert!(schema.contains(column), "{column} missing from migrations");
        }
    }

    #[test]
    fn test_amount_columns_match_validation_bounds() {
        let create = MIGRATIONS[0].sql;
        assert!(create.contains(&format!("NUMERIC(20, {})", AMOUNT_SCALE)));
        assert_eq!(amount_limit(), Decimal::from(10_i64.pow(20 - AMOUNT_SCALE)));
    }

    #[test]
    fn test_row_conversion() {
        let trade = Trade::try_from(row("sell")).unwrap();
        assert_eq!(trade.side, Side::Sell);
        assert_eq!(trade.id, 9);

        match Trade::try_from(row("SELL")) {
            Err(StorageError::CorruptRow { id, reason }) => {
                assert_eq!(id, 9);
                assert!(reason.contains("SELL"));
            }
            other => panic!("expected corrupt row, got {other:?}"),
        }
    }
}
