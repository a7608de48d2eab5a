//! Process-local trade store
//!
//! Mirrors the Postgres store's ordering, filtering and id assignment so the
//! service behaves the same with either backend.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{SchemaStatus, TradeRepository};
use crate::error::StorageError;
use crate::trade::models::{NewTrade, Trade, TradeFilter};

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    trades: BTreeMap<i64, Trade>,
}

/// Trade store held in memory, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct MemoryTradeRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryTradeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matching trades in list order
    fn matching<'a>(state: &'a MemoryState, filter: &TradeFilter) -> Vec<&'a Trade> {
        let mut trades: Vec<&Trade> = state
            .trades
            .values()
            .filter(|t| filter.symbol.as_deref().map_or(true, |s| t.symbol == s))
            .filter(|t| filter.side.map_or(true, |side| t.side == side))
            .collect();
        trades.sort_by(|a, b| b.entry_time.cmp(&a.entry_time).then(b.id.cmp(&a.id)));
        trades
    }
}

impl TradeRepository for MemoryTradeRepository {
    async fn insert(&self, trade: &NewTrade, pnl: Option<Decimal>) -> Result<Trade, StorageError> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let now = Utc::now();

        let stored = Trade {
            id: state.last_id,
            symbol: trade.symbol.clone(),
            side: trade.side,
            quantity: trade.quantity,
            lot_size: trade.lot_size,
            entry_price: trade.entry_price,
            entry_time: trade.entry_time,
            exit_price: trade.exit_price,
            exit_time: trade.exit_time,
            exit_reason: trade.exit_reason.clone(),
            stop_loss: trade.stop_loss,
            take_profit: trade.take_profit,
            fees: trade.fees,
            notes: trade.notes.clone(),
            pnl,
            checklist_grade: trade.checklist_grade.clone(),
            checklist_score: trade.checklist_score,
            created_at: now,
            updated_at: now,
        };
        state.trades.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: i64) -> Result<Option<Trade>, StorageError> {
        Ok(self.state.read().await.trades.get(&id).cloned())
    }

    async fn list(&self, filter: &TradeFilter) -> Result<Vec<Trade>, StorageError> {
        let state = self.state.read().await;
        let offset = usize::try_from(filter.offset).unwrap_or(0);
        let limit = usize::try_from(filter.limit).unwrap_or(0);

        Ok(Self::matching(&state, filter)
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &TradeFilter) -> Result<i64, StorageError> {
        let state = self.state.read().await;
        Ok(Self::matching(&state, filter).len() as i64)
    }

    async fn all(&self) -> Result<Vec<Trade>, StorageError> {
        let state = self.state.read().await;
        Ok(Self::matching(&state, &TradeFilter::default())
            .into_iter()
            .cloned()
            .collect())
    }

    async fn update(&self, trade: &Trade) -> Result<Option<Trade>, StorageError> {
        let mut state = self.state.write().await;
        let Some(stored) = state.trades.get_mut(&trade.id) else {
            return Ok(None);
        };

        let created_at = stored.created_at;
        *stored = Trade {
            created_at,
            updated_at: Utc::now(),
            ..trade.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        Ok(self.state.write().await.trades.remove(&id).is_some())
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        let mut state = self.state.write().await;
        let removed = state.trades.len() as u64;
        state.trades.clear();
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn schema_status(&self) -> Result<SchemaStatus, StorageError> {
        Ok(SchemaStatus {
            trades_table_exists: true,
            total_tables: 1,
            trades_columns: super::postgres::TRADE_COLUMN_COUNT,
            schema_ready: true,
        })
    }
}
