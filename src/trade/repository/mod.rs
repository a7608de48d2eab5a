//! Trade storage
//!
//! - [`postgres`] - sqlx-backed store used in production
//! - [`memory`] - process-local store for running without a database

pub mod memory;
pub mod postgres;

use rust_decimal::Decimal;
use serde::Serialize;
use std::future::Future;

use super::models::{NewTrade, Trade, TradeFilter};
use crate::error::StorageError;

pub use memory::MemoryTradeRepository;
pub use postgres::PgTradeRepository;

/// Snapshot of schema readiness for health checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaStatus {
    pub trades_table_exists: bool,
    pub total_tables: i64,
    pub trades_columns: i64,
    pub schema_ready: bool,
}

/// Durable storage of trades keyed by id
pub trait TradeRepository: Send + Sync {
    /// Persist a new trade; storage assigns id and timestamps
    fn insert(
        &self,
        trade: &NewTrade,
        pnl: Option<Decimal>,
    ) -> impl Future<Output = Result<Trade, StorageError>> + Send;

    fn get(&self, id: i64) -> impl Future<Output = Result<Option<Trade>, StorageError>> + Send;

    /// Page of trades, newest `entry_time` first, ties broken by id descending
    fn list(&self, filter: &TradeFilter) -> impl Future<Output = Result<Vec<Trade>, StorageError>> + Send;

    /// Number of trades matching the filter, ignoring limit and offset
    fn count(&self, filter: &TradeFilter) -> impl Future<Output = Result<i64, StorageError>> + Send;

    /// Every trade, for summary statistics
    fn all(&self) -> impl Future<Output = Result<Vec<Trade>, StorageError>> + Send;

    /// Overwrite the mutable fields of `trade.id`; `None` when the id is gone
    fn update(&self, trade: &Trade) -> impl Future<Output = Result<Option<Trade>, StorageError>> + Send;

    /// `true` when a row was removed
    fn delete(&self, id: i64) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Remove every trade, returning how many were removed
    fn clear(&self) -> impl Future<Output = Result<u64, StorageError>> + Send;

    fn ping(&self) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn schema_status(&self) -> impl Future<Output = Result<SchemaStatus, StorageError>> + Send;
}

/// Store selected at startup
#[derive(Debug, Clone)]
pub enum Repository {
    Postgres(PgTradeRepository),
    Memory(MemoryTradeRepository),
}

impl Repository {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

impl TradeRepository for Repository {
    async fn insert(&self, trade: &NewTrade, pnl: Option<Decimal>) -> Result<Trade, StorageError> {
        match self {
            Self::Postgres(repo) => repo.insert(trade, pnl).await,
            Self::Memory(repo) => repo.insert(trade, pnl).await,
        }
    }

    async fn get(&self, id: i64) -> Result<Option<Trade>, StorageError> {
        match self {
            Self::Postgres(repo) => repo.get(id).await,
            Self::Memory(repo) => repo.get(id).await,
        }
    }

    async fn list(&self, filter: &TradeFilter) -> Result<Vec<Trade>, StorageError> {
        match self {
            Self::Postgres(repo) => repo.list(filter).await,
            Self::Memory(repo) => repo.list(filter).await,
        }
    }

    async fn count(&self, filter: &TradeFilter) -> Result<i64, StorageError> {
        match self {
            Self::Postgres(repo) => repo.count(filter).await,
            Self::Memory(repo) => repo.count(filter).await,
        }
    }

    async fn all(&self) -> Result<Vec<Trade>, StorageError> {
        match self {
            Self::Postgres(repo) => repo.all().await,
            Self::Memory(repo) => repo.all().await,
        }
    }

    async fn update(&self, trade: &Trade) -> Result<Option<Trade>, StorageError> {
        match self {
            Self::Postgres(repo) => repo.update(trade).await,
            Self::Memory(repo) => repo.update(trade).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        match self {
            Self::Postgres(repo) => repo.delete(id).await,
            Self::Memory(repo) => repo.delete(id).await,
        }
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        match self {
            Self::Postgres(repo) => repo.clear().await,
            Self::Memory(repo) => repo.clear().await,
        }
    }

    async fn ping(&self) -> Result<(), StorageError> {
        match self {
            Self::Postgres(repo) => repo.ping().await,
            Self::Memory(repo) => repo.ping().await,
        }
    }

    async fn schema_status(&self) -> Result<SchemaStatus, StorageError> {
        match self {
            Self::Postgres(repo) => repo.schema_status().await,
            Self::Memory(repo) => repo.schema_status().await,
        }
    }
}
