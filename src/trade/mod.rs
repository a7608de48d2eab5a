//! Trade journal domain
//!
//! - [`models`] - the trade entity and its input shapes
//! - [`validation`] - payload checks naming the offending field
//! - [`pnl`] - realized P&L and the partial-update merge
//! - [`repository`] - Postgres and in-memory stores
//! - [`service`] - operations used by the HTTP handlers and the CLI
//! - [`stats`] - win/loss and monthly summaries

pub mod models;
pub mod pnl;
pub mod repository;
pub mod service;
pub mod stats;
pub mod validation;

// Re-export commonly used types
pub use models::{NewTrade, Side, Trade, TradeFilter, TradePage, TradeUpdate};
pub use pnl::{compute_pnl, merge_update};
pub use repository::{MemoryTradeRepository, PgTradeRepository, Repository, SchemaStatus, TradeRepository};
pub use service::{ListParams, TradeService};
pub use stats::TradeStats;
pub use validation::ValidationPolicy;
