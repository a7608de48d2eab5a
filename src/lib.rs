// Library crate - trade journal domain, storage and HTTP surface

pub mod api;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod seed;
pub mod trade;

// Re-export commonly used types
pub use config::Settings;
pub use context::AppContext;
pub use error::{ConfigError, MigrationError, ServiceError, StorageError, ValidationError};
pub use trade::{NewTrade, Side, Trade, TradeService, TradeUpdate};
