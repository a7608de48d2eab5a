//! Process-wide state handed to every request handler
//!
//! Built once at startup and shut down once after the server drains.

use anyhow::{Context as _, Result};
use tracing::info;

use crate::config::Settings;
use crate::db;
use crate::trade::{MemoryTradeRepository, PgTradeRepository, Repository, TradeService};

pub struct AppContext {
    pub settings: Settings,
    trades: TradeService<Repository>,
}

impl AppContext {
    /// Connect storage (with startup retries) and apply migrations when enabled.
    ///
    /// Any failure here is fatal to startup.
    pub async fn init(settings: Settings) -> Result<Self> {
        let repository = if settings.in_memory {
            info!("Using in-memory trade storage");
            Repository::Memory(MemoryTradeRepository::new())
        } else {
            let pool = db::connect_with_retry(&settings.pool_config())
                .await
                .context("Failed to connect to the database")?;

            if settings.run_migrations_on_startup {
                db::run_migrations(&pool)
                    .await
                    .context("Failed to apply startup migrations")?;
            } else {
                info!("Startup migrations disabled");
            }

            Repository::Postgres(PgTradeRepository::new(pool))
        };

        Ok(Self::with_repository(settings, repository))
    }

    pub fn with_repository(settings: Settings, repository: Repository) -> Self {
        let trades = TradeService::new(repository, settings.validation_policy());
        Self { settings, trades }
    }

    pub fn trades(&self) -> &TradeService<Repository> {
        &self.trades
    }

    pub fn repository(&self) -> &Repository {
        self.trades.repository()
    }

    /// Close pooled connections
    pub async fn shutdown(&self) {
        if let Repository::Postgres(repo) = self.repository() {
            repo.pool().close().await;
            info!("Database pool closed");
        }
    }
}
