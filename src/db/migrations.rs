//! Ordered, idempotent schema scripts compiled into the binary

use sqlx::{Executor, PgPool};
use tracing::info;

use crate::error::MigrationError;

/// One schema script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

/// Applied in this order; every script must be safe to re-run
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "001_create_trades.sql",
        sql: include_str!("../../migrations/001_create_trades.sql"),
    },
    Migration {
        name: "002_trade_review_fields.sql",
        sql: include_str!("../../migrations/002_trade_review_fields.sql"),
    },
    Migration {
        name: "003_trade_indexes.sql",
        sql: include_str!("../../migrations/003_trade_indexes.sql"),
    },
];

pub fn migration_names() -> Vec<&'static str> {
    MIGRATIONS.iter().map(|m| m.name).collect()
}

/// Apply every migration, each in its own transaction. The first failure aborts.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    for migration in MIGRATIONS {
        info!("Applying migration {}", migration.name);
        apply(pool, migration).await.map_err(|source| MigrationError {
            migration: migration.name,
            source,
        })?;
    }
    info!("Migrations applied");
    Ok(())
}

async fn apply(pool: &PgPool, migration: &Migration) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    // Unprepared execution so a script may hold several statements
    (&mut *tx).execute(migration.sql).await?;
    tx.commit().await
}
