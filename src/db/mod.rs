//! Connection pool setup and schema migrations

pub mod migrations;

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::StorageError;

pub use migrations::{migration_names, run_migrations, Migration, MIGRATIONS};

/// Pool sizing and startup retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    /// Total connection attempts, including the first
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

/// Create the pool, retrying a fixed number of times with a fixed delay.
///
/// This is the only place storage calls are retried.
pub async fn connect_with_retry(config: &PoolConfig) -> Result<PgPool, StorageError> {
    let max_attempts = config.max_attempts.max(1);

    info!("Initializing database connection pool...");
    info!("   URL: {}", redact_url(&config.url));
    info!("   Max attempts: {}", max_attempts);
    info!("   Retry delay: {:?}", config.retry_delay);

    let mut attempt = 1;
    loop {
        info!("Creating database pool (attempt {}/{})...", attempt, max_attempts);

        let result = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await;

        match result {
            Ok(pool) => {
                info!(
                    "Database pool created (min={}, max={})",
                    config.min_connections, config.max_connections
                );
                return Ok(pool);
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    "Failed to create database pool (attempt {}/{}): {}",
                    attempt, max_attempts, e
                );
                info!("Retrying in {:?}...", config.retry_delay);
                tokio::time::sleep(config.retry_delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!("Failed to create database pool after {} attempts: {}", max_attempts, e);
                return Err(StorageError::Unavailable {
                    attempts: max_attempts,
                    source: e,
                });
            }
        }
    }
}

/// Mask the password in a connection URL for logging
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}
