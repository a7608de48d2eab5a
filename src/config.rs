//! Runtime settings
//!
//! Every setting can come from a command-line flag or an environment
//! variable; a `.env` file is loaded before parsing.

use clap::{builder::BoolishValueParser, ArgAction, Args};
use std::time::Duration;

use crate::db::PoolConfig;
use crate::error::ConfigError;
use crate::trade::ValidationPolicy;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_PREFIX: &str = "/api/v1";
pub const DEFAULT_TITLE: &str = "Trading Journal API";
pub const DEFAULT_DB_HOST: &str = "db";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_NAME: &str = "app_db";
pub const DEFAULT_DB_USER: &str = "postgres";
pub const DEFAULT_DB_PASSWORD: &str = "password";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

const LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to run the web server on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Path prefix for every API route
    #[arg(long, env = "API_PREFIX", default_value = DEFAULT_PREFIX)]
    pub api_prefix: String,

    /// Service title reported by the status endpoint
    #[arg(long, env = "API_TITLE", default_value = DEFAULT_TITLE)]
    pub api_title: String,

    /// Service version reported by health and status endpoints
    #[arg(long, env = "API_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub api_version: String,

    /// Debug mode flag reported by the status endpoints
    #[arg(long, env = "API_DEBUG", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub api_debug: bool,

    /// Full Postgres URL, overrides the individual DATABASE_* parts
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "DATABASE_HOST", default_value = DEFAULT_DB_HOST)]
    pub database_host: String,

    #[arg(long, env = "DATABASE_PORT", default_value_t = DEFAULT_DB_PORT)]
    pub database_port: u16,

    #[arg(long, env = "DATABASE_NAME", default_value = DEFAULT_DB_NAME)]
    pub database_name: String,

    #[arg(long, env = "DATABASE_USER", default_value = DEFAULT_DB_USER)]
    pub database_user: String,

    #[arg(long, env = "DATABASE_PASSWORD", default_value = DEFAULT_DB_PASSWORD, hide_env_values = true)]
    pub database_password: String,

    /// Upper bound on pooled connections
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub database_max_connections: u32,

    /// Pool creation attempts at startup
    #[arg(long, env = "DATABASE_CONNECT_RETRIES", default_value_t = DEFAULT_CONNECT_ATTEMPTS)]
    pub database_connect_retries: u32,

    /// Seconds between pool creation attempts
    #[arg(long, env = "DATABASE_RETRY_DELAY_SECS", default_value_t = DEFAULT_RETRY_DELAY_SECS)]
    pub database_retry_delay_secs: u64,

    /// DEBUG, INFO, WARNING, ERROR or CRITICAL
    #[arg(long, env = "LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Apply schema migrations before serving
    #[arg(
        long,
        env = "RUN_MIGRATIONS_ON_STARTUP",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub run_migrations_on_startup: bool,

    /// Require stop loss and take profit on new trades
    #[arg(long, env = "REQUIRE_RISK_LEVELS", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub require_risk_levels: bool,

    /// Keep trades in process memory instead of Postgres
    #[arg(long, env = "IN_MEMORY", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub in_memory: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_prefix: DEFAULT_PREFIX.to_string(),
            api_title: DEFAULT_TITLE.to_string(),
            api_version: env!("CARGO_PKG_VERSION").to_string(),
            api_debug: false,
            database_url: None,
            database_host: DEFAULT_DB_HOST.to_string(),
            database_port: DEFAULT_DB_PORT,
            database_name: DEFAULT_DB_NAME.to_string(),
            database_user: DEFAULT_DB_USER.to_string(),
            database_password: DEFAULT_DB_PASSWORD.to_string(),
            database_max_connections: DEFAULT_MAX_CONNECTIONS,
            database_connect_retries: DEFAULT_CONNECT_ATTEMPTS,
            database_retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            run_migrations_on_startup: true,
            require_risk_levels: false,
            in_memory: false,
        }
    }
}

impl Settings {
    /// Check and normalize settings; the log level is uppercased in place
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let level = self.log_level.trim().to_uppercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log_level));
        }
        self.log_level = level;

        let prefix = self.api_prefix.trim();
        if !prefix.is_empty() && (!prefix.starts_with('/') || (prefix.len() > 1 && prefix.ends_with('/'))) {
            return Err(ConfigError::InvalidPrefix(self.api_prefix));
        }
        self.api_prefix = prefix.to_string();

        if self.database_max_connections == 0 {
            return Err(ConfigError::NotPositive { key: "DATABASE_MAX_CONNECTIONS" });
        }
        if self.database_connect_retries == 0 {
            return Err(ConfigError::NotPositive { key: "DATABASE_CONNECT_RETRIES" });
        }

        Ok(self)
    }

    /// Direct URL when given (with any `+asyncpg` driver suffix dropped), otherwise built from parts
    pub fn effective_database_url(&self) -> String {
        match self.database_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => match url.strip_prefix("postgresql+asyncpg://") {
                Some(rest) => format!("postgresql://{}", rest),
                None => url.to_string(),
            },
            _ => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.database_user,
                self.database_password,
                self.database_host,
                self.database_port,
                self.database_name
            ),
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            url: self.effective_database_url(),
            min_connections: 1,
            max_connections: self.database_max_connections,
            max_attempts: self.database_connect_retries,
            retry_delay: Duration::from_secs(self.database_retry_delay_secs),
        }
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            require_risk_levels: self.require_risk_levels,
        }
    }

    /// `tracing` level name for the configured log level
    pub fn tracing_level(&self) -> &'static str {
        match self.log_level.to_uppercase().as_str() {
            "DEBUG" => "debug",
            "WARNING" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn test_flags_parse() {
        let settings = TestCli::try_parse_from([
            "trading-journal",
            "--port",
            "9000",
            "--run-migrations-on-startup",
            "false",
            "--require-risk-levels",
            "--log-level",
            "debug",
        ])
        .unwrap()
        .settings
        .validate()
        .unwrap();

        assert_eq!(settings.port, 9000);
        assert!(!settings.run_migrations_on_startup);
        assert!(settings.require_risk_levels);
        assert_eq!(settings.log_level, "DEBUG");
        assert_eq!(settings.tracing_level(), "debug");
    }

    #[test]
    fn test_log_level_validation() {
        let settings = Settings {
            log_level: "warning".to_string(),
            ..Default::default()
        };
        let settings = settings.validate().unwrap();
        assert_eq!(settings.log_level, "WARNING");
        assert_eq!(settings.tracing_level(), "warn");

        let bad = Settings {
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        assert_eq!(
            bad.validate().unwrap_err(),
            ConfigError::InvalidLogLevel("verbose".to_string())
        );
    }

    #[test]
    fn test_prefix_validation() {
        for prefix in ["api", "/api/"] {
            let settings = Settings {
                api_prefix: prefix.to_string(),
                ..Default::default()
            };
            assert!(matches!(settings.validate(), Err(ConfigError::InvalidPrefix(_))));
        }

        for prefix in ["", "/", "/journal"] {
            let settings = Settings {
                api_prefix: prefix.to_string(),
                ..Default::default()
            };
            assert!(settings.validate().is_ok(), "{prefix}");
        }
    }

    #[test]
    fn test_effective_database_url() {
        let settings = Settings::default();
        assert_eq!(
            settings.effective_database_url(),
            "postgresql://postgres:password@db:5432/app_db"
        );

        let direct = Settings {
            database_url: Some("postgresql+asyncpg://u:p@localhost:5433/journal".to_string()),
            ..Default::default()
        };
        assert_eq!(direct.effective_database_url(), "postgresql://u:p@localhost:5433/journal");

        let blank = Settings {
            database_url: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.effective_database_url(), settings.effective_database_url());
    }

    #[test]
    fn test_pool_config() {
        let settings = Settings {
            database_connect_retries: 3,
            database_retry_delay_secs: 1,
            ..Default::default()
        };
        let pool = settings.pool_config();
        assert_eq!(pool.max_attempts, 3);
        assert_eq!(pool.retry_delay, Duration::from_secs(1));
        assert_eq!(pool.min_connections, 1);
    }
}
