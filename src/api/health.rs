use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::context::AppContext;
use crate::db::{migration_names, redact_url};
use crate::trade::{SchemaStatus, TradeRepository};

pub const SERVICE_NAME: &str = "trading-journal-api";

/// Overall verdict of the detailed health check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthLevel {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }

    /// Unreachable storage is fatal, a schema that is not ready only degrades
    pub fn from_checks(database_ok: bool, schema: Option<&SchemaStatus>) -> Self {
        match (database_ok, schema) {
            (false, _) => Self::Unhealthy,
            (true, Some(s)) if s.schema_ready => Self::Healthy,
            (true, _) => Self::Degraded,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::OK,
        }
    }
}

/// GET /health - Liveness
pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
        "version": ctx.settings.api_version,
    }))
}

/// GET /health/detailed - Storage, schema and configuration checks
pub async fn health_detailed(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let repo = ctx.repository();

    let (database, database_ok) = match repo.ping().await {
        Ok(()) => (json!({"status": "healthy", "backend": repo.kind()}), true),
        Err(e) => {
            warn!("Health check could not reach storage: {}", e);
            (
                json!({"status": "unhealthy", "backend": repo.kind(), "error": "Storage unreachable"}),
                false,
            )
        }
    };

    let schema = if database_ok {
        match repo.schema_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Health check could not read schema status: {}", e);
                None
            }
        }
    } else {
        None
    };

    let schema_check = match &schema {
        Some(status) => json!({
            "status": if status.schema_ready { "healthy" } else { "degraded" },
            "details": status,
        }),
        None => json!({"status": "unknown"}),
    };

    let level = HealthLevel::from_checks(database_ok, schema.as_ref());

    let body = json!({
        "status": level.as_str(),
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
        "version": ctx.settings.api_version,
        "checks": {
            "database": database,
            "schema": schema_check,
            "configuration": {
                "status": "healthy",
                "log_level": ctx.settings.log_level,
                "api_prefix": ctx.settings.api_prefix,
            },
        },
    });

    (level.status_code(), Json(body))
}

/// GET /health/schema - Schema readiness and known migrations
pub async fn health_schema(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    match ctx.repository().schema_status().await {
        Ok(status) => (
            StatusCode::OK,
            Json(json!({
                "status": if status.schema_ready { "ready" } else { "not_ready" },
                "schema": status,
                "migrations": migration_names(),
                "migrations_enabled": ctx.settings.run_migrations_on_startup,
                "timestamp": Utc::now().to_rfc3339(),
            })),
        ),
        Err(e) => {
            warn!("Schema status unavailable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "error",
                    "error": "Storage unreachable",
                    "migrations": migration_names(),
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
    }
}

/// GET /status - Effective settings, without credentials
pub async fn status(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let settings = &ctx.settings;
    let database_url = settings
        .database_url
        .as_deref()
        .map(redact_url);

    Json(json!({
        "api": {
            "title": settings.api_title,
            "version": settings.api_version,
            "prefix": settings.api_prefix,
            "debug": settings.api_debug,
        },
        "database": {
            "backend": ctx.repository().kind(),
            "host": settings.database_host,
            "port": settings.database_port,
            "name": settings.database_name,
            "user": settings.database_user,
            "url": database_url,
            "max_connections": settings.database_max_connections,
        },
        "application": {
            "log_level": settings.log_level,
            "run_migrations_on_startup": settings.run_migrations_on_startup,
            "require_risk_levels": settings.require_risk_levels,
        },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::trade::{MemoryTradeRepository, Repository};

    fn context(settings: Settings) -> Arc<AppContext> {
        Arc::new(AppContext::with_repository(
            settings,
            Repository::Memory(MemoryTradeRepository::new()),
        ))
    }

    #[test]
    fn test_health_level() {
        let ready = SchemaStatus {
            trades_table_exists: true,
            total_tables: 1,
            trades_columns: 19,
            schema_ready: true,
        };
        let missing = SchemaStatus {
            trades_table_exists: false,
            total_tables: 0,
            trades_columns: 0,
            schema_ready: false,
        };

        assert_eq!(HealthLevel::from_checks(true, Some(&ready)), HealthLevel::Healthy);
        assert_eq!(HealthLevel::from_checks(true, Some(&missing)), HealthLevel::Degraded);
        assert_eq!(HealthLevel::from_checks(true, None), HealthLevel::Degraded);
        assert_eq!(HealthLevel::from_checks(false, None), HealthLevel::Unhealthy);
    }

    #[tokio::test]
    async fn test_liveness_body() {
        let Json(body) = health(State(context(Settings::default()))).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], SERVICE_NAME);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_status_never_exposes_password() {
        let settings = Settings {
            database_password: "hunter2".to_string(),
            database_url: Some("postgresql://journal:hunter2@db:5432/app_db".to_string()),
            ..Default::default()
        };
        let Json(body) = status(State(context(settings))).await;

        assert!(!body.to_string().contains("hunter2"));
        assert_eq!(body["database"]["backend"], "memory");
        assert_eq!(body["api"]["prefix"], "/api/v1");
    }
}
