//! HTTP surface: trade CRUD plus health and status probes

pub mod error;
pub mod health;
pub mod trades;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use std::{any::Any, sync::Arc};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

use crate::context::AppContext;

pub use error::ApiError;

/// Routes relative to the configured prefix
fn routes() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/trades", get(trades::list_trades).post(trades::create_trade))
        .route("/trades/stats", get(trades::get_stats))
        .route(
            "/trades/{id}",
            get(trades::get_trade)
                .put(trades::update_trade)
                .delete(trades::delete_trade),
        )
        .route("/health", get(health::health))
        .route("/health/detailed", get(health::health_detailed))
        .route("/health/schema", get(health::health_schema))
        .route("/status", get(health::status))
}

/// Build the application router
pub fn router(ctx: Arc<AppContext>) -> Router {
    let prefix = ctx.settings.api_prefix.clone();

    let app = match prefix.as_str() {
        "" | "/" => routes(),
        prefix => Router::new().nest(prefix, routes()),
    };

    app.layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(AnyOrigin).allow_methods(AnyOrigin).allow_headers(AnyOrigin))
        .with_state(ctx)
}

/// Generic 500 for a handler that panicked
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Request handler panicked: {}", detail);

    let body = json!({
        "success": false,
        "error": {
            "message": "An unexpected error occurred. Please try again later.",
            "code": "INTERNAL_ERROR",
            "status_code": 500,
            "details": {},
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
