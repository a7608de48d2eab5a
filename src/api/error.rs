//! Error responses for the HTTP layer

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::error::{ServiceError, StorageError, ValidationError};

#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    NotFound { resource: &'static str, id: i64 },
    Storage(StorageError),
}

impl ApiError {
    pub fn trade_not_found(id: i64) -> Self {
        Self::NotFound { resource: "Trade", id }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Storage(StorageError::CorruptRow { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Storage(StorageError::CorruptRow { .. }) => "INTERNAL_ERROR",
            Self::Storage(_) => "DATABASE_ERROR",
        }
    }

    /// Client-facing message; storage internals stay in the server log
    fn message(&self) -> String {
        match self {
            Self::Validation(e) => e.message.clone(),
            Self::NotFound { resource, id } => format!("{} with ID {} not found", resource, id),
            Self::Storage(StorageError::CorruptRow { .. }) => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
            Self::Storage(_) => "The trade store is currently unavailable.".to_string(),
        }
    }

    fn details(&self) -> Value {
        match self {
            Self::Validation(e) => json!({ "field": e.field }),
            Self::NotFound { id, .. } => json!({ "trade_id": id }),
            Self::Storage(_) => json!({}),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => Self::Validation(e),
            ServiceError::Storage(e) => Self::Storage(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(ValidationError::new("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(ValidationError::new("query", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(ValidationError::new("trade_id", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            Self::Storage(e) => error!("Storage failure: {:?}", e),
            Self::Validation(e) => warn!("Rejected request: {} ({})", e.message, e.field),
            Self::NotFound { resource, id } => warn!("{} {} not found", resource, id),
        }

        let body = json!({
            "success": false,
            "error": {
                "message": self.message(),
                "code": self.code(),
                "status_code": status.as_u16(),
                "details": self.details(),
            },
            "timestamp": Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ValidationError::missing("symbol")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::trade_not_found(3).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Storage(StorageError::Database(sqlx::Error::PoolTimedOut)).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Storage(StorageError::CorruptRow { id: 1, reason: "bad side".to_string() }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_message_hides_internals() {
        let err = ApiError::Storage(StorageError::Database(sqlx::Error::Protocol(
            "password authentication failed for user postgres".to_string(),
        )));
        assert!(!err.message().contains("password"));
        assert_eq!(err.code(), "DATABASE_ERROR");
    }
}
