use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::error::ApiError;
use crate::context::AppContext;
use crate::trade::{ListParams, Trade, TradePage, TradeStats};

/// Trade as returned over HTTP, with derived fields
#[derive(Debug, Serialize)]
pub struct TradeResponse {
    #[serde(flatten)]
    pub trade: Trade,
    pub is_closed: bool,
    pub duration_seconds: Option<i64>,
}

impl From<Trade> for TradeResponse {
    fn from(trade: Trade) -> Self {
        Self {
            is_closed: trade.is_closed(),
            duration_seconds: trade.duration_seconds(),
            trade,
        }
    }
}

/// Response for create and update
#[derive(Debug, Serialize)]
pub struct TradeEnvelope {
    pub trade: TradeResponse,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize)]
pub struct AppliedFilters {
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Response for trades list
#[derive(Debug, Serialize)]
pub struct TradeListResponse {
    pub trades: Vec<TradeResponse>,
    pub pagination: Pagination,
    pub filters: AppliedFilters,
}

impl From<TradePage> for TradeListResponse {
    fn from(page: TradePage) -> Self {
        let pagination = Pagination {
            total: page.total,
            page: page.page(),
            size: page.filter.limit,
            pages: page.pages(),
            has_next: page.has_next(),
            has_prev: page.has_prev(),
        };
        let filters = AppliedFilters {
            symbol: page.filter.symbol.clone(),
            side: page.filter.side.map(|s| s.to_string()),
            limit: page.filter.limit,
            offset: page.filter.offset,
        };

        Self {
            trades: page.trades.into_iter().map(TradeResponse::from).collect(),
            pagination,
            filters,
        }
    }
}

/// Query params for the trades list endpoint
#[derive(Debug, Default, Deserialize)]
pub struct TradesQueryParams {
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<TradesQueryParams> for ListParams {
    fn from(params: TradesQueryParams) -> Self {
        Self {
            symbol: params.symbol,
            side: params.side,
            limit: params.limit,
            offset: params.offset,
        }
    }
}

/// POST /trades - Create a trade
pub async fn create_trade(
    State(ctx): State<Arc<AppContext>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<TradeEnvelope>), ApiError> {
    let Json(payload) = payload?;
    let trade = ctx.trades().create_trade(&payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(TradeEnvelope {
            trade: trade.into(),
            message: "Trade created successfully",
        }),
    ))
}

/// GET /trades/{id} - Fetch one trade
pub async fn get_trade(
    State(ctx): State<Arc<AppContext>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<TradeResponse>, ApiError> {
    let Path(id) = id?;
    match ctx.trades().get_trade(id).await? {
        Some(trade) => Ok(Json(trade.into())),
        None => Err(ApiError::trade_not_found(id)),
    }
}

/// GET /trades - List trades with filtering and pagination
pub async fn list_trades(
    State(ctx): State<Arc<AppContext>>,
    params: Result<Query<TradesQueryParams>, QueryRejection>,
) -> Result<Json<TradeListResponse>, ApiError> {
    let Query(params) = params?;
    let page = ctx.trades().list_trades(params.into()).await?;
    Ok(Json(page.into()))
}

/// PUT /trades/{id} - Partial update
pub async fn update_trade(
    State(ctx): State<Arc<AppContext>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TradeEnvelope>, ApiError> {
    let (Path(id), Json(payload)) = (id?, payload?);
    match ctx.trades().update_trade(id, &payload).await? {
        Some(trade) => Ok(Json(TradeEnvelope {
            trade: trade.into(),
            message: "Trade updated successfully",
        })),
        None => Err(ApiError::trade_not_found(id)),
    }
}

/// DELETE /trades/{id} - Remove a trade
pub async fn delete_trade(
    State(ctx): State<Arc<AppContext>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    if ctx.trades().delete_trade(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::trade_not_found(id))
    }
}

/// GET /trades/stats - Journal summary
pub async fn get_stats(State(ctx): State<Arc<AppContext>>) -> Result<Json<TradeStats>, ApiError> {
    Ok(Json(ctx.trades().stats().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::trade::{MemoryTradeRepository, Repository};
    use serde_json::json;

    fn context() -> Arc<AppContext> {
        Arc::new(AppContext::with_repository(
            Settings::default(),
            Repository::Memory(MemoryTradeRepository::new()),
        ))
    }

    fn closed_buy() -> Value {
        json!({
            "symbol": "aapl",
            "side": "buy",
            "quantity": 2,
            "lot_size": 100,
            "entry_price": 150.00,
            "entry_time": "2024-01-15T10:30:00Z",
            "exit_price": 155.00,
            "exit_time": "2024-01-16T14:45:00Z",
            "fees": 1.50
        })
    }

    #[tokio::test]
    async fn test_create_then_get_serializes_derived_fields() {
        let ctx = context();
        let (status, Json(created)) = create_trade(State(ctx.clone()), Ok(Json(closed_buy())))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let id = created.trade.trade.id;
        let Json(fetched) = get_trade(State(ctx), Ok(Path(id))).await.unwrap();
        let body = serde_json::to_value(&fetched).unwrap();

        assert_eq!(body["id"], json!(id));
        assert_eq!(body["symbol"], json!("AAPL"));
        assert_eq!(body["side"], json!("buy"));
        assert_eq!(body["pnl"], json!(998.5));
        assert_eq!(body["is_closed"], json!(true));
        assert_eq!(body["duration_seconds"], json!(28 * 3600 + 15 * 60));
    }

    #[tokio::test]
    async fn test_missing_trade_is_404() {
        let err = get_trade(State(context()), Ok(Path(12))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = delete_trade(State(context()), Ok(Path(12))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = update_trade(State(context()), Ok(Path(12)), Ok(Json(json!({"notes": "x"}))))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validation_failure_is_422() {
        let mut payload = closed_buy();
        payload["side"] = json!("hold");

        let err = create_trade(State(context()), Ok(Json(payload))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_delete_returns_no_content() {
        let ctx = context();
        let (_, Json(created)) = create_trade(State(ctx.clone()), Ok(Json(closed_buy())))
            .await
            .unwrap();

        let status = delete_trade(State(ctx), Ok(Path(created.trade.trade.id))).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_list_empty_page_metadata() {
        let params = TradesQueryParams {
            limit: Some(50),
            offset: Some(0),
            ..Default::default()
        };
        let Json(list) = list_trades(State(context()), Ok(Query(params))).await.unwrap();
        let body = serde_json::to_value(&list).unwrap();

        assert_eq!(body["trades"], json!([]));
        assert_eq!(
            body["pagination"],
            json!({"total": 0, "page": 1, "size": 50, "pages": 0, "has_next": false, "has_prev": false})
        );
        assert_eq!(
            body["filters"],
            json!({"symbol": null, "side": null, "limit": 50, "offset": 0})
        );
    }

    #[tokio::test]
    async fn test_list_pages_through_results() {
        let ctx = context();
        for _ in 0..3 {
            create_trade(State(ctx.clone()), Ok(Json(closed_buy()))).await.unwrap();
        }

        let params = TradesQueryParams {
            symbol: Some("AAPL".to_string()),
            limit: Some(2),
            offset: Some(2),
            ..Default::default()
        };
        let Json(list) = list_trades(State(ctx), Ok(Query(params))).await.unwrap();

        assert_eq!(list.trades.len(), 1);
        assert_eq!(list.pagination.total, 3);
        assert_eq!(list.pagination.page, 2);
        assert_eq!(list.pagination.pages, 2);
        assert!(!list.pagination.has_next);
        assert!(list.pagination.has_prev);
        // equal entry times fall back to id descending
        assert_eq!(list.trades[0].trade.id, 1);
    }
}
