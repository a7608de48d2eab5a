//! Trade operations: validation, P&L and storage wired together

use serde_json::Value;
use tracing::{debug, info, warn};

use super::models::{NewTrade, Side, Trade, TradeFilter, TradePage, MAX_PAGE_LIMIT, DEFAULT_PAGE_LIMIT};
use super::pnl::{compute_pnl, merge_update, trade_pnl};
use super::repository::TradeRepository;
use super::stats::{summarize, TradeStats};
use super::validation::{check_price_levels, normalize_symbol, validate_new_trade, validate_update, ValidationPolicy};
use crate::error::{ServiceError, ValidationError};

/// Raw list parameters as received from a caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListParams {
    /// Normalize the symbol and bound the page window
    pub fn into_filter(self) -> Result<TradeFilter, ValidationError> {
        let symbol = match self.symbol.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(normalize_symbol(raw)?),
        };
        let side = match self.side.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<Side>()?),
        };

        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(ValidationError::new(
                "limit",
                format!("limit must be between 1 and {}", MAX_PAGE_LIMIT),
            ));
        }

        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(ValidationError::new("offset", "offset must not be negative"));
        }

        Ok(TradeFilter { symbol, side, limit, offset })
    }
}

fn check_trade_id(id: i64) -> Result<(), ValidationError> {
    if id <= 0 {
        return Err(ValidationError::new("trade_id", "Trade ID must be a positive integer"));
    }
    Ok(())
}

/// Trade operations over any store
#[derive(Debug, Clone)]
pub struct TradeService<R> {
    repo: R,
    policy: ValidationPolicy,
}

impl<R: TradeRepository> TradeService<R> {
    pub fn new(repo: R, policy: ValidationPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate a raw payload and store it with a freshly computed P&L
    pub async fn create_trade(&self, payload: &Value) -> Result<Trade, ServiceError> {
        let trade = validate_new_trade(payload, &self.policy)?;
        self.record(trade).await
    }

    /// Store an already-built trade. P&L is always computed here, never taken from input.
    pub async fn record(&self, trade: NewTrade) -> Result<Trade, ServiceError> {
        check_price_levels(trade.side, trade.entry_price, trade.stop_loss, trade.take_profit)?;

        let pnl = compute_pnl(
            trade.side,
            trade.quantity,
            trade.lot_size,
            trade.entry_price,
            trade.exit_price,
            trade.fees,
        )?;

        let stored = self.repo.insert(&trade, pnl).await?;
        info!(
            "Created trade {} {} {} x{} @ {} (pnl: {:?})",
            stored.id, stored.side, stored.symbol, stored.quantity, stored.entry_price, stored.pnl
        );
        Ok(stored)
    }

    pub async fn get_trade(&self, id: i64) -> Result<Option<Trade>, ServiceError> {
        check_trade_id(id)?;
        Ok(self.repo.get(id).await?)
    }

    pub async fn list_trades(&self, params: ListParams) -> Result<TradePage, ServiceError> {
        let filter = params.into_filter()?;
        let trades = self.repo.list(&filter).await?;
        let total = self.repo.count(&filter).await?;
        debug!("Listed {} of {} trades ({:?})", trades.len(), total, filter);

        Ok(TradePage { trades, total, filter })
    }

    /// Merge a partial payload into the stored trade. `Ok(None)` when the id is unknown.
    pub async fn update_trade(&self, id: i64, payload: &Value) -> Result<Option<Trade>, ServiceError> {
        check_trade_id(id)?;
        let update = validate_update(payload)?;

        let Some(existing) = self.repo.get(id).await? else {
            return Ok(None);
        };

        let merged = merge_update(&existing, &update)?;
        check_price_levels(merged.side, merged.entry_price, merged.stop_loss, merged.take_profit)?;

        if let Some(supplied) = update.pnl {
            // Caller-supplied P&L is stored as given; flag drift from the fields
            if let Ok(Some(recomputed)) = trade_pnl(&merged) {
                if recomputed != supplied {
                    warn!(
                        "Trade {}: supplied pnl {} differs from computed {}",
                        id, supplied, recomputed
                    );
                }
            }
        }

        let updated = self.repo.update(&merged).await?;
        if let Some(trade) = &updated {
            info!("Updated trade {} (pnl: {:?})", trade.id, trade.pnl);
        }
        Ok(updated)
    }

    /// `false` when nothing was stored under `id`
    pub async fn delete_trade(&self, id: i64) -> Result<bool, ServiceError> {
        check_trade_id(id)?;
        let deleted = self.repo.delete(id).await?;
        if deleted {
            info!("Deleted trade {}", id);
        }
        Ok(deleted)
    }

    pub async fn stats(&self) -> Result<TradeStats, ServiceError> {
        let trades = self.repo.all().await?;
        Ok(summarize(&trades))
    }

    pub async fn clear_trades(&self) -> Result<u64, ServiceError> {
        let removed = self.repo.clear().await?;
        info!("Cleared {} trades", removed);
        Ok(removed)
    }
}
