//! Realized P&L and the update merge that feeds it

use rust_decimal::{Decimal, RoundingStrategy};

use super::models::{Side, Trade, TradeUpdate};
use super::validation::{amount_limit, AMOUNT_SCALE};
use crate::error::ValidationError;

fn out_of_range() -> ValidationError {
    ValidationError::new(
        "quantity",
        "Computed P&L is out of range for the given quantity, lot size and prices",
    )
}

/// Realized profit or loss, `None` while the trade has no exit price.
///
/// Rounded half away from zero to the 8 decimal places the trade store keeps.
/// Fails on `quantity` when the result cannot be represented.
pub fn compute_pnl(
    side: Side,
    quantity: Decimal,
    lot_size: Decimal,
    entry_price: Decimal,
    exit_price: Option<Decimal>,
    fees: Decimal,
) -> Result<Option<Decimal>, ValidationError> {
    let Some(exit_price) = exit_price else {
        return Ok(None);
    };

    let move_per_unit = match side {
        Side::Buy => exit_price.checked_sub(entry_price),
        Side::Sell => entry_price.checked_sub(exit_price),
    };
    let pnl = move_per_unit
        .and_then(|m| m.checked_mul(quantity))
        .and_then(|m| m.checked_mul(lot_size))
        .and_then(|gross| gross.checked_sub(fees))
        .ok_or_else(out_of_range)?
        .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero);

    if pnl.abs() >= amount_limit() {
        return Err(out_of_range());
    }
    Ok(Some(pnl))
}

/// P&L of a trade recomputed from its own fields
pub fn trade_pnl(trade: &Trade) -> Result<Option<Decimal>, ValidationError> {
    compute_pnl(
        trade.side,
        trade.quantity,
        trade.lot_size,
        trade.entry_price,
        trade.exit_price,
        trade.fees,
    )
}

/// Overlay an update on the stored trade.
///
/// Present fields win, absent fields keep the stored value. A `pnl` in the
/// update is taken verbatim; otherwise P&L is recomputed from the merged fields.
pub fn merge_update(existing: &Trade, update: &TradeUpdate) -> Result<Trade, ValidationError> {
    let mut merged = existing.clone();

    if let Some(symbol) = &update.symbol {
        merged.symbol = symbol.clone();
    }
    if let Some(side) = update.side {
        merged.side = side;
    }
    if let Some(quantity) = update.quantity {
        merged.quantity = quantity;
    }
    if let Some(lot_size) = update.lot_size {
        merged.lot_size = lot_size;
    }
    if let Some(entry_price) = update.entry_price {
        merged.entry_price = entry_price;
    }
    if let Some(entry_time) = update.entry_time {
        merged.entry_time = entry_time;
    }
    if update.exit_price.is_some() {
        merged.exit_price = update.exit_price;
    }
    if update.exit_time.is_some() {
        merged.exit_time = update.exit_time;
    }
    if update.exit_reason.is_some() {
        merged.exit_reason = update.exit_reason.clone();
    }
    if update.stop_loss.is_some() {
        merged.stop_loss = update.stop_loss;
    }
    if update.take_profit.is_some() {
        merged.take_profit = update.take_profit;
    }
    if let Some(fees) = update.fees {
        merged.fees = fees;
    }
    if update.notes.is_some() {
        merged.notes = update.notes.clone();
    }
    if update.checklist_grade.is_some() {
        merged.checklist_grade = update.checklist_grade.clone();
    }
    if update.checklist_score.is_some() {
        merged.checklist_score = update.checklist_score;
    }

    merged.pnl = match update.pnl {
        Some(pnl) => Some(pnl),
        None => trade_pnl(&merged)?,
    };

    Ok(merged)
}
