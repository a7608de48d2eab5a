//! Field-level checks that turn raw JSON payloads into trade inputs
//!
//! Every failure names the offending field. Checks run in a fixed order:
//! required fields, value parsing, side, then the stop-loss / take-profit
//! ordering relative to the entry price.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

use super::models::{NewTrade, Side, TradeUpdate};
use crate::error::ValidationError;

pub const MAX_SYMBOL_LEN: usize = 20;
pub const MAX_NOTES_LEN: usize = 2000;
pub const MAX_EXIT_REASON_LEN: usize = 50;
pub const MAX_GRADE_LEN: usize = 5;

/// Decimal places kept for amounts (`NUMERIC(20, 8)` columns)
pub const AMOUNT_SCALE: u32 = 8;

/// Exclusive bound on the magnitude of any amount, 10^(20 - 8)
pub fn amount_limit() -> Decimal {
    Decimal::from(1_000_000_000_000_i64)
}

/// Reject amounts the trade store would overflow or silently round
pub fn check_amount(field: &str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value.abs() >= amount_limit() {
        return Err(ValidationError::new(
            field,
            format!("Field {} must be less than {} in magnitude", field, amount_limit()),
        ));
    }
    if value.normalize().scale() > AMOUNT_SCALE {
        return Err(ValidationError::new(
            field,
            format!("Field {} must have at most {} decimal places", field, AMOUNT_SCALE),
        ));
    }
    Ok(value)
}

/// Knobs that change which fields a new trade must carry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Reject new trades without both a stop loss and a take profit
    pub require_risk_levels: bool,
}

/// Read-only view over a JSON object where `null` counts as absent
struct Payload<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> Payload<'a> {
    fn new(value: &'a Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(ValidationError::new("body", "Trade payload must be a JSON object")),
        }
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        match self.fields.get(field) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    fn decimal(&self, field: &str) -> Result<Option<Decimal>, ValidationError> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        let text = match value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => return Err(ValidationError::not_numeric(field)),
        };
        let value = parse_decimal(&text).ok_or_else(|| ValidationError::not_numeric(field))?;
        check_amount(field, value).map(Some)
    }

    fn string(&self, field: &str) -> Result<Option<&'a str>, ValidationError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(ValidationError::new(field, format!("Field {} must be a string", field))),
        }
    }

    fn integer(&self, field: &str) -> Result<Option<i64>, ValidationError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| ValidationError::new(field, format!("Field {} must be an integer", field))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ValidationError::new(field, format!("Field {} must be an integer", field))),
            Some(_) => Err(ValidationError::new(field, format!("Field {} must be an integer", field))),
        }
    }

    fn timestamp(&self, field: &str) -> Result<Option<DateTime<Utc>>, ValidationError> {
        let Some(raw) = self.string(field)? else {
            return Ok(None);
        };
        parse_timestamp(raw).map(Some).ok_or_else(|| {
            ValidationError::new(field, format!("Invalid timestamp for field: {}", field))
        })
    }

    fn side(&self) -> Result<Option<Side>, ValidationError> {
        match self.get("side") {
            None => Ok(None),
            Some(Value::String(s)) => s.parse::<Side>().map(Some),
            Some(_) => Err(ValidationError::new(
                "side",
                "Invalid trade side. Must be 'buy' or 'sell'",
            )),
        }
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// RFC 3339, or a naive ISO timestamp taken as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Trim and uppercase, then enforce 1..=20 characters
pub fn normalize_symbol(raw: &str) -> Result<String, ValidationError> {
    let symbol = raw.trim().to_uppercase();
    let len = symbol.chars().count();
    if len == 0 || len > MAX_SYMBOL_LEN {
        return Err(ValidationError::new(
            "symbol",
            format!("Symbol must be between 1 and {} characters", MAX_SYMBOL_LEN),
        ));
    }
    Ok(symbol)
}

fn positive(field: &str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::new(field, format!("Field {} must be greater than 0", field)));
    }
    Ok(value)
}

fn non_negative(field: &str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::new(field, format!("Field {} must not be negative", field)));
    }
    Ok(value)
}

fn bounded_text(field: &str, value: &str, max: usize) -> Result<String, ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            format!("Field {} must be at most {} characters", field, max),
        ));
    }
    Ok(value.to_string())
}

fn checklist_score(value: i64) -> Result<i32, ValidationError> {
    if !(0..=100).contains(&value) {
        return Err(ValidationError::new(
            "checklist_score",
            "Field checklist_score must be between 0 and 100",
        ));
    }
    Ok(value as i32)
}

fn optional_positive(payload: &Payload<'_>, field: &str) -> Result<Option<Decimal>, ValidationError> {
    payload.decimal(field)?.map(|v| positive(field, v)).transpose()
}

fn optional_text(payload: &Payload<'_>, field: &str, max: usize) -> Result<Option<String>, ValidationError> {
    payload.string(field)?.map(|v| bounded_text(field, v, max)).transpose()
}

/// Stop loss must sit on the losing side of the entry, take profit on the winning side
pub fn check_price_levels(
    side: Side,
    entry_price: Decimal,
    stop_loss: Option<Decimal>,
    take_profit: Option<Decimal>,
) -> Result<(), ValidationError> {
    match side {
        Side::Buy => {
            if stop_loss.is_some_and(|sl| sl >= entry_price) {
                return Err(ValidationError::new(
                    "stop_loss",
                    "For buy trades, stop loss must be below entry price",
                ));
            }
            if take_profit.is_some_and(|tp| tp <= entry_price) {
                return Err(ValidationError::new(
                    "take_profit",
                    "For buy trades, take profit must be above entry price",
                ));
            }
        }
        Side::Sell => {
            if stop_loss.is_some_and(|sl| sl <= entry_price) {
                return Err(ValidationError::new(
                    "stop_loss",
                    "For sell trades, stop loss must be above entry price",
                ));
            }
            if take_profit.is_some_and(|tp| tp >= entry_price) {
                return Err(ValidationError::new(
                    "take_profit",
                    "For sell trades, take profit must be below entry price",
                ));
            }
        }
    }
    Ok(())
}

/// Validate a create payload. A `pnl` key, if any, is ignored.
pub fn validate_new_trade(value: &Value, policy: &ValidationPolicy) -> Result<NewTrade, ValidationError> {
    let payload = Payload::new(value)?;

    let mut required = vec!["symbol", "side", "quantity", "entry_price"];
    if policy.require_risk_levels {
        required.extend(["stop_loss", "take_profit"]);
    }
    required.push("entry_time");
    if let Some(field) = required.into_iter().find(|field| !payload.has(field)) {
        return Err(ValidationError::missing(field));
    }

    // Numeric parsing is reported before side and range problems
    for field in ["quantity", "lot_size", "entry_price", "exit_price", "stop_loss", "take_profit", "fees"] {
        payload.decimal(field)?;
    }

    let side = payload.side()?.ok_or_else(|| ValidationError::missing("side"))?;
    let symbol = normalize_symbol(payload.string("symbol")?.unwrap_or_default())?;

    let quantity = optional_positive(&payload, "quantity")?.ok_or_else(|| ValidationError::missing("quantity"))?;
    let lot_size = optional_positive(&payload, "lot_size")?.unwrap_or(Decimal::ONE);
    let entry_price = optional_positive(&payload, "entry_price")?
        .ok_or_else(|| ValidationError::missing("entry_price"))?;
    let exit_price = optional_positive(&payload, "exit_price")?;
    let stop_loss = optional_positive(&payload, "stop_loss")?;
    let take_profit = optional_positive(&payload, "take_profit")?;
    let fees = payload
        .decimal("fees")?
        .map(|v| non_negative("fees", v))
        .transpose()?
        .unwrap_or(Decimal::ZERO);

    check_price_levels(side, entry_price, stop_loss, take_profit)?;

    let entry_time = payload
        .timestamp("entry_time")?
        .ok_or_else(|| ValidationError::missing("entry_time"))?;
    let exit_time = payload.timestamp("exit_time")?;

    Ok(NewTrade {
        symbol,
        side,
        quantity,
        lot_size,
        entry_price,
        entry_time,
        exit_price,
        exit_time,
        exit_reason: optional_text(&payload, "exit_reason", MAX_EXIT_REASON_LEN)?,
        stop_loss,
        take_profit,
        fees,
        notes: optional_text(&payload, "notes", MAX_NOTES_LEN)?,
        checklist_grade: optional_text(&payload, "checklist_grade", MAX_GRADE_LEN)?,
        checklist_score: payload.integer("checklist_score")?.map(checklist_score).transpose()?,
    })
}

/// Validate the fields present in an update payload.
///
/// Cross-field price rules need the stored trade and are checked after merging.
pub fn validate_update(value: &Value) -> Result<TradeUpdate, ValidationError> {
    let payload = Payload::new(value)?;

    for field in ["quantity", "lot_size", "entry_price", "exit_price", "stop_loss", "take_profit", "fees", "pnl"] {
        payload.decimal(field)?;
    }

    Ok(TradeUpdate {
        symbol: payload.string("symbol")?.map(normalize_symbol).transpose()?,
        side: payload.side()?,
        quantity: optional_positive(&payload, "quantity")?,
        lot_size: optional_positive(&payload, "lot_size")?,
        entry_price: optional_positive(&payload, "entry_price")?,
        entry_time: payload.timestamp("entry_time")?,
        exit_price: optional_positive(&payload, "exit_price")?,
        exit_time: payload.timestamp("exit_time")?,
        exit_reason: optional_text(&payload, "exit_reason", MAX_EXIT_REASON_LEN)?,
        stop_loss: optional_positive(&payload, "stop_loss")?,
        take_profit: optional_positive(&payload, "take_profit")?,
        fees: payload.decimal("fees")?.map(|v| non_negative("fees", v)).transpose()?,
        notes: optional_text(&payload, "notes", MAX_NOTES_LEN)?,
        checklist_grade: optional_text(&payload, "checklist_grade", MAX_GRADE_LEN)?,
        checklist_score: payload.integer("checklist_score")?.map(checklist_score).transpose()?,
        pnl: payload.decimal("pnl")?,
    })
}
