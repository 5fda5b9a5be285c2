//! Dashboard statistics, computed from storage on every call.

use crate::error::{LedgerError, Result};
use crate::inventory::search_items;
use crate::models::{InventoryStats, OwnerId};
use rusqlite::Connection;
use rust_decimal::Decimal;

/// Item count and total stock value (`sum(quantity * price)`) for `owner`.
///
/// The total is summed as `Decimal` over the owner's current rows, so it is
/// exact for any stock a write accepted. An owner without items gets `0` and
/// `0.00`.
pub fn stats(conn: &Connection, owner: &OwnerId) -> Result<InventoryStats> {
    let items = search_items(conn, owner, "")?;

    let total_value = items
        .iter()
        .try_fold(Decimal::ZERO, |total, item| {
            item.line_value().and_then(|value| total.checked_add(value))
        })
        .ok_or_else(|| {
            LedgerError::Validation(format!("total stock value of '{}' is too large", owner))
        })?;

    Ok(InventoryStats {
        item_count: items.len() as i64,
        total_value: total_value.round_dp(2),
    })
}
