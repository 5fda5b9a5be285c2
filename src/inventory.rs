//! Inventory repository
//!
//! Every function takes the owning [`OwnerId`] and filters on it, so one
//! account can never see or touch another account's rows. Writes are single
//! parameterized statements; uniqueness of `(code, owner)` is left to the
//! primary key rather than checked beforehand.

use crate::error::{is_unique_violation, LedgerError, Result};
use crate::models::{from_subunits, InventoryItem, OwnerId};
use crate::normalize::ItemInput;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        code: row.get(0)?,
        name: row.get(1)?,
        quantity: row.get(2)?,
        price: from_subunits(row.get(3)?),
    })
}

/// Insert a new item for `owner`.
///
/// Fails with `Validation` on bad input (nothing is written) and with
/// `DuplicateCode` when the owner already has this code.
pub fn insert_item(conn: &Connection, owner: &OwnerId, item: &ItemInput) -> Result<()> {
    item.validate()?;
    let price_cents = item.price_subunits()?;

    match conn.execute(
        "INSERT INTO inventory_items (code, name, quantity, price_cents, owner)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![item.code, item.name, item.quantity, price_cents, owner.as_str()],
    ) {
        Ok(_) => {
            log::info!("Inserted item '{}' for '{}'", item.code, owner);
            Ok(())
        }
        Err(e) if is_unique_violation(&e) => Err(LedgerError::DuplicateCode(item.code.clone())),
        Err(e) => Err(e.into()),
    }
}

/// Replace name, quantity and price of the item matched by `(item.code, owner)`.
///
/// The code itself is never changed. No matching row is `NotFound`.
pub fn update_item(conn: &Connection, owner: &OwnerId, item: &ItemInput) -> Result<()> {
    item.validate()?;
    let price_cents = item.price_subunits()?;

    let affected = conn.execute(
        "UPDATE inventory_items
         SET name = ?1, quantity = ?2, price_cents = ?3
         WHERE code = ?4 AND owner = ?5",
        params![item.name, item.quantity, price_cents, item.code, owner.as_str()],
    )?;

    if affected == 0 {
        return Err(LedgerError::NotFound(format!("item '{}'", item.code)));
    }
    log::info!("Updated item '{}' for '{}'", item.code, owner);
    Ok(())
}

/// Remove the item matched by `(code, owner)`. No matching row is `NotFound`.
pub fn delete_item(conn: &Connection, owner: &OwnerId, code: &str) -> Result<()> {
    let affected = conn.execute(
        "DELETE FROM inventory_items WHERE code = ?1 AND owner = ?2",
        params![code, owner.as_str()],
    )?;

    if affected == 0 {
        return Err(LedgerError::NotFound(format!("item '{}'", code)));
    }
    log::info!("Deleted item '{}' for '{}'", code, owner);
    Ok(())
}

/// Fetch a single item by code
pub fn get_item(conn: &Connection, owner: &OwnerId, code: &str) -> Result<Option<InventoryItem>> {
    let item = conn
        .query_row(
            "SELECT code, name, quantity, price_cents
             FROM inventory_items
             WHERE code = ?1 AND owner = ?2",
            params![code, owner.as_str()],
            item_from_row,
        )
        .optional()?;
    Ok(item)
}

/// Search the owner's items, ordered by code.
///
/// The keyword is trimmed; empty means all items. Otherwise `name` or `code`
/// must contain it, case-insensitively with Unicode case folding. The keyword
/// is matched literally, wildcard characters included.
pub fn search_items(conn: &Connection, owner: &OwnerId, keyword: &str) -> Result<Vec<InventoryItem>> {
    let keyword = keyword.trim();

    let items: rusqlite::Result<Vec<InventoryItem>> = if keyword.is_empty() {
        let mut stmt = conn.prepare_cached(
            "SELECT code, name, quantity, price_cents
             FROM inventory_items
             WHERE owner = ?1
             ORDER BY code ASC",
        )?;
        let rows = stmt.query_map(params![owner.as_str()], item_from_row)?;
        rows.collect()
    } else {
        let mut stmt = conn.prepare_cached(
            "SELECT code, name, quantity, price_cents
             FROM inventory_items
             WHERE owner = ?1
               AND (contains_ci(name, ?2) OR contains_ci(code, ?2))
             ORDER BY code ASC",
        )?;
        let rows = stmt.query_map(params![owner.as_str(), keyword], item_from_row)?;
        rows.collect()
    };

    let items = items?;
    log::debug!(
        "Search '{}' for '{}' returned {} items",
        keyword,
        owner,
        items.len()
    );
    Ok(items)
}
