//! Domain types shared by the account gate, repository and exporter.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Identifier of the authenticated account that scopes every inventory operation.
///
/// Only issued by a successful [`crate::accounts::authenticate`], so repository
/// calls can never be made with an empty or unchecked owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub(crate) fn new(username: impl Into<String>) -> Self {
        OwnerId(username.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One stock-keeping record as stored for its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryItem {
    pub code: String,
    pub name: String,
    pub quantity: i64,
    /// Unit price, scale 2
    pub price: Decimal,
}

impl InventoryItem {
    /// `quantity * price` for this row, `None` when it does not fit a `Decimal`
    pub fn line_value(&self) -> Option<Decimal> {
        line_value(self.quantity, self.price)
    }
}

/// Dashboard figures for one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryStats {
    pub item_count: i64,
    pub total_value: Decimal,
}

/// Account row without its credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub username: String,
    pub created_at: chrono::NaiveDateTime,
}

pub(crate) fn line_value(quantity: i64, price: Decimal) -> Option<Decimal> {
    Decimal::from(quantity).checked_mul(price)
}

/// Convert a scale-2 amount to integer subunits for storage.
pub(crate) fn to_subunits(amount: Decimal) -> Option<i64> {
    use rust_decimal::prelude::ToPrimitive;
    (amount * Decimal::ONE_HUNDRED).to_i64()
}

/// Convert stored integer subunits back to a scale-2 amount.
pub(crate) fn from_subunits(subunits: i64) -> Decimal {
    Decimal::new(subunits, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subunit_conversion_is_exact() {
        let amount = Decimal::new(123456, 2);
        assert_eq!(to_subunits(amount), Some(123456));
        assert_eq!(from_subunits(123456), amount);
        assert_eq!(from_subunits(0), Decimal::ZERO);
    }

    #[test]
    fn line_value_multiplies_quantity_and_price() {
        let item = InventoryItem {
            code: "A1".to_string(),
            name: "Bolt".to_string(),
            quantity: 3,
            price: Decimal::new(250, 2),
        };
        assert_eq!(item.line_value(), Some(Decimal::new(750, 2)));
    }

    #[test]
    fn line_value_reports_overflow() {
        let item = InventoryItem {
            code: "A1".to_string(),
            name: "Bolt".to_string(),
            quantity: i64::MAX,
            price: from_subunits(i64::MAX),
        };
        assert_eq!(item.line_value(), None);
    }
}
