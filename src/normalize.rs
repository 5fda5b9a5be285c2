//! Input normalization for item forms.
//!
//! Quantity and price arrive as user-entered text. The price field is masked:
//! raw digits while it has focus, a formatted currency string otherwise. What
//! gets persisted is always derived from the digits alone, never from the
//! display string, so formatting can't leak into stored values.

use crate::error::{LedgerError, Result};
use crate::models::{from_subunits, line_value, to_subunits};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Digits after the decimal separator in displayed and stored prices
pub const FRACTION_DIGITS: u32 = 2;

const BACKSPACE: char = '\u{8}';

/// How amounts are rendered for display.
///
/// None of the fields may contain digits, otherwise the display text could
/// not be normalized back to the amount it came from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CurrencyFormat {
    pub symbol: String,
    pub group_separator: String,
    pub decimal_separator: String,
}

impl Default for CurrencyFormat {
    /// Indonesian Rupiah, e.g. `Rp1.250.000,00`
    fn default() -> Self {
        CurrencyFormat {
            symbol: "Rp".to_string(),
            group_separator: ".".to_string(),
            decimal_separator: ",".to_string(),
        }
    }
}

impl CurrencyFormat {
    /// Reject formats whose decorations contain digits.
    pub fn validate(&self) -> Result<()> {
        let parts = [
            &self.symbol,
            &self.group_separator,
            &self.decimal_separator,
        ];
        if parts.iter().any(|p| p.chars().any(|c| c.is_ascii_digit())) {
            return Err(LedgerError::Config(
                "currency symbol and separators must not contain digits".into(),
            ));
        }
        Ok(())
    }

    /// Render an integer count of subunits, e.g. `123456` -> `Rp1.234,56`.
    pub fn format_subunits(&self, subunits: i64) -> String {
        let sign = if subunits < 0 { "-" } else { "" };
        let abs = subunits.unsigned_abs();
        let scale = 10u64.pow(FRACTION_DIGITS);
        let whole = abs / scale;
        let fraction = abs % scale;

        format!(
            "{sign}{}{}{}{:0width$}",
            self.symbol,
            group_thousands(whole, &self.group_separator),
            self.decimal_separator,
            fraction,
            width = FRACTION_DIGITS as usize
        )
    }

    /// Render a decimal amount. Amounts beyond two decimals are rounded.
    pub fn format_amount(&self, amount: Decimal) -> String {
        match to_subunits(amount.round_dp(FRACTION_DIGITS)) {
            Some(subunits) => self.format_subunits(subunits),
            None => format!("{}{}", self.symbol, amount),
        }
    }
}

fn group_thousands(value: u64, separator: &str) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

/// Key filter for numeric fields: digits and backspace only.
pub fn is_quantity_keystroke(c: char) -> bool {
    c.is_ascii_digit() || c == BACKSPACE
}

/// Keep only the ASCII digits of `text`.
pub fn strip_to_digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parse a quantity field. Empty or non-numeric content is rejected.
pub fn parse_quantity(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation("quantity is required".into()));
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(LedgerError::Validation(format!(
            "quantity must be a whole number: '{}'",
            trimmed
        )));
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| LedgerError::Validation(format!("quantity is too large: '{}'", trimmed)))
}

/// Normalize price text (displayed or raw) to a decimal amount.
///
/// Every non-digit is dropped and the remaining digits are read as subunits,
/// so `Rp1.234,56`, `1234,56` and `123456` all give `1234.56`. Empty text is zero.
pub fn parse_price(text: &str) -> Result<Decimal> {
    let digits = strip_to_digits(text);
    if digits.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let subunits = digits
        .parse::<i64>()
        .map_err(|_| LedgerError::Validation(format!("price is too large: '{}'", text)))?;
    Ok(from_subunits(subunits))
}

/// State of a masked price input.
#[derive(Debug, Clone, Default)]
pub struct PriceField {
    text: String,
    focused: bool,
    format: CurrencyFormat,
}

impl PriceField {
    pub fn new(format: CurrencyFormat) -> Self {
        PriceField {
            text: String::new(),
            focused: false,
            format,
        }
    }

    /// Text currently shown in the field
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Show raw digits while editing.
    pub fn focus_gained(&mut self) {
        self.focused = true;
        self.text = strip_to_digits(&self.text);
    }

    /// Reformat as currency once editing stops. Empty stays empty.
    pub fn focus_lost(&mut self) {
        self.focused = false;
        let digits = strip_to_digits(&self.text);
        self.text = match digits.parse::<i64>() {
            Ok(subunits) => self.format.format_subunits(subunits),
            Err(_) => digits,
        };
    }

    /// Apply one keystroke. Only digits and backspace are accepted while focused.
    ///
    /// Returns false when the key was rejected.
    pub fn type_char(&mut self, c: char) -> bool {
        if !self.focused || !is_quantity_keystroke(c) {
            return false;
        }
        if c == BACKSPACE {
            self.text.pop();
        } else {
            self.text.push(c);
        }
        true
    }

    /// Fill the field from a stored amount (e.g. a selected row).
    pub fn set_amount(&mut self, amount: Decimal) {
        self.text = if self.focused {
            to_subunits(amount.round_dp(FRACTION_DIGITS))
                .map(|s| s.to_string())
                .unwrap_or_default()
        } else {
            self.format.format_amount(amount)
        };
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Amount the current text normalizes to
    pub fn amount(&self) -> Result<Decimal> {
        parse_price(&self.text)
    }
}

/// Validated values for an insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInput {
    pub code: String,
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
}

impl ItemInput {
    /// Build from already-typed values and validate them.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        quantity: i64,
        price: Decimal,
    ) -> Result<Self> {
        let input = ItemInput {
            code: code.into(),
            name: name.into(),
            quantity,
            price,
        };
        input.validate()?;
        Ok(input)
    }

    /// Build from form text: quantity digits and a (possibly formatted) price.
    pub fn from_form(code: &str, name: &str, quantity_text: &str, price_text: &str) -> Result<Self> {
        if code.is_empty() || name.is_empty() {
            return Err(LedgerError::Validation("code and name are required".into()));
        }
        let quantity = parse_quantity(quantity_text)?;
        let price = parse_price(price_text)?;
        ItemInput::new(code, name, quantity, price)
    }

    pub fn validate(&self) -> Result<()> {
        if self.code.is_empty() {
            return Err(LedgerError::Validation("code is required".into()));
        }
        if self.name.is_empty() {
            return Err(LedgerError::Validation("name is required".into()));
        }
        if self.quantity < 0 {
            return Err(LedgerError::Validation(format!(
                "quantity must not be negative: {}",
                self.quantity
            )));
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(LedgerError::Validation(format!(
                "price must not be negative: {}",
                self.price
            )));
        }
        if line_value(self.quantity, self.price).is_none() {
            return Err(LedgerError::Validation(format!(
                "stock value too large: {} x {}",
                self.quantity, self.price
            )));
        }
        if self.price.round_dp(FRACTION_DIGITS) != self.price {
            return Err(LedgerError::Validation(format!(
                "price has more than {} decimal places: {}",
                FRACTION_DIGITS, self.price
            )));
        }
        Ok(())
    }

    /// Price as stored subunits
    pub(crate) fn price_subunits(&self) -> Result<i64> {
        to_subunits(self.price)
            .ok_or_else(|| LedgerError::Validation(format!("price is too large: {}", self.price)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_rupiah_with_grouping() {
        let format = CurrencyFormat::default();
        assert_eq!(format.format_subunits(0), "Rp0,00");
        assert_eq!(format.format_subunits(5), "Rp0,05");
        assert_eq!(format.format_subunits(100_000), "Rp1.000,00");
        assert_eq!(format.format_subunits(123_456_789), "Rp1.234.567,89");
    }

    #[test]
    fn formats_amount_from_decimal() {
        let format = CurrencyFormat {
            symbol: "$".to_string(),
            group_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
        };
        assert_eq!(format.format_amount(Decimal::new(3500, 2)), "$35.00");
        assert_eq!(format.format_amount(Decimal::new(12, 0)), "$12.00");
    }

    #[test]
    fn group_thousands_boundaries() {
        assert_eq!(group_thousands(0, "."), "0");
        assert_eq!(group_thousands(999, "."), "999");
        assert_eq!(group_thousands(1000, "."), "1.000");
        assert_eq!(group_thousands(1_000_000, " "), "1 000 000");
    }

    #[test]
    fn quantity_keystroke_filter() {
        assert!(is_quantity_keystroke('0'));
        assert!(is_quantity_keystroke('9'));
        assert!(is_quantity_keystroke(BACKSPACE));
        assert!(!is_quantity_keystroke('-'));
        assert!(!is_quantity_keystroke('a'));
        assert!(!is_quantity_keystroke('.'));
    }

    #[test]
    fn parse_quantity_accepts_digits() {
        assert_eq!(parse_quantity("42").unwrap(), 42);
        assert_eq!(parse_quantity("0").unwrap(), 0);
        assert_eq!(parse_quantity(" 7 ").unwrap(), 7);
    }

    #[test]
    fn parse_quantity_rejects_bad_input() {
        for bad in ["", "   ", "-1", "1.5", "abc", "99999999999999999999"] {
            assert!(
                matches!(parse_quantity(bad), Err(LedgerError::Validation(_))),
                "expected rejection for {:?}",
                bad
            );
        }
    }

    #[test]
    fn parse_price_strips_formatting() {
        assert_eq!(parse_price("Rp1.234,56").unwrap(), Decimal::new(123456, 2));
        assert_eq!(parse_price("123456").unwrap(), Decimal::new(123456, 2));
        assert_eq!(parse_price("").unwrap(), Decimal::ZERO);
        assert_eq!(parse_price("Rp").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn price_field_masks_while_focused() {
        let mut field = PriceField::new(CurrencyFormat::default());
        field.focus_gained();
        for c in "150000".chars() {
            assert!(field.type_char(c));
        }
        assert!(!field.type_char('x'));
        assert_eq!(field.text(), "150000");

        field.focus_lost();
        assert_eq!(field.text(), "Rp1.500,00");
        assert_eq!(field.amount().unwrap(), Decimal::new(150000, 2));

        field.focus_gained();
        assert_eq!(field.text(), "150000");
    }

    #[test]
    fn price_field_backspace_and_empty() {
        let mut field = PriceField::new(CurrencyFormat::default());
        field.focus_gained();
        field.type_char('1');
        field.type_char('2');
        field.type_char(BACKSPACE);
        assert_eq!(field.text(), "1");
        field.type_char(BACKSPACE);
        field.focus_lost();
        assert_eq!(field.text(), "");
        assert_eq!(field.amount().unwrap(), Decimal::ZERO);
    }

    #[test]
    fn price_field_ignores_typing_without_focus() {
        let mut field = PriceField::new(CurrencyFormat::default());
        assert!(!field.type_char('5'));
        assert_eq!(field.text(), "");
    }

    #[test]
    fn price_field_set_amount_from_row() {
        let mut field = PriceField::new(CurrencyFormat::default());
        field.set_amount(Decimal::new(1050, 2));
        assert_eq!(field.text(), "Rp10,50");
        assert_eq!(field.amount().unwrap(), Decimal::new(1050, 2));
    }

    #[test]
    fn item_input_from_form() {
        let input = ItemInput::from_form("A1", "Widget", "3", "Rp5,00").unwrap();
        assert_eq!(input.quantity, 3);
        assert_eq!(input.price, Decimal::new(500, 2));
    }

    #[test]
    fn item_input_rejects_missing_fields() {
        assert!(matches!(
            ItemInput::from_form("", "Widget", "3", "500"),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ItemInput::from_form("A1", "", "3", "500"),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ItemInput::from_form("A1", "Widget", "", "500"),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn item_input_rejects_negative_and_fractional_cents() {
        assert!(ItemInput::new("A1", "Widget", -1, Decimal::ONE).is_err());
        assert!(ItemInput::new("A1", "Widget", 1, Decimal::new(-100, 2)).is_err());
        assert!(ItemInput::new("A1", "Widget", 1, Decimal::new(1005, 3)).is_err());
        assert!(ItemInput::new("A1", "Widget", 0, Decimal::ZERO).is_ok());
    }

    #[test]
    fn item_input_rejects_unrepresentable_stock_value() {
        let result = ItemInput::new("A1", "Widget", i64::MAX, Decimal::new(i64::MAX, 2));
        assert!(matches!(result, Err(LedgerError::Validation(_))));

        let bulk = ItemInput::from_form("A1", "Bulk", "1000000000000", "Rp100.000.000,00");
        assert!(bulk.is_ok());
    }

    #[test]
    fn validate_rejects_digit_decorations() {
        let format = CurrencyFormat {
            symbol: "R1".to_string(),
            ..CurrencyFormat::default()
        };
        assert!(format.validate().is_err());
        assert!(CurrencyFormat::default().validate().is_ok());
    }

    proptest! {
        #[test]
        fn displayed_price_normalizes_back(subunits in 0i64..=i64::MAX / 100) {
            let format = CurrencyFormat::default();
            let shown = format.format_subunits(subunits);
            prop_assert_eq!(parse_price(&shown).unwrap(), from_subunits(subunits));
        }
    }
}
