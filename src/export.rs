//! CSV report of a result set.
//!
//! Commas (and line breaks) are removed from field values instead of being
//! quoted, so every row is a plain comma-separated line. The report is always
//! produced whole from the rows given; where it gets written is up to the caller.

use crate::error::Result;
use crate::models::InventoryItem;

pub const CSV_HEADER: [&str; 4] = ["Code", "Name", "Quantity", "Price"];

fn clean_field(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ',' | '\r' | '\n'))
        .collect()
}

/// Serialize `rows` (in the given order) to CSV text with a header line.
pub fn export_csv(rows: &[InventoryItem]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for item in rows {
        writer.write_record([
            clean_field(&item.code),
            clean_field(&item.name),
            item.quantity.to_string(),
            item.price.to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    log::debug!("Exported {} rows to CSV", rows.len());
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
