//! Stock Ledger - per-user inventory records
//!
//! Users register and log in; each account manages its own set of items
//! (code, name, quantity, unit price) stored in SQLite, with dashboard
//! statistics and CSV reports.

pub mod accounts;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod inventory;
pub mod models;
pub mod normalize;
pub mod session;
pub mod stats;

pub use config::LedgerConfig;
pub use database::{ensure_schema, Database};
pub use error::{LedgerError, Result};
pub use models::{Account, InventoryItem, InventoryStats, OwnerId};
pub use normalize::{CurrencyFormat, ItemInput, PriceField};
pub use session::{open_session, InventorySession, LoadProgress, LoadSchedule, LoadStage};
