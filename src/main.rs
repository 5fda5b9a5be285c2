//! Stock Ledger - command line front end
//!
//! Every inventory command logs in first; the account's items are the only
//! ones it can see or change.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use stock_ledger::accounts;
use stock_ledger::{
    open_session, CurrencyFormat, Database, InventoryItem, InventorySession, InventoryStats,
    ItemInput, LedgerConfig, LedgerError, LoadSchedule, OwnerId, Result,
};
use tokio::sync::mpsc;

/// Per-user inventory ledger backed by SQLite
#[derive(Parser, Debug)]
#[command(name = "stock_ledger")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (default: ./ledger.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage url or SQLite path, overrides the config
    #[arg(short, long)]
    database: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct Credentials {
    #[arg(short, long)]
    username: String,

    #[arg(short, long, env = "LEDGER_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(clap::Args, Debug)]
struct ItemFields {
    /// Item code, unique within your inventory
    #[arg(long)]
    code: String,

    #[arg(long)]
    name: String,

    /// Stock count (digits only)
    #[arg(long)]
    quantity: String,

    /// Unit price as shown (e.g. "Rp12.500,00") or raw subunit digits ("1250000")
    #[arg(long, default_value = "")]
    price: String,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Create a new account
    Register(Credentials),
    /// Log in, load the inventory and show it with its statistics
    Login(Credentials),
    /// Add an item
    Add {
        #[command(flatten)]
        credentials: Credentials,
        #[command(flatten)]
        item: ItemFields,
    },
    /// Change name, quantity and price of an existing item
    Update {
        #[command(flatten)]
        credentials: Credentials,
        #[command(flatten)]
        item: ItemFields,
    },
    /// Delete an item by code
    Delete {
        #[command(flatten)]
        credentials: Credentials,
        #[arg(long)]
        code: String,
    },
    /// List items whose name or code contains the keyword (all when omitted)
    Search {
        #[command(flatten)]
        credentials: Credentials,
        keyword: Option<String>,
    },
    /// Item count and total stock value
    Stats {
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Write the (optionally filtered) item list as CSV
    Export {
        #[command(flatten)]
        credentials: Credentials,
        keyword: Option<String>,
        /// Target file (default: ~/Documents/Inventory_Reports/inventory_report.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete your account and all of its items
    DeleteAccount(Credentials),
}

/// JSON output envelope
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Stats with the display string alongside the raw amount
#[derive(Serialize)]
struct StatsView {
    #[serde(flatten)]
    stats: InventoryStats,
    total_value_display: String,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        if json {
            print_json(&ApiResponse::<()> {
                success: false,
                data: None,
                error: Some(e.to_string()),
            });
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = LedgerConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.database {
        config.storage.url = url;
    }
    let db = Database::open(&config.storage)?;
    let currency = &config.currency;
    let json = cli.json;

    match cli.command {
        Command::Register(creds) => {
            db.with_conn(|conn| accounts::register(conn, &creds.username, &creds.password))?;
            notice(json, &format!("Account '{}' registered. You can log in now.", creds.username));
        }
        Command::Login(creds) => {
            let owner = login(&db, &creds)?;
            let schedule = LoadSchedule::from_config(&config.session);
            let (tx, mut rx) = mpsc::channel(8);
            let loader = tokio::spawn(open_session(db.clone(), owner, schedule, tx));

            while let Some(progress) = rx.recv().await {
                log::info!("[{:>3}%] {}", progress.percent, progress.stage.label());
            }
            let session = loader.await.map_err(|e| {
                LedgerError::StorageUnavailable(format!("session loader failed: {}", e))
            })??;

            let account = db.with_conn(|conn| accounts::get_account(conn, session.owner()))?;
            log::info!("Account created {}", account.created_at);
            show_rows(&session, currency, json);
            show_stats(&session, currency, json)?;
        }
        Command::Add { credentials, item } => {
            let mut session = start_session(&db, &credentials)?;
            let input = ItemInput::from_form(&item.code, &item.name, &item.quantity, &item.price)?;
            session.add(&input)?;
            notice(json, &format!("Item '{}' saved.", input.code));
            show_rows(&session, currency, json);
        }
        Command::Update { credentials, item } => {
            let mut session = start_session(&db, &credentials)?;
            let input = ItemInput::from_form(&item.code, &item.name, &item.quantity, &item.price)?;
            session.update(&input)?;
            notice(json, &format!("Item '{}' updated.", input.code));
            show_rows(&session, currency, json);
        }
        Command::Delete { credentials, code } => {
            let mut session = start_session(&db, &credentials)?;
            session.delete(&code)?;
            notice(json, &format!("Item '{}' deleted.", code));
            show_rows(&session, currency, json);
        }
        Command::Search {
            credentials,
            keyword,
        } => {
            let mut session = start_session(&db, &credentials)?;
            session.search(keyword.as_deref().unwrap_or(""))?;
            show_rows(&session, currency, json);
        }
        Command::Stats { credentials } => {
            let session = start_session(&db, &credentials)?;
            show_stats(&session, currency, json)?;
        }
        Command::Export {
            credentials,
            keyword,
            output,
        } => {
            let mut session = start_session(&db, &credentials)?;
            session.search(keyword.as_deref().unwrap_or(""))?;
            let csv = session.export_csv()?;

            let path = output.unwrap_or_else(default_report_path);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&path, csv)?;
            log::info!("Exported {} items", session.rows().len());
            notice(json, &format!("Report written to {}", path.display()));
        }
        Command::DeleteAccount(creds) => {
            let session = start_session(&db, &creds)?;
            session.delete_account()?;
            notice(json, &format!("Account '{}' and its items were deleted.", creds.username));
        }
    }

    Ok(())
}

fn login(db: &Database, creds: &Credentials) -> Result<OwnerId> {
    db.with_conn(|conn| accounts::authenticate(conn, &creds.username, &creds.password))
}

fn start_session(db: &Database, creds: &Credentials) -> Result<InventorySession> {
    let owner = login(db, creds)?;
    InventorySession::new(db.clone(), owner)
}

/// Returns the default report path: ~/Documents/Inventory_Reports/inventory_report.csv
fn default_report_path() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Inventory_Reports")
        .join("inventory_report.csv")
}

/// Confirmation line; suppressed in JSON mode so stdout stays parseable
fn notice(json: bool, message: &str) {
    if json {
        log::info!("{}", message);
    } else {
        println!("{}", message);
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => log::error!("Failed to serialize output: {}", e),
    }
}

fn show_rows(session: &InventorySession, currency: &CurrencyFormat, json: bool) {
    if json {
        print_json(&ApiResponse {
            success: true,
            data: Some(session.rows()),
            error: None,
        });
    } else {
        print!("{}", format_table(session.rows(), currency));
    }
}

fn show_stats(session: &InventorySession, currency: &CurrencyFormat, json: bool) -> Result<()> {
    let stats = session.stats()?;
    let display = currency.format_amount(stats.total_value);
    if json {
        print_json(&ApiResponse {
            success: true,
            data: Some(StatsView {
                stats,
                total_value_display: display,
            }),
            error: None,
        });
    } else {
        println!("Total items: {}", stats.item_count);
        println!("Total value: {}", display);
    }
    Ok(())
}

fn column_width(header: &str, cells: impl Iterator<Item = usize>) -> usize {
    cells.fold(header.chars().count(), usize::max)
}

/// Aligned plain-text table of items
fn format_table(rows: &[InventoryItem], currency: &CurrencyFormat) -> String {
    if rows.is_empty() {
        return "No items.\n".to_string();
    }

    let prices: Vec<String> = rows.iter().map(|r| currency.format_amount(r.price)).collect();
    let code_w = column_width("Code", rows.iter().map(|r| r.code.chars().count()));
    let name_w = column_width("Name", rows.iter().map(|r| r.name.chars().count()));
    let qty_w = column_width("Qty", rows.iter().map(|r| r.quantity.to_string().len()));
    let price_w = column_width("Price", prices.iter().map(|p| p.chars().count()));

    let mut out = format!(
        "{:<code_w$}  {:<name_w$}  {:>qty_w$}  {:>price_w$}\n",
        "Code", "Name", "Qty", "Price"
    );
    for (row, price) in rows.iter().zip(&prices) {
        out.push_str(&format!(
            "{:<code_w$}  {:<name_w$}  {:>qty_w$}  {:>price_w$}\n",
            row.code, row.name, row.quantity, price
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rust_decimal::Decimal;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_command() {
        let cli = Cli::try_parse_from([
            "stock_ledger",
            "add",
            "-u",
            "alice",
            "-p",
            "pw",
            "--code",
            "A1",
            "--name",
            "Widget",
            "--quantity",
            "3",
            "--price",
            "Rp5.000,00",
        ])
        .unwrap();

        match cli.command {
            Command::Add { credentials, item } => {
                assert_eq!(credentials.username, "alice");
                assert_eq!(item.code, "A1");
                assert_eq!(item.price, "Rp5.000,00");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn table_aligns_columns() {
        let rows = vec![
            InventoryItem {
                code: "A1".to_string(),
                name: "Widget".to_string(),
                quantity: 2,
                price: Decimal::new(1000, 2),
            },
            InventoryItem {
                code: "B22".to_string(),
                name: "Gizmo".to_string(),
                quantity: 10,
                price: Decimal::new(550, 2),
            },
        ];
        let table = format_table(&rows, &CurrencyFormat::default());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Code  Name    Qty    Price");
        assert_eq!(lines[1], "A1    Widget    2  Rp10,00");
        assert_eq!(lines[2], "B22   Gizmo    10   Rp5,50");
    }

    #[test]
    fn empty_table_says_so() {
        assert_eq!(format_table(&[], &CurrencyFormat::default()), "No items.\n");
    }
}
