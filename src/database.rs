//! Storage handle and schema for the ledger
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Every write is a single statement, so there is never a partial change to roll back.

use crate::config::StorageConfig;
use crate::error::{LedgerError, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Shared storage handle.
///
/// Cloning is cheap; every clone refers to the same connection. Access goes
/// through [`Database::with_conn`], which holds the connection only for the
/// duration of one operation.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the database described by `config` and make sure the schema exists.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let conn = match storage_path(&config.url) {
            None => Connection::open_in_memory()?,
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            LedgerError::StorageUnavailable(format!(
                                "cannot create {}: {}",
                                parent.display(),
                                e
                            ))
                        })?;
                        log::info!("Created directory: {}", parent.display());
                    }
                }
                Connection::open(&path)?
            }
        };
        if config.user.is_some() {
            log::debug!("SQLite storage ignores the configured principal");
        }
        log::info!("Opened database: {}", config.url);
        Self::from_connection(conn)
    }

    /// In-memory database with the schema in place
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        ensure_schema(&conn)?;
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with exclusive access to the connection.
    ///
    /// The lock is released when `f` returns, whether it succeeded or not.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| LedgerError::StorageUnavailable("connection lock poisoned".into()))?;
        f(&conn)
    }
}

/// Resolve a storage url to a file path. `None` means in-memory.
fn storage_path(url: &str) -> Option<PathBuf> {
    let trimmed = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    if trimmed == ":memory:" || trimmed.is_empty() {
        None
    } else {
        Some(Path::new(trimmed).to_path_buf())
    }
}

/// Create the schema if it doesn't exist
///
/// - `accounts`: one row per registered user, keyed by username
/// - `inventory_items`: stock records, unique per `(code, owner)`, removed with their account
///
/// Safe to call on every start. Foreign key enforcement is switched on for
/// this connection as well, since SQLite leaves it off by default, and the
/// search functions are registered.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    register_functions(conn)?;
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS accounts (
            username      TEXT NOT NULL PRIMARY KEY,
            password_hash TEXT NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Composite primary key: item codes are unique per owner, not globally
        CREATE TABLE IF NOT EXISTS inventory_items (
            code        TEXT NOT NULL,
            name        TEXT NOT NULL,
            quantity    INTEGER NOT NULL CHECK (quantity >= 0),
            price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
            owner       TEXT NOT NULL,
            PRIMARY KEY (code, owner),
            FOREIGN KEY (owner) REFERENCES accounts(username) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_inventory_items_owner ON inventory_items(owner);
        ",
    )?;

    log::info!("Database schema ready");
    Ok(())
}

/// Per-connection SQL functions.
///
/// `contains_ci(haystack, needle)`: substring test after Unicode lowercasing
/// of both sides. NULL haystack never matches.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "contains_ci",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let haystack: Option<String> = ctx.get(0)?;
            let needle: String = ctx.get(1)?;
            Ok(haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase())))
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn ensure_schema_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();

        assert!(table_exists(&conn, "accounts"));
        assert!(table_exists(&conn, "inventory_items"));
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO accounts (username, password_hash) VALUES ('alice', 'x')",
            [],
        )
        .unwrap();

        ensure_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn ensure_schema_enables_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();

        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn contains_ci_folds_unicode_case() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();

        let check = |haystack: Option<&str>, needle: &str| -> bool {
            conn.query_row(
                "SELECT contains_ci(?1, ?2)",
                rusqlite::params![haystack, needle],
                |row| row.get(0),
            )
            .unwrap()
        };
        assert!(check(Some("Ékstra Sabun"), "ékstra"));
        assert!(check(Some("STRASSE Ölfilter"), "ölf"));
        assert!(check(Some("Widget"), "DGE"));
        assert!(!check(Some("Widget"), "gizmo"));
        assert!(!check(None, "a"));
    }

    #[test]
    fn storage_path_understands_url_forms() {
        assert_eq!(storage_path(":memory:"), None);
        assert_eq!(storage_path("sqlite::memory:"), None);
        assert_eq!(
            storage_path("sqlite:///tmp/ledger.db"),
            Some(PathBuf::from("/tmp/ledger.db"))
        );
        assert_eq!(
            storage_path("sqlite:data/ledger.db"),
            Some(PathBuf::from("data/ledger.db"))
        );
        assert_eq!(storage_path("ledger.db"), Some(PathBuf::from("ledger.db")));
    }

    #[test]
    fn open_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.db");
        let config = StorageConfig {
            url: path.to_string_lossy().to_string(),
            user: None,
            password: None,
        };

        let db = Database::open(&config).unwrap();

        assert!(path.exists());
        let ok = db
            .with_conn(|conn| Ok(table_exists(conn, "inventory_items")))
            .unwrap();
        assert!(ok);
    }
}
