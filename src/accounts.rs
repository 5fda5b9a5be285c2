//! Account registration and login.
//!
//! Passwords are stored as Argon2id PHC strings, never as supplied. A login
//! either yields an [`OwnerId`] or fails with `InvalidCredentials`; unknown
//! user and wrong password are not told apart.

use crate::error::{is_unique_violation, LedgerError, Result};
use crate::models::{Account, OwnerId};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| LedgerError::StorageUnavailable(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

/// Create a new account.
///
/// Both fields must be non-empty. An existing username is reported as
/// `DuplicateUsername`, detected from the primary key violation.
pub fn register(conn: &Connection, username: &str, password: &str) -> Result<()> {
    if username.is_empty() || password.is_empty() {
        return Err(LedgerError::Validation(
            "username and password are required".into(),
        ));
    }

    let password_hash = hash_password(password)?;
    match conn.execute(
        "INSERT INTO accounts (username, password_hash) VALUES (?1, ?2)",
        params![username, password_hash],
    ) {
        Ok(_) => {
            log::info!("Registered account '{}'", username);
            Ok(())
        }
        Err(e) if is_unique_violation(&e) => {
            log::info!("Registration rejected, '{}' already exists", username);
            Err(LedgerError::DuplicateUsername(username.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Check a username/password pair and issue the owner identifier.
///
/// Matching is exact and case-sensitive. Every non-match, empty fields
/// included, is `InvalidCredentials`.
pub fn authenticate(conn: &Connection, username: &str, password: &str) -> Result<OwnerId> {
    // No account can have an empty username or password.
    if username.is_empty() || password.is_empty() {
        return Err(LedgerError::InvalidCredentials);
    }

    let stored: Option<String> = conn
        .query_row(
            "SELECT password_hash FROM accounts WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )
        .optional()?;

    match stored {
        Some(hash) if verify_password(password, &hash) => {
            log::info!("User '{}' logged in", username);
            Ok(OwnerId::new(username))
        }
        _ => {
            log::warn!("Failed login for '{}'", username);
            Err(LedgerError::InvalidCredentials)
        }
    }
}

/// Load the account record for an owner
pub fn get_account(conn: &Connection, owner: &OwnerId) -> Result<Account> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT username, created_at FROM accounts WHERE username = ?1",
            params![owner.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (username, created_at) =
        row.ok_or_else(|| LedgerError::NotFound(format!("account '{}'", owner)))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at, SQLITE_DATETIME).map_err(|e| {
        LedgerError::StorageUnavailable(format!("bad created_at '{}': {}", created_at, e))
    })?;
    Ok(Account {
        username,
        created_at,
    })
}

/// Delete the owner's account. Its inventory goes with it (cascade).
pub fn delete_account(conn: &Connection, owner: &OwnerId) -> Result<()> {
    let affected = conn.execute(
        "DELETE FROM accounts WHERE username = ?1",
        params![owner.as_str()],
    )?;
    if affected == 0 {
        return Err(LedgerError::NotFound(format!("account '{}'", owner)));
    }
    log::info!("Deleted account '{}'", owner);
    Ok(())
}
