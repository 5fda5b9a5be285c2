//! Ledger configuration: storage endpoint, currency display and session pacing.
//!
//! Read from an optional TOML file, then from `LEDGER__*` environment variables.

use crate::error::Result;
use crate::normalize::CurrencyFormat;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file, looked up relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "ledger.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LedgerConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub currency: CurrencyFormat,
    #[serde(default)]
    pub session: SessionConfig,
}

/// The three opaque storage values: endpoint, principal and credential.
#[derive(Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_url")]
    pub url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            url: default_storage_url(),
            user: None,
            password: None,
        }
    }
}

// Hand-written so the credential never ends up in logs.
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Pause between loading progress steps, in milliseconds
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            step_delay_ms: default_step_delay_ms(),
        }
    }
}

impl SessionConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

/// Returns the default database path: ~/.local/share/stock_ledger/ledger.db
fn default_storage_url() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stock_ledger")
        .join("ledger.db")
        .to_string_lossy()
        .to_string()
}

fn default_step_delay_ms() -> u64 {
    300
}

impl LedgerConfig {
    /// Load from `path` (or [`DEFAULT_CONFIG_FILE`]) and the environment.
    ///
    /// The file is optional unless a path is given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("LEDGER").separator("__"))
            .build()?;

        let config: LedgerConfig = settings.try_deserialize()?;
        config.currency.validate()?;
        log::debug!("Loaded configuration: {:?}", config.storage);
        Ok(config)
    }
}
