//! Logged-in inventory session.
//!
//! A session binds the storage handle to one [`OwnerId`] and keeps the last
//! fetched result set for display and export. It holds no other copy of the
//! data: every successful write re-runs the current search, and statistics
//! are read from storage each time.

use crate::accounts;
use crate::config::SessionConfig;
use crate::database::Database;
use crate::error::{LedgerError, Result};
use crate::export::export_csv;
use crate::inventory::{delete_item, get_item, insert_item, search_items, update_item};
use crate::models::{InventoryItem, InventoryStats, OwnerId};
use crate::normalize::ItemInput;
use crate::stats::stats;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct InventorySession {
    db: Database,
    owner: OwnerId,
    keyword: String,
    rows: Vec<InventoryItem>,
}

impl InventorySession {
    /// Start a session for `owner` and load all of its items.
    pub fn new(db: Database, owner: OwnerId) -> Result<Self> {
        let mut session = InventorySession {
            db,
            owner,
            keyword: String::new(),
            rows: Vec::new(),
        };
        session.refresh()?;
        Ok(session)
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Keyword of the current result set
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Last fetched result set
    pub fn rows(&self) -> &[InventoryItem] {
        &self.rows
    }

    /// Run a new search and keep its result.
    pub fn search(&mut self, keyword: &str) -> Result<&[InventoryItem]> {
        self.keyword = keyword.trim().to_string();
        self.refresh()?;
        Ok(&self.rows)
    }

    /// Re-run the current search against storage.
    pub fn refresh(&mut self) -> Result<()> {
        let owner = &self.owner;
        let keyword = &self.keyword;
        self.rows = self
            .db
            .with_conn(|conn| search_items(conn, owner, keyword))?;
        Ok(())
    }

    pub fn add(&mut self, item: &ItemInput) -> Result<()> {
        self.db.with_conn(|conn| insert_item(conn, &self.owner, item))?;
        self.refresh()
    }

    pub fn update(&mut self, item: &ItemInput) -> Result<()> {
        self.db.with_conn(|conn| update_item(conn, &self.owner, item))?;
        self.refresh()
    }

    pub fn delete(&mut self, code: &str) -> Result<()> {
        self.db.with_conn(|conn| delete_item(conn, &self.owner, code))?;
        self.refresh()
    }

    pub fn get(&self, code: &str) -> Result<Option<InventoryItem>> {
        self.db.with_conn(|conn| get_item(conn, &self.owner, code))
    }

    pub fn stats(&self) -> Result<InventoryStats> {
        self.db.with_conn(|conn| stats(conn, &self.owner))
    }

    /// CSV report of the last fetched result set
    pub fn export_csv(&self) -> Result<String> {
        export_csv(&self.rows)
    }

    /// Delete the account behind this session, ending it.
    pub fn delete_account(self) -> Result<()> {
        self.db
            .with_conn(|conn| accounts::delete_account(conn, &self.owner))
    }
}

/// Coarse phase of the session loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadStage {
    Connecting,
    Fetching,
    Preparing,
    Done,
}

impl LoadStage {
    pub fn for_percent(percent: u8) -> Self {
        match percent {
            0..=29 => LoadStage::Connecting,
            30..=69 => LoadStage::Fetching,
            70..=89 => LoadStage::Preparing,
            _ => LoadStage::Done,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadStage::Connecting => "Connecting to database...",
            LoadStage::Fetching => "Fetching inventory...",
            LoadStage::Preparing => "Preparing view...",
            LoadStage::Done => "Done!",
        }
    }
}

/// One progress notification from [`open_session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadProgress {
    pub percent: u8,
    pub stage: LoadStage,
}

impl LoadProgress {
    fn at(percent: u8) -> Self {
        LoadProgress {
            percent,
            stage: LoadStage::for_percent(percent),
        }
    }
}

/// Pauses between progress steps
#[derive(Debug, Clone, Copy)]
pub struct LoadSchedule {
    pub step_delay: Duration,
    pub final_delay: Duration,
}

impl LoadSchedule {
    pub fn from_config(config: &SessionConfig) -> Self {
        let step = config.step_delay();
        LoadSchedule {
            step_delay: step,
            final_delay: step * 2 / 3,
        }
    }

    /// No pauses at all
    pub fn immediate() -> Self {
        LoadSchedule {
            step_delay: Duration::ZERO,
            final_delay: Duration::ZERO,
        }
    }
}

async fn emit(progress: &mpsc::Sender<LoadProgress>, percent: u8) {
    let event = LoadProgress::at(percent);
    log::debug!("Session load {}% - {}", event.percent, event.stage.label());
    if progress.send(event).await.is_err() {
        log::debug!("Progress listener went away");
    }
}

/// Load a session in the background, reporting progress on `progress`.
///
/// Emits 10, 50, 70 and 100 percent. The data load itself runs on a blocking
/// worker between 70 and 100; if it fails, no 100 event is sent and the error
/// is returned so the caller can fall back to the login state.
pub async fn open_session(
    db: Database,
    owner: OwnerId,
    schedule: LoadSchedule,
    progress: mpsc::Sender<LoadProgress>,
) -> Result<InventorySession> {
    emit(&progress, 10).await;
    tokio::time::sleep(schedule.step_delay).await;
    emit(&progress, 50).await;
    tokio::time::sleep(schedule.step_delay).await;
    emit(&progress, 70).await;

    let session = tokio::task::spawn_blocking(move || InventorySession::new(db, owner))
        .await
        .map_err(|e| LedgerError::StorageUnavailable(format!("session load task failed: {}", e)))??;

    emit(&progress, 100).await;
    tokio::time::sleep(schedule.final_delay).await;
    log::info!(
        "Session ready for '{}' ({} items)",
        session.owner(),
        session.rows().len()
    );
    Ok(session)
}
