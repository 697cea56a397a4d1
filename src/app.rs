//! Application state and initialization
//!
//! Earlier builds kept one app-wide mutable object behind a global
//! variable. Here the whole engine hangs off an explicitly initialized
//! handle: the presentation layer calls `DiaryApp::init` once at
//! startup and owns the returned value.

use crate::error::Result;
use crate::services::{EntryService, FontService, SettingsService, TransferService};
use crate::storage::{KvStore, Repository};
use std::path::PathBuf;

/// Central handle holding all services
#[derive(Clone)]
pub struct DiaryApp {
    repo: Repository,
    entries: EntryService,
    settings: SettingsService,
    fonts: FontService,
    transfer: TransferService,
}

impl DiaryApp {
    /// Initialize the engine against a data directory.
    ///
    /// Creates the directory if needed, loads (and migrates) whatever
    /// document is persisted there, and wires up all services. A
    /// corrupt document degrades to defaults rather than failing.
    pub async fn init(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        tracing::info!("Initializing diary engine at: {:?}", data_dir);

        let kv = KvStore::new(data_dir);
        kv.initialize().await?;

        let repo = Repository::load(kv).await;

        let app = Self {
            entries: EntryService::new(repo.clone()),
            settings: SettingsService::new(repo.clone()),
            fonts: FontService::new(repo.clone())?,
            transfer: TransferService::new(repo.clone()),
            repo,
        };

        tracing::info!("Diary engine initialized");

        Ok(app)
    }

    /// Entry store: create, edit, delete, search
    pub fn entries(&self) -> &EntryService {
        &self.entries
    }

    /// Settings resolver: theme, fonts, profile, display preferences
    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }

    /// Font ingestion: custom fonts and book font slots
    pub fn fonts(&self) -> &FontService {
        &self.fonts
    }

    /// Export / import
    pub fn transfer(&self) -> &TransferService {
        &self.transfer
    }

    /// Whether the first-run welcome dialog was already dismissed
    pub async fn welcome_seen(&self) -> bool {
        self.repo.welcome_seen().await
    }

    /// Record that the welcome dialog was dismissed
    pub async fn mark_welcome_seen(&self) -> Result<()> {
        self.repo.mark_welcome_seen().await
    }

    /// Wipe all diary data and reset to defaults. The welcome flag is
    /// kept; this is not a fresh installation.
    pub async fn clear_all_data(&self) -> Result<()> {
        self.repo.clear().await
    }
}
