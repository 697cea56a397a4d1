//! Repository layer for the application document
//!
//! Owns the in-memory document (entries + settings) shared by all
//! services and persists it after every mutation. Loading runs the
//! schema migration chain and the defaults merge so the rest of the
//! crate only ever sees the current settings shape.

use super::kv_store::KvStore;
use super::models::*;
use super::schema;
use crate::config;
use crate::error::{AppError, Result};
use crate::merge;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Repository for document operations
#[derive(Clone)]
pub struct Repository {
    kv: KvStore,
    doc: Arc<RwLock<AppDocument>>,
}

impl Repository {
    /// Load the persisted document, or fall back to defaults.
    ///
    /// A missing key is first run; a corrupt document degrades to
    /// defaults rather than failing startup.
    pub async fn load(kv: KvStore) -> Self {
        let doc = match kv.read(config::APP_DATA_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => document_from_value(value),
                Err(e) => {
                    tracing::warn!("Persisted document is not valid JSON, using defaults: {}", e);
                    AppDocument::default()
                }
            },
            Ok(None) => {
                tracing::info!("No persisted document found, starting from defaults");
                AppDocument::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read persisted document, using defaults: {}", e);
                AppDocument::default()
            }
        };

        Self {
            kv,
            doc: Arc::new(RwLock::new(doc)),
        }
    }

    /// Create a new entry at the head of the collection
    pub async fn create_entry(&self, content: String, tags: Vec<String>) -> Result<Entry> {
        let now = Utc::now();
        let entry = Entry {
            id: Uuid::new_v4().to_string(),
            content,
            tags,
            created_at: now,
            updated_at: now,
        };

        {
            let mut doc = self.doc.write().await;
            doc.entries.insert(0, entry.clone());
        }

        self.persist().await?;

        tracing::debug!("Created entry: {}", entry.id);
        Ok(entry)
    }

    /// Get an entry by id
    pub async fn get_entry(&self, id: &str) -> Result<Entry> {
        let doc = self.doc.read().await;
        doc.entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    /// Update an entry's content and tags; `created_at` never changes
    pub async fn update_entry(
        &self,
        id: &str,
        content: String,
        tags: Vec<String>,
    ) -> Result<Entry> {
        let updated = {
            let mut doc = self.doc.write().await;
            let entry = doc
                .entries
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| AppError::NotFound(id.to_string()))?;

            entry.content = content;
            entry.tags = tags;
            entry.updated_at = Utc::now();
            entry.clone()
        };

        self.persist().await?;

        tracing::debug!("Updated entry: {}", id);
        Ok(updated)
    }

    /// Remove an entry by id. Returns whether anything was removed;
    /// an absent id is a no-op, not an error.
    pub async fn delete_entry(&self, id: &str) -> Result<bool> {
        let removed = {
            let mut doc = self.doc.write().await;
            let before = doc.entries.len();
            doc.entries.retain(|e| e.id != id);
            doc.entries.len() != before
        };

        if removed {
            self.persist().await?;
            tracing::debug!("Deleted entry: {}", id);
        }

        Ok(removed)
    }

    /// All entries in insertion order (newest inserted first)
    pub async fn list_entries(&self) -> Vec<Entry> {
        self.doc.read().await.entries.clone()
    }

    /// Current settings snapshot
    pub async fn settings(&self) -> Settings {
        self.doc.read().await.settings.clone()
    }

    /// Apply a mutation to the settings and persist
    pub async fn update_settings<F>(&self, mutate: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let settings = {
            let mut doc = self.doc.write().await;
            mutate(&mut doc.settings);
            doc.settings.clone()
        };

        self.persist().await?;
        Ok(settings)
    }

    /// Snapshot of the whole document (for export)
    pub async fn document(&self) -> AppDocument {
        self.doc.read().await.clone()
    }

    /// Replace the whole document (import) and persist
    pub async fn replace_document(&self, document: AppDocument) -> Result<()> {
        {
            let mut doc = self.doc.write().await;
            *doc = document;
        }

        self.persist().await
    }

    /// Remove the persisted document and reset in-memory state
    pub async fn clear(&self) -> Result<()> {
        {
            let mut doc = self.doc.write().await;
            *doc = AppDocument::default();
        }

        self.kv.remove(config::APP_DATA_KEY).await?;

        tracing::info!("All diary data cleared");
        Ok(())
    }

    /// Whether the welcome dialog was dismissed on this installation
    pub async fn welcome_seen(&self) -> bool {
        matches!(
            self.kv.read(config::WELCOME_SEEN_KEY).await,
            Ok(Some(ref v)) if v == "true"
        )
    }

    /// Record that the welcome dialog was dismissed
    pub async fn mark_welcome_seen(&self) -> Result<()> {
        self.kv.write(config::WELCOME_SEEN_KEY, "true").await
    }

    /// Serialize the in-memory document and write it under the fixed
    /// application key. A write failure leaves in-memory state intact;
    /// the caller surfaces the error.
    async fn persist(&self) -> Result<()> {
        let raw = {
            let doc = self.doc.read().await;
            serde_json::to_string(&*doc)
                .map_err(|e| AppError::Storage(format!("failed to serialize document: {}", e)))?
        };

        self.kv.write(config::APP_DATA_KEY, &raw).await
    }
}

/// Build a typed document from raw persisted JSON: entries load
/// leniently, settings run migration, defaults merge, and sanitation.
fn document_from_value(value: Value) -> AppDocument {
    let entries = match value.get("entries") {
        Some(raw_entries) => match serde_json::from_value::<Vec<Entry>>(raw_entries.clone()) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Persisted entries are malformed, dropping them: {}", e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let raw_settings = value.get("settings").cloned().unwrap_or(Value::Null);
    let settings = settings_from_value(raw_settings);

    AppDocument { entries, settings }
}

/// Migrate + merge + sanitize a raw settings value into typed settings.
/// Shared by the load path and import.
pub(crate) fn settings_from_value(raw: Value) -> Settings {
    let migrated = schema::migrate_settings(raw);
    let mut merged = merge::merged(&Settings::default_value(), &migrated);
    schema::sanitize(&mut merged);

    match serde_json::from_value::<Settings>(merged) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Merged settings failed to deserialize, using defaults: {}", e);
            Settings::default()
        }
    }
}
