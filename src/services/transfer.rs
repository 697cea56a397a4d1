//! Export / import service
//!
//! Produces a downloadable snapshot of the whole document and accepts
//! one back. Import is all-or-nothing: structurally invalid input is
//! rejected before any state changes, and settings re-enter through the
//! same migrate-and-merge path used at load time.

use crate::error::{AppError, Result};
use crate::storage::repository::settings_from_value;
use crate::storage::{AppDocument, Entry, Repository};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// A ready-to-download export
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    /// Suggested filename, stamped with the current date
    pub filename: String,
    /// Pretty-printed document, identical in shape to persisted data
    pub json: String,
}

/// Service for data export and import
#[derive(Clone)]
pub struct TransferService {
    repo: Repository,
}

impl TransferService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Export the whole document as pretty JSON
    pub async fn export(&self) -> Result<ExportBundle> {
        let document = self.repo.document().await;

        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| AppError::Storage(format!("failed to serialize export: {}", e)))?;

        let filename = format!("diary_backup_{}.json", Utc::now().format("%Y-%m-%d"));

        tracing::info!("Exported {} entries to {}", document.entries.len(), filename);

        Ok(ExportBundle { filename, json })
    }

    /// Replace all data with an imported document.
    ///
    /// The caller is expected to have confirmed the overwrite with the
    /// user. Returns the number of imported entries.
    pub async fn import(&self, raw: &str) -> Result<usize> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| AppError::Validation(format!("import is not valid JSON: {}", e)))?;

        if !value.is_object() {
            return Err(AppError::Validation(
                "import must be a JSON object with entries and settings".to_string(),
            ));
        }

        let entries: Vec<Entry> = match value.get("entries") {
            Some(raw_entries) => serde_json::from_value(raw_entries.clone())
                .map_err(|e| AppError::Validation(format!("import has malformed entries: {}", e)))?,
            None => Vec::new(),
        };

        let raw_settings = value.get("settings").cloned().unwrap_or(Value::Null);
        let settings = settings_from_value(raw_settings);

        let count = entries.len();
        self.repo
            .replace_document(AppDocument { entries, settings })
            .await?;

        tracing::info!("Imported {} entries", count);

        Ok(count)
    }
}
