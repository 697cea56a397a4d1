//! Entry service
//!
//! High-level business logic for diary entries: validation, the
//! two-phase delete confirmation flow, search, and the aggregate
//! numbers shown on the profile panel.

use crate::error::{AppError, Result};
use crate::storage::{Entry, EntryStats, Repository, SortOrder};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Service for managing diary entries
#[derive(Clone)]
pub struct EntryService {
    repo: Repository,
    pending_delete: Arc<Mutex<Option<String>>>,
}

impl EntryService {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            pending_delete: Arc::new(Mutex::new(None)),
        }
    }

    /// Publish a new entry
    pub async fn create(&self, content: &str, tags: Vec<String>) -> Result<Entry> {
        let content = validate_content(content)?;
        let tags = clean_tags(tags);

        tracing::info!("Publishing new entry ({} chars)", content.len());

        let entry = self.repo.create_entry(content, tags).await?;

        tracing::info!("Entry published: {}", entry.id);

        Ok(entry)
    }

    /// Edit an existing entry; creation time never changes
    pub async fn update(&self, id: &str, content: &str, tags: Vec<String>) -> Result<Entry> {
        let content = validate_content(content)?;
        let tags = clean_tags(tags);

        tracing::debug!("Updating entry: {}", id);

        let entry = self.repo.update_entry(id, content, tags).await?;

        tracing::debug!("Entry updated: {}", id);

        Ok(entry)
    }

    /// Get a single entry by id
    pub async fn get(&self, id: &str) -> Result<Entry> {
        self.repo.get_entry(id).await
    }

    /// Remember an entry as the delete candidate until the user
    /// confirms or cancels
    pub async fn stage_delete(&self, id: &str) {
        let mut pending = self.pending_delete.lock().await;
        *pending = Some(id.to_string());
    }

    /// Delete the staged entry, if any. Returns whether an entry was
    /// actually removed.
    pub async fn confirm_delete(&self) -> Result<bool> {
        let id = {
            let mut pending = self.pending_delete.lock().await;
            pending.take()
        };

        match id {
            Some(id) => self.delete_by_id(&id).await,
            None => Ok(false),
        }
    }

    /// Drop the staged delete candidate without deleting anything
    pub async fn cancel_delete(&self) {
        let mut pending = self.pending_delete.lock().await;
        *pending = None;
    }

    /// Remove an entry by id; an absent id is a no-op
    pub async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let removed = self.repo.delete_entry(id).await?;

        if removed {
            tracing::info!("Entry deleted: {}", id);
        } else {
            tracing::debug!("Delete of absent entry ignored: {}", id);
        }

        Ok(removed)
    }

    /// Filter and sort entries for the feed.
    ///
    /// Matches case-insensitively against content or any tag; an empty
    /// search returns everything. Ties in creation time keep their
    /// original insertion order.
    pub async fn query(&self, search: &str, sort: SortOrder) -> Vec<Entry> {
        let mut entries = self.repo.list_entries().await;

        let needle = search.trim().to_lowercase();
        if !needle.is_empty() {
            entries.retain(|e| {
                e.content.to_lowercase().contains(&needle)
                    || e.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            });
        }

        match sort {
            SortOrder::Oldest => entries.sort_by_key(|e| e.created_at),
            SortOrder::Newest => {
                entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
        }

        entries
    }

    /// Feed query using the persisted sort order preference
    pub async fn feed(&self, search: &str) -> Vec<Entry> {
        let sort = self.repo.settings().await.sort_order;
        self.query(search, sort).await
    }

    /// Aggregate numbers for the profile panel
    pub async fn stats(&self) -> EntryStats {
        let entries = self.repo.list_entries().await;

        let char_count = entries.iter().map(|e| e.content.chars().count()).sum();
        let latest = entries
            .iter()
            .max_by_key(|e| e.last_touched())
            .cloned();

        EntryStats {
            entry_count: entries.len(),
            char_count,
            latest,
        }
    }
}

fn validate_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("entry content must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
