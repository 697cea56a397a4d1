//! Document models
//!
//! Rust structs representing the persisted application document.
//! Wire names are camelCase to stay compatible with documents written
//! by earlier releases; all models use serde for (de)serialization.

use crate::config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single diary entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Timestamp used for "most recent" ordering: last edit, falling
    /// back to creation for documents written before edits existed.
    pub fn last_touched(&self) -> DateTime<Utc> {
        self.updated_at.max(self.created_at)
    }
}

/// A user-added font backed by a remote or embedded stylesheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFont {
    /// Stable id assigned at ingestion; font selections reference this,
    /// never the position in the list
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub family: String,
    pub url: String,
}

/// A font bound to one surface of the book view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookFont {
    pub name: String,
    pub family: String,
    pub url: String,
}

/// Per-script font slots for the page-flip book surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookFontSlots {
    #[serde(default)]
    pub chinese: Option<BookFont>,
    #[serde(default)]
    pub english: Option<BookFont>,
}

/// Which book font slot an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFontSlot {
    Chinese,
    English,
}

impl BookFontSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookFontSlot::Chinese => "chinese",
            BookFontSlot::English => "english",
        }
    }
}

/// Local user profile shown alongside entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default = "default_profile_name")]
    pub name: String,
    #[serde(default = "default_signature")]
    pub signature: String,
    /// Either empty or a `data:image/...` URI
    #[serde(default)]
    pub avatar: String,
}

fn default_profile_name() -> String {
    "Anonymous".to_string()
}

fn default_signature() -> String {
    "This diarist has nothing to say.".to_string()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: default_profile_name(),
            signature: default_signature(),
            avatar: String::new(),
        }
    }
}

/// How entry timestamps are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    Relative,
    Short,
    Full,
}

impl Default for TimeFormat {
    fn default() -> Self {
        TimeFormat::Relative
    }
}

/// Feed ordering by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Newest,
    Oldest,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Newest
    }
}

/// Application settings (one per installation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_theme")]
    pub theme: String,
    /// A preset key or `custom-<id>` reference
    #[serde(default = "default_font_id")]
    pub font_id: String,
    #[serde(default)]
    pub custom_fonts: Vec<CustomFont>,
    #[serde(default)]
    pub book_font: BookFontSlots,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub time_format: TimeFormat,
    #[serde(default)]
    pub sort_order: SortOrder,
}

fn default_schema_version() -> u32 {
    config::SCHEMA_VERSION
}

fn default_theme() -> String {
    config::DEFAULT_THEME.to_string()
}

fn default_font_id() -> String {
    config::DEFAULT_FONT_ID.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            theme: default_theme(),
            font_id: default_font_id(),
            custom_fonts: Vec::new(),
            book_font: BookFontSlots::default(),
            profile: Profile::default(),
            time_format: TimeFormat::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl Settings {
    /// Defaults as a JSON value, the target side of the load-time merge.
    pub fn default_value() -> serde_json::Value {
        serde_json::to_value(Settings::default())
            .expect("default settings always serialize")
    }
}

/// The whole persisted application document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDocument {
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub settings: Settings,
}

/// Aggregates for the profile panel
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStats {
    pub entry_count: usize,
    /// Total characters across all entry contents
    pub char_count: usize,
    /// Most recently touched entry, if any
    pub latest: Option<Entry>,
}

/// View-model for one row of the font picker
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FontOption {
    pub id: String,
    pub label: String,
    pub family: String,
    pub builtin: bool,
}
