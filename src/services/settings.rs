//! Settings service
//!
//! Commands for theme, font selection, display preferences, and the
//! local profile, plus font resolution: turning whatever font id is
//! selected into a concrete CSS font-family declaration. Resolution is
//! total and synchronous; network work happens at ingestion time only
//! (see `services::fonts`).

use crate::config;
use crate::error::{AppError, Result};
use crate::storage::{
    BookFontSlot, FontOption, Profile, Repository, Settings, SortOrder, TimeFormat,
};

/// Resolve a font id against the given settings.
///
/// Preset ids resolve to their hardcoded family, `custom-<id>` to the
/// stored family with a sans-serif fallback, and anything else,
/// including stale custom references, to the default preset. Never
/// fails and never touches the network.
pub fn resolve_font(settings: &Settings, font_id: &str) -> String {
    if let Some(family) = config::preset_family(font_id) {
        return family.to_string();
    }

    if let Some(id) = font_id.strip_prefix(config::CUSTOM_FONT_PREFIX) {
        if let Some(font) = settings.custom_fonts.iter().find(|f| f.id == id) {
            return format!("'{}', {}", font.family, config::CUSTOM_FONT_FALLBACK);
        }
    }

    config::default_family().to_string()
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    repo: Repository,
}

impl SettingsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Current settings snapshot
    pub async fn settings(&self) -> Settings {
        self.repo.settings().await
    }

    /// Select a theme; an unknown id falls back to the default
    pub async fn set_theme(&self, theme: &str) -> Result<Settings> {
        let theme = if config::VALID_THEMES.contains(&theme) {
            theme.to_string()
        } else {
            tracing::warn!("Unknown theme '{}', falling back to default", theme);
            config::DEFAULT_THEME.to_string()
        };

        self.repo.update_settings(|s| s.theme = theme).await
    }

    /// Select the global font.
    ///
    /// Preset ids and stale/unknown ids are accepted (they resolve to
    /// the default); a `custom-<id>` reference must name an existing
    /// custom font.
    pub async fn set_font(&self, font_id: &str) -> Result<Settings> {
        if let Some(id) = font_id.strip_prefix(config::CUSTOM_FONT_PREFIX) {
            let settings = self.repo.settings().await;
            if !settings.custom_fonts.iter().any(|f| f.id == id) {
                return Err(AppError::NotFound(format!("custom font {}", id)));
            }
        }

        let font_id = font_id.to_string();
        self.repo.update_settings(|s| s.font_id = font_id).await
    }

    /// Select how timestamps are rendered
    pub async fn set_time_format(&self, format: TimeFormat) -> Result<Settings> {
        self.repo.update_settings(|s| s.time_format = format).await
    }

    /// Select the feed sort order
    pub async fn set_sort_order(&self, order: SortOrder) -> Result<Settings> {
        self.repo.update_settings(|s| s.sort_order = order).await
    }

    /// Update the profile name and signature
    pub async fn update_profile(&self, name: &str, signature: &str) -> Result<Profile> {
        let name = name.trim();
        let signature = signature.trim();

        if name.chars().count() > config::MAX_PROFILE_NAME_LEN {
            return Err(AppError::Validation(format!(
                "profile name longer than {} characters",
                config::MAX_PROFILE_NAME_LEN
            )));
        }
        if signature.chars().count() > config::MAX_SIGNATURE_LEN {
            return Err(AppError::Validation(format!(
                "signature longer than {} characters",
                config::MAX_SIGNATURE_LEN
            )));
        }

        let name = name.to_string();
        let signature = signature.to_string();

        let settings = self
            .repo
            .update_settings(|s| {
                s.profile.name = name;
                s.profile.signature = signature;
            })
            .await?;

        tracing::info!("Profile updated");
        Ok(settings.profile)
    }

    /// Set or clear the avatar. Anything other than an empty string
    /// must be an embedded image payload.
    pub async fn set_avatar(&self, avatar: &str) -> Result<Profile> {
        if !avatar.is_empty() && !avatar.starts_with(config::AVATAR_DATA_PREFIX) {
            return Err(AppError::Validation(
                "avatar must be an embedded image (data:image/...) or empty".to_string(),
            ));
        }

        let avatar = avatar.to_string();
        let settings = self.repo.update_settings(|s| s.profile.avatar = avatar).await?;

        Ok(settings.profile)
    }

    /// Resolve an arbitrary font id against current settings
    pub async fn resolve(&self, font_id: &str) -> String {
        let settings = self.repo.settings().await;
        resolve_font(&settings, font_id)
    }

    /// The family the feed should render with right now
    pub async fn current_family(&self) -> String {
        let settings = self.repo.settings().await;
        resolve_font(&settings, &settings.font_id)
    }

    /// The family a book surface should render with: its slot if
    /// filled, otherwise the global font
    pub async fn resolve_book_font(&self, slot: BookFontSlot) -> String {
        let settings = self.repo.settings().await;

        let slot_font = match slot {
            BookFontSlot::Chinese => settings.book_font.chinese.as_ref(),
            BookFontSlot::English => settings.book_font.english.as_ref(),
        };

        match slot_font {
            Some(font) => format!("'{}', {}", font.family, config::CUSTOM_FONT_FALLBACK),
            None => resolve_font(&settings, &settings.font_id),
        }
    }

    /// View-models for the font picker: presets first, then customs
    pub async fn font_catalog(&self) -> Vec<FontOption> {
        let settings = self.repo.settings().await;

        let mut options: Vec<FontOption> = config::PRESET_FONTS
            .iter()
            .map(|(id, family)| FontOption {
                id: (*id).to_string(),
                label: (*id).to_string(),
                family: (*family).to_string(),
                builtin: true,
            })
            .collect();

        options.extend(settings.custom_fonts.iter().map(|font| FontOption {
            id: format!("{}{}", config::CUSTOM_FONT_PREFIX, font.id),
            label: font.name.clone(),
            family: format!("'{}', {}", font.family, config::CUSTOM_FONT_FALLBACK),
            builtin: false,
        }));

        options
    }
}
