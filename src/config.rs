//! Application configuration constants
//!
//! Central location for storage keys, the built-in font table,
//! resource limits, and validation boundaries used throughout the engine.

// ===== Storage Keys =====

/// Key under which the whole application document is stored
pub const APP_DATA_KEY: &str = "diaryAppData";

/// Key for the standalone "welcome dialog dismissed" flag
pub const WELCOME_SEEN_KEY: &str = "diaryAppVisited";

// ===== Fonts =====

/// Font id used whenever a selection cannot be resolved
pub const DEFAULT_FONT_ID: &str = "sans-serif";

/// Built-in font presets: id -> concrete CSS font-family declaration.
/// Presets never require a network resource.
pub const PRESET_FONTS: &[(&str, &str)] = &[
    ("sans-serif", "'Noto Sans SC', sans-serif"),
    ("serif", "'Noto Serif SC', serif"),
    ("handwritten", "'ZCOOL KuaiLe', cursive"),
];

/// Prefix marking a font id as a reference into the custom font list
pub const CUSTOM_FONT_PREFIX: &str = "custom-";

/// Fallback appended after a custom family so text stays readable while
/// the remote face loads (or fails to)
pub const CUSTOM_FONT_FALLBACK: &str = "sans-serif";

/// Maximum number of user-added custom fonts.
/// Prevents unbounded growth of the persisted document.
pub const MAX_CUSTOM_FONTS: usize = 20;

/// Hard timeout for a font stylesheet fetch, in seconds
pub const FONT_FETCH_TIMEOUT_SECS: u64 = 10;

// ===== Themes =====

/// Theme id used whenever a persisted or submitted theme is unknown
pub const DEFAULT_THEME: &str = "light";

/// Closed set of theme ids the presentation layer ships stylesheets for
pub const VALID_THEMES: &[&str] = &["light", "dark", "sepia", "midnight"];

// ===== Profile Limits =====

/// Maximum length for the profile display name
pub const MAX_PROFILE_NAME_LEN: usize = 40;

/// Maximum length for the profile signature line
pub const MAX_SIGNATURE_LEN: usize = 120;

/// Required prefix for an uploaded avatar payload
pub const AVATAR_DATA_PREFIX: &str = "data:image/";

// ===== Schema =====

/// Current version of the persisted settings shape.
/// Bump together with a new migration step in `storage::schema`.
pub const SCHEMA_VERSION: u32 = 3;

/// Lookup a preset family by font id.
pub fn preset_family(font_id: &str) -> Option<&'static str> {
    PRESET_FONTS
        .iter()
        .find(|(id, _)| *id == font_id)
        .map(|(_, family)| *family)
}

/// The family string for the default preset.
pub fn default_family() -> &'static str {
    // DEFAULT_FONT_ID is always present in PRESET_FONTS
    preset_family(DEFAULT_FONT_ID).unwrap_or("sans-serif")
}
