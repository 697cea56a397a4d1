//! Settings schema versioning and migrations
//!
//! Documents written by earlier releases stored font settings in three
//! different shapes. An explicit integer version tag gates a linear
//! chain of migration steps, each taking shape v_n to v_{n+1}:
//!
//! - v1: flat `fontId` string, custom fonts may lack a `family`
//! - v2: per-surface `fonts: {main, book}` object
//! - v3 (current): global `fontId` plus `bookFont: {chinese, english}`
//!   slots, custom fonts carry stable generated ids
//!
//! Untagged documents are sniffed by shape; tagged documents trust the
//! tag. Running the chain on an already-current document is a no-op.

use crate::config;
use serde_json::{json, Value};
use uuid::Uuid;

/// Determine the schema version of a raw settings object.
pub fn detect_version(settings: &Value) -> u32 {
    if let Some(version) = settings.get("schemaVersion").and_then(Value::as_u64) {
        return version as u32;
    }

    // Legacy documents carry no tag; the shape of the font fields
    // identifies the revision that wrote them.
    if settings.get("fonts").map(Value::is_object).unwrap_or(false) {
        2
    } else {
        1
    }
}

/// Run the migration chain, returning a current-shape settings object.
pub fn migrate_settings(mut settings: Value) -> Value {
    if !settings.is_object() {
        settings = json!({});
    }

    let mut version = detect_version(&settings);

    if version > config::SCHEMA_VERSION {
        tracing::warn!(
            "Settings written by a newer release (v{}), loading as-is",
            version
        );
        return settings;
    }

    while version < config::SCHEMA_VERSION {
        tracing::info!("Migrating settings schema v{} -> v{}", version, version + 1);
        settings = match version {
            1 => migrate_v1_to_v2(settings),
            2 => migrate_v2_to_v3(settings),
            _ => break,
        };
        version += 1;
    }

    if let Some(map) = settings.as_object_mut() {
        map.insert("schemaVersion".to_string(), json!(config::SCHEMA_VERSION));
    }

    settings
}

/// v1 -> v2: the flat `fontId` becomes the main surface of a
/// per-surface `fonts` object; the new book surface gets the default.
fn migrate_v1_to_v2(mut settings: Value) -> Value {
    let Some(map) = settings.as_object_mut() else {
        return settings;
    };

    let main = map
        .remove("fontId")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| config::DEFAULT_FONT_ID.to_string());

    map.insert(
        "fonts".to_string(),
        json!({ "main": main, "book": config::DEFAULT_FONT_ID }),
    );

    settings
}

/// v2 -> v3: the main surface becomes the global `fontId`, the single
/// book surface splits into empty per-script slots, custom fonts get a
/// `family` (best effort: the literal name) and a stable id, and a
/// positional `custom-<index>` selection is remapped to that id.
fn migrate_v2_to_v3(mut settings: Value) -> Value {
    let Some(map) = settings.as_object_mut() else {
        return settings;
    };

    let mut font_id = map
        .remove("fonts")
        .and_then(|fonts| {
            fonts
                .get("main")
                .and_then(|v| v.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| config::DEFAULT_FONT_ID.to_string());

    // Empty slots fall through to the global font at resolution time.
    map.insert("bookFont".to_string(), json!({ "chinese": null, "english": null }));

    let mut stable_ids = Vec::new();
    if let Some(fonts) = map.get_mut("customFonts").and_then(Value::as_array_mut) {
        for font in fonts.iter_mut() {
            let Some(entry) = font.as_object_mut() else {
                continue;
            };

            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            // Before smart parsing existed the user-given name doubled
            // as the CSS family.
            let family_missing = entry
                .get("family")
                .and_then(Value::as_str)
                .map(str::is_empty)
                .unwrap_or(true);
            if family_missing && !name.is_empty() {
                entry.insert("family".to_string(), json!(name));
            }

            let id_missing = entry
                .get("id")
                .and_then(Value::as_str)
                .map(str::is_empty)
                .unwrap_or(true);
            if id_missing {
                entry.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
            }

            stable_ids.push(
                entry
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            );
        }
    }

    // A positional reference survives deletion-reshuffles only by
    // becoming a stable id here; out of range falls back to the default.
    if let Some(index_str) = font_id.strip_prefix(config::CUSTOM_FONT_PREFIX) {
        if let Ok(index) = index_str.parse::<usize>() {
            font_id = match stable_ids.get(index) {
                Some(id) => format!("{}{}", config::CUSTOM_FONT_PREFIX, id),
                None => config::DEFAULT_FONT_ID.to_string(),
            };
        }
    }

    map.insert("fontId".to_string(), json!(font_id));

    settings
}

/// Clamp free-form persisted fields to their closed sets so a garbage
/// value never reaches typed deserialization. Runs after the merge.
pub fn sanitize(settings: &mut Value) {
    let Some(map) = settings.as_object_mut() else {
        return;
    };

    let theme_ok = map
        .get("theme")
        .and_then(Value::as_str)
        .map(|t| config::VALID_THEMES.contains(&t))
        .unwrap_or(false);
    if !theme_ok {
        map.insert("theme".to_string(), json!(config::DEFAULT_THEME));
    }

    let time_ok = map
        .get("timeFormat")
        .and_then(Value::as_str)
        .map(|t| matches!(t, "relative" | "short" | "full"))
        .unwrap_or(false);
    if !time_ok {
        map.insert("timeFormat".to_string(), json!("relative"));
    }

    let sort_ok = map
        .get("sortOrder")
        .and_then(Value::as_str)
        .map(|s| matches!(s, "newest" | "oldest"))
        .unwrap_or(false);
    if !sort_ok {
        map.insert("sortOrder".to_string(), json!("newest"));
    }

    if !map.get("fontId").map(Value::is_string).unwrap_or(false) {
        map.insert("fontId".to_string(), json!(config::DEFAULT_FONT_ID));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_untagged_v1() {
        let settings = json!({ "fontId": "serif" });
        assert_eq!(detect_version(&settings), 1);
    }

    #[test]
    fn test_detects_untagged_v2() {
        let settings = json!({ "fonts": { "main": "serif", "book": "sans-serif" } });
        assert_eq!(detect_version(&settings), 2);
    }

    #[test]
    fn test_trusts_version_tag() {
        let settings = json!({ "schemaVersion": 3, "fonts": { "main": "x" } });
        assert_eq!(detect_version(&settings), 3);
    }

    #[test]
    fn test_flat_font_id_reaches_current_shape() {
        let migrated = migrate_settings(json!({ "fontId": "serif" }));

        assert_eq!(migrated["schemaVersion"], 3);
        assert_eq!(migrated["fontId"], "serif");
        assert!(migrated["bookFont"]["chinese"].is_null());
        assert!(migrated["bookFont"]["english"].is_null());
        assert!(migrated.get("fonts").is_none());
    }

    #[test]
    fn test_missing_family_normalized_to_name() {
        let migrated = migrate_settings(json!({
            "fontId": "sans-serif",
            "customFonts": [{ "name": "LXGW WenKai", "url": "https://fonts.example/lxgw.css" }]
        }));

        let font = &migrated["customFonts"][0];
        assert_eq!(font["family"], "LXGW WenKai");
        assert!(!font["id"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_positional_selection_remapped_to_stable_id() {
        let migrated = migrate_settings(json!({
            "fontId": "custom-1",
            "customFonts": [
                { "name": "First", "url": "https://fonts.example/a.css" },
                { "name": "Second", "url": "https://fonts.example/b.css" }
            ]
        }));

        let second_id = migrated["customFonts"][1]["id"].as_str().unwrap();
        assert_eq!(
            migrated["fontId"].as_str().unwrap(),
            format!("custom-{}", second_id)
        );
    }

    #[test]
    fn test_out_of_range_positional_selection_falls_back() {
        let migrated = migrate_settings(json!({
            "fontId": "custom-5",
            "customFonts": [{ "name": "Only", "url": "https://fonts.example/a.css" }]
        }));

        assert_eq!(migrated["fontId"], "sans-serif");
    }

    #[test]
    fn test_migration_is_idempotent() {
        let once = migrate_settings(json!({ "fontId": "serif" }));
        let twice = migrate_settings(once.clone());

        assert_eq!(once, twice);
    }

    #[test]
    fn test_newer_document_loads_as_is() {
        let settings = json!({ "schemaVersion": 9, "fontId": "serif" });
        let migrated = migrate_settings(settings.clone());

        assert_eq!(migrated, settings);
    }

    #[test]
    fn test_sanitize_clamps_unknown_values() {
        let mut settings = json!({
            "theme": "neon",
            "timeFormat": "cosmic",
            "sortOrder": "shuffled",
            "fontId": 7
        });

        sanitize(&mut settings);

        assert_eq!(settings["theme"], "light");
        assert_eq!(settings["timeFormat"], "relative");
        assert_eq!(settings["sortOrder"], "newest");
        assert_eq!(settings["fontId"], "sans-serif");
    }

    #[test]
    fn test_sanitize_keeps_valid_values() {
        let mut settings = json!({
            "theme": "midnight",
            "timeFormat": "full",
            "sortOrder": "oldest",
            "fontId": "serif"
        });

        sanitize(&mut settings);

        assert_eq!(settings["theme"], "midnight");
        assert_eq!(settings["timeFormat"], "full");
        assert_eq!(settings["sortOrder"], "oldest");
    }
}
