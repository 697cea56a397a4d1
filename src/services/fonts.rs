//! Font ingestion service
//!
//! The one place the engine talks to the outside world: adding a custom
//! font fetches its stylesheet (or decodes an embedded `data:` payload)
//! and extracts the real `font-family` name, so a user only ever has to
//! paste a link. Resolution itself stays synchronous and offline; the
//! parsed family is stored alongside the url at ingestion time.
//!
//! Overlapping ingestions for the same logical operation are rejected
//! with `Busy` via a per-operation in-flight flag. The two book slots
//! are independent operations and may run concurrently.

use crate::config;
use crate::error::{AppError, Result};
use crate::storage::{BookFont, BookFontSlot, CustomFont, Repository};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Tolerant match for a font-family declaration: quoted or unquoted
/// value, up to the next semicolon or quote.
static FONT_FAMILY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"font-family\s*:\s*['"]?([^;'"]+)"#).expect("font-family pattern is valid")
});

/// Extract the font-family value from stylesheet text.
pub fn parse_font_family(css: &str) -> Result<String> {
    let family = FONT_FAMILY_RE
        .captures(css)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|family| !family.is_empty())
        .ok_or_else(|| {
            AppError::Parse("no font-family declaration found in stylesheet".to_string())
        })?;

    Ok(family.to_string())
}

/// Releases the in-flight flag when the operation finishes, on success
/// and on every error path.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn try_begin<'a>(flag: &'a AtomicBool, what: &str) -> Result<InFlight<'a>> {
    if flag
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(AppError::Busy(format!("{} is already being fetched", what)));
    }
    Ok(InFlight(flag))
}

/// Service for custom font and book font ingestion
#[derive(Clone)]
pub struct FontService {
    repo: Repository,
    client: reqwest::Client,
    custom_in_flight: Arc<AtomicBool>,
    chinese_in_flight: Arc<AtomicBool>,
    english_in_flight: Arc<AtomicBool>,
}

impl FontService {
    pub fn new(repo: Repository) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("inkdiary-font-loader")
            .timeout(Duration::from_secs(config::FONT_FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            repo,
            client,
            custom_in_flight: Arc::new(AtomicBool::new(false)),
            chinese_in_flight: Arc::new(AtomicBool::new(false)),
            english_in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Add a custom font from a stylesheet url.
    ///
    /// The alias is optional; when empty, the first comma-separated
    /// token of the parsed family is used. Returns the stored font with
    /// its freshly assigned stable id.
    pub async fn add_custom_font(&self, url: &str, alias: &str) -> Result<CustomFont> {
        let _in_flight = try_begin(&self.custom_in_flight, "a custom font")?;

        let url = validate_url(url)?;

        let settings = self.repo.settings().await;
        if settings.custom_fonts.len() >= config::MAX_CUSTOM_FONTS {
            return Err(AppError::Validation(format!(
                "at most {} custom fonts are supported",
                config::MAX_CUSTOM_FONTS
            )));
        }

        tracing::info!("Fetching custom font stylesheet: {}", url);

        let css = self.fetch_stylesheet(&url).await?;
        let family = parse_font_family(&css)?;

        let alias = clean_alias(alias);
        let name = if alias.is_empty() {
            first_family_token(&family)
        } else {
            alias
        };

        let font = CustomFont {
            id: Uuid::new_v4().to_string(),
            name,
            family,
            url,
        };

        let stored = font.clone();
        self.repo
            .update_settings(move |s| s.custom_fonts.push(stored))
            .await?;

        tracing::info!("Custom font added: {} ({})", font.name, font.family);

        Ok(font)
    }

    /// Remove a custom font by its stable id.
    ///
    /// Other references are untouched; only a selection pointing at the
    /// removed font resets to the default preset.
    pub async fn delete_custom_font(&self, id: &str) -> Result<CustomFont> {
        let settings = self.repo.settings().await;
        let removed = settings
            .custom_fonts
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("custom font {}", id)))?;

        let removed_ref = format!("{}{}", config::CUSTOM_FONT_PREFIX, id);
        let id = id.to_string();
        self.repo
            .update_settings(move |s| {
                s.custom_fonts.retain(|f| f.id != id);
                if s.font_id == removed_ref {
                    s.font_id = config::DEFAULT_FONT_ID.to_string();
                }
            })
            .await?;

        tracing::info!("Custom font deleted: {}", removed.name);

        Ok(removed)
    }

    /// Set or reset one book font slot.
    ///
    /// An empty url resets the slot (the book surface falls back to the
    /// global font); anything else is ingested like a custom font.
    pub async fn set_book_font(
        &self,
        slot: BookFontSlot,
        url: &str,
        alias: &str,
    ) -> Result<Option<BookFont>> {
        let flag = match slot {
            BookFontSlot::Chinese => &self.chinese_in_flight,
            BookFontSlot::English => &self.english_in_flight,
        };
        let _in_flight = try_begin(flag, slot.as_str())?;

        if url.trim().is_empty() {
            self.repo
                .update_settings(move |s| match slot {
                    BookFontSlot::Chinese => s.book_font.chinese = None,
                    BookFontSlot::English => s.book_font.english = None,
                })
                .await?;

            tracing::info!("Book font slot reset: {}", slot.as_str());
            return Ok(None);
        }

        let url = validate_url(url)?;

        tracing::info!("Fetching {} book font stylesheet: {}", slot.as_str(), url);

        let css = self.fetch_stylesheet(&url).await?;
        let family = parse_font_family(&css)?;

        let alias = clean_alias(alias);
        let name = if alias.is_empty() {
            first_family_token(&family)
        } else {
            alias
        };

        let font = BookFont { name, family, url };

        let stored = font.clone();
        self.repo
            .update_settings(move |s| match slot {
                BookFontSlot::Chinese => s.book_font.chinese = Some(stored),
                BookFontSlot::English => s.book_font.english = Some(stored),
            })
            .await?;

        tracing::info!("Book font set: {} = {}", slot.as_str(), font.family);

        Ok(Some(font))
    }

    /// Apply both book font slots concurrently. Each slot succeeds or
    /// fails on its own.
    pub async fn set_book_fonts(
        &self,
        chinese_url: &str,
        english_url: &str,
    ) -> (Result<Option<BookFont>>, Result<Option<BookFont>>) {
        tokio::join!(
            self.set_book_font(BookFontSlot::Chinese, chinese_url, ""),
            self.set_book_font(BookFontSlot::English, english_url, "")
        )
    }

    /// Load stylesheet text from an http(s) url or an embedded `data:`
    /// reference.
    async fn fetch_stylesheet(&self, url: &str) -> Result<String> {
        if let Some(rest) = url.strip_prefix("data:") {
            return decode_data_reference(rest);
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Network(format!(
                "stylesheet fetch returned {}",
                status
            )));
        }

        Ok(response.text().await?)
    }
}

/// Syntactic validation: non-empty, and either an embedded data
/// reference or a well-formed http(s) url.
fn validate_url(url: &str) -> Result<String> {
    let url = url.trim();

    if url.is_empty() {
        return Err(AppError::Validation("font url must not be empty".to_string()));
    }

    if url.starts_with("data:") {
        if !url.contains(',') {
            return Err(AppError::Validation(
                "malformed data reference: missing payload".to_string(),
            ));
        }
        return Ok(url.to_string());
    }

    let parsed = Url::parse(url)
        .map_err(|e| AppError::Validation(format!("invalid font url: {}", e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "unsupported url scheme: {}",
            parsed.scheme()
        )));
    }

    Ok(url.to_string())
}

/// Decode the part after `data:`: an optional media type and encoding
/// marker, a comma, then the payload.
fn decode_data_reference(rest: &str) -> Result<String> {
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::Validation("malformed data reference".to_string()))?;

    if header.ends_with(";base64") {
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| AppError::Parse(format!("invalid base64 payload: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Parse(format!("stylesheet is not valid UTF-8: {}", e)))
    } else {
        Ok(payload.to_string())
    }
}

/// Strip whitespace and one pair of surrounding quotes from a
/// user-given alias.
fn clean_alias(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix(&['\'', '"'][..]).unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(&['\'', '"'][..]).unwrap_or(trimmed);
    trimmed.trim().to_string()
}

fn first_family_token(family: &str) -> String {
    family
        .split(',')
        .next()
        .unwrap_or(family)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::KvStore;
    use mockito::Server;
    use tempfile::TempDir;

    async fn create_test_service() -> (FontService, Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let kv = KvStore::new(temp_dir.path().join("data"));
        kv.initialize().await.unwrap();
        let repo = Repository::load(kv).await;
        (FontService::new(repo.clone()).unwrap(), repo, temp_dir)
    }

    #[test]
    fn test_parse_quoted_family() {
        let css = "@font-face { font-family: 'MyFont', sans-serif; src: url(f.woff2); }";
        assert_eq!(parse_font_family(css).unwrap(), "MyFont");
    }

    #[test]
    fn test_parse_double_quoted_family() {
        let css = r#"body { font-family: "ZCOOL KuaiLe"; }"#;
        assert_eq!(parse_font_family(css).unwrap(), "ZCOOL KuaiLe");
    }

    #[test]
    fn test_parse_unquoted_family_keeps_fallback_list() {
        let css = "p { font-family: LXGW WenKai, serif; }";
        assert_eq!(parse_font_family(css).unwrap(), "LXGW WenKai, serif");
    }

    #[test]
    fn test_parse_missing_family() {
        let css = "body { color: red; }";
        assert!(matches!(parse_font_family(css), Err(AppError::Parse(_))));
    }

    #[test]
    fn test_clean_alias_strips_quotes() {
        assert_eq!(clean_alias("  'Cool Font' "), "Cool Font");
        assert_eq!(clean_alias("\"Cool Font\""), "Cool Font");
        assert_eq!(clean_alias("Plain"), "Plain");
        assert_eq!(clean_alias(""), "");
    }

    #[tokio::test]
    async fn test_add_custom_font_from_server() {
        let (service, repo, _temp) = create_test_service().await;
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/font.css")
            .with_status(200)
            .with_body("@font-face { font-family: 'MyFont', sans-serif; src: url(x); }")
            .create_async()
            .await;

        let url = format!("{}/font.css", server.url());
        let font = service.add_custom_font(&url, "").await.unwrap();

        mock.assert_async().await;
        assert_eq!(font.name, "MyFont");
        assert_eq!(font.family, "MyFont");
        assert_eq!(font.url, url);
        assert!(!font.id.is_empty());

        let settings = repo.settings().await;
        assert_eq!(settings.custom_fonts.len(), 1);
        assert_eq!(settings.custom_fonts[0], font);
    }

    #[tokio::test]
    async fn test_alias_overrides_parsed_name() {
        let (service, _repo, _temp) = create_test_service().await;
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/font.css")
            .with_status(200)
            .with_body("font-family: RealFamily;")
            .create_async()
            .await;

        let url = format!("{}/font.css", server.url());
        let font = service.add_custom_font(&url, " 'Pet Name' ").await.unwrap();

        assert_eq!(font.name, "Pet Name");
        assert_eq!(font.family, "RealFamily");
    }

    #[tokio::test]
    async fn test_unparseable_stylesheet_leaves_fonts_unchanged() {
        let (service, repo, _temp) = create_test_service().await;
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/plain.css")
            .with_status(200)
            .with_body("body { margin: 0; }")
            .create_async()
            .await;

        let url = format!("{}/plain.css", server.url());
        let result = service.add_custom_font(&url, "").await;

        assert!(matches!(result, Err(AppError::Parse(_))));
        assert!(repo.settings().await.custom_fonts.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_a_network_error() {
        let (service, repo, _temp) = create_test_service().await;
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/missing.css")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/missing.css", server.url());
        let result = service.add_custom_font(&url, "").await;

        assert!(matches!(result, Err(AppError::Network(_))));
        assert!(repo.settings().await.custom_fonts.is_empty());
    }

    #[tokio::test]
    async fn test_url_validation() {
        let (service, _repo, _temp) = create_test_service().await;

        assert!(matches!(
            service.add_custom_font("", "x").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.add_custom_font("   ", "x").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.add_custom_font("not a url", "x").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.add_custom_font("ftp://fonts.example/f.css", "x").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_embedded_data_reference() {
        let (service, _repo, _temp) = create_test_service().await;

        let css = "font-family: 'Embedded Font';";
        let encoded = BASE64.encode(css);
        let url = format!("data:text/css;base64,{}", encoded);

        let font = service.add_custom_font(&url, "").await.unwrap();

        assert_eq!(font.family, "Embedded Font");
        assert_eq!(font.name, "Embedded Font");
    }

    #[tokio::test]
    async fn test_plain_data_reference() {
        let (service, _repo, _temp) = create_test_service().await;

        let url = "data:text/css,font-family: PlainData;";
        let font = service.add_custom_font(url, "").await.unwrap();

        assert_eq!(font.family, "PlainData");
    }

    #[tokio::test]
    async fn test_overlapping_ingestion_is_busy() {
        let (service, _repo, _temp) = create_test_service().await;

        // Simulate an ingestion already in flight
        service.custom_in_flight.store(true, Ordering::SeqCst);

        let result = service
            .add_custom_font("data:text/css,font-family: X;", "")
            .await;
        assert!(matches!(result, Err(AppError::Busy(_))));

        // Flag untouched by the rejected call
        assert!(service.custom_in_flight.load(Ordering::SeqCst));
        service.custom_in_flight.store(false, Ordering::SeqCst);

        // And a failed ingestion releases the flag
        let _ = service.add_custom_font("not a url", "").await;
        assert!(!service.custom_in_flight.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_custom_font_limit() {
        let (service, repo, _temp) = create_test_service().await;

        repo.update_settings(|s| {
            for i in 0..config::MAX_CUSTOM_FONTS {
                s.custom_fonts.push(CustomFont {
                    id: format!("id-{}", i),
                    name: format!("Font {}", i),
                    family: format!("Font {}", i),
                    url: "https://fonts.example/f.css".to_string(),
                });
            }
        })
        .await
        .unwrap();

        let result = service
            .add_custom_font("data:text/css,font-family: One Too Many;", "")
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_custom_font_resets_matching_selection_only() {
        let (service, repo, _temp) = create_test_service().await;

        let keep = service
            .add_custom_font("data:text/css,font-family: Keeper;", "")
            .await
            .unwrap();
        let drop = service
            .add_custom_font("data:text/css,font-family: Goner;", "")
            .await
            .unwrap();

        // Select the font that stays
        repo.update_settings(|s| s.font_id = format!("custom-{}", keep.id))
            .await
            .unwrap();

        service.delete_custom_font(&drop.id).await.unwrap();

        let settings = repo.settings().await;
        assert_eq!(settings.custom_fonts.len(), 1);
        assert_eq!(settings.font_id, format!("custom-{}", keep.id));

        // Deleting the selected font resets the selection
        service.delete_custom_font(&keep.id).await.unwrap();
        assert_eq!(repo.settings().await.font_id, config::DEFAULT_FONT_ID);
    }

    #[tokio::test]
    async fn test_delete_missing_custom_font() {
        let (service, _repo, _temp) = create_test_service().await;

        assert!(matches!(
            service.delete_custom_font("ghost").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_book_font_set_and_reset() {
        let (service, repo, _temp) = create_test_service().await;

        let font = service
            .set_book_font(
                BookFontSlot::Chinese,
                "data:text/css,font-family: Ma Shan Zheng;",
                "",
            )
            .await
            .unwrap()
            .expect("slot should be filled");

        assert_eq!(font.family, "Ma Shan Zheng");
        assert!(repo.settings().await.book_font.chinese.is_some());

        let reset = service
            .set_book_font(BookFontSlot::Chinese, "", "")
            .await
            .unwrap();
        assert!(reset.is_none());
        assert!(repo.settings().await.book_font.chinese.is_none());
    }

    #[tokio::test]
    async fn test_book_slots_fan_out_independently() {
        let (service, repo, _temp) = create_test_service().await;

        let (chinese, english) = service
            .set_book_fonts(
                "data:text/css,font-family: Hanzi Face;",
                "data:text/css,body { margin: 0; }",
            )
            .await;

        assert_eq!(chinese.unwrap().unwrap().family, "Hanzi Face");
        assert!(matches!(english, Err(AppError::Parse(_))));

        let settings = repo.settings().await;
        assert!(settings.book_font.chinese.is_some());
        assert!(settings.book_font.english.is_none());
    }
}
