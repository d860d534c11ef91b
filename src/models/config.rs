//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Limits for a single scrape run
    #[serde(default)]
    pub run: RunConfig,

    /// Page extraction settings
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Record store location
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        let base = url::Url::parse(&self.crawler.base_url)
            .map_err(|e| AppError::validation(format!("crawler.base_url: {e}")))?;
        if base.host_str().is_none() {
            return Err(AppError::validation("crawler.base_url has no host"));
        }
        if self.extract.map_domains.iter().all(|d| d.trim().is_empty()) {
            return Err(AppError::validation("extract.map_domains is empty"));
        }
        if self.storage.output.as_os_str().is_empty() {
            return Err(AppError::validation("storage.output is empty"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Site root; listing page N lives at `{base_url}/page/N/`
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept header
    #[serde(default = "defaults::accept")]
    pub accept: String,

    /// Accept-Language header
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Minimum spacing between post requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Minimum spacing between listing page requests in milliseconds
    #[serde(default = "defaults::listing_delay")]
    pub listing_delay_ms: u64,

    /// Maximum concurrent post fetches
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Extra attempts after a transport failure
    #[serde(default)]
    pub max_retries: u32,

    /// Backoff step between retries in milliseconds
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn listing_delay(&self) -> Duration {
        Duration::from_millis(self.listing_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            accept: defaults::accept(),
            accept_language: defaults::accept_language(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            listing_delay_ms: defaults::listing_delay(),
            max_concurrent: defaults::max_concurrent(),
            max_retries: 0,
            retry_backoff_ms: defaults::retry_backoff(),
        }
    }
}

/// Limits for a scrape run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Hard ceiling on listing pages walked
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Maximum hikes fetched per run (0 = all)
    #[serde(default)]
    pub max_hikes: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_pages: defaults::max_pages(),
            max_hikes: 0,
        }
    }
}

/// Page extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Site name appended to every page title
    #[serde(default = "defaults::title_suffix")]
    pub title_suffix: String,

    /// URL fragments identifying the hiking map provider
    #[serde(default = "defaults::map_domains")]
    pub map_domains: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            title_suffix: defaults::title_suffix(),
            map_domains: defaults::map_domains(),
        }
    }
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store path; a `.json` extension selects the JSON snapshot store
    #[serde(default = "defaults::output")]
    pub output: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output: defaults::output(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    /// Listing pages walked when no explicit ceiling is given.
    pub const PAGE_CEILING: usize = 200;

    // Crawler defaults
    pub fn base_url() -> String {
        "https://randoromandie.com".into()
    }
    pub fn user_agent() -> String {
        "RandoScrapper/1.0 (hike browser project)".into()
    }
    pub fn accept() -> String {
        "text/html,application/xhtml+xml".into()
    }
    pub fn accept_language() -> String {
        "fr,en;q=0.9".into()
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn request_delay() -> u64 {
        800
    }
    pub fn listing_delay() -> u64 {
        500
    }
    pub fn max_concurrent() -> usize {
        1
    }
    pub fn retry_backoff() -> u64 {
        500
    }

    // Run defaults
    pub fn max_pages() -> usize {
        PAGE_CEILING
    }

    // Extract defaults
    pub fn title_suffix() -> String {
        " – Randonnées en Suisse romande".into()
    }
    pub fn map_domains() -> Vec<String> {
        vec!["schweizmobil.ch".into(), "suissemobile".into()]
    }

    // Storage defaults
    pub fn output() -> PathBuf {
        PathBuf::from("data/hikes.db")
    }
}

pub use defaults::PAGE_CEILING;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.crawler.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_delay_is_non_zero() {
        let config = Config::default();
        assert!(!config.crawler.request_delay().is_zero());
        assert_eq!(config.run.max_pages, PAGE_CEILING);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            request_delay_ms = 250
            max_concurrent = 3

            [storage]
            output = "out/hikes.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.crawler.request_delay_ms, 250);
        assert_eq!(config.crawler.max_concurrent, 3);
        assert_eq!(config.crawler.timeout_secs, 15);
        assert_eq!(config.extract.map_domains.len(), 2);
        assert_eq!(config.storage.output, PathBuf::from("out/hikes.json"));
    }
}
