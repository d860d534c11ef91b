// src/utils/http.rs

//! HTTP fetch gateway and request spacing.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// A fetched document.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

/// Capability to fetch a document by URL.
///
/// Implementations report transport failures and non-success statuses as
/// errors; callers decide whether to skip or abort.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page>;
}

/// Create a configured asynchronous HTTP client with fixed identity headers.
pub fn create_async_client(config: &CrawlerConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_str(&config.accept)
            .map_err(|e| AppError::config(format!("crawler.accept: {e}")))?,
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&config.accept_language)
            .map_err(|e| AppError::config(format!("crawler.accept_language: {e}")))?,
    );

    let client = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}

/// Fetch gateway backed by `reqwest`.
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpFetcher {
    /// Create a fetcher from crawler settings.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<Page> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::transport(url, e))?;
        Ok(Page {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Page> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    log::debug!("Retry {}/{} for {}: {}", attempt, self.max_retries, url, e);
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Enforces a minimum spacing between request starts across all workers.
#[derive(Debug)]
pub struct Throttle {
    spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            next_slot: Mutex::new(None),
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Wait for the next free slot and reserve it.
    ///
    /// The first call returns immediately.
    pub async fn wait(&self) {
        if self.spacing.is_zero() {
            return;
        }

        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        let start = match *next_slot {
            Some(slot) if slot > now => {
                tokio::time::sleep_until(slot).await;
                slot
            }
            _ => now,
        };
        *next_slot = Some(start + self.spacing);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fetch double.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Serves canned documents; unknown URLs fail as transport errors.
    #[derive(Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        /// URLs requested so far, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetch for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Page> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(body) => Ok(Page {
                    status: 200,
                    body: body.clone(),
                }),
                None => Err(AppError::transport(url, "connection refused")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StaticFetcher;
    use super::*;

    #[test]
    fn client_builds_from_default_config() {
        assert!(create_async_client(&CrawlerConfig::default()).is_ok());
    }

    #[test]
    fn client_rejects_invalid_header_value() {
        let config = CrawlerConfig {
            accept_language: "fr\nen".into(),
            ..CrawlerConfig::default()
        };
        assert!(matches!(
            create_async_client(&config),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn throttle_spaces_requests() {
        let throttle = Throttle::new(Duration::from_millis(40));
        let start = Instant::now();

        throttle.wait().await;
        throttle.wait().await;
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn throttle_spaces_concurrent_waiters() {
        let throttle = Throttle::new(Duration::from_millis(40));
        let start = Instant::now();

        futures::future::join_all((0..4).map(|_| throttle.wait())).await;
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn zero_spacing_never_waits() {
        let throttle = Throttle::new(Duration::ZERO);
        for _ in 0..100 {
            throttle.wait().await;
        }
        assert!(throttle.spacing().is_zero());
    }

    #[tokio::test]
    async fn static_fetcher_serves_and_fails() {
        let fetcher = StaticFetcher::new().with_page("https://a.test/", "<html></html>");
        assert_eq!(fetcher.fetch("https://a.test/").await.unwrap().status, 200);
        assert!(fetcher.fetch("https://b.test/").await.unwrap_err().is_transport());
        assert_eq!(fetcher.requests().len(), 2);
    }
}
