// src/services/discovery.rs

//! Link discovery service.
//!
//! Walks the paginated listing and collects canonical post URLs.

use std::collections::{BTreeSet, HashSet};

use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::utils::http::{Fetch, Throttle};
use crate::utils::url::{canonical_post_url, listing_page_url};

/// Outcome of a listing walk.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    /// Unique post URLs, sorted
    pub urls: Vec<String>,
    /// Listing pages fetched successfully
    pub pages_walked: usize,
    /// Whether the walk ended on a listing fetch failure
    pub stopped_on_error: bool,
}

/// Service walking listing pages for post links.
pub struct LinkDiscovery<'a> {
    fetcher: &'a dyn Fetch,
    throttle: &'a Throttle,
    base_url: Url,
    anchor: Selector,
}

impl<'a> LinkDiscovery<'a> {
    /// Create a discovery service rooted at `base_url`.
    pub fn new(fetcher: &'a dyn Fetch, throttle: &'a Throttle, base_url: &str) -> Result<Self> {
        let anchor =
            Selector::parse("a[href]").map_err(|e| AppError::selector("a[href]", format!("{e:?}")))?;
        Ok(Self {
            fetcher,
            throttle,
            base_url: Url::parse(base_url)?,
            anchor,
        })
    }

    /// Walk listing pages 1..=`max_pages`.
    ///
    /// Stops at the first page contributing no new post, or at the first
    /// listing fetch failure; URLs found up to that point are kept.
    pub async fn discover(&self, max_pages: usize) -> DiscoveryOutcome {
        let mut all_urls = BTreeSet::new();
        let mut outcome = DiscoveryOutcome::default();

        for page in 1..=max_pages {
            let page_url = listing_page_url(self.base_url.as_str(), page);
            self.throttle.wait().await;

            let body = match self.fetcher.fetch(&page_url).await {
                Ok(page) => page.body,
                Err(e) => {
                    log::warn!("Error fetching {}: {}", page_url, e);
                    outcome.stopped_on_error = true;
                    break;
                }
            };
            outcome.pages_walked += 1;

            let links = self.post_links(&body);
            let before = all_urls.len();
            all_urls.extend(links.iter().cloned());
            let new_count = all_urls.len() - before;

            log::info!(
                "Page {}: found {} links, {} new (total unique: {})",
                page,
                links.len(),
                new_count,
                all_urls.len()
            );

            if new_count == 0 {
                break;
            }
        }

        outcome.urls = all_urls.into_iter().collect();
        outcome
    }

    /// Post URLs linked from one listing page, in first-seen order.
    pub fn post_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        document
            .select(&self.anchor)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| canonical_post_url(&self.base_url, href))
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::utils::http::testing::StaticFetcher;

    const BASE: &str = "https://randoromandie.com";

    fn listing(paths: &[&str]) -> String {
        let anchors: String = paths
            .iter()
            .map(|p| format!(r#"<a href="{p}">post</a>"#))
            .collect();
        format!(
            r#"<html><body><a href="/category/vaud/">Vaud</a>{anchors}<a href="/page/2/">Suivant</a></body></html>"#
        )
    }

    #[test]
    fn test_post_links_dedup_within_page() {
        let fetcher = StaticFetcher::new();
        let throttle = Throttle::new(Duration::ZERO);
        let discovery = LinkDiscovery::new(&fetcher, &throttle, BASE).unwrap();

        let links = discovery.post_links(&listing(&[
            "/2026/01/10/b/",
            "https://randoromandie.com/2026/01/10/b",
            "/2026/01/09/a/#comments",
        ]));
        assert_eq!(
            links,
            vec![
                "https://randoromandie.com/2026/01/10/b",
                "https://randoromandie.com/2026/01/09/a",
            ]
        );
    }

    #[tokio::test]
    async fn test_discover_dedups_across_pages_and_sorts() {
        let fetcher = StaticFetcher::new()
            .with_page(
                "https://randoromandie.com/",
                &listing(&["/2026/02/01/zinal/", "/2026/01/15/aigle/"]),
            )
            .with_page(
                "https://randoromandie.com/page/2/",
                &listing(&["/2026/01/15/aigle/", "/2025/12/24/bulle/"]),
            )
            .with_page("https://randoromandie.com/page/3/", &listing(&[]));
        let throttle = Throttle::new(Duration::ZERO);
        let discovery = LinkDiscovery::new(&fetcher, &throttle, BASE).unwrap();

        let outcome = discovery.discover(10).await;
        assert_eq!(
            outcome.urls,
            vec![
                "https://randoromandie.com/2025/12/24/bulle",
                "https://randoromandie.com/2026/01/15/aigle",
                "https://randoromandie.com/2026/02/01/zinal",
            ]
        );
        assert_eq!(outcome.pages_walked, 3);
        assert!(!outcome.stopped_on_error);
    }

    #[tokio::test]
    async fn test_discover_stops_when_page_adds_nothing_new() {
        let fetcher = StaticFetcher::new()
            .with_page("https://randoromandie.com/", &listing(&["/2026/02/01/zinal/"]))
            .with_page(
                "https://randoromandie.com/page/2/",
                &listing(&["/2026/02/01/zinal/"]),
            )
            .with_page(
                "https://randoromandie.com/page/3/",
                &listing(&["/2026/01/01/never-reached/"]),
            );
        let throttle = Throttle::new(Duration::ZERO);
        let discovery = LinkDiscovery::new(&fetcher, &throttle, BASE).unwrap();

        let outcome = discovery.discover(10).await;
        assert_eq!(outcome.urls, vec!["https://randoromandie.com/2026/02/01/zinal"]);
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_discover_keeps_partial_results_on_transport_failure() {
        let fetcher = StaticFetcher::new()
            .with_page("https://randoromandie.com/", &listing(&["/2026/02/01/zinal/"]));
        let throttle = Throttle::new(Duration::ZERO);
        let discovery = LinkDiscovery::new(&fetcher, &throttle, BASE).unwrap();

        let outcome = discovery.discover(10).await;
        assert_eq!(outcome.urls.len(), 1);
        assert_eq!(outcome.pages_walked, 1);
        assert!(outcome.stopped_on_error);
    }

    #[tokio::test]
    async fn test_discover_respects_page_ceiling() {
        let fetcher = StaticFetcher::new()
            .with_page("https://randoromandie.com/", &listing(&["/2026/02/01/a/"]))
            .with_page("https://randoromandie.com/page/2/", &listing(&["/2026/02/02/b/"]));
        let throttle = Throttle::new(Duration::ZERO);
        let discovery = LinkDiscovery::new(&fetcher, &throttle, BASE).unwrap();

        let outcome = discovery.discover(1).await;
        assert_eq!(outcome.urls.len(), 1);
        assert_eq!(
            fetcher.requests(),
            vec!["https://randoromandie.com/".to_string()]
        );
    }
}
