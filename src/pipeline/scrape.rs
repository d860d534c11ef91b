// src/pipeline/scrape.rs

//! Hike scraping pipeline.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{Config, HikeRecord, PAGE_CEILING};
use crate::pipeline::diff::{ChangeSummary, calculate_diff};
use crate::services::{LinkDiscovery, RecordExtractor};
use crate::storage::HikeStore;
use crate::utils::http::{Fetch, Throttle};
use crate::utils::report;

/// Summary of a scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub pages_walked: usize,
    /// Unique post URLs found on listing pages
    pub discovered: usize,
    /// Posts requested after the `max_hikes` cut
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub changes: ChangeSummary,
    /// Records in the store after the upsert
    pub stored_total: usize,
}

impl ScrapeReport {
    /// Log the closing summary block.
    pub fn log_summary(&self, location: &str) {
        let elapsed = self.end_time - self.start_time;
        report::summary(
            "Scrape complete",
            &[
                ("Listing pages", self.pages_walked.to_string()),
                ("Discovered", self.discovered.to_string()),
                ("Fetched", format!("{}/{}", self.succeeded, self.attempted)),
                ("Skipped", self.failed.to_string()),
                ("Added", self.changes.added.len().to_string()),
                ("Updated", self.changes.updated.len().to_string()),
                ("Unchanged", self.changes.unchanged.len().to_string()),
                ("Stored", format!("{} in {}", self.stored_total, location)),
                ("Elapsed", format!("{}s", elapsed.num_seconds())),
            ],
        );
    }
}

/// Run the scraper: discover posts, fetch and extract them, then upsert.
///
/// Per-URL failures are skipped. A run producing no record at all fails
/// with [`AppError::EmptyRun`]; a store failure is returned as is.
pub async fn run_scraper(
    config: &Config,
    fetcher: &dyn Fetch,
    store: &dyn HikeStore,
) -> Result<ScrapeReport> {
    let start_time = Utc::now();
    report::header(&format!("Scraping {}", config.crawler.base_url));

    // Step 1: listing walk
    let max_pages = match config.run.max_pages {
        0 => PAGE_CEILING,
        n => n,
    };
    report::step(1, 4, &format!("Discovering hike links (up to {max_pages} pages)"));
    let listing_throttle = Throttle::new(config.crawler.listing_delay());
    let discovery = LinkDiscovery::new(fetcher, &listing_throttle, &config.crawler.base_url)?;
    let outcome = discovery.discover(max_pages).await;
    let discovered = outcome.urls.len();

    let mut urls = outcome.urls;
    if config.run.max_hikes > 0 && urls.len() > config.run.max_hikes {
        report::sub_item(&format!(
            "Limiting run to {} of {} hikes",
            config.run.max_hikes,
            urls.len()
        ));
        urls.truncate(config.run.max_hikes);
    }

    // Step 2: posts
    report::step(2, 4, &format!("Fetching {} hike pages", urls.len()));
    let (mut hikes, failed) = fetch_hikes(config, fetcher, &urls).await?;
    hikes.sort_by(|a, b| a.url.cmp(&b.url));

    if hikes.is_empty() {
        log::error!("No hike could be scraped ({} URLs attempted)", urls.len());
        return Err(AppError::EmptyRun);
    }

    // Step 3: change summary
    report::step(3, 4, "Comparing with stored hikes");
    let previous = store.read_all().await?;
    let changes = calculate_diff(&previous, &hikes);
    report::sub_item(&format!(
        "{} added, {} updated, {} unchanged",
        changes.added.len(),
        changes.updated.len(),
        changes.unchanged.len()
    ));

    // Step 4: store
    report::step(4, 4, &format!("Saving to {}", store.location()));
    let succeeded = store.upsert_many(&hikes).await?;
    let stored_total = store.count().await?;

    let report = ScrapeReport {
        start_time,
        end_time: Utc::now(),
        pages_walked: outcome.pages_walked,
        discovered,
        attempted: urls.len(),
        succeeded,
        failed,
        changes,
        stored_total,
    };
    report.log_summary(&store.location());
    Ok(report)
}

/// Fetch and extract every URL through a bounded worker pool.
///
/// Returns extracted records in completion order and the failure count.
async fn fetch_hikes(
    config: &Config,
    fetcher: &dyn Fetch,
    urls: &[String],
) -> Result<(Vec<HikeRecord>, usize)> {
    let extractor = RecordExtractor::new(&config.extract)?;
    let throttle = Throttle::new(config.crawler.request_delay());
    let concurrency = config.crawler.max_concurrent.max(1);
    let total = urls.len();

    let mut results = stream::iter(urls)
        .map(|url| {
            let (extractor, throttle) = (&extractor, &throttle);
            async move {
                throttle.wait().await;
                let result = fetcher
                    .fetch(url)
                    .await
                    .map(|page| extractor.extract(url, &page.body));
                (url, result)
            }
        })
        .buffer_unordered(concurrency);

    let mut hikes = Vec::with_capacity(total);
    let mut failed = 0;
    while let Some((url, result)) = results.next().await {
        match result {
            Ok(hike) => {
                hikes.push(hike);
                log::info!("[{}/{}] {}", hikes.len() + failed, total, url);
            }
            Err(error) if error.is_transport() => {
                failed += 1;
                log::warn!("Skipping {}: {}", url, error);
            }
            Err(error) => {
                failed += 1;
                log::error!("Skipping {} after unexpected error: {}", url, error);
            }
        }
    }

    Ok((hikes, failed))
}
