//! Pipeline entry points for scraper operations.
//!
//! - `run_scraper`: Discover, fetch and store hikes from the site

pub mod diff;
pub mod scrape;

pub use diff::{ChangeSummary, DiffCalculator, calculate_diff};
pub use scrape::{ScrapeReport, run_scraper};
