//! Service layer for the scraper application.
//!
//! This module contains the business logic for:
//! - Listing walks (`LinkDiscovery`)
//! - Post parsing (`RecordExtractor`)
//! - Field bucketing (`normalize`)
//! - Record filtering (`filter`)

pub mod discovery;
pub mod extract;
pub mod filter;
pub mod normalize;

pub use discovery::{DiscoveryOutcome, LinkDiscovery};
pub use extract::RecordExtractor;
pub use filter::{Dimension, FilterReport, Selections, filter, filter_options, filter_with_report};
