// src/models/mod.rs

//! Domain models for the scraper application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod catalog;
mod config;
mod hike;

// Re-export all public types
pub use catalog::{
    CANTONS, DeniveleRange, Difficulte, DureeRange, ENVIRONMENT_TAGS, ENVIRONNEMENTS, KmRange,
    SEASONS, Season, TypeParcours, WINTER_TAG, YEAR_ROUND,
};
pub use config::{
    Config, CrawlerConfig, ExtractConfig, PAGE_CEILING, RunConfig, StorageConfig,
};
pub use hike::{HikeRecord, INFO_TABLE_KEYS, RawTable};
