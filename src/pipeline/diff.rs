//! Change summary between stored hikes and a fresh scrape.
//!
//! Records are compared by URL and content fingerprint. Stored hikes missing
//! from the fresh set are left alone by upserts, so they are not reported.

use std::collections::HashMap;

use crate::models::HikeRecord;

/// URLs grouped by what an upsert of the fresh set will do to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
}

impl ChangeSummary {
    /// Check if the upsert changes anything.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty()
    }

    /// Number of inserted or replaced records.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.updated.len()
    }
}

/// Calculator comparing stored and fresh hikes.
#[derive(Debug, Clone, Default)]
pub struct DiffCalculator;

impl DiffCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Summary in the order of `current`.
    pub fn calculate(&self, previous: &[HikeRecord], current: &[HikeRecord]) -> ChangeSummary {
        let prev_map: HashMap<&str, String> = previous
            .iter()
            .map(|h| (h.url.as_str(), h.fingerprint()))
            .collect();

        let mut summary = ChangeSummary::default();
        for hike in current {
            match prev_map.get(hike.url.as_str()) {
                None => summary.added.push(hike.url.clone()),
                Some(fingerprint) if *fingerprint != hike.fingerprint() => {
                    summary.updated.push(hike.url.clone())
                }
                Some(_) => summary.unchanged.push(hike.url.clone()),
            }
        }
        summary
    }
}

/// Convenience function to calculate a change summary.
pub fn calculate_diff(previous: &[HikeRecord], current: &[HikeRecord]) -> ChangeSummary {
    DiffCalculator::new().calculate(previous, current)
}
