// src/services/normalize.rs

//! Field normalization.
//!
//! Pure, total functions turning raw French measurement strings into bucket
//! labels. None of them fail: unparsable input maps to `None`.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{DeniveleRange, Difficulte, DureeRange, KmRange, Season};
use crate::utils::normalize_apostrophes;

static DISTANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*km").expect("valid distance regex"));

static ELEVATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d\s]*)m").expect("valid elevation regex"));

static HOURS_MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*h\s*(\d{1,2})?").expect("valid duration regex"));

static BARE_HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)").expect("valid hours regex"));

/// Literal marker of year-round availability, after case and apostrophe folding.
const YEAR_ROUND_MARKER: &str = "toute l'année";

/// First `<number> km` in a distance cell, accepting `.` or `,` as decimal separator.
pub fn parse_distance_km(text: &str) -> Option<f64> {
    let caps = DISTANCE.captures(text)?;
    caps[1].replace(',', ".").parse().ok()
}

/// First `<integer> m` in an elevation cell; spaces used as thousands
/// separators (regular, non-breaking, thin) are ignored.
pub fn parse_meters(text: &str) -> Option<i64> {
    let caps = ELEVATION.captures(text)?;
    let digits: String = caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Walking time in hours from `3h06`, `2h`, `2 h 30` or a bare decimal (`4.5`, `4,5`).
pub fn parse_duration_hours(text: &str) -> Option<f64> {
    let text = text.trim().to_lowercase().replace(',', ".");
    if let Some(caps) = HOURS_MINUTES.captures(&text) {
        let hours: f64 = caps[1].parse().ok()?;
        let minutes: f64 = caps.get(2).map_or(Ok(0.0), |m| m.as_str().parse()).ok()?;
        return Some(hours + minutes / 60.0);
    }
    let caps = BARE_HOURS.captures(&text)?;
    caps[1].parse().ok()
}

/// Distance bucket. Upper bounds are inclusive except for the open top bucket.
pub fn km_range(km: f64) -> Option<KmRange> {
    if !km.is_finite() {
        return None;
    }
    Some(if km < 5.0 {
        KmRange::Under5
    } else if km <= 10.0 {
        KmRange::From5To10
    } else if km <= 15.0 {
        KmRange::From10To15
    } else if km <= 20.0 {
        KmRange::From15To20
    } else {
        KmRange::Over20
    })
}

/// Walking time bucket.
pub fn duree_range(hours: f64) -> Option<DureeRange> {
    if !hours.is_finite() {
        return None;
    }
    Some(if hours < 3.0 {
        DureeRange::Under3h
    } else if hours <= 5.0 {
        DureeRange::From3To5h
    } else {
        DureeRange::Over5h
    })
}

/// Elevation gain bucket.
pub fn denivele_range(meters: i64) -> DeniveleRange {
    if meters < 500 {
        DeniveleRange::Under500
    } else if meters <= 1000 {
        DeniveleRange::From500To1000
    } else {
        DeniveleRange::Over1000
    }
}

/// Grade from any text mentioning `T1`, `T2` or `T3` (lowest grade wins).
pub fn difficulte(text: &str) -> Option<Difficulte> {
    let text = text.trim();
    [
        ("T1", Difficulte::T1),
        ("T2", Difficulte::T2),
        ("T3", Difficulte::T3),
    ]
    .into_iter()
    .find_map(|(marker, grade)| text.contains(marker).then_some(grade))
}

/// Whether raw season text literally says "toute l'année".
pub fn is_literal_year_round(text: &str) -> bool {
    normalize_apostrophes(text.trim())
        .to_lowercase()
        .contains(YEAR_ROUND_MARKER)
}

/// Canonical season set of a raw season cell.
///
/// "Toute l'année" anywhere yields all four seasons. Otherwise each
/// comma-separated segment contributes at most one season.
pub fn parse_seasons(text: &str) -> BTreeSet<Season> {
    if text.trim().is_empty() {
        return BTreeSet::new();
    }
    if is_literal_year_round(text) {
        return Season::ALL.iter().copied().collect();
    }

    text.split(',')
        .filter_map(|segment| {
            let segment = segment.trim().to_lowercase();
            if segment.is_empty() {
                None
            } else if segment.contains("printemps") {
                Some(Season::Printemps)
            } else if segment.contains("été") || segment.contains("ete") {
                Some(Season::Ete)
            } else if segment.contains("automne") {
                Some(Season::Automne)
            } else if segment.contains("hiver") {
                Some(Season::Hiver)
            } else {
                None
            }
        })
        .collect()
}

/// Whether a season set covers the whole year.
pub fn is_full_year(seasons: &BTreeSet<Season>) -> bool {
    Season::ALL.iter().all(|s| seasons.contains(s))
}
