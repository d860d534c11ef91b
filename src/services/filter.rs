// src/services/filter.rs

//! Filter engine.
//!
//! Dimensions combine with AND. Within a dimension a hike matches any
//! selected value, except for environments (every selected tag required)
//! and seasons (see [`season_matches`]). An empty selection leaves its
//! dimension unconstrained.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::models::{
    CANTONS, DeniveleRange, Difficulte, DureeRange, ENVIRONNEMENTS, HikeRecord, KmRange, SEASONS,
    TypeParcours, YEAR_ROUND,
};
use crate::services::normalize::{is_full_year, is_literal_year_round, parse_seasons};

/// A filterable attribute of a hike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Canton,
    TypeParcours,
    Km,
    Duree,
    Environnement,
    Difficulte,
    Denivele,
    Saison,
}

impl Dimension {
    /// Every dimension, in display order.
    pub const ALL: [Dimension; 8] = [
        Dimension::Canton,
        Dimension::TypeParcours,
        Dimension::Km,
        Dimension::Duree,
        Dimension::Environnement,
        Dimension::Difficulte,
        Dimension::Denivele,
        Dimension::Saison,
    ];

    /// Display name.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Canton => "Canton",
            Dimension::TypeParcours => "Type de parcours",
            Dimension::Km => "Kilomètres",
            Dimension::Duree => "Durée",
            Dimension::Environnement => "Environnement",
            Dimension::Difficulte => "Difficulté",
            Dimension::Denivele => "Dénivelé positif",
            Dimension::Saison => "Saison",
        }
    }

    /// Short machine name.
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Canton => "canton",
            Dimension::TypeParcours => "type",
            Dimension::Km => "km",
            Dimension::Duree => "duree",
            Dimension::Environnement => "env",
            Dimension::Difficulte => "difficulte",
            Dimension::Denivele => "denivele",
            Dimension::Saison => "saison",
        }
    }

    /// Selectable values, in display order.
    pub fn options(self) -> &'static [&'static str] {
        match self {
            Dimension::Canton => CANTONS,
            Dimension::TypeParcours => TypeParcours::LABELS,
            Dimension::Km => KmRange::LABELS,
            Dimension::Duree => DureeRange::LABELS,
            Dimension::Environnement => ENVIRONNEMENTS,
            Dimension::Difficulte => Difficulte::LABELS,
            Dimension::Denivele => DeniveleRange::LABELS,
            Dimension::Saison => SEASONS,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Dimension {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.key().eq_ignore_ascii_case(s) || d.label().to_lowercase() == s.to_lowercase())
            .ok_or_else(|| AppError::validation(format!("unknown filter dimension '{s}'")))
    }
}

/// Selected values per dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selections {
    by_dimension: BTreeMap<Dimension, BTreeSet<String>>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Selections::select`].
    pub fn with<I, S>(mut self, dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select(dimension, values);
        self
    }

    /// Add values to a dimension. Blank values are ignored.
    pub fn select<I, S>(&mut self, dimension: Dimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if !values.is_empty() {
            self.by_dimension.entry(dimension).or_default().extend(values);
        }
    }

    /// Selected values of a dimension, if it is constrained.
    pub fn get(&self, dimension: Dimension) -> Option<&BTreeSet<String>> {
        self.by_dimension.get(&dimension)
    }

    /// Whether no dimension is constrained.
    pub fn is_empty(&self) -> bool {
        self.by_dimension.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &BTreeSet<String>)> {
        self.by_dimension.iter().map(|(d, v)| (*d, v))
    }
}

/// Matching hikes plus data-quality signals gathered while filtering.
#[derive(Debug)]
pub struct FilterReport<'a> {
    pub hikes: Vec<&'a HikeRecord>,
    /// Hikes whose literal year-round text and derived season set disagreed
    pub season_divergences: usize,
}

/// Result of matching one hike against a season selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonMatch {
    pub matched: bool,
    /// Literal year-round text and four-season derivation disagree
    pub diverged: bool,
}

/// Hikes matching every constrained dimension.
pub fn filter<'a>(records: &'a [HikeRecord], selections: &Selections) -> Vec<&'a HikeRecord> {
    filter_with_report(records, selections).hikes
}

/// Like [`filter`], also counting season-path divergences.
pub fn filter_with_report<'a>(records: &'a [HikeRecord], selections: &Selections) -> FilterReport<'a> {
    let mut season_divergences = 0;
    let hikes = records
        .iter()
        .filter(|hike| {
            selections.iter().all(|(dimension, selected)| match dimension {
                Dimension::Environnement => environment_matches(hike, selected),
                Dimension::Saison => {
                    let result = season_matches(hike.saison.as_deref(), selected);
                    if result.diverged {
                        season_divergences += 1;
                        log::debug!(
                            "Season text of {} ({:?}) diverges between literal and derived year-round checks",
                            hike.url,
                            hike.saison
                        );
                    }
                    result.matched
                }
                _ => dimension_value(hike, dimension)
                    .is_some_and(|value| selected.contains(value.trim())),
            })
        })
        .collect();

    FilterReport {
        hikes,
        season_divergences,
    }
}

/// Every selected tag must be among the hike's tags.
pub fn environment_matches(hike: &HikeRecord, selected: &BTreeSet<String>) -> bool {
    let tags = hike.environment_set();
    selected.iter().all(|tag| tags.contains(tag.as_str()))
}

/// Season matching.
///
/// A hike matches when
/// (a) "Toute l'année" is selected and its raw text literally says so, or
/// (b) "Toute l'année" is selected and its derived season set is complete, or
/// (c) its derived season set meets the other selected seasons.
pub fn season_matches(raw: Option<&str>, selected: &BTreeSet<String>) -> SeasonMatch {
    let raw = raw.unwrap_or("");
    let wants_year_round = selected.contains(YEAR_ROUND);
    let seasons = parse_seasons(raw);

    let literal = is_literal_year_round(raw);
    let derived_full = is_full_year(&seasons);

    let by_literal = wants_year_round && literal;
    let by_derived = wants_year_round && derived_full;
    let by_season = seasons
        .iter()
        .any(|s| s.as_str() != YEAR_ROUND && selected.contains(s.as_str()));

    SeasonMatch {
        matched: by_literal || by_derived || by_season,
        diverged: wants_year_round && literal != derived_full,
    }
}

/// Labels of every dimension, for building selection widgets.
pub fn filter_options() -> Vec<(Dimension, &'static [&'static str])> {
    Dimension::ALL.into_iter().map(|d| (d, d.options())).collect()
}

fn dimension_value(hike: &HikeRecord, dimension: Dimension) -> Option<&str> {
    match dimension {
        Dimension::Canton => hike.canton.as_deref(),
        Dimension::TypeParcours => hike.type_parcours.map(|v| v.as_str()),
        Dimension::Km => hike.km_range.map(|v| v.as_str()),
        Dimension::Duree => hike.duree_range.map(|v| v.as_str()),
        Dimension::Environnement => hike.environnement.as_deref(),
        Dimension::Difficulte => hike.difficulte.map(|v| v.as_str()),
        Dimension::Denivele => hike.denivele_range.map(|v| v.as_str()),
        Dimension::Saison => hike.saison.as_deref(),
    }
}
