// src/services/extract.rs

//! Record extractor service.
//!
//! Parses one hike post into a `HikeRecord`. Extraction never fails on
//! malformed markup: anything missing simply leaves the field empty.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{
    ENVIRONMENT_TAGS, ExtractConfig, HikeRecord, RawTable, TypeParcours, WINTER_TAG,
};
use crate::services::normalize;
use crate::utils::normalize_whitespace;

/// Typed attribute read from the raw table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Canton,
    Environnement,
    Distance,
    TempsMarche,
    Montee,
    Descente,
    Saison,
    Difficulte,
    LieuDepart,
    LieuArrivee,
    AccesTp,
    RetourTp,
}

impl Field {
    /// Raw keys accepted for this field, in priority order.
    pub const fn keys(self) -> &'static [&'static str] {
        match self {
            Field::Canton => &["Canton", "Canton / Région"],
            Field::Environnement => &["Environnement"],
            Field::Distance => &["Distance"],
            Field::TempsMarche => &["Temps de marche", "Durée"],
            Field::Montee => &["Montée"],
            Field::Descente => &["Descente"],
            Field::Saison => &["Saison"],
            Field::Difficulte => &["Difficulté"],
            Field::LieuDepart => &["Lieu de départ"],
            Field::LieuArrivee => &["Lieu d'arrivée", "Lieu d’arrivée"],
            Field::AccesTp => &["Accès transports publics"],
            Field::RetourTp => &["Retour transports publics"],
        }
    }

    /// Value of this field in a raw table.
    pub fn lookup(self, table: &RawTable) -> Option<&str> {
        table.first_of(self.keys())
    }
}

/// Pre-parsed selectors used on every page.
struct PageSelectors {
    heading: Selector,
    title: Selector,
    table: Selector,
    row: Selector,
    anchor: Selector,
}

impl PageSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            heading: parse_selector("h1")?,
            title: parse_selector("title")?,
            table: parse_selector("table")?,
            row: parse_selector("tr")?,
            anchor: parse_selector("a[href]")?,
        })
    }
}

/// Service turning hike post documents into records.
pub struct RecordExtractor {
    selectors: PageSelectors,
    title_suffix: String,
    map_domains: Vec<String>,
}

impl RecordExtractor {
    /// Create an extractor with the given settings.
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        Ok(Self {
            selectors: PageSelectors::new()?,
            title_suffix: config.title_suffix.clone(),
            map_domains: config
                .map_domains
                .iter()
                .map(|d| d.trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        })
    }

    /// Extract and normalize a record from a post document.
    pub fn extract(&self, url: &str, html: &str) -> HikeRecord {
        let document = Html::parse_document(html);
        let table = self.extract_table(&document);

        let canton = owned(Field::Canton.lookup(&table));
        let env_raw = Field::Environnement.lookup(&table).unwrap_or("");
        let temps_marche = owned(Field::TempsMarche.lookup(&table));
        let saison = owned(Field::Saison.lookup(&table));
        let lieu_depart = owned(Field::LieuDepart.lookup(&table));
        let lieu_arrivee = owned(Field::LieuArrivee.lookup(&table));

        let distance_km = Field::Distance
            .lookup(&table)
            .and_then(normalize::parse_distance_km);
        let montee_m = Field::Montee.lookup(&table).and_then(normalize::parse_meters);
        let descente_m = Field::Descente.lookup(&table).and_then(normalize::parse_meters);

        let environnements = environment_tags(env_raw, saison.as_deref());
        let environnement = environnements.first().cloned();

        HikeRecord {
            url: url.to_string(),
            title: self.extract_title(&document),
            canton,
            type_parcours: type_parcours(lieu_depart.as_deref(), lieu_arrivee.as_deref()),
            km_range: distance_km.and_then(normalize::km_range),
            duree_range: temps_marche
                .as_deref()
                .and_then(normalize::parse_duration_hours)
                .and_then(normalize::duree_range),
            environnement,
            environnements,
            difficulte: Field::Difficulte
                .lookup(&table)
                .and_then(normalize::difficulte),
            denivele_range: montee_m.map(normalize::denivele_range),
            distance_km,
            temps_marche,
            montee_m,
            descente_m,
            saison,
            lieu_depart,
            lieu_arrivee,
            acces_tp: owned(Field::AccesTp.lookup(&table)),
            retour_tp: owned(Field::RetourTp.lookup(&table)),
            suisse_mobile_url: self.extract_map_link(&document),
            raw_table: table,
        }
    }

    /// Primary heading, else document title, without the trailing site name.
    fn extract_title(&self, document: &Html) -> String {
        let title = [&self.selectors.heading, &self.selectors.title]
            .into_iter()
            .filter_map(|sel| document.select(sel).next())
            .map(element_text)
            .find(|t| !t.is_empty())
            .unwrap_or_default();

        match title.strip_suffix(self.title_suffix.as_str()) {
            Some(stripped) if !self.title_suffix.is_empty() => stripped.trim().to_string(),
            _ => title,
        }
    }

    /// Every two-cell row of every table, first cell as key.
    fn extract_table(&self, document: &Html) -> RawTable {
        let mut table = RawTable::new();
        for tab in document.select(&self.selectors.table) {
            for row in tab.select(&self.selectors.row) {
                let cells: Vec<ElementRef> = row
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|cell| matches!(cell.value().name(), "th" | "td"))
                    .collect();
                if cells.len() < 2 {
                    continue;
                }

                let key = element_text(cells[0]);
                let value = element_text(cells[1]);
                if !key.is_empty() && !value.is_empty() {
                    table.insert(key, value);
                }
            }
        }
        table
    }

    /// First link pointing at the hiking map provider.
    fn extract_map_link(&self, document: &Html) -> Option<String> {
        document
            .select(&self.selectors.anchor)
            .filter_map(|a| a.value().attr("href"))
            .map(str::trim)
            .find(|href| {
                let lower = href.to_lowercase();
                self.map_domains.iter().any(|d| lower.contains(d.as_str()))
            })
            .map(str::to_string)
    }
}

/// Environment tags in catalog order, plus the winter tag for winter hikes.
///
/// When no known tag matches, the raw text itself becomes the only tag.
pub fn environment_tags(env_raw: &str, saison: Option<&str>) -> Vec<String> {
    let env_lower = env_raw.to_lowercase();
    let mut tags: Vec<String> = ENVIRONMENT_TAGS
        .iter()
        .filter(|tag| env_lower.contains(&tag.to_lowercase()))
        .map(|tag| tag.to_string())
        .collect();

    let winter = saison.is_some_and(|s| s.to_lowercase().contains("hiver"));
    if winter && !tags.iter().any(|t| t == WINTER_TAG) {
        tags.push(WINTER_TAG.to_string());
    }

    let env_raw = env_raw.trim();
    if tags.is_empty() && !env_raw.is_empty() {
        tags.push(env_raw.to_string());
    }
    tags
}

/// Loop when departure equals arrival, linear otherwise; unknown without both.
pub fn type_parcours(depart: Option<&str>, arrivee: Option<&str>) -> Option<TypeParcours> {
    let depart = depart.map(str::trim).filter(|s| !s.is_empty())?;
    let arrivee = arrivee.map(str::trim).filter(|s| !s.is_empty())?;
    Some(if depart == arrivee {
        TypeParcours::Boucle
    } else {
        TypeParcours::Lineaire
    })
}

fn element_text(element: ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
