// src/models/hike.rs

//! Hike record and its raw key/value table.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::models::{DeniveleRange, Difficulte, DureeRange, KmRange, TypeParcours};
use crate::utils::normalize_apostrophes;

/// Order in which well-known raw keys are displayed.
pub const INFO_TABLE_KEYS: &[&str] = &[
    "Canton",
    "Environnement",
    "Temps de marche",
    "Distance",
    "Montée",
    "Descente",
    "Saison",
    "Difficulté",
    "Lieu de départ",
    "Accès transports publics",
    "Lieu d'arrivée",
    "Retour transports publics",
];

/// Ordered key/value pairs as they appeared on the source page.
///
/// Keys keep their first-seen position; inserting an existing key replaces
/// its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    entries: Vec<(String, String)>,
}

impl RawTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value stored under an exact (case-sensitive) key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First present value among candidate keys, tried in order.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode a JSON object, yielding an empty table on any failure.
    pub fn from_json_lossy(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_else(|e| {
            log::warn!("Discarding undecodable raw table: {}", e);
            Self::default()
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

impl Serialize for RawTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawTableVisitor;

        impl<'de> Visitor<'de> for RawTableVisitor {
            type Value = RawTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of string keys to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RawTable, A::Error> {
                let mut table = RawTable::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    table.insert(k, v);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(RawTableVisitor)
    }
}

/// A single hike, keyed by its source URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HikeRecord {
    /// Canonical post URL (unique key)
    pub url: String,

    /// Post title without the site suffix
    #[serde(default)]
    pub title: String,

    // --- Filter fields ---
    #[serde(default)]
    pub canton: Option<String>,
    #[serde(default)]
    pub type_parcours: Option<TypeParcours>,
    #[serde(default)]
    pub km_range: Option<KmRange>,
    #[serde(default)]
    pub duree_range: Option<DureeRange>,
    /// Primary environment, the first entry of `environnements`
    #[serde(default)]
    pub environnement: Option<String>,
    /// Every environment tag, including the derived winter tag
    #[serde(default)]
    pub environnements: Vec<String>,
    #[serde(default)]
    pub difficulte: Option<Difficulte>,
    #[serde(default)]
    pub denivele_range: Option<DeniveleRange>,

    // --- Raw measurements for display ---
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub temps_marche: Option<String>,
    #[serde(default)]
    pub montee_m: Option<i64>,
    #[serde(default)]
    pub descente_m: Option<i64>,
    #[serde(default)]
    pub saison: Option<String>,
    #[serde(default)]
    pub lieu_depart: Option<String>,
    #[serde(default)]
    pub lieu_arrivee: Option<String>,
    #[serde(default)]
    pub acces_tp: Option<String>,
    #[serde(default)]
    pub retour_tp: Option<String>,
    #[serde(default)]
    pub suisse_mobile_url: Option<String>,

    /// Every key/value pair found on the page
    #[serde(default)]
    pub raw_table: RawTable,
}

impl HikeRecord {
    /// Environment tags of this hike, merging the primary and multi-valued fields.
    pub fn environment_set(&self) -> BTreeSet<&str> {
        self.environnement
            .iter()
            .chain(self.environnements.iter())
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .collect()
    }

    /// SHA-256 of the serialized record, stable across identical extractions.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    /// Rows for a detail view.
    ///
    /// Prefers the raw table (well-known keys first, then the rest in page
    /// order); falls back to the typed fields when no raw table was kept.
    pub fn info_rows(&self) -> Vec<(String, String)> {
        if !self.raw_table.is_empty() {
            let is_known = |key: &str| INFO_TABLE_KEYS.contains(&normalize_apostrophes(key).as_str());
            let mut rows: Vec<(String, String)> = INFO_TABLE_KEYS
                .iter()
                .filter_map(|known| {
                    self.raw_table
                        .iter()
                        .find(|(k, _)| normalize_apostrophes(k) == *known)
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                })
                .collect();
            rows.extend(
                self.raw_table
                    .iter()
                    .filter(|(k, _)| !is_known(*k))
                    .map(|(k, v)| (k.to_string(), v.to_string())),
            );
            return rows;
        }

        let mut rows = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                rows.push((key.to_string(), value));
            }
        };
        push("Canton", self.canton.clone());
        push("Environnement", self.environnement.clone());
        push("Temps de marche", self.temps_marche.clone());
        push("Distance", self.distance_km.map(|d| format!("{d} km")));
        push("Montée", self.montee_m.map(|m| format!("{m} m")));
        push("Descente", self.descente_m.map(|m| format!("{m} m")));
        push("Saison", self.saison.clone());
        push("Difficulté", self.difficulte.map(|d| d.to_string()));
        push("Lieu de départ", self.lieu_depart.clone());
        push("Accès transports publics", self.acces_tp.clone());
        push("Lieu d'arrivée", self.lieu_arrivee.clone());
        push("Retour transports publics", self.retour_tp.clone());
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_table_keeps_first_position_on_overwrite() {
        let mut table = RawTable::new();
        table.insert("Canton", "Vaud");
        table.insert("Distance", "8 km");
        table.insert("Canton", "Valais romand");

        let keys: Vec<&str> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Canton", "Distance"]);
        assert_eq!(table.get("Canton"), Some("Valais romand"));
        assert_eq!(table.get("canton"), None);
    }

    #[test]
    fn raw_table_json_preserves_page_order() {
        let table: RawTable = [("Zeta", "1"), ("Alpha", "2"), ("Mu", "3")]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"Zeta":"1","Alpha":"2","Mu":"3"}"#);

        let decoded: RawTable = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn raw_table_lossy_decode_falls_back_to_empty() {
        assert!(RawTable::from_json_lossy("{not json").is_empty());
        assert!(RawTable::from_json_lossy("[1, 2]").is_empty());
        assert_eq!(RawTable::from_json_lossy(r#"{"a":"b"}"#).get("a"), Some("b"));
    }

    #[test]
    fn first_of_respects_priority() {
        let table: RawTable = [("Canton / Région", "Jura"), ("Canton", "Vaud")]
            .into_iter()
            .collect();
        assert_eq!(table.first_of(&["Canton", "Canton / Région"]), Some("Vaud"));
        assert_eq!(table.first_of(&["Région"]), None);
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let hike = HikeRecord {
            url: "https://example.com/2024/01/01/a".into(),
            title: "A".into(),
            ..HikeRecord::default()
        };
        assert_eq!(hike.fingerprint(), hike.clone().fingerprint());

        let mut changed = hike.clone();
        changed.title = "B".into();
        assert_ne!(hike.fingerprint(), changed.fingerprint());
    }

    #[test]
    fn info_rows_prefer_raw_table_order() {
        let hike = HikeRecord {
            raw_table: [
                ("Remarque", "Prendre de l'eau"),
                ("Distance", "12 km"),
                ("Canton", "Vaud"),
            ]
            .into_iter()
            .collect(),
            ..HikeRecord::default()
        };
        let keys: Vec<String> = hike.info_rows().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Canton", "Distance", "Remarque"]);
    }

    #[test]
    fn info_rows_fold_typographic_apostrophes() {
        let hike = HikeRecord {
            raw_table: [
                ("Remarque", "Sentier balisé"),
                ("Lieu d’arrivée", "Champéry"),
                ("Lieu de départ", "Morgins"),
            ]
            .into_iter()
            .collect(),
            ..HikeRecord::default()
        };
        let keys: Vec<String> = hike.info_rows().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Lieu de départ", "Lieu d’arrivée", "Remarque"]);
    }

    #[test]
    fn info_rows_fall_back_to_typed_fields() {
        let hike = HikeRecord {
            canton: Some("Jura".into()),
            distance_km: Some(7.5),
            montee_m: Some(320),
            ..HikeRecord::default()
        };
        assert_eq!(
            hike.info_rows(),
            vec![
                ("Canton".to_string(), "Jura".to_string()),
                ("Distance".to_string(), "7.5 km".to_string()),
                ("Montée".to_string(), "320 m".to_string()),
            ]
        );
    }

    #[test]
    fn environment_set_merges_fields() {
        let hike = HikeRecord {
            environnement: Some("Montagne".into()),
            environnements: vec!["Montagne".into(), "Gorges".into()],
            ..HikeRecord::default()
        };
        let set = hike.environment_set();
        assert_eq!(set.len(), 2);
        assert!(set.contains("Gorges"));
    }
}
