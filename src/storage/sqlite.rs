//! SQLite storage implementation.
//!
//! One `hikes` row per record. Categorical values are stored as their
//! display labels, `environnements` as a JSON array and `raw_table` as a
//! JSON object in page order.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, Row, params};

use crate::error::{AppError, Result};
use crate::models::{
    DeniveleRange, Difficulte, DureeRange, HikeRecord, KmRange, RawTable, TypeParcours,
};
use crate::storage::HikeStore;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS hikes (
    url TEXT PRIMARY KEY,
    title TEXT NOT NULL DEFAULT '',
    canton TEXT,
    type_parcours TEXT,
    km_range TEXT,
    duree_range TEXT,
    environnement TEXT,
    environnements TEXT NOT NULL DEFAULT '[]',
    difficulte TEXT,
    denivele_range TEXT,
    distance_km REAL,
    temps_marche TEXT,
    montee_m INTEGER,
    descente_m INTEGER,
    saison TEXT,
    lieu_depart TEXT,
    lieu_arrivee TEXT,
    acces_tp TEXT,
    retour_tp TEXT,
    suisse_mobile_url TEXT
);
CREATE INDEX IF NOT EXISTS idx_hikes_canton ON hikes(canton);
CREATE INDEX IF NOT EXISTS idx_hikes_type_parcours ON hikes(type_parcours);
CREATE INDEX IF NOT EXISTS idx_hikes_km_range ON hikes(km_range);
CREATE INDEX IF NOT EXISTS idx_hikes_duree_range ON hikes(duree_range);
CREATE INDEX IF NOT EXISTS idx_hikes_difficulte ON hikes(difficulte);
CREATE INDEX IF NOT EXISTS idx_hikes_denivele_range ON hikes(denivele_range);
"#;

const COLUMNS: &str = "url, title, canton, type_parcours, km_range, duree_range, \
    environnement, environnements, difficulte, denivele_range, distance_km, temps_marche, \
    montee_m, descente_m, saison, lieu_depart, lieu_arrivee, acces_tp, retour_tp, \
    suisse_mobile_url, raw_table";

/// SQLite-backed hike store.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a database file and bring its schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA)?;
        Self::migrate_schema(conn)
    }

    /// Add columns missing from databases created by older versions.
    fn migrate_schema(conn: &Connection) -> Result<()> {
        let has_raw_table = conn.prepare("SELECT raw_table FROM hikes LIMIT 0").is_ok();
        if !has_raw_table {
            conn.execute_batch("ALTER TABLE hikes ADD COLUMN raw_table TEXT;")?;
            log::info!("Migrated hikes table: added raw_table column");
        }
        Ok(())
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| AppError::store("SQLite connection lock poisoned"))?;
            f(&mut guard)
        })
        .await
        .map_err(AppError::store)?
    }

    fn insert_all(conn: &mut Connection, hikes: &[HikeRecord]) -> Result<usize> {
        let tx = conn.transaction()?;
        {
            let sql = format!(
                "INSERT OR REPLACE INTO hikes ({COLUMNS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)"
            );
            let mut stmt = tx.prepare(&sql)?;
            for hike in hikes {
                let environnements = serde_json::to_string(&hike.environnements)?;
                let raw_table = serde_json::to_string(&hike.raw_table)?;
                stmt.execute(params![
                    hike.url,
                    hike.title,
                    hike.canton,
                    hike.type_parcours.map(|v| v.as_str()),
                    hike.km_range.map(|v| v.as_str()),
                    hike.duree_range.map(|v| v.as_str()),
                    hike.environnement,
                    environnements,
                    hike.difficulte.map(|v| v.as_str()),
                    hike.denivele_range.map(|v| v.as_str()),
                    hike.distance_km,
                    hike.temps_marche,
                    hike.montee_m,
                    hike.descente_m,
                    hike.saison,
                    hike.lieu_depart,
                    hike.lieu_arrivee,
                    hike.acces_tp,
                    hike.retour_tp,
                    hike.suisse_mobile_url,
                    raw_table,
                ])?;
            }
        }
        tx.commit()?;
        Ok(hikes.len())
    }

    fn row_to_hike(row: &Row<'_>) -> rusqlite::Result<HikeRecord> {
        let label = |idx: usize| -> rusqlite::Result<Option<String>> { row.get(idx) };
        let environnements: Option<String> = row.get(7)?;
        let raw_table: Option<String> = row.get(20)?;

        Ok(HikeRecord {
            url: row.get(0)?,
            title: row.get(1)?,
            canton: row.get(2)?,
            type_parcours: label(3)?.as_deref().and_then(TypeParcours::from_label),
            km_range: label(4)?.as_deref().and_then(KmRange::from_label),
            duree_range: label(5)?.as_deref().and_then(DureeRange::from_label),
            environnement: row.get(6)?,
            environnements: environnements.as_deref().map(decode_tags).unwrap_or_default(),
            difficulte: label(8)?.as_deref().and_then(Difficulte::from_label),
            denivele_range: label(9)?.as_deref().and_then(DeniveleRange::from_label),
            distance_km: row.get(10)?,
            temps_marche: row.get(11)?,
            montee_m: row.get(12)?,
            descente_m: row.get(13)?,
            saison: row.get(14)?,
            lieu_depart: row.get(15)?,
            lieu_arrivee: row.get(16)?,
            acces_tp: row.get(17)?,
            retour_tp: row.get(18)?,
            suisse_mobile_url: row.get(19)?,
            raw_table: raw_table
                .as_deref()
                .map(RawTable::from_json_lossy)
                .unwrap_or_default(),
        })
    }
}

/// Decode the `environnements` column.
///
/// Rows written by older versions hold comma-joined text instead of a JSON
/// array; those are split on commas.
fn decode_tags(text: &str) -> Vec<String> {
    serde_json::from_str(text).unwrap_or_else(|_| {
        text.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(String::from)
            .collect()
    })
}

#[async_trait]
impl HikeStore for SqliteStore {
    async fn upsert_many(&self, hikes: &[HikeRecord]) -> Result<usize> {
        let hikes = hikes.to_vec();
        let written = self
            .with_conn(move |conn| Self::insert_all(conn, &hikes))
            .await
            .inspect_err(|e| log::error!("SQLite upsert failed: {}", e))?;
        log::debug!("Upserted {} hikes into {}", written, self.location());
        Ok(written)
    }

    async fn read_all(&self) -> Result<Vec<HikeRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM hikes ORDER BY url"))?;
            let hikes = stmt
                .query_map([], Self::row_to_hike)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(hikes)
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM hikes", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
        .await
    }

    fn location(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => ":memory:".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractConfig;
    use crate::pipeline::calculate_diff;
    use crate::services::RecordExtractor;
    use tempfile::TempDir;

    fn sample(url: &str) -> HikeRecord {
        let mut raw_table = RawTable::new();
        raw_table.insert("Canton", "Valais");
        raw_table.insert("Distance", "12,5 km");
        raw_table.insert("Remarque", "Prendre de l'eau");
        HikeRecord {
            url: url.to_string(),
            title: "Lac de Derborence".to_string(),
            canton: Some("Valais".to_string()),
            type_parcours: Some(TypeParcours::Boucle),
            km_range: Some(KmRange::From10To15),
            duree_range: Some(DureeRange::From3To5h),
            environnement: Some("Montagne".to_string()),
            environnements: vec!["Montagne".to_string(), "Bord de lac".to_string()],
            difficulte: Some(Difficulte::T2),
            denivele_range: Some(DeniveleRange::From500To1000),
            distance_km: Some(12.5),
            temps_marche: Some("4h15".to_string()),
            montee_m: Some(820),
            descente_m: Some(820),
            saison: Some("Été, Automne".to_string()),
            lieu_depart: Some("Derborence".to_string()),
            lieu_arrivee: Some("Derborence".to_string()),
            acces_tp: Some("Car postal".to_string()),
            retour_tp: None,
            suisse_mobile_url: Some("https://map.schweizmobil.ch/?trackId=1".to_string()),
            raw_table,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_read_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        let hike = sample("https://randoromandie.com/2026/01/01/derborence");

        assert_eq!(store.upsert_many(&[hike.clone()]).await.unwrap(), 1);
        let stored = store.read_all().await.unwrap();
        assert_eq!(stored, vec![hike]);
        assert_eq!(
            stored[0].raw_table.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            vec!["Canton", "Distance", "Remarque"]
        );
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_record() {
        let store = SqliteStore::open_in_memory().unwrap();
        let url = "https://randoromandie.com/2026/01/01/derborence";
        store.upsert_many(&[sample(url)]).await.unwrap();

        let replacement = HikeRecord {
            url: url.to_string(),
            title: "Nouveau titre".to_string(),
            ..HikeRecord::default()
        };
        store.upsert_many(&[replacement.clone()]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.read_all().await.unwrap(), vec![replacement]);
    }

    #[tokio::test]
    async fn test_repeated_upsert_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteStore::open(tmp.path().join("hikes.db")).unwrap();
        let hikes = vec![
            sample("https://randoromandie.com/2026/01/02/b"),
            sample("https://randoromandie.com/2026/01/01/a"),
        ];

        store.upsert_many(&hikes).await.unwrap();
        let first = serde_json::to_vec(&store.read_all().await.unwrap()).unwrap();
        store.upsert_many(&hikes).await.unwrap();
        let second = serde_json::to_vec(&store.read_all().await.unwrap()).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(
            store.read_all().await.unwrap()[0].url,
            "https://randoromandie.com/2026/01/01/a"
        );
    }

    #[tokio::test]
    async fn test_undecodable_raw_table_reads_as_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        let url = "https://randoromandie.com/2026/01/01/derborence";
        store.upsert_many(&[sample(url)]).await.unwrap();
        store
            .with_conn(|conn| {
                conn.execute("UPDATE hikes SET raw_table = '{not json'", [])?;
                Ok(())
            })
            .await
            .unwrap();

        let stored = store.read_all().await.unwrap();
        assert!(stored[0].raw_table.is_empty());
        assert_eq!(stored[0].canton.as_deref(), Some("Valais"));
    }

    #[test]
    fn test_migration_adds_raw_table_once() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE hikes (url TEXT PRIMARY KEY, title TEXT NOT NULL DEFAULT '');
                 INSERT INTO hikes (url, title) VALUES ('https://randoromandie.com/2025/05/05/old', 'Ancienne');",
            )
            .unwrap();
        }

        {
            let conn = Connection::open(&path).unwrap();
            SqliteStore::migrate_schema(&conn).unwrap();
            SqliteStore::migrate_schema(&conn).unwrap();
            assert!(conn.prepare("SELECT raw_table FROM hikes LIMIT 0").is_ok());
            let title: String = conn
                .query_row("SELECT title FROM hikes", [], |row| row.get(0))
                .unwrap();
            assert_eq!(title, "Ancienne");
        }
    }

    #[tokio::test]
    async fn test_environment_with_comma_round_trips() {
        let extractor = RecordExtractor::new(&ExtractConfig::default()).unwrap();
        let hike = extractor.extract(
            "https://randoromandie.com/2026/03/01/vallon",
            "<html><body><h1>Vallon</h1><table>\
             <tr><td>Environnement</td><td>Forêt, pâturages</td></tr>\
             </table></body></html>",
        );
        assert_eq!(hike.environnements, vec!["Forêt, pâturages"]);

        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_many(&[hike.clone()]).await.unwrap();
        let stored = store.read_all().await.unwrap();
        assert_eq!(stored, vec![hike.clone()]);
        assert_eq!(
            stored[0].environnement.as_deref(),
            stored[0].environnements.first().map(String::as_str)
        );

        let changes = calculate_diff(&stored, &[hike]);
        assert!(!changes.has_changes());
    }

    #[test]
    fn test_decode_tags_accepts_legacy_text() {
        assert_eq!(decode_tags(r#"["Forêt, pâturages"]"#), vec!["Forêt, pâturages"]);
        assert_eq!(decode_tags("Montagne, Gorges"), vec!["Montagne", "Gorges"]);
        assert!(decode_tags("").is_empty());
        assert!(decode_tags("[]").is_empty());
    }

    #[tokio::test]
    async fn test_every_categorical_column_is_indexed() {
        let store = SqliteStore::open_in_memory().unwrap();
        let indexed: Vec<String> = store
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'hikes' \
                     AND name LIKE 'idx_%' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(names)
            })
            .await
            .unwrap();

        assert_eq!(
            indexed,
            vec![
                "idx_hikes_canton",
                "idx_hikes_denivele_range",
                "idx_hikes_difficulte",
                "idx_hikes_duree_range",
                "idx_hikes_km_range",
                "idx_hikes_type_parcours",
            ]
        );
    }

    #[tokio::test]
    async fn test_reopen_existing_database() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hikes.db");
        let hike = sample("https://randoromandie.com/2026/01/01/derborence");

        SqliteStore::open(&path)
            .unwrap()
            .upsert_many(&[hike.clone()])
            .await
            .unwrap();
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.read_all().await.unwrap(), vec![hike]);
    }
}
