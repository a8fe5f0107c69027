use crate::dlog;
use crate::error::Result;
use crate::registry::GeofenceRegistry;
use crate::types::{Geofence, WorkoutVisit};
use anyhow::Context;
use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

/// Durable home for committed workouts.
///
/// The tracker calls `load` once at construction and `save` with the full
/// log synchronously after each commit.
pub trait VisitStore {
    fn load(&mut self) -> Result<Vec<WorkoutVisit>>;
    fn save(&mut self, visits: &[WorkoutVisit]) -> Result<()>;
}

/// Volatile store for tests and throwaway trackers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    visits: Vec<WorkoutVisit>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed with history, as if loaded from a previous run.
    pub fn with_visits(visits: Vec<WorkoutVisit>) -> Self {
        Self {
            visits,
        }
    }
}

impl VisitStore for MemoryStore {
    fn load(&mut self) -> Result<Vec<WorkoutVisit>> {
        Ok(self.visits.clone())
    }

    fn save(&mut self, visits: &[WorkoutVisit]) -> Result<()> {
        self.visits = visits.to_vec();
        Ok(())
    }
}

/// JSON-array-on-disk store: one file, ISO-8601 timestamps.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }
}

impl VisitStore for JsonFileStore {
    fn load(&mut self) -> Result<Vec<WorkoutVisit>> {
        if !self.path.exists() {
            dlog!("visit_store_empty path={}", self.path.display());
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&mut self, visits: &[WorkoutVisit]) -> Result<()> {
        let raw = serde_json::to_string_pretty(visits)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// SQLite-backed store. Timestamps are stored as unix epoch milliseconds.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS workout_visit (
                id INTEGER PRIMARY KEY,
                geofence_id TEXT NOT NULL,
                entered_at_ms INTEGER NOT NULL,
                exited_at_ms INTEGER NOT NULL,
                duration_minutes INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn,
        })
    }
}

impl VisitStore for SqliteStore {
    fn load(&mut self) -> Result<Vec<WorkoutVisit>> {
        let mut stmt = self.conn.prepare(
            "SELECT geofence_id, entered_at_ms, exited_at_ms, duration_minutes
             FROM workout_visit ORDER BY id",
        )?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let geofence_id: String = row.get(0)?;
            let entered_ms: i64 = row.get(1)?;
            let exited_ms: i64 = row.get(2)?;
            let duration_minutes: i64 = row.get(3)?;

            let Some(entered_at) = Utc.timestamp_millis_opt(entered_ms).single() else {
                dlog!("visit_bad_entered_ms entered_ms={entered_ms}");
                continue;
            };
            let Some(exited_at) = Utc.timestamp_millis_opt(exited_ms).single() else {
                dlog!("visit_bad_exited_ms exited_ms={exited_ms}");
                continue;
            };

            out.push(WorkoutVisit {
                geofence_id,
                entered_at,
                exited_at,
                duration_minutes,
            });
        }

        Ok(out)
    }

    fn save(&mut self, visits: &[WorkoutVisit]) -> Result<()> {
        // Full-log rewrite keeps the table an exact mirror of memory.
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM workout_visit", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO workout_visit
                 (geofence_id, entered_at_ms, exited_at_ms, duration_minutes)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for v in visits {
                stmt.execute(rusqlite::params![
                    v.geofence_id,
                    v.entered_at.timestamp_millis(),
                    v.exited_at.timestamp_millis(),
                    v.duration_minutes,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

/// Load a registry snapshot (JSON array of geofences). A missing file is an
/// empty registry, not an error.
pub fn load_registry(path: &Path) -> anyhow::Result<GeofenceRegistry> {
    if !path.exists() {
        dlog!("registry_empty path={}", path.display());
        return Ok(GeofenceRegistry::new());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading gym registry: {}", path.display()))?;
    let fences: Vec<Geofence> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing gym registry: {}", path.display()))?;

    Ok(GeofenceRegistry::from_fences(fences))
}

pub fn save_registry(path: &Path, registry: &GeofenceRegistry) -> anyhow::Result<()> {
    let raw = serde_json::to_string_pretty(&registry.list())?;
    fs::write(path, raw).with_context(|| format!("writing gym registry: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoPoint;
    use chrono::Duration;

    fn sample_visits() -> Vec<WorkoutVisit> {
        let entered = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        vec![
            WorkoutVisit {
                geofence_id: "gym-1".to_owned(),
                entered_at: entered,
                exited_at: entered + Duration::minutes(42),
                duration_minutes: 42,
            },
            WorkoutVisit {
                geofence_id: "gym-2".to_owned(),
                entered_at: entered + Duration::days(1),
                exited_at: entered + Duration::days(1) + Duration::minutes(31),
                duration_minutes: 31,
            },
        ]
    }

    #[test]
    fn json_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visits.json");

        let mut store = JsonFileStore::new(&path);
        assert!(store.load().unwrap().is_empty());

        let visits = sample_visits();
        store.save(&visits).unwrap();

        let loaded = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].geofence_id, "gym-1");
        assert_eq!(loaded[0].entered_at, visits[0].entered_at);
        assert_eq!(loaded[1].duration_minutes, 31);
    }

    #[test]
    fn sqlite_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visits.sqlite3");

        let visits = sample_visits();
        {
            let mut store = SqliteStore::open(&path).unwrap();
            assert!(store.load().unwrap().is_empty());
            store.save(&visits).unwrap();
        }

        let loaded = SqliteStore::open(&path).unwrap().load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].entered_at, visits[0].entered_at);
        assert_eq!(loaded[1].exited_at, visits[1].exited_at);
        assert_eq!(loaded[1].duration_minutes, 31);
    }

    #[test]
    fn registry_snapshot_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gyms.json");

        let mut reg = GeofenceRegistry::new();
        reg.add("Downtown Fitness", GeoPoint::new(37.7749, -122.4194), None).unwrap();
        save_registry(&path, &reg).unwrap();

        let restored = load_registry(&path).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.list()[0].name, "Downtown Fitness");
    }
}
