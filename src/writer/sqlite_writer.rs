//! SQLite writer for passes
//!
//! One `passes` row per (mission, phase, cycle, pass) and one `pass_values`
//! row per variable and record. Re-running replaces the pass and its values.

use super::backend::{
    staged_mut, take_staged, MissionContext, PassHandle, PassMetadata, PassWriterBackend,
    StagedPass, WriterError,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// WAL journal, relaxed sync, checkpoint every 1000 pages
fn apply_pragmas(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    conn.pragma_update(None, "wal_autocheckpoint", 1000)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

pub struct SqlitePassWriter {
    conn: Connection,
    db_path: PathBuf,
    mission: Option<MissionContext>,
    open: Option<StagedPass>,
    next_handle: u64,
}

impl SqlitePassWriter {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, WriterError> {
        let db_path = db_path.as_ref();
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    WriterError::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to create database directory {}: {}", parent.display(), e),
                    ))
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        apply_pragmas(&conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS phases (
                mission TEXT NOT NULL,
                phase TEXT NOT NULL,
                PRIMARY KEY (mission, phase)
            );
            CREATE TABLE IF NOT EXISTS passes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mission TEXT NOT NULL,
                tag TEXT NOT NULL,
                phase TEXT NOT NULL,
                cycle INTEGER NOT NULL,
                pass INTEGER NOT NULL,
                orbit INTEGER NOT NULL,
                start_time REAL NOT NULL,
                end_time REAL NOT NULL,
                equator_time REAL NOT NULL,
                equator_lon REAL NOT NULL,
                records INTEGER NOT NULL,
                source TEXT NOT NULL,
                baseline TEXT NOT NULL,
                UNIQUE (mission, tag, phase, cycle, pass)
            );
            CREATE TABLE IF NOT EXISTS pass_values (
                pass_id INTEGER NOT NULL REFERENCES passes(id) ON DELETE CASCADE,
                variable TEXT NOT NULL,
                record INTEGER NOT NULL,
                value REAL,
                PRIMARY KEY (pass_id, variable, record)
            );
            CREATE INDEX IF NOT EXISTS idx_passes_equator ON passes(mission, equator_time);",
        )?;

        log::info!("✅ SQLite pass database initialized with WAL mode");

        Ok(Self {
            conn,
            db_path: db_path.to_path_buf(),
            mission: None,
            open: None,
            next_handle: 1,
        })
    }

    fn mission(&self) -> Result<&MissionContext, WriterError> {
        self.mission
            .as_ref()
            .ok_or_else(|| WriterError::InvalidState("mission context not initialized".to_string()))
    }

    /// Replace any earlier copy of the pass, then insert it with its values.
    fn store_pass(&mut self, mission: &MissionContext, staged: &StagedPass) -> Result<i64, WriterError> {
        let meta = &staged.meta;
        let tx = self.conn.transaction()?;

        let previous: Option<i64> = tx
            .query_row(
                "SELECT id FROM passes
                 WHERE mission = ?1 AND tag = ?2 AND phase = ?3 AND cycle = ?4 AND pass = ?5",
                params![mission.id, mission.tag, meta.phase, meta.cycle, meta.pass],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = previous {
            log::debug!("Replacing pass c{:03} p{:04} (row {})", meta.cycle, meta.pass, id);
            tx.execute("DELETE FROM pass_values WHERE pass_id = ?1", params![id])?;
            tx.execute("DELETE FROM passes WHERE id = ?1", params![id])?;
        }

        tx.execute(
            "INSERT INTO passes
             (mission, tag, phase, cycle, pass, orbit, start_time, end_time,
              equator_time, equator_lon, records, source, baseline)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                mission.id,
                mission.tag,
                meta.phase,
                meta.cycle,
                meta.pass,
                meta.orbit,
                meta.start_time,
                meta.end_time,
                meta.equator_time,
                meta.equator_lon,
                meta.records as i64,
                meta.source,
                meta.baseline,
            ],
        )?;
        let pass_id = tx.last_insert_rowid();

        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO pass_values (pass_id, variable, record, value) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (name, values) in staged.written() {
                for (record, value) in values.iter().enumerate() {
                    let value = value.is_finite().then_some(*value);
                    insert.execute(params![pass_id, name, record as i64, value])?;
                }
            }
        }

        tx.commit()?;
        Ok(pass_id)
    }
}

impl PassWriterBackend for SqlitePassWriter {
    fn init_mission(&mut self, mission: &str, tag: &str) -> Result<(), WriterError> {
        self.mission = Some(MissionContext {
            id: mission.to_string(),
            tag: tag.to_string(),
        });
        Ok(())
    }

    fn phase(&mut self, name: &str) -> Result<(), WriterError> {
        let mission = self.mission()?.id.clone();
        self.conn.execute(
            "INSERT OR IGNORE INTO phases (mission, phase) VALUES (?1, ?2)",
            params![mission, name],
        )?;
        Ok(())
    }

    fn begin_pass(&mut self, meta: &PassMetadata) -> Result<PassHandle, WriterError> {
        self.mission()?;
        if let Some(open) = &self.open {
            return Err(WriterError::InvalidState(format!(
                "pass {:?} is still open",
                open.handle
            )));
        }
        let handle = PassHandle(self.next_handle);
        self.next_handle += 1;
        self.open = Some(StagedPass::new(handle, meta.clone()));
        Ok(handle)
    }

    fn define_variable(&mut self, pass: PassHandle, name: &str) -> Result<(), WriterError> {
        staged_mut(&mut self.open, pass)?.define(name);
        Ok(())
    }

    fn put_values(&mut self, pass: PassHandle, name: &str, values: &[f64]) -> Result<(), WriterError> {
        staged_mut(&mut self.open, pass)?.put(name, values)
    }

    fn close_pass(&mut self, pass: PassHandle) -> Result<String, WriterError> {
        let staged = take_staged(&mut self.open, pass)?;
        let mission = self.mission()?.clone();
        let pass_id = self.store_pass(&mission, &staged)?;
        log::debug!(
            "✅ Stored pass c{:03} p{:04} as row {}",
            staged.meta.cycle,
            staged.meta.pass,
            pass_id
        );
        Ok(format!(
            "{}#{}{}/{}/c{:03}/p{:04}",
            self.db_path.display(),
            mission.id,
            mission.tag,
            staged.meta.phase,
            staged.meta.cycle,
            staged.meta.pass
        ))
    }

    fn shutdown(&mut self) -> Result<(), WriterError> {
        if let Some(open) = self.open.take() {
            log::warn!(
                "Discarding unclosed pass c{:03} p{:04}",
                open.meta.cycle,
                open.meta.pass
            );
        }
        self.mission = None;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn meta(cycle: i32, pass: i32) -> PassMetadata {
        PassMetadata {
            phase: "a".to_string(),
            cycle,
            pass,
            orbit: 10,
            start_time: 100.0,
            end_time: 101.0,
            equator_time: 100.5,
            equator_lon: 33.0,
            records: 2,
            source: "G1".to_string(),
            baseline: "F".to_string(),
        }
    }

    fn write(writer: &mut SqlitePassWriter, cycle: i32, pass: i32, values: &[f64]) {
        writer.phase("a").unwrap();
        let h = writer.begin_pass(&meta(cycle, pass)).unwrap();
        writer.define_variable(h, "height").unwrap();
        writer.put_values(h, "height", values).unwrap();
        writer.close_pass(h).unwrap();
    }

    #[test]
    fn test_sqlite_pass_write() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("passes.db");
        let mut writer = SqlitePassWriter::new(&db_path).unwrap();
        writer.init_mission("ra", "a").unwrap();
        write(&mut writer, 1, 5, &[1.25, f64::NAN]);

        let conn = Connection::open(&db_path).unwrap();
        let (cycle, pass, source): (i32, i32, String) = conn
            .query_row("SELECT cycle, pass, source FROM passes", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .unwrap();
        assert_eq!((cycle, pass, source.as_str()), (1, 5, "G1"));

        let values: Vec<Option<f64>> = conn
            .prepare("SELECT value FROM pass_values WHERE variable = 'height' ORDER BY record")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(values, vec![Some(1.25), None]);
    }

    #[test]
    fn test_rerun_replaces_pass() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("passes.db");
        let mut writer = SqlitePassWriter::new(&db_path).unwrap();
        writer.init_mission("ra", "a").unwrap();
        write(&mut writer, 1, 5, &[1.0, 1.0]);
        write(&mut writer, 1, 5, &[2.0, 2.0]);
        write(&mut writer, 1, 6, &[3.0, 3.0]);

        let conn = Connection::open(&db_path).unwrap();
        let passes: i64 = conn
            .query_row("SELECT COUNT(*) FROM passes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(passes, 2);
        let sum: f64 = conn
            .query_row(
                "SELECT SUM(v.value) FROM pass_values v JOIN passes p ON p.id = v.pass_id WHERE p.pass = 5",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(sum, 4.0);
    }

    #[test]
    fn test_tags_are_stored_side_by_side() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("passes.db");
        let mut writer = SqlitePassWriter::new(&db_path).unwrap();
        writer.init_mission("ra", "a").unwrap();
        write(&mut writer, 1, 5, &[1.0, 1.0]);
        writer.init_mission("ra", "b").unwrap();
        write(&mut writer, 1, 5, &[2.0, 2.0]);
        write(&mut writer, 1, 5, &[3.0, 3.0]);

        let conn = Connection::open(&db_path).unwrap();
        let tags: Vec<(String, f64)> = conn
            .prepare(
                "SELECT p.tag, SUM(v.value) FROM passes p JOIN pass_values v ON p.id = v.pass_id
                 GROUP BY p.tag ORDER BY p.tag",
            )
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(tags, vec![("a".to_string(), 2.0), ("b".to_string(), 6.0)]);
    }

    #[test]
    fn test_wal_mode_enabled() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("passes.db");
        let _writer = SqlitePassWriter::new(&db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "wal");
    }
}
