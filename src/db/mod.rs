use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::align::FrameMatrix;
use crate::segment::TimeSlice;
use crate::tracking::{EntitySeries, Half, Team};

pub mod models;
use models::*;

/// Thread-safe SQLite handle (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        self.conn()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    // ── Matches ───────────────────────────────────────────────────────────────

    /// Insert or refresh a match record
    pub fn upsert_match(&self, m: &MatchRecord) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO matches (id, source, pitch_length, pitch_width, processed_at)
             VALUES (?1,?2,?3,?4,?5)
             ON CONFLICT(id) DO UPDATE SET
                source=excluded.source,
                pitch_length=excluded.pitch_length,
                pitch_width=excluded.pitch_width,
                processed_at=excluded.processed_at",
            params![m.id, m.source, m.pitch_length, m.pitch_width, m.processed_at],
        )?;
        Ok(())
    }

    pub fn get_match(&self, id: &str) -> Result<Option<MatchRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT id, source, pitch_length, pitch_width, processed_at
                 FROM matches WHERE id=?1",
                params![id],
                map_match,
            )
            .optional()?;
        Ok(record)
    }

    // ── Alignment runs ────────────────────────────────────────────────────────

    /// Store a run and its aligned rows in one transaction. Returns the run id.
    pub fn insert_alignment(&self, run: &AlignmentRun, matrix: &FrameMatrix) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO alignment_runs (
                match_id, team, half, first_frame, rows, width, strategy,
                player_ids, centroid_x, centroid_y, stretch, processed_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
            params![
                run.match_id,
                run.team,
                run.half,
                run.first_frame,
                matrix.rows() as i64,
                matrix.cols() as i64,
                run.strategy,
                serde_json::to_string(&run.player_ids)?,
                run.centroid_x,
                run.centroid_y,
                run.stretch,
                run.processed_at,
            ],
        )?;
        let run_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO aligned_frames (run_id, row_idx, frame, coords) VALUES (?1,?2,?3,?4)",
            )?;
            for (idx, row) in matrix.iter_rows().enumerate() {
                let coords = serde_json::to_string(row)?;
                stmt.execute(params![run_id, idx as i64, run.first_frame + idx as i64, coords])?;
            }
        }
        tx.commit()?;
        Ok(run_id)
    }

    /// Runs of a match, first half first, home before guest
    pub fn list_runs(&self, match_id: &str) -> Result<Vec<AlignmentRun>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, match_id, team, half, first_frame, rows, width, strategy,
                    player_ids, centroid_x, centroid_y, stretch, processed_at
             FROM alignment_runs WHERE match_id=?1
             ORDER BY half, CASE team WHEN 'home' THEN 0 ELSE 1 END, id",
        )?;
        let runs = stmt
            .query_map(params![match_id], map_run)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    /// Rebuild the aligned matrix of a run
    pub fn load_aligned_frames(&self, run_id: i64) -> Result<FrameMatrix> {
        let conn = self.conn()?;
        let (rows, width): (i64, i64) = conn
            .query_row(
                "SELECT rows, width FROM alignment_runs WHERE id=?1",
                params![run_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| anyhow!("alignment run {} not found", run_id))?;

        let mut stmt =
            conn.prepare("SELECT coords FROM aligned_frames WHERE run_id=?1 ORDER BY row_idx")?;
        let encoded = stmt
            .query_map(params![run_id], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut values = Vec::with_capacity((rows * width).max(0) as usize);
        for (idx, text) in encoded.iter().enumerate() {
            let row: Vec<f64> = serde_json::from_str(text)
                .with_context(|| format!("run {} row {}: bad coordinate JSON", run_id, idx))?;
            values.extend(row);
        }
        FrameMatrix::from_flat(rows as usize, width as usize, values).ok_or_else(|| {
            anyhow!(
                "run {}: stored frames do not form a {}x{} matrix",
                run_id,
                rows,
                width
            )
        })
    }

    // ── Formation slices ──────────────────────────────────────────────────────

    /// Store the time slices computed from a run's matrix. Replaces any
    /// slices already stored for the run.
    pub fn insert_time_slices(&self, run_id: i64, slices: &[TimeSlice]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM formation_slices WHERE run_id=?1", params![run_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO formation_slices
                    (run_id, slice_idx, phase, start_row, end_row, possession, mean)
                 VALUES (?1,?2,?3,?4,?5,?6,?7)",
            )?;
            for (idx, slice) in slices.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    idx as i64,
                    slice.phase as i64,
                    slice.start as i64,
                    slice.end as i64,
                    slice.possession,
                    serde_json::to_string(&slice.mean)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(slices.len())
    }

    pub fn list_time_slices(&self, run_id: i64) -> Result<Vec<TimeSlice>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT phase, start_row, end_row, possession, mean
             FROM formation_slices WHERE run_id=?1 ORDER BY slice_idx",
        )?;
        let slices = stmt
            .query_map(params![run_id], map_slice)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(slices)
    }

    // ── Player positions ──────────────────────────────────────────────────────

    /// Store a raw x/y series. Existing samples for the same frames are replaced.
    pub fn insert_player_positions(
        &self,
        match_id: &str,
        half: Half,
        team: Team,
        player_id: &str,
        series: &EntitySeries,
    ) -> Result<usize> {
        if series.dims() != 2 {
            bail!(
                "player {} series has {} dims, only x/y series are stored",
                player_id,
                series.dims()
            );
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO player_positions
                    (match_id, half, team, player_id, frame, x, y)
                 VALUES (?1,?2,?3,?4,?5,?6,?7)",
            )?;
            for (frame, c) in series.iter() {
                stmt.execute(params![
                    match_id,
                    half.number(),
                    team.as_str(),
                    player_id,
                    frame,
                    c[0],
                    c[1]
                ])?;
            }
        }
        tx.commit()?;
        Ok(series.len())
    }

    pub fn get_player_positions(
        &self,
        match_id: &str,
        half: Half,
        team: Team,
        player_id: &str,
    ) -> Result<EntitySeries> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT frame, x, y FROM player_positions
             WHERE match_id=?1 AND half=?2 AND team=?3 AND player_id=?4
             ORDER BY frame",
        )?;
        let samples = stmt
            .query_map(
                params![match_id, half.number(), team.as_str(), player_id],
                |r| Ok((r.get::<_, i64>(0)?, r.get::<_, f64>(1)?, r.get::<_, f64>(2)?)),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(EntitySeries::from_xy(samples))
    }

    // ── Stats ─────────────────────────────────────────────────────────────────

    pub fn get_stats(&self) -> Result<Stats> {
        let conn = self.conn()?;
        let count = |table: &str| -> rusqlite::Result<i64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        };
        Ok(Stats {
            matches: count("matches")?,
            runs: count("alignment_runs")?,
            aligned_frames: count("aligned_frames")?,
            player_positions: count("player_positions")?,
            time_slices: count("formation_slices")?,
        })
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_match(row: &rusqlite::Row) -> rusqlite::Result<MatchRecord> {
    Ok(MatchRecord {
        id: row.get(0)?,
        source: row.get(1)?,
        pitch_length: row.get(2)?,
        pitch_width: row.get(3)?,
        processed_at: row.get(4)?,
    })
}

fn map_run(row: &rusqlite::Row) -> rusqlite::Result<AlignmentRun> {
    let ids: String = row.get(8)?;
    let player_ids = serde_json::from_str(&ids).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(AlignmentRun {
        id: row.get(0)?,
        match_id: row.get(1)?,
        team: row.get(2)?,
        half: row.get(3)?,
        first_frame: row.get(4)?,
        rows: row.get(5)?,
        width: row.get(6)?,
        strategy: row.get(7)?,
        player_ids,
        centroid_x: row.get(9)?,
        centroid_y: row.get(10)?,
        stretch: row.get(11)?,
        processed_at: row.get(12)?,
    })
}

fn map_slice(row: &rusqlite::Row) -> rusqlite::Result<TimeSlice> {
    let mean: String = row.get(4)?;
    let mean = serde_json::from_str(&mean).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(TimeSlice {
        phase: row.get::<_, i64>(0)? as usize,
        start: row.get::<_, i64>(1)? as usize,
        end: row.get::<_, i64>(2)? as usize,
        possession: row.get(3)?,
        mean,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS matches (
    id            TEXT    PRIMARY KEY,
    source        TEXT    NOT NULL,
    pitch_length  REAL    NOT NULL,
    pitch_width   REAL    NOT NULL,
    processed_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS alignment_runs (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    match_id      TEXT    NOT NULL,
    team          TEXT    NOT NULL,
    half          INTEGER NOT NULL,
    first_frame   INTEGER NOT NULL,
    rows          INTEGER NOT NULL,
    width         INTEGER NOT NULL,
    strategy      TEXT    NOT NULL,
    player_ids    TEXT    NOT NULL,
    centroid_x    REAL,
    centroid_y    REAL,
    stretch       REAL,
    processed_at  TEXT    NOT NULL,
    FOREIGN KEY (match_id) REFERENCES matches(id)
);

CREATE TABLE IF NOT EXISTS aligned_frames (
    run_id   INTEGER NOT NULL,
    row_idx  INTEGER NOT NULL,
    frame    INTEGER NOT NULL,
    coords   TEXT    NOT NULL,
    PRIMARY KEY (run_id, row_idx),
    FOREIGN KEY (run_id) REFERENCES alignment_runs(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS player_positions (
    match_id   TEXT    NOT NULL,
    half       INTEGER NOT NULL,
    team       TEXT    NOT NULL,
    player_id  TEXT    NOT NULL,
    frame      INTEGER NOT NULL,
    x          REAL    NOT NULL,
    y          REAL    NOT NULL,
    PRIMARY KEY (match_id, half, team, player_id, frame),
    FOREIGN KEY (match_id) REFERENCES matches(id)
);

CREATE TABLE IF NOT EXISTS formation_slices (
    run_id      INTEGER NOT NULL,
    slice_idx   INTEGER NOT NULL,
    phase       INTEGER NOT NULL,
    start_row   INTEGER NOT NULL,
    end_row     INTEGER NOT NULL,
    possession  INTEGER NOT NULL,
    mean        TEXT    NOT NULL,
    PRIMARY KEY (run_id, slice_idx),
    FOREIGN KEY (run_id) REFERENCES alignment_runs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_runs_match ON alignment_runs(match_id);
"#;
