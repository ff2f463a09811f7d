use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use itertools::Itertools;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::stats::RealtimeStats;
use crate::util::mean;

/// Number of practice records kept by default.
pub const DEFAULT_CAPACITY: usize = 100;

/// Immutable summary of one completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeRecord {
    pub lesson_id: String,
    pub lesson_title: String,
    pub duration_sec: u64,
    pub keystroke_speed: u32,
    pub content_speed: u32,
    pub accuracy_pct: u8,
    pub total_typed: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub completed_at: DateTime<Local>,
}

impl PracticeRecord {
    pub fn from_stats(
        lesson_id: &str,
        lesson_title: &str,
        stats: &RealtimeStats,
        completed_at: DateTime<Local>,
    ) -> Self {
        Self {
            lesson_id: lesson_id.to_string(),
            lesson_title: lesson_title.to_string(),
            duration_sec: stats.duration_sec,
            keystroke_speed: stats.keystroke_speed,
            content_speed: stats.content_speed,
            accuracy_pct: stats.accuracy_pct,
            total_typed: stats.total_typed,
            correct_count: stats.correct_count,
            incorrect_count: stats.incorrect_count,
            completed_at,
        }
    }
}

/// Aggregates over the stored practices of one lesson.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LessonStats {
    pub total_practices: usize,
    pub best_speed: u32,
    pub average_accuracy: f64,
    pub last_practiced: Option<DateTime<Local>>,
}

impl LessonStats {
    /// `records` must be ordered newest first.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a PracticeRecord>) -> Self {
        let records = records.into_iter().collect_vec();
        let Some(latest) = records.first() else {
            return Self::default();
        };
        let accuracies = records
            .iter()
            .map(|r| f64::from(r.accuracy_pct))
            .collect_vec();

        Self {
            total_practices: records.len(),
            best_speed: records.iter().map(|r| r.content_speed).max().unwrap_or(0),
            average_accuracy: mean(&accuracies).unwrap_or(0.0),
            last_practiced: Some(latest.completed_at),
        }
    }
}

/// Retains the most recent practice records, newest first.
pub trait HistoryStore {
    fn add(&mut self, record: &PracticeRecord) -> Result<()>;
    fn recent(&self, limit: usize) -> Result<Vec<PracticeRecord>>;
    fn lesson_stats(&self, lesson_id: &str) -> Result<LessonStats>;
    fn clear_all(&mut self) -> Result<()>;

    fn all(&self) -> Result<Vec<PracticeRecord>> {
        self.recent(usize::MAX)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryHistoryStore {
    records: VecDeque<PracticeRecord>,
    capacity: usize,
}

impl MemoryHistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity,
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn add(&mut self, record: &PracticeRecord) -> Result<()> {
        self.records.push_front(record.clone());
        self.records.truncate(self.capacity);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<PracticeRecord>> {
        Ok(self.records.iter().take(limit).cloned().collect())
    }

    fn lesson_stats(&self, lesson_id: &str) -> Result<LessonStats> {
        Ok(LessonStats::from_records(
            self.records.iter().filter(|r| r.lesson_id == lesson_id),
        ))
    }

    fn clear_all(&mut self) -> Result<()> {
        self.records.clear();
        Ok(())
    }
}

const CREATE_PRACTICES: &str = r#"
    CREATE TABLE IF NOT EXISTS practices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        lesson_id TEXT NOT NULL,
        lesson_title TEXT NOT NULL,
        duration_sec INTEGER NOT NULL,
        keystroke_speed INTEGER NOT NULL,
        content_speed INTEGER NOT NULL,
        accuracy INTEGER NOT NULL,
        total_typed INTEGER NOT NULL,
        correct_count INTEGER NOT NULL,
        incorrect_count INTEGER NOT NULL,
        completed_at TEXT NOT NULL
    )
"#;

const SELECT_COLUMNS: &str = "SELECT lesson_id, lesson_title, duration_sec, keystroke_speed, \
     content_speed, accuracy, total_typed, correct_count, incorrect_count, completed_at \
     FROM practices";

/// Practice history in SQLite, capped to the most recent `capacity` rows.
#[derive(Debug)]
pub struct SqliteHistoryStore {
    conn: Connection,
    capacity: usize,
}

impl SqliteHistoryStore {
    pub fn open<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?, capacity)
    }

    pub fn open_in_memory(capacity: usize) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, capacity)
    }

    fn with_connection(conn: Connection, capacity: usize) -> Result<Self> {
        conn.execute(CREATE_PRACTICES, [])?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_practices_lesson ON practices(lesson_id)",
            [],
        )?;
        Ok(Self { conn, capacity })
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<PracticeRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<PracticeRecord> {
    let completed_at: String = row.get(9)?;
    let completed_at = DateTime::parse_from_rfc3339(&completed_at)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Local);

    Ok(PracticeRecord {
        lesson_id: row.get(0)?,
        lesson_title: row.get(1)?,
        duration_sec: u64::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
        keystroke_speed: row.get(3)?,
        content_speed: row.get(4)?,
        accuracy_pct: row.get(5)?,
        total_typed: get_count(row, 6)?,
        correct_count: get_count(row, 7)?,
        incorrect_count: get_count(row, 8)?,
        completed_at,
    })
}

fn get_count(row: &Row<'_>, idx: usize) -> rusqlite::Result<usize> {
    Ok(usize::try_from(row.get::<_, i64>(idx)?).unwrap_or(0))
}

fn to_sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl HistoryStore for SqliteHistoryStore {
    fn add(&mut self, record: &PracticeRecord) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO practices
            (lesson_id, lesson_title, duration_sec, keystroke_speed, content_speed, accuracy,
             total_typed, correct_count, incorrect_count, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.lesson_id,
                record.lesson_title,
                i64::try_from(record.duration_sec).unwrap_or(i64::MAX),
                record.keystroke_speed,
                record.content_speed,
                record.accuracy_pct,
                to_sql_count(record.total_typed),
                to_sql_count(record.correct_count),
                to_sql_count(record.incorrect_count),
                record.completed_at.to_rfc3339(),
            ],
        )?;
        let evicted = tx.execute(
            "DELETE FROM practices WHERE id NOT IN (SELECT id FROM practices ORDER BY id DESC LIMIT ?1)",
            [to_sql_count(self.capacity)],
        )?;
        tx.commit()?;
        if evicted > 0 {
            debug!(evicted, "evicted old practice records");
        }
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<PracticeRecord>> {
        self.query(
            &format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1"),
            [to_sql_count(limit)],
        )
    }

    fn lesson_stats(&self, lesson_id: &str) -> Result<LessonStats> {
        let records = self.query(
            &format!("{SELECT_COLUMNS} WHERE lesson_id = ?1 ORDER BY id DESC"),
            [lesson_id],
        )?;
        Ok(LessonStats::from_records(&records))
    }

    fn clear_all(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM practices", [])?;
        Ok(())
    }
}

/// Writes records as CSV with a header row.
pub fn export_csv<W: Write>(records: &[PracticeRecord], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}
