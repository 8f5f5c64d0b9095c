//! SQLite-backed review repository.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

use super::{RepositoryStats, ReviewRepository, ScheduleTransition};
use crate::error::{ErrorCode, RetainError, RetainResult};
use crate::types::{split_tags, Attempt, AttemptType, Problem, ReviewSchedule};

const PROBLEM_COLUMNS: &str = "p.id, p.user_id, p.external_ref, p.title, p.difficulty, p.tags, \
     p.description, p.first_solved_at, p.created_at";

const ATTEMPT_COLUMNS: &str = "a.id, a.problem_id, a.user_id, a.attempt_type, a.approach_text, \
     a.code, a.language, a.feedback_summary, a.memory_rating, a.created_at";

const SCHEDULE_COLUMNS: &str = "s.id, s.problem_id, s.user_id, s.current_interval_days, \
     s.next_review_date, s.last_review_date, s.active, s.version";

const PROBLEM_WIDTH: usize = 9;

/// SQLite store for problems, attempts and schedules.
///
/// A single connection behind a mutex; every write runs in its own
/// transaction.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> RetainResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> RetainResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> RetainResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> RetainResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| RetainError::database(e.to_string()))
    }

    fn init_schema(&self) -> RetainResult<()> {
        let conn = self.lock()?;

        // Returns the resulting mode, which is "memory" for in-memory databases
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS problems (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                external_ref TEXT NOT NULL,
                title TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                first_solved_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (user_id, external_ref)
            );

            CREATE INDEX IF NOT EXISTS idx_problems_user ON problems(user_id);

            CREATE TABLE IF NOT EXISTS attempts (
                id TEXT PRIMARY KEY,
                problem_id TEXT NOT NULL REFERENCES problems(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                attempt_type TEXT NOT NULL CHECK (attempt_type IN ('ORIGINAL', 'REVIEW')),
                approach_text TEXT NOT NULL,
                code TEXT,
                language TEXT,
                feedback_summary TEXT,
                memory_rating TEXT CHECK (memory_rating IN ('REMEMBERED', 'PARTIAL', 'FORGOT')),
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_attempts_problem ON attempts(problem_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_attempts_user ON attempts(user_id);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_attempts_one_original
                ON attempts(problem_id) WHERE attempt_type = 'ORIGINAL';

            CREATE TABLE IF NOT EXISTS review_schedules (
                id TEXT PRIMARY KEY,
                problem_id TEXT NOT NULL UNIQUE REFERENCES problems(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                current_interval_days INTEGER NOT NULL CHECK (current_interval_days > 0),
                next_review_date TEXT NOT NULL,
                last_review_date TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                version INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_schedules_due
                ON review_schedules(user_id, active, next_review_date);
            ",
        )?;

        Ok(())
    }

    fn insert_attempt(conn: &Connection, attempt: &Attempt) -> RetainResult<()> {
        conn.execute(
            "INSERT INTO attempts (id, problem_id, user_id, attempt_type, approach_text, code,
                                   language, feedback_summary, memory_rating, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                attempt.id.to_string(),
                attempt.problem_id.to_string(),
                attempt.user_id,
                attempt.attempt_type.to_string(),
                attempt.approach_text,
                attempt.code,
                attempt.language,
                attempt.feedback_summary,
                attempt.memory_rating.map(|r| r.to_string()),
                timestamp(&attempt.created_at),
            ],
        )?;
        Ok(())
    }

    fn select_schedule(
        conn: &Connection,
        user_id: &str,
        problem_id: Uuid,
    ) -> RetainResult<Option<ReviewSchedule>> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM review_schedules s
             WHERE s.problem_id = ?1 AND s.user_id = ?2"
        );
        Ok(conn
            .query_row(&sql, params![problem_id.to_string(), user_id], |row| {
                schedule_from_row(row, 0)
            })
            .optional()?)
    }
}

#[async_trait]
impl ReviewRepository for SqliteStore {
    async fn find_problem(&self, user_id: &str, problem_id: Uuid) -> RetainResult<Option<Problem>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {PROBLEM_COLUMNS} FROM problems p WHERE p.id = ?1 AND p.user_id = ?2");
        Ok(conn
            .query_row(&sql, params![problem_id.to_string(), user_id], |row| {
                problem_from_row(row, 0)
            })
            .optional()?)
    }

    async fn find_problem_by_ref(
        &self,
        user_id: &str,
        external_ref: &str,
    ) -> RetainResult<Option<Problem>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {PROBLEM_COLUMNS} FROM problems p WHERE p.user_id = ?1 AND p.external_ref = ?2"
        );
        Ok(conn
            .query_row(&sql, params![user_id, external_ref], |row| problem_from_row(row, 0))
            .optional()?)
    }

    async fn list_problems(&self, user_id: &str) -> RetainResult<Vec<Problem>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {PROBLEM_COLUMNS} FROM problems p WHERE p.user_id = ?1
             ORDER BY p.created_at, p.rowid"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], |row| problem_from_row(row, 0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn create_problem_with_original(
        &self,
        problem: &Problem,
        original: &Attempt,
        schedule: &ReviewSchedule,
    ) -> RetainResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            "INSERT INTO problems (id, user_id, external_ref, title, difficulty, tags,
                                   description, first_solved_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                problem.id.to_string(),
                problem.user_id,
                problem.external_ref,
                problem.title,
                problem.difficulty.to_string(),
                problem.tags_joined(),
                problem.description,
                timestamp(&problem.first_solved_at),
                timestamp(&problem.created_at),
            ],
        );
        if let Err(rusqlite::Error::SqliteFailure(e, _)) = &inserted {
            if e.code == rusqlite::ErrorCode::ConstraintViolation {
                return Err(RetainError::validation(format!(
                    "Problem '{}' already exists",
                    problem.external_ref
                )));
            }
        }
        inserted?;

        Self::insert_attempt(&tx, original)?;

        tx.execute(
            "INSERT INTO review_schedules (id, problem_id, user_id, current_interval_days,
                                           next_review_date, last_review_date, active, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                schedule.id.to_string(),
                schedule.problem_id.to_string(),
                schedule.user_id,
                schedule.current_interval_days,
                schedule.next_review_date.to_string(),
                schedule.last_review_date.map(|d| d.to_string()),
                schedule.active,
                schedule.version,
            ],
        )?;

        tx.commit()?;
        debug!(problem_id = %problem.id, user_id = %problem.user_id, "Created problem");
        Ok(())
    }

    async fn find_attempt(&self, user_id: &str, attempt_id: Uuid) -> RetainResult<Option<Attempt>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts a WHERE a.id = ?1 AND a.user_id = ?2");
        Ok(conn
            .query_row(&sql, params![attempt_id.to_string(), user_id], |row| {
                attempt_from_row(row)
            })
            .optional()?)
    }

    async fn latest_attempt(
        &self,
        user_id: &str,
        problem_id: Uuid,
        attempt_type: AttemptType,
    ) -> RetainResult<Option<Attempt>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts a
             WHERE a.problem_id = ?1 AND a.user_id = ?2 AND a.attempt_type = ?3
             ORDER BY a.created_at DESC, a.rowid DESC LIMIT 1"
        );
        Ok(conn
            .query_row(
                &sql,
                params![problem_id.to_string(), user_id, attempt_type.to_string()],
                attempt_from_row,
            )
            .optional()?)
    }

    async fn list_attempts(&self, user_id: &str, problem_id: Uuid) -> RetainResult<Vec<Attempt>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts a
             WHERE a.problem_id = ?1 AND a.user_id = ?2
             ORDER BY a.created_at, a.rowid"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![problem_id.to_string(), user_id], attempt_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_schedule(
        &self,
        user_id: &str,
        problem_id: Uuid,
    ) -> RetainResult<Option<ReviewSchedule>> {
        let conn = self.lock()?;
        Self::select_schedule(&conn, user_id, problem_id)
    }

    async fn record_review(
        &self,
        attempt: &Attempt,
        transition: &ScheduleTransition<'_>,
        reviewed_on: NaiveDate,
    ) -> RetainResult<ReviewSchedule> {
        let mut conn = self.lock()?;
        // IMMEDIATE takes the write lock up front so the schedule read below
        // cannot go stale before the update
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut schedule = Self::select_schedule(&tx, &attempt.user_id, attempt.problem_id)?
            .ok_or_else(|| {
                error!(problem_id = %attempt.problem_id, "Review recorded for a problem without a schedule");
                RetainError::invariant(
                    ErrorCode::InvMissingSchedule,
                    format!("problem '{}' has no review schedule", attempt.problem_id),
                )
            })?;

        Self::insert_attempt(&tx, attempt)?;

        if let Some(update) = transition(&schedule)? {
            let base_version = schedule.version;
            schedule.apply(update, reviewed_on);
            schedule.version = base_version + 1;

            let updated = tx.execute(
                "UPDATE review_schedules
                 SET current_interval_days = ?1, next_review_date = ?2, last_review_date = ?3,
                     version = ?4
                 WHERE id = ?5 AND version = ?6",
                params![
                    schedule.current_interval_days,
                    schedule.next_review_date.to_string(),
                    schedule.last_review_date.map(|d| d.to_string()),
                    schedule.version,
                    schedule.id.to_string(),
                    base_version,
                ],
            )?;

            if updated != 1 {
                error!(problem_id = %attempt.problem_id, base_version, "Schedule changed underneath review");
                return Err(RetainError::invariant(
                    ErrorCode::InvStaleSchedule,
                    format!("schedule for problem '{}' was modified concurrently", attempt.problem_id),
                ));
            }
        }

        tx.commit()?;
        Ok(schedule)
    }

    async fn list_due(
        &self,
        user_id: &str,
        as_of: NaiveDate,
    ) -> RetainResult<Vec<(Problem, ReviewSchedule)>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {PROBLEM_COLUMNS}, {SCHEDULE_COLUMNS}
             FROM review_schedules s JOIN problems p ON p.id = s.problem_id
             WHERE s.user_id = ?1 AND s.active = 1 AND s.next_review_date <= ?2
             ORDER BY s.next_review_date, p.rowid"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id, as_of.to_string()], |row| {
            Ok((problem_from_row(row, 0)?, schedule_from_row(row, PROBLEM_WIDTH)?))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_weak(&self, user_id: &str) -> RetainResult<Vec<Problem>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {PROBLEM_COLUMNS} FROM problems p
             JOIN attempts a ON a.id = (
                 SELECT latest.id FROM attempts latest
                 WHERE latest.problem_id = p.id AND latest.attempt_type = 'REVIEW'
                 ORDER BY latest.created_at DESC, latest.rowid DESC LIMIT 1
             )
             WHERE p.user_id = ?1 AND a.memory_rating IN ('PARTIAL', 'FORGOT')
             ORDER BY p.created_at, p.rowid"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], |row| problem_from_row(row, 0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn stats(&self, user_id: &str) -> RetainResult<RepositoryStats> {
        let conn = self.lock()?;
        let count = |sql: &str| -> RetainResult<usize> {
            let n: i64 = conn.query_row(sql, params![user_id], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(RepositoryStats {
            total_problems: count("SELECT COUNT(*) FROM problems WHERE user_id = ?1")?,
            total_attempts: count("SELECT COUNT(*) FROM attempts WHERE user_id = ?1")?,
        })
    }

    async fn set_schedule_active(
        &self,
        user_id: &str,
        problem_id: Uuid,
        active: bool,
    ) -> RetainResult<bool> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE review_schedules SET active = ?1, version = version + 1
             WHERE problem_id = ?2 AND user_id = ?3",
            params![active, problem_id.to_string(), user_id],
        )?;
        Ok(updated > 0)
    }
}

/// Sortable RFC 3339 form used for every stored timestamp.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parsed<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn text_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    parsed(idx, &raw)
}

fn opt_text_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parsed(idx, &s)).transpose()
}

fn problem_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Problem> {
    let tags: String = row.get(offset + 5)?;
    Ok(Problem {
        id: text_col(row, offset)?,
        user_id: row.get(offset + 1)?,
        external_ref: row.get(offset + 2)?,
        title: row.get(offset + 3)?,
        difficulty: text_col(row, offset + 4)?,
        tags: split_tags(&tags),
        description: row.get(offset + 6)?,
        first_solved_at: text_col(row, offset + 7)?,
        created_at: text_col(row, offset + 8)?,
    })
}

fn attempt_from_row(row: &Row<'_>) -> rusqlite::Result<Attempt> {
    Ok(Attempt {
        id: text_col(row, 0)?,
        problem_id: text_col(row, 1)?,
        user_id: row.get(2)?,
        attempt_type: text_col(row, 3)?,
        approach_text: row.get(4)?,
        code: row.get(5)?,
        language: row.get(6)?,
        feedback_summary: row.get(7)?,
        memory_rating: opt_text_col(row, 8)?,
        created_at: text_col(row, 9)?,
    })
}

fn schedule_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<ReviewSchedule> {
    Ok(ReviewSchedule {
        id: text_col(row, offset)?,
        problem_id: text_col(row, offset + 1)?,
        user_id: row.get(offset + 2)?,
        current_interval_days: row.get(offset + 3)?,
        next_review_date: text_col(row, offset + 4)?,
        last_review_date: opt_text_col(row, offset + 5)?,
        active: row.get(offset + 6)?,
        version: row.get(offset + 7)?,
    })
}
