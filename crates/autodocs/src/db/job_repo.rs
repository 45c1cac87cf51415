//! Job repository: CRUD and status transitions for the `jobs` table.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{now_timestamp, Database, DatabaseError};
use crate::job::{JobStatus, PROGRESS_CREATED, PROGRESS_STARTED};

/// A job row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    pub id: String,
    pub filename: String,
    pub upload_path: String,
    pub status: JobStatus,
    pub progress: u8,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    /// A fresh `pending` job for an upload that has just been stored.
    pub fn new(filename: impl Into<String>, upload_path: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            upload_path: upload_path.into(),
            status: JobStatus::Pending,
            progress: PROGRESS_CREATED,
            error_message: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status: String = row.get("status")?;
        let status = status.parse::<JobStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Self {
            id: row.get("id")?,
            filename: row.get("filename")?,
            upload_path: row.get("upload_path")?,
            status,
            progress: row.get("progress")?,
            error_message: row.get("error_message")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, filename, upload_path, status, progress, error_message,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                job.id,
                job.filename,
                job.upload_path,
                job.status.as_str(),
                job.progress,
                job.error_message,
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| find_in(conn, id))
}

fn find_in(conn: &Connection, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM jobs WHERE id = ?1",
            params![id],
            JobRow::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Lists jobs newest first.
pub fn list_recent(db: &Database, limit: Option<u64>) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(
            "SELECT * FROM jobs ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: JobStatus) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status.as_str()],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Moves a job to `to` if its current status allows it.
///
/// The check and the write happen in one conditional `UPDATE`, so a
/// concurrent writer cannot slip a forbidden transition in between.
pub(crate) fn transition_in(
    conn: &Connection,
    id: &str,
    to: JobStatus,
    progress: u8,
    error_message: Option<&str>,
) -> Result<(), DatabaseError> {
    let allowed = to
        .allowed_predecessors()
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE jobs SET status = ?2, progress = ?3, error_message = ?4, updated_at = ?5
         WHERE id = ?1 AND status IN ({})",
        allowed
    );

    let changed = conn.execute(
        &sql,
        params![id, to.as_str(), progress, error_message, now_timestamp()],
    )?;
    if changed == 1 {
        return Ok(());
    }

    match find_in(conn, id)? {
        None => Err(DatabaseError::JobNotFound(id.to_string())),
        Some(current) => Err(DatabaseError::InvalidTransition {
            id: id.to_string(),
            from: current.status,
            to,
        }),
    }
}

/// `pending | processing → processing`, progress 5.
pub fn mark_processing(db: &Database, id: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| transition_in(conn, id, JobStatus::Processing, PROGRESS_STARTED, None))
}

/// `processing → failed`, keeping the current progress and recording `error`.
pub fn mark_failed(db: &Database, id: &str, error: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let progress = find_in(conn, id)?
            .map(|j| j.progress)
            .ok_or_else(|| DatabaseError::JobNotFound(id.to_string()))?;
        transition_in(conn, id, JobStatus::Failed, progress, Some(error))
    })
}

/// Any status → `pending`, progress 0, error cleared. Used by operator re-enqueue.
pub fn reset_pending(db: &Database, id: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| transition_in(conn, id, JobStatus::Pending, PROGRESS_CREATED, None))
}
