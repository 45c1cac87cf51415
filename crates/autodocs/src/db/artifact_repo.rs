//! Artifact repository for the `artifacts` table.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{job_repo, now_timestamp, Database, DatabaseError};
use crate::job::{ArtifactKind, JobStatus, PROGRESS_DONE};

/// An artifact row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRow {
    pub id: String,
    pub job_id: String,
    pub kind: ArtifactKind,
    pub title: String,
    pub path: Option<String>,
    pub content: Option<String>,
    pub created_at: String,
}

impl ArtifactRow {
    pub fn new(
        job_id: impl Into<String>,
        kind: ArtifactKind,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_id: job_id.into(),
            kind,
            title: kind.title().to_string(),
            path: Some(path.into()),
            content: Some(content.into()),
            created_at: now_timestamp(),
        }
    }

    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let tag: String = row.get("type")?;
        let kind = ArtifactKind::from_type_tag(&tag).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown artifact type '{}'", tag).into(),
            )
        })?;

        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            kind,
            title: row.get("title")?,
            path: row.get("path")?,
            content: row.get("content")?,
            created_at: row.get("created_at")?,
        })
    }
}

fn insert_in(conn: &Connection, artifact: &ArtifactRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO artifacts (id, job_id, type, title, path, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            artifact.id,
            artifact.job_id,
            artifact.kind.type_tag(),
            artifact.title,
            artifact.path,
            artifact.content,
            artifact.created_at,
        ],
    )?;
    Ok(())
}

/// Inserts a single artifact row.
pub fn insert(db: &Database, artifact: &ArtifactRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_in(conn, artifact))
}

/// Lists a job's artifacts in generation order.
pub fn list_for_job(db: &Database, job_id: &str) -> Result<Vec<ArtifactRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM artifacts WHERE job_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![job_id], ArtifactRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn find_by_job_and_kind(
    db: &Database,
    job_id: &str,
    kind: ArtifactKind,
) -> Result<Option<ArtifactRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM artifacts WHERE job_id = ?1 AND type = ?2",
                params![job_id, kind.type_tag()],
                ArtifactRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Returns the distinct job ids whose artifact content contains `needle`.
pub fn job_ids_with_content(db: &Database, needle: &str) -> Result<Vec<String>, DatabaseError> {
    let pattern = format!("%{}%", escape_like(needle));
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT job_id FROM artifacts
             WHERE content LIKE ?1 ESCAPE '\\'
             ORDER BY job_id",
        )?;
        let ids = stmt
            .query_map(params![pattern], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    })
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Registers a full artifact set and marks the job completed, atomically.
///
/// Artifacts left by an earlier run of the same job are replaced. If the
/// job is no longer `processing` nothing is written.
pub fn complete_job_with_artifacts(
    db: &Database,
    job_id: &str,
    artifacts: &[ArtifactRow],
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        tx.execute("DELETE FROM artifacts WHERE job_id = ?1", params![job_id])?;
        for artifact in artifacts {
            insert_in(&tx, artifact)?;
        }
        job_repo::transition_in(&tx, job_id, JobStatus::Completed, PROGRESS_DONE, None)?;

        tx.commit()?;
        Ok(())
    })
}
