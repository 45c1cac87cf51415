//! Read models returned by the API facade.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{parse_timestamp, ArtifactRow, JobRow};
use crate::job::{ArtifactKind, JobStatus};

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub title: String,
    pub path: Option<String>,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ArtifactRow> for ArtifactView {
    fn from(row: ArtifactRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            title: row.title,
            path: row.path,
            content: row.content,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: String,
    pub filename: String,
    pub status: JobStatus,
    pub progress: u8,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub artifacts: Vec<ArtifactView>,
}

impl JobView {
    pub fn new(job: JobRow, artifacts: Vec<ArtifactRow>) -> Self {
        Self {
            id: job.id,
            filename: job.filename,
            status: job.status,
            progress: job.progress,
            error_message: job.error_message,
            created_at: parse_timestamp(&job.created_at),
            updated_at: parse_timestamp(&job.updated_at),
            artifacts: artifacts.into_iter().map(ArtifactView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobList {
    pub items: Vec<JobView>,
    pub total: usize,
}

/// An artifact file ready to be served.
#[derive(Debug, Clone)]
pub struct ArtifactDownload {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    /// Credentials and a base URL are both present.
    pub configured: bool,
    /// The base URL's host resolves via DNS. Only checked when configured.
    pub resolvable: bool,
    pub base_url: String,
    pub model: String,
    pub api_key_present: bool,
    pub safe_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reprocessed {
    pub reprocessed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub environment: String,
}

/// Response wrapper for callers that want a uniform envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl<T> From<Result<T, super::ApiError>> for ApiResponse<T> {
    fn from(result: Result<T, super::ApiError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_view_serializes_artifact_type() {
        let job = JobRow::new("demo.zip", "/tmp/demo.zip");
        let artifact = ArtifactRow::new(&job.id, ArtifactKind::ApiDocs, "/tmp/a/api_docs.md", "# API Docs");
        let view = JobView::new(job, vec![artifact]);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["progress"], 0);
        assert!(json["error_message"].is_null());
        assert_eq!(json["artifacts"][0]["type"], "api_docs");
        assert_eq!(json["artifacts"][0]["title"], "API Docs");
    }

    #[test]
    fn test_api_response_from_result() {
        let ok: ApiResponse<u8> = Ok(1).into();
        assert!(ok.success);
        let err: ApiResponse<u8> = Err(super::super::ApiError::Unauthorized).into();
        assert_eq!(err.error.as_deref(), Some("Unauthorized"));
    }
}
