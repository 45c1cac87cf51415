use std::net::ToSocketAddrs;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use reqwest::Url;

use crate::config::Settings;
use crate::db::{artifact_repo, job_repo, Database, JobRow};
use crate::job::PLACEHOLDER_MARKER;
use crate::sanitize;
use crate::secrets;
use crate::storage::FileStorage;
use crate::worker::JobQueue;

use super::error::ApiError;
use super::models::{ArtifactDownload, Health, JobList, JobView, ProviderStatus, Reprocessed};

/// Request-side operations: store uploads, enqueue work, read results.
///
/// Nothing here runs the pipeline; work is handed to the [`JobQueue`].
#[derive(Clone)]
pub struct AutoDocs {
    settings: Arc<Settings>,
    db: Database,
    storage: FileStorage,
    queue: Arc<dyn JobQueue>,
}

impl AutoDocs {
    pub fn new(settings: Arc<Settings>, db: Database, queue: Arc<dyn JobQueue>) -> Self {
        let storage = FileStorage::from_settings(&settings);
        Self {
            settings,
            db,
            storage,
            queue,
        }
    }

    pub fn upload(&self, filename: &str, content: &[u8]) -> Result<JobView, ApiError> {
        if filename.trim().is_empty() {
            return Err(ApiError::BadRequest("File must have a name".to_string()));
        }

        let stored = self.storage.save_upload(filename, content)?;
        let job = JobRow::new(&stored.filename, stored.path.display().to_string());
        job_repo::insert(&self.db, &job)?;
        info!("Created job {} for {}", job.id, stored.filename);

        self.queue.enqueue(&job.id, &stored.path)?;
        Ok(JobView::new(job, Vec::new()))
    }

    /// All jobs, newest first, with their artifacts.
    pub fn list_jobs(&self) -> Result<JobList, ApiError> {
        let jobs = job_repo::list_recent(&self.db, None)?;
        let items = jobs
            .into_iter()
            .map(|job| -> Result<JobView, ApiError> {
                let artifacts = artifact_repo::list_for_job(&self.db, &job.id)?;
                Ok(JobView::new(job, artifacts))
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        Ok(JobList {
            total: items.len(),
            items,
        })
    }

    pub fn get_job(&self, job_id: &str) -> Result<JobView, ApiError> {
        let job = job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;
        let artifacts = artifact_repo::list_for_job(&self.db, job_id)?;
        Ok(JobView::new(job, artifacts))
    }

    /// Reads `<artifacts_dir>/<job_id>/<filename>`.
    ///
    /// When a download token is configured, `authorization` must be
    /// `Bearer <token>`; this is checked before the file is looked up, so
    /// such callers get `Unauthorized` (401) before `NotFound` (404).
    pub fn download_artifact(
        &self,
        job_id: &str,
        filename: &str,
        authorization: Option<&str>,
    ) -> Result<ArtifactDownload, ApiError> {
        if let Some(token) = self.settings.download_token.as_deref() {
            if bearer_token(authorization.unwrap_or_default()) != Some(token) {
                return Err(ApiError::Unauthorized);
            }
        }

        let path = self
            .storage
            .resolve_artifact(job_id, filename)
            .ok_or_else(|| ApiError::NotFound("Artifact not found".to_string()))?;
        let bytes = self.storage.read_file(&path)?;

        Ok(ArtifactDownload {
            filename: filename.to_string(),
            content_type: "application/octet-stream",
            bytes,
        })
    }

    /// Resets a job to `pending` and enqueues it again against its stored upload.
    pub fn requeue(&self, job_id: &str) -> Result<JobView, ApiError> {
        let job = job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

        self.reset_and_enqueue(&job)?;
        self.get_job(job_id)
    }

    /// Re-enqueues every job with an artifact still holding placeholder text.
    pub fn reprocess_placeholders(&self) -> Result<Reprocessed, ApiError> {
        let job_ids = artifact_repo::job_ids_with_content(&self.db, PLACEHOLDER_MARKER)?;

        let mut reprocessed = Vec::with_capacity(job_ids.len());
        for job_id in job_ids {
            let Some(job) = job_repo::find_by_id(&self.db, &job_id)? else {
                continue;
            };
            match self.reset_and_enqueue(&job) {
                Ok(()) => reprocessed.push(job_id),
                Err(e) => warn!("Could not reprocess job {}: {}", job_id, e),
            }
        }

        info!("Re-enqueued {} jobs with placeholder artifacts", reprocessed.len());
        Ok(Reprocessed { reprocessed })
    }

    pub fn provider_status(&self) -> ProviderStatus {
        let provider = &self.settings.provider;
        let api_key_present = match secrets::resolve_provider_key(provider, |n| std::env::var(n).ok()) {
            Ok(key) => key.is_some(),
            Err(e) => {
                warn!("Provider key could not be read: {}", e);
                false
            }
        };
        let configured = api_key_present && !provider.base_url.trim().is_empty();

        ProviderStatus {
            configured,
            resolvable: configured && host_resolves(&provider.base_url),
            base_url: sanitize::redact_url(&provider.base_url),
            model: provider.model.clone(),
            api_key_present,
            safe_mode: self.settings.safe_mode,
        }
    }

    pub fn health(&self) -> Health {
        Health {
            status: "ok",
            environment: self.settings.environment.clone(),
        }
    }

    fn reset_and_enqueue(&self, job: &JobRow) -> Result<(), ApiError> {
        job_repo::reset_pending(&self.db, &job.id)?;
        self.queue.enqueue(&job.id, Path::new(&job.upload_path))?;
        info!("Re-enqueued job {}", job.id);
        Ok(())
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` value.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(char::is_whitespace)?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

fn host_resolves(base_url: &str) -> bool {
    let Ok(url) = Url::parse(base_url) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let port = url.port_or_known_default().unwrap_or(443);

    (host, port)
        .to_socket_addrs()
        .map(|mut addrs| addrs.next().is_some())
        .unwrap_or(false)
}
