use std::path::Path;

use crate::error::WorkerError;

/// Hands a stored job to background processing.
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, job_id: &str, upload_path: &Path) -> Result<(), WorkerError>;
}
