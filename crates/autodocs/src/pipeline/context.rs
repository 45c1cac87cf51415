use std::path::PathBuf;

use crate::db::ArtifactRow;
use crate::generation::GeneratedArtifact;

pub struct PipelineContext {
    // Input
    pub job_id: String,
    pub upload_path: PathBuf,
    /// Earlier reschedules of this run; drives the retry delay.
    pub retries: u32,

    // Step 1 result
    pub project_context: Option<String>,

    // Step 2 results
    pub strategy: Option<&'static str>,
    pub generated: Vec<GeneratedArtifact>,

    // Step 3 result
    pub artifacts: Vec<ArtifactRow>,
}

impl PipelineContext {
    pub fn new(job_id: impl Into<String>, upload_path: impl Into<PathBuf>, retries: u32) -> Self {
        Self {
            job_id: job_id.into(),
            upload_path: upload_path.into(),
            retries,
            project_context: None,
            strategy: None,
            generated: Vec::new(),
            artifacts: Vec::new(),
        }
    }
}
