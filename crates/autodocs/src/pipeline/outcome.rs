use std::time::Duration;

use crate::db::ArtifactRow;

/// Result of one pipeline run.
#[derive(Debug)]
pub enum RunOutcome {
    /// All five artifacts written and registered; the job is completed.
    Success(Vec<ArtifactRow>),
    /// The provider rate-limited the run. Retry the whole run after the delay.
    RetryAfter(Duration),
    /// Unrecoverable; the message becomes the job's error.
    Fatal(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }
}
