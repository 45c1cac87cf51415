use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::ArtifactRow;
use crate::job::JobStatus;

/// One unit of work: run the pipeline for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub job_id: String,
    pub upload_path: PathBuf,
    /// How many times this run has already been rescheduled.
    pub retries: u32,
}

impl Task {
    pub fn new(job_id: impl Into<String>, upload_path: impl AsRef<Path>) -> Self {
        Self {
            job_id: job_id.into(),
            upload_path: upload_path.as_ref().to_path_buf(),
            retries: 0,
        }
    }

    /// The same task with its retry count bumped.
    pub fn next_retry(&self) -> Self {
        Self {
            retries: self.retries + 1,
            ..self.clone()
        }
    }
}

/// What happened to a task.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed { artifacts: Vec<ArtifactRow> },
    /// Rate limited; the job stays `processing` until the retry runs.
    Rescheduled { delay: Duration, retries: u32 },
    Failed { error: String },
    JobNotFound,
    /// The job's status did not allow it to enter `processing`.
    Skipped { status: JobStatus },
}

impl TaskOutcome {
    /// Whether the job reached a state no further work on this task will change.
    pub fn is_final(&self) -> bool {
        !matches!(self, TaskOutcome::Rescheduled { .. })
    }
}

/// Outcome of a task as reported on the pool's result channel.
#[derive(Debug)]
pub struct TaskReport {
    pub job_id: String,
    pub outcome: TaskOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_retry_keeps_identity() {
        let task = Task::new("job-1", "/tmp/uploads/p.zip");
        let retry = task.next_retry().next_retry();
        assert_eq!(retry.job_id, "job-1");
        assert_eq!(retry.upload_path, PathBuf::from("/tmp/uploads/p.zip"));
        assert_eq!(retry.retries, 2);
    }

    #[test]
    fn test_only_reschedule_is_not_final() {
        assert!(!TaskOutcome::Rescheduled {
            delay: Duration::from_secs(1),
            retries: 1
        }
        .is_final());
        assert!(TaskOutcome::JobNotFound.is_final());
        assert!(TaskOutcome::Failed {
            error: "x".to_string()
        }
        .is_final());
    }
}
