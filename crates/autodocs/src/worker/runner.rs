use log::{debug, error, info, warn};

use crate::broadcast::{JobEventBroadcaster, JobEventTracker};
use crate::db::{job_repo, Database, DatabaseError};
use crate::pipeline::{BroadcastProgress, NoopProgress, Pipeline, PipelineContext, RunOutcome};

use super::retry::RetryPolicy;
use super::task::{Task, TaskOutcome};

/// Drives one task through the job state machine around a pipeline run.
pub struct TaskRunner {
    db: Database,
    pipeline: Pipeline,
    policy: RetryPolicy,
    events: Option<JobEventBroadcaster>,
}

impl TaskRunner {
    pub fn new(db: Database, pipeline: Pipeline, events: Option<JobEventBroadcaster>) -> Self {
        let policy = pipeline.config().retry;
        Self {
            db,
            pipeline,
            policy,
            events,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn execute(&self, task: &Task) -> TaskOutcome {
        let tracker = self.events.as_ref().map(|e| e.tracker(&task.job_id));

        let job = match job_repo::find_by_id(&self.db, &task.job_id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!("Job {} not found, dropping task", task.job_id);
                return TaskOutcome::JobNotFound;
            }
            Err(e) => {
                error!("Failed to load job {}: {}", task.job_id, e);
                return TaskOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        match job_repo::mark_processing(&self.db, &task.job_id) {
            Ok(()) => {}
            Err(DatabaseError::InvalidTransition { from, .. }) => {
                info!("Job {} is {}, skipping task", task.job_id, from);
                return TaskOutcome::Skipped { status: from };
            }
            Err(DatabaseError::JobNotFound(_)) => return TaskOutcome::JobNotFound,
            Err(e) => {
                error!("Failed to start job {}: {}", task.job_id, e);
                return TaskOutcome::Failed {
                    error: e.to_string(),
                };
            }
        }

        if let Some(t) = &tracker {
            t.started(task.retries);
        }
        debug!("Running job {} ({}), retry {}", job.id, job.filename, task.retries);

        let ctx = PipelineContext::new(&task.job_id, &task.upload_path, task.retries);
        let (outcome, _ctx) = match &tracker {
            Some(t) => self.pipeline.run(ctx, &BroadcastProgress::new(t.clone())),
            None => self.pipeline.run(ctx, &NoopProgress),
        };

        self.settle(task, outcome, tracker.as_ref())
    }

    /// Maps a run outcome onto the job row and the task outcome.
    fn settle(&self, task: &Task, outcome: RunOutcome, tracker: Option<&JobEventTracker>) -> TaskOutcome {
        match outcome {
            RunOutcome::Success(artifacts) => {
                info!("Job {} completed with {} artifacts", task.job_id, artifacts.len());
                if let Some(t) = tracker {
                    t.completed(artifacts.len());
                }
                TaskOutcome::Completed { artifacts }
            }
            RunOutcome::RetryAfter(delay) if self.policy.can_retry(task.retries) => {
                let retries = task.retries + 1;
                info!(
                    "Job {} rate limited, retry {}/{} in {:?}",
                    task.job_id, retries, self.policy.max_retries, delay
                );
                if let Some(t) = tracker {
                    t.rescheduled(delay, retries);
                }
                TaskOutcome::Rescheduled { delay, retries }
            }
            RunOutcome::RetryAfter(_) => {
                let message = format!(
                    "Provider rate limit persisted after {} retries",
                    task.retries
                );
                self.fail(task, message, tracker)
            }
            RunOutcome::Fatal(message) => self.fail(task, message, tracker),
        }
    }

    /// Fails a rate-limited job whose retry could not be handed to the scheduler.
    pub fn abandon_retry(&self, task: &Task, reason: &str) -> TaskOutcome {
        let tracker = self.events.as_ref().map(|e| e.tracker(&task.job_id));
        let message = format!("Retry could not be scheduled: {}", reason);
        self.fail(task, message, tracker.as_ref())
    }

    fn fail(&self, task: &Task, message: String, tracker: Option<&JobEventTracker>) -> TaskOutcome {
        warn!("Job {} failed: {}", task.job_id, message);
        if let Err(e) = job_repo::mark_failed(&self.db, &task.job_id, &message) {
            error!("Failed to record failure for job {}: {}", task.job_id, e);
        }
        if let Some(t) = tracker {
            t.failed(&message);
        }
        TaskOutcome::Failed { error: message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::JobPhase;
    use crate::config::Settings;
    use crate::db::JobRow;
    use crate::job::JobStatus;
    use crate::pipeline::PipelineConfig;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        db: Database,
        upload: PathBuf,
        settings: Settings,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let mut settings = Settings::default();
            settings.uploads_dir = dir.path().join("uploads").display().to_string();
            settings.artifacts_dir = dir.path().join("artifacts").display().to_string();
            settings.retry.max_retries = 2;
            settings.retry.backoff_base_secs = 1;

            std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
            let upload = dir.path().join("uploads").join("app.py");
            std::fs::write(&upload, "print('hello')").unwrap();

            Self {
                _dir: dir,
                db: Database::open_in_memory().unwrap(),
                upload,
                settings,
            }
        }

        fn runner(&self, key: Option<&str>, events: Option<JobEventBroadcaster>) -> TaskRunner {
            let key = key.map(str::to_string);
            let config = PipelineConfig::from_settings_with(&self.settings, |name| {
                (name == "OPENAI_API_KEY").then(|| key.clone()).flatten()
            })
            .unwrap();
            let pipeline = Pipeline::from_config(Arc::new(config), self.db.clone());
            TaskRunner::new(self.db.clone(), pipeline, events)
        }

        fn job(&self) -> JobRow {
            let job = JobRow::new("app.py", self.upload.display().to_string());
            job_repo::insert(&self.db, &job).unwrap();
            job
        }

        fn status(&self, id: &str) -> JobRow {
            job_repo::find_by_id(&self.db, id).unwrap().unwrap()
        }
    }

    fn rate_limited_server() -> (mockito::ServerGuard, mockito::Mock) {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .create();
        (server, mock)
    }

    #[test]
    fn test_unknown_job_is_not_found() {
        let fx = Fixture::new();
        let outcome = fx.runner(None, None).execute(&Task::new("missing", &fx.upload));
        assert!(matches!(outcome, TaskOutcome::JobNotFound));
    }

    #[test]
    fn test_completed_job_is_skipped() {
        let mut fx = Fixture::new();
        fx.settings.safe_mode = true;
        let job = fx.job();
        let runner = fx.runner(None, None);

        let first = runner.execute(&Task::new(&job.id, &fx.upload));
        assert!(matches!(first, TaskOutcome::Completed { .. }));

        let second = runner.execute(&Task::new(&job.id, &fx.upload));
        assert!(matches!(
            second,
            TaskOutcome::Skipped {
                status: JobStatus::Completed
            }
        ));
    }

    #[test]
    fn test_success_emits_events_in_order() {
        let mut fx = Fixture::new();
        fx.settings.safe_mode = true;
        let job = fx.job();
        let events = JobEventBroadcaster::new(32);
        let mut rx = events.subscribe();

        let outcome = fx.runner(None, Some(events)).execute(&Task::new(&job.id, &fx.upload));

        match outcome {
            TaskOutcome::Completed { artifacts } => assert_eq!(artifacts.len(), 5),
            other => panic!("expected completion, got {:?}", other),
        }
        let phases: Vec<JobPhase> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![
                JobPhase::Started,
                JobPhase::ExtractingContext,
                JobPhase::Generating,
                JobPhase::Persisting,
                JobPhase::Completed,
            ]
        );
        assert_eq!(fx.status(&job.id).status, JobStatus::Completed);
    }

    #[test]
    fn test_rate_limit_with_retries_left_keeps_job_processing() {
        let (server, _mock) = rate_limited_server();
        let mut fx = Fixture::new();
        fx.settings.provider.base_url = server.url();
        let job = fx.job();

        let outcome = fx.runner(Some("sk-test"), None).execute(&Task::new(&job.id, &fx.upload));

        match outcome {
            TaskOutcome::Rescheduled { delay, retries } => {
                assert_eq!(delay, Duration::from_secs(1));
                assert_eq!(retries, 1);
            }
            other => panic!("expected reschedule, got {:?}", other),
        }
        let stored = fx.status(&job.id);
        assert_eq!(stored.status, JobStatus::Processing);
        assert!(stored.error_message.is_none());
    }

    #[test]
    fn test_rate_limit_after_last_retry_fails_job() {
        let (server, _mock) = rate_limited_server();
        let mut fx = Fixture::new();
        fx.settings.provider.base_url = server.url();
        let job = fx.job();
        let runner = fx.runner(Some("sk-test"), None);

        let mut task = Task::new(&job.id, &fx.upload);
        let mut outcomes = Vec::new();
        loop {
            let outcome = runner.execute(&task);
            let done = outcome.is_final();
            outcomes.push(outcome);
            if done {
                break;
            }
            assert_eq!(fx.status(&job.id).status, JobStatus::Processing);
            task = task.next_retry();
        }

        // Initial run plus two retries
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes.last(), Some(TaskOutcome::Failed { .. })));
        let stored = fx.status(&job.id);
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored.error_message.unwrap().contains("rate limit"));
    }

    #[test]
    fn test_fatal_run_records_error() {
        let fx = Fixture::new();
        let job = fx.job();
        std::fs::remove_file(&fx.upload).unwrap();

        let outcome = fx.runner(None, None).execute(&Task::new(&job.id, &fx.upload));

        assert!(matches!(outcome, TaskOutcome::Failed { .. }));
        let stored = fx.status(&job.id);
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.progress, 5);
        assert!(stored.error_message.unwrap().contains("app.py"));
    }
}
