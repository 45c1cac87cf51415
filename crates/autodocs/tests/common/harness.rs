//! Test harness for isolated end-to-end runs.
//!
//! The `TestHarness` struct owns:
//! - A temporary directory with `uploads/` and `artifacts/`
//! - An in-memory job store
//! - A worker pool and API facade wired the way the binary wires them

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use autodocs::api::AutoDocs;
use autodocs::config::Settings;
use autodocs::db::Database;
use autodocs::pipeline::PipelineConfig;
use autodocs::worker::{JobQueue, TaskOutcome, TaskReport, WorkerPool};

use super::builders::SettingsBuilder;

/// Longest a test waits for a job to settle.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct TestHarness {
    temp_dir: TempDir,
    pub uploads_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub settings: Arc<Settings>,
    pub db: Database,
    pub api: AutoDocs,
    pool: Option<Arc<WorkerPool>>,
}

impl TestHarness {
    /// Harness with default test settings (no credentials).
    pub fn new() -> Self {
        Self::with_settings(SettingsBuilder::new())
    }

    /// Harness whose directories are rooted in a fresh temp dir.
    pub fn with_settings(builder: SettingsBuilder) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let uploads_dir = temp_dir.path().join("uploads");
        let artifacts_dir = temp_dir.path().join("artifacts");

        let mut settings = builder.build();
        settings.uploads_dir = uploads_dir.display().to_string();
        settings.artifacts_dir = artifacts_dir.display().to_string();
        settings.database_path = temp_dir.path().join("autodocs.db").display().to_string();
        let settings = Arc::new(settings);

        let db = Database::open_in_memory().expect("Failed to open database");
        let config = PipelineConfig::from_settings_with(&settings, |_| None)
            .expect("Failed to build pipeline config");
        let pool = Arc::new(
            WorkerPool::new(Arc::new(config), db.clone(), settings.worker_count, None)
                .expect("Failed to start worker pool"),
        );
        let queue: Arc<dyn JobQueue> = pool.clone();
        let api = AutoDocs::new(Arc::clone(&settings), db.clone(), queue);

        Self {
            temp_dir,
            uploads_dir,
            artifacts_dir,
            settings,
            db,
            api,
            pool: Some(pool),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn pool(&self) -> &WorkerPool {
        self.pool.as_ref().expect("Pool already stopped")
    }

    /// Next report from the pool, or `None` on timeout.
    pub fn next_report(&self, timeout: Duration) -> Option<TaskReport> {
        self.pool().recv_result_timeout(timeout)
    }

    /// Waits for the final outcome of `job_id`, collecting every report for it.
    pub fn wait_for_final(&self, job_id: &str) -> Vec<TaskOutcome> {
        let deadline = Instant::now() + SETTLE_TIMEOUT;
        let mut outcomes = Vec::new();

        while Instant::now() < deadline {
            let Some(report) = self.next_report(Duration::from_millis(200)) else {
                continue;
            };
            if report.job_id != job_id {
                continue;
            }
            let done = report.outcome.is_final();
            outcomes.push(report.outcome);
            if done {
                return outcomes;
            }
        }

        panic!("Job {} did not settle within {:?}", job_id, SETTLE_TIMEOUT);
    }

    /// Uploads `content` and waits for its job to settle.
    pub fn upload_and_wait(&self, filename: &str, content: &[u8]) -> (String, Vec<TaskOutcome>) {
        let job = self.api.upload(filename, content).expect("Upload failed");
        let outcomes = self.wait_for_final(&job.id);
        (job.id, outcomes)
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown();
            // The facade still holds a queue handle, so the pool cannot be
            // unwrapped here; threads exit on the shutdown flag.
        }
    }
}
