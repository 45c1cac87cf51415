//! Job event broadcaster for real-time status streaming.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::{JobStatus, PROGRESS_DONE, PROGRESS_STARTED};

/// Step a job is in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Queued,
    Started,
    ExtractingContext,
    Generating,
    Persisting,
    Rescheduled,
    Completed,
    Failed,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Queued => write!(f, "Queued"),
            JobPhase::Started => write!(f, "Started"),
            JobPhase::ExtractingContext => write!(f, "Extracting context"),
            JobPhase::Generating => write!(f, "Generating"),
            JobPhase::Persisting => write!(f, "Persisting"),
            JobPhase::Rescheduled => write!(f, "Rescheduled"),
            JobPhase::Completed => write!(f, "Completed"),
            JobPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// One status update for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: String,
    pub phase: JobPhase,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobEvent {
    pub fn new(job_id: &str, phase: JobPhase, status: JobStatus, progress: u8, message: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            phase,
            status,
            progress,
            message: message.to_string(),
            timestamp: Utc::now(),
            error: None,
        }
    }
}

/// Fans job events out to any number of subscribers.
#[derive(Clone)]
pub struct JobEventBroadcaster {
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl JobEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: JobEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    /// Tracker that stamps events with `job_id`.
    pub fn tracker(&self, job_id: &str) -> JobEventTracker {
        JobEventTracker {
            job_id: job_id.to_string(),
            sender: Arc::clone(&self.sender),
        }
    }
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Emits events for a single job.
#[derive(Clone)]
pub struct JobEventTracker {
    job_id: String,
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl JobEventTracker {
    fn emit(&self, event: JobEvent) {
        let _ = self.sender.send(event);
    }

    pub fn queued(&self) {
        self.emit(JobEvent::new(&self.job_id, JobPhase::Queued, JobStatus::Pending, 0, "Job queued for processing"));
    }

    pub fn started(&self, retries: u32) {
        let message = if retries == 0 {
            "Job picked up by a worker".to_string()
        } else {
            format!("Job picked up by a worker (retry {})", retries)
        };
        self.emit(JobEvent::new(
            &self.job_id,
            JobPhase::Started,
            JobStatus::Processing,
            PROGRESS_STARTED,
            &message,
        ));
    }

    /// Intermediate step while the job is processing.
    pub fn phase(&self, phase: JobPhase, message: &str) {
        self.emit(JobEvent::new(&self.job_id, phase, JobStatus::Processing, PROGRESS_STARTED, message));
    }

    pub fn rescheduled(&self, delay: Duration, retries: u32) {
        self.emit(JobEvent::new(
            &self.job_id,
            JobPhase::Rescheduled,
            JobStatus::Processing,
            PROGRESS_STARTED,
            &format!("Provider rate limited, retry {} in {}s", retries, delay.as_secs()),
        ));
    }

    pub fn completed(&self, artifact_count: usize) {
        self.emit(JobEvent::new(
            &self.job_id,
            JobPhase::Completed,
            JobStatus::Completed,
            PROGRESS_DONE,
            &format!("Generated {} artifacts", artifact_count),
        ));
    }

    pub fn failed(&self, error: &str) {
        let mut event = JobEvent::new(&self.job_id, JobPhase::Failed, JobStatus::Failed, PROGRESS_STARTED, "Processing failed");
        event.error = Some(error.to_string());
        self.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_without_subscribers_is_fine() {
        let broadcaster = JobEventBroadcaster::default();
        broadcaster.tracker("job-1").queued();
    }

    #[test]
    fn test_tracker_events_reach_subscribers() {
        let broadcaster = JobEventBroadcaster::new(16);
        let mut rx = broadcaster.subscribe();
        let tracker = broadcaster.tracker("job-1");

        tracker.started(0);
        tracker.phase(JobPhase::Generating, "Generating artifacts");
        tracker.completed(5);

        let started = rx.try_recv().unwrap();
        assert_eq!(started.job_id, "job-1");
        assert_eq!(started.status, JobStatus::Processing);
        assert_eq!(started.progress, PROGRESS_STARTED);

        assert_eq!(rx.try_recv().unwrap().phase, JobPhase::Generating);

        let done = rx.try_recv().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress, 100);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failed_event_carries_error() {
        let broadcaster = JobEventBroadcaster::new(4);
        let mut rx = broadcaster.subscribe();
        broadcaster.tracker("job-2").failed("disk full");

        let event = rx.try_recv().unwrap();
        assert_eq!(event.status, JobStatus::Failed);
        assert_eq!(event.error.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = JobEvent::new("job-3", JobPhase::Queued, JobStatus::Pending, 0, "queued");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["jobId"], "job-3");
        assert_eq!(json["phase"], "queued");
        assert_eq!(json["status"], "pending");
        assert!(json.get("error").is_none());
    }
}
