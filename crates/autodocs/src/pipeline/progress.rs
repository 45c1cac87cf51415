use crate::broadcast::{JobEventTracker, JobPhase};

/// Sink for the pipeline's step notifications.
pub trait ProgressReporter: Send + Sync {
    fn phase(&self, phase: JobPhase, message: &str);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn phase(&self, _phase: JobPhase, _message: &str) {}
}

/// Bridges pipeline steps to the job event broadcast channel.
pub struct BroadcastProgress {
    tracker: JobEventTracker,
}

impl BroadcastProgress {
    pub fn new(tracker: JobEventTracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &JobEventTracker {
        &self.tracker
    }
}

impl ProgressReporter for BroadcastProgress {
    fn phase(&self, phase: JobPhase, message: &str) {
        self.tracker.phase(phase, message);
    }
}
