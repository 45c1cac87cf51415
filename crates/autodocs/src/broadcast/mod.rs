//! Broadcasting of job status events for real-time streaming.

pub mod job_events;

pub use job_events::{JobEvent, JobEventBroadcaster, JobEventTracker, JobPhase};
