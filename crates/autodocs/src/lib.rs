pub mod api;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod provider;
pub mod sanitize;
pub mod secrets;
pub mod storage;
pub mod worker;

pub use api::{ApiError, AutoDocs, JobList, JobView};
pub use broadcast::{JobEvent, JobEventBroadcaster};
pub use config::{load_settings, load_settings_with_env, Settings};
pub use db::Database;
pub use error::{AutoDocsError, ConfigError, Result, StorageError, WorkerError};
pub use job::{ArtifactKind, JobStatus};
pub use pipeline::{Pipeline, PipelineConfig, PipelineContext, RunOutcome};
pub use provider::ProviderError;
pub use secrets::{resolve_secret, SecretError};
pub use worker::{JobQueue, Task, TaskOutcome, WorkerPool};
