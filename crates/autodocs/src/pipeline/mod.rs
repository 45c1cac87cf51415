pub mod config;
pub mod context;
pub mod error;
pub mod outcome;
pub mod progress;
pub mod runner;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::PipelineError;
pub use outcome::RunOutcome;
pub use progress::{BroadcastProgress, NoopProgress, ProgressReporter};
pub use runner::Pipeline;
