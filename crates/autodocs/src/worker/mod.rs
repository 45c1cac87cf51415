pub mod pool;
pub mod queue;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod task;

pub use pool::WorkerPool;
pub use queue::JobQueue;
pub use retry::RetryPolicy;
pub use runner::TaskRunner;
pub use scheduler::RetryScheduler;
pub use task::{Task, TaskOutcome, TaskReport};

