use thiserror::Error;

/// Failures that end a run without a retry.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Storage failed: {0}")]
    Storage(#[from] crate::error::StorageError),

    #[error("Provider call failed: {0}")]
    Provider(crate::provider::ProviderError),

    #[error("Database update failed: {0}")]
    Database(#[from] crate::db::DatabaseError),
}
