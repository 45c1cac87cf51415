use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::{StorageError, WorkerError};

/// Errors surfaced to API callers, each mapped to an HTTP status.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Queue unavailable: {0}")]
    Queue(#[from] WorkerError),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized => 401,
            ApiError::NotFound(_) => 404,
            ApiError::Database(_) | ApiError::Storage(_) => 500,
            ApiError::Queue(_) => 503,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidName(name) => ApiError::BadRequest(format!("Invalid file name: {}", name)),
            other => ApiError::Storage(other),
        }
    }
}
