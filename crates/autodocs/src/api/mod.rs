//! Request-side facade: uploads, job queries, downloads and operator actions.

pub mod error;
pub mod models;
pub mod service;

pub use error::ApiError;
pub use models::{
    ApiResponse, ArtifactDownload, ArtifactView, Health, JobList, JobView, ProviderStatus, Reprocessed,
};
pub use service::AutoDocs;
