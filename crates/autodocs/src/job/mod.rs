pub mod artifact;
pub mod status;

pub use artifact::{ArtifactKind, PLACEHOLDER_MARKER};
pub use status::{JobStatus, UnknownStatus, PROGRESS_CREATED, PROGRESS_DONE, PROGRESS_STARTED};
