use super::{StorageError, ValidationError};
use crate::domain::models::{SweepProgress, SweepStage};

/// Stage-level failures of a sweep.
///
/// Item-level delete failures never surface here; they are collected in the
/// report instead.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Invalid sweep configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("Invalid access or secret key: {source}")]
    Authentication { source: StorageError },

    #[error("Could not reach storage backend: {source}")]
    Connection { source: StorageError },

    #[error("Listing failed {progress}: {source}")]
    TransientList {
        progress: SweepProgress,
        source: StorageError,
    },

    #[error("Bucket '{bucket}' does not exist, stopped {progress}")]
    BucketNotFound {
        bucket: String,
        progress: SweepProgress,
    },

    #[error("Delete request failed {progress}: {source}")]
    BatchDelete {
        progress: SweepProgress,
        source: StorageError,
    },

    #[error("Recount failed {progress}: {source}")]
    Reconcile {
        progress: SweepProgress,
        source: StorageError,
    },

    #[error("Sweep cancelled {progress}")]
    Cancelled { progress: SweepProgress },
}

impl SweepError {
    /// Stage the sweep was in when it stopped
    pub fn stage(&self) -> SweepStage {
        match self {
            SweepError::InvalidConfig(_)
            | SweepError::Authentication { .. }
            | SweepError::Connection { .. } => SweepStage::Start,
            SweepError::TransientList { progress, .. }
            | SweepError::BucketNotFound { progress, .. }
            | SweepError::BatchDelete { progress, .. }
            | SweepError::Reconcile { progress, .. }
            | SweepError::Cancelled { progress } => progress.stage,
        }
    }

    pub fn progress(&self) -> Option<&SweepProgress> {
        match self {
            SweepError::TransientList { progress, .. }
            | SweepError::BucketNotFound { progress, .. }
            | SweepError::BatchDelete { progress, .. }
            | SweepError::Reconcile { progress, .. }
            | SweepError::Cancelled { progress } => Some(progress),
            _ => None,
        }
    }

    /// True if the bucket may have been modified before the failure
    pub fn deletions_issued(&self) -> bool {
        self.progress()
            .map_or(false, SweepProgress::deletions_issued)
    }
}

/// Result type for sweep operations
pub type SweepResult<T> = Result<T, SweepError>;
