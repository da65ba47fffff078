pub mod report;
pub mod retention;
pub mod sweep;
pub mod version;

pub use report::{
    BatchResult, ConfirmedDeletion, DeletionSummary, ItemDeleteFailure, SweepReport, VersionCounts,
};
pub use retention::{Disposition, RetentionPolicy};
pub use sweep::{ReconcileScope, SweepProgress, SweepRequest, SweepStage, MAX_DELETE_BATCH};
pub use version::{
    CandidateKind, DeleteMarkerRecord, DeletionCandidate, ListCursor, VersionPage, VersionRecord,
};
