pub mod services;
pub mod storage;

// Re-export all port traits for convenience
pub use services::SweepService;
pub use storage::{
    DeleteObjectError, DeleteObjectsOutcome, DeletedObject, ObjectIdentifier,
    VersionedBucketClient,
};
