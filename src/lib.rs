pub mod adapters;
pub mod app;
pub mod domain;
pub mod ports;
pub mod services;

// Re-export key types for convenience

// Domain types - value objects, sweep models and errors
pub use domain::{
    BucketName,
    DomainValidationError,
    ObjectKey,
    RetentionPolicy,
    StorageError,
    SweepError,
    SweepProgress,
    SweepReport,
    SweepRequest,
    SweepStage,
    VersionCounts,
    VersionId,
};

// Port types - interfaces for external systems
pub use ports::{SweepService, VersionedBucketClient};

// Service implementations - business logic
pub use services::RetentionSweepService;

// Application factory and configuration
pub use app::{run_sweep, AppBuilder, AppError, StorageBackend, SweepConfig};

// Adapter types - infrastructure implementations
pub use adapters::outbound::storage::{InMemoryVersionedBucket, S3Config, S3VersionedClient};

// Public facade for easy construction
pub mod prelude {
    pub use crate::{
        run_sweep, AppBuilder, BucketName, InMemoryVersionedBucket, RetentionSweepService,
        S3VersionedClient, StorageBackend, SweepConfig, SweepError, SweepReport, SweepRequest,
        SweepService, VersionedBucketClient,
    };
    pub use tokio_util::sync::CancellationToken;
}
