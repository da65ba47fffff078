use crate::domain::{
    errors::SweepResult,
    models::{SweepReport, SweepRequest, VersionCounts},
    value_objects::BucketName,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Service port for retention sweeps
#[async_trait]
pub trait SweepService: Send + Sync + 'static {
    /// Check that the configured credentials are accepted by the backend
    async fn verify_credentials(&self) -> SweepResult<()>;

    /// Run one full sweep: enumerate, classify, delete, reconcile.
    ///
    /// Cancelling `cancel` stops the sweep at the next page or batch boundary.
    async fn sweep(
        &self,
        request: SweepRequest,
        cancel: CancellationToken,
    ) -> SweepResult<SweepReport>;

    /// Count current and non-current versions without deleting anything
    async fn count_versions(
        &self,
        bucket: &BucketName,
        prefix: Option<&str>,
    ) -> SweepResult<VersionCounts>;
}
