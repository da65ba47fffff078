use crate::domain::{
    errors::StorageResult,
    models::{DeletionCandidate, ListCursor, VersionPage},
    value_objects::{BucketName, ObjectKey, VersionId},
};
use async_trait::async_trait;

/// Port for a version-enabled, S3-compatible object store.
///
/// Implementations are stateless per call from the caller's point of view and
/// may be shared behind an `Arc` for the lifetime of a sweep.
#[async_trait]
pub trait VersionedBucketClient: Send + Sync + 'static {
    /// List the buckets owned by the caller. Used to validate credentials.
    async fn list_buckets(&self) -> StorageResult<Vec<BucketName>>;

    /// Fetch one page of the bucket's version history, starting after `cursor`
    async fn list_object_versions(
        &self,
        bucket: &BucketName,
        prefix: Option<&str>,
        cursor: Option<&ListCursor>,
    ) -> StorageResult<VersionPage>;

    /// Permanently delete specific versions. At most 1000 objects per call.
    ///
    /// In quiet mode only failures are reported back.
    async fn delete_objects(
        &self,
        bucket: &BucketName,
        objects: &[ObjectIdentifier],
        quiet: bool,
    ) -> StorageResult<DeleteObjectsOutcome>;
}

/// Key and version of one object in a delete request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    pub key: ObjectKey,
    pub version_id: Option<VersionId>,
}

impl From<&DeletionCandidate> for ObjectIdentifier {
    fn from(candidate: &DeletionCandidate) -> Self {
        Self {
            key: candidate.key.clone(),
            version_id: Some(candidate.version_id.clone()),
        }
    }
}

/// An object the backend reports as deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedObject {
    pub key: ObjectKey,
    pub version_id: Option<VersionId>,
}

/// An object the backend refused to delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteObjectError {
    pub key: ObjectKey,
    pub version_id: Option<VersionId>,
    pub code: String,
    pub message: String,
}

/// Per-item results of a multi-object delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteObjectsOutcome {
    pub deleted: Vec<DeletedObject>,
    pub errors: Vec<DeleteObjectError>,
}
