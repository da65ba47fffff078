use crate::domain::value_objects::{ObjectKey, VersionId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One stored version of an object, as listed by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub key: ObjectKey,
    pub version_id: VersionId,
    pub is_latest: bool,
    pub last_modified: DateTime<Utc>,
}

/// A tombstone left by an unversioned delete of a versioned key.
///
/// `is_latest` is reported by the backend but plays no part in retention:
/// markers expire on age alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteMarkerRecord {
    pub key: ObjectKey,
    pub version_id: VersionId,
    pub is_latest: bool,
    pub last_modified: DateTime<Utc>,
}

/// Continuation point for a version listing (`key-marker` / `version-id-marker`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCursor {
    pub key_marker: String,
    pub version_id_marker: Option<String>,
}

/// One page of a bucket's version history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionPage {
    pub versions: Vec<VersionRecord>,
    pub delete_markers: Vec<DeleteMarkerRecord>,
    /// Present while the backend has more pages to return
    pub next_cursor: Option<ListCursor>,
}

impl VersionPage {
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }

    pub fn entry_count(&self) -> usize {
        self.versions.len() + self.delete_markers.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Version,
    DeleteMarker,
}

/// A version or delete marker selected for permanent removal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeletionCandidate {
    pub key: ObjectKey,
    pub version_id: VersionId,
    pub kind: CandidateKind,
}

impl From<&VersionRecord> for DeletionCandidate {
    fn from(record: &VersionRecord) -> Self {
        Self {
            key: record.key.clone(),
            version_id: record.version_id.clone(),
            kind: CandidateKind::Version,
        }
    }
}

impl From<&DeleteMarkerRecord> for DeletionCandidate {
    fn from(record: &DeleteMarkerRecord) -> Self {
        Self {
            key: record.key.clone(),
            version_id: record.version_id.clone(),
            kind: CandidateKind::DeleteMarker,
        }
    }
}
