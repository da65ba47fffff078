use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    domain::{
        errors::{StorageError, StorageResult},
        models::{DeleteMarkerRecord, ListCursor, VersionPage, VersionRecord, MAX_DELETE_BATCH},
        value_objects::{BucketName, ObjectKey, VersionId},
    },
    ports::storage::{
        DeleteObjectError, DeleteObjectsOutcome, DeletedObject, ObjectIdentifier,
        VersionedBucketClient,
    },
};

const DEFAULT_PAGE_SIZE: usize = 1000;

/// In-memory versioned bucket store for testing and development.
///
/// Follows S3 versioning rules: the newest entry of a key is its latest
/// version, deleting a version by id promotes the next newest entry, and
/// listings are ordered by key and then newest first. Failures can be
/// injected to exercise error paths.
#[derive(Clone, Default)]
pub struct InMemoryVersionedBucket {
    data: Arc<RwLock<StoreData>>,
    page_size: Option<usize>,
}

#[derive(Default)]
struct StoreData {
    buckets: BTreeMap<BucketName, BTreeMap<ObjectKey, Vec<StoredEntry>>>,
    credentials_rejected: bool,
    list_buckets_unreachable: bool,
    failing_list_calls: HashMap<usize, StorageError>,
    failing_delete_requests: HashSet<usize>,
    denied_keys: HashSet<ObjectKey>,
    list_calls: usize,
    delete_calls: usize,
    accepted_deletes: Vec<Vec<ObjectIdentifier>>,
}

#[derive(Debug, Clone)]
struct StoredEntry {
    version_id: VersionId,
    last_modified: DateTime<Utc>,
    is_delete_marker: bool,
}

impl InMemoryVersionedBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries returned per listing page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    pub async fn create_bucket(&self, bucket: &BucketName) {
        let mut data = self.data.write().await;
        data.buckets.entry(bucket.clone()).or_default();
    }

    /// Write a new version of `key` with the given modification time
    pub async fn put_version(
        &self,
        bucket: &BucketName,
        key: &str,
        last_modified: DateTime<Utc>,
    ) -> StorageResult<VersionId> {
        self.insert_entry(bucket, key, last_modified, false).await
    }

    /// Place a delete marker on top of `key`
    pub async fn put_delete_marker(
        &self,
        bucket: &BucketName,
        key: &str,
        last_modified: DateTime<Utc>,
    ) -> StorageResult<VersionId> {
        self.insert_entry(bucket, key, last_modified, true).await
    }

    /// Make every call fail with an authentication error
    pub async fn reject_credentials(&self, rejected: bool) {
        self.data.write().await.credentials_rejected = rejected;
    }

    /// Make the bucket listing used as a credential probe fail at the transport level
    pub async fn fail_list_buckets(&self, unreachable: bool) {
        self.data.write().await.list_buckets_unreachable = unreachable;
    }

    /// Fail the `call`-th version listing request (zero-based, counted since creation)
    pub async fn fail_list_call(&self, call: usize) {
        let error = StorageError::Backend {
            status: 503,
            code: "SlowDown".to_string(),
            message: format!("injected failure on listing call {}", call),
        };
        self.fail_list_call_with(call, error).await;
    }

    /// Fail the `call`-th version listing request with `error`. The
    /// credential probe is unaffected.
    pub async fn fail_list_call_with(&self, call: usize, error: StorageError) {
        self.data.write().await.failing_list_calls.insert(call, error);
    }

    /// Reject the `call`-th delete request as a whole (zero-based)
    pub async fn fail_delete_request(&self, call: usize) {
        self.data.write().await.failing_delete_requests.insert(call);
    }

    /// Refuse to delete any version of `key`
    pub async fn deny_key(&self, key: &str) {
        if let Ok(key) = ObjectKey::new(key) {
            self.data.write().await.denied_keys.insert(key);
        }
    }

    /// Number of version listing requests served or failed so far
    pub async fn list_calls(&self) -> usize {
        self.data.read().await.list_calls
    }

    /// Objects of every delete request that was accepted, in order
    pub async fn delete_requests(&self) -> Vec<Vec<ObjectIdentifier>> {
        self.data.read().await.accepted_deletes.clone()
    }

    /// Total entries (versions and markers) currently stored in `bucket`
    pub async fn entry_count(&self, bucket: &BucketName) -> usize {
        let data = self.data.read().await;
        data.buckets
            .get(bucket)
            .map_or(0, |keys| keys.values().map(Vec::len).sum())
    }

    async fn insert_entry(
        &self,
        bucket: &BucketName,
        key: &str,
        last_modified: DateTime<Utc>,
        is_delete_marker: bool,
    ) -> StorageResult<VersionId> {
        let key = ObjectKey::new(key).map_err(|e| StorageError::InvalidRequest {
            message: e.to_string(),
        })?;

        let mut data = self.data.write().await;
        let keys = data
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound {
                bucket: bucket.to_string(),
            })?;

        let version_id = VersionId::generate();
        let entries = keys.entry(key).or_default();
        entries.insert(
            0,
            StoredEntry {
                version_id: version_id.clone(),
                last_modified,
                is_delete_marker,
            },
        );
        // Newest first, the most recent write wins a timestamp tie
        entries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

        Ok(version_id)
    }

    fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

#[async_trait]
impl VersionedBucketClient for InMemoryVersionedBucket {
    async fn list_buckets(&self) -> StorageResult<Vec<BucketName>> {
        let data = self.data.read().await;
        if data.credentials_rejected {
            return Err(rejected());
        }
        if data.list_buckets_unreachable {
            return Err(StorageError::Transport {
                message: "connection refused".to_string(),
            });
        }
        Ok(data.buckets.keys().cloned().collect())
    }

    async fn list_object_versions(
        &self,
        bucket: &BucketName,
        prefix: Option<&str>,
        cursor: Option<&ListCursor>,
    ) -> StorageResult<VersionPage> {
        let mut data = self.data.write().await;
        let call = data.list_calls;
        data.list_calls += 1;

        if data.credentials_rejected {
            return Err(rejected());
        }
        if let Some(error) = data.failing_list_calls.get(&call) {
            return Err(error.clone());
        }

        let keys = data
            .buckets
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound {
                bucket: bucket.to_string(),
            })?;

        let flat: Vec<(&ObjectKey, usize, &StoredEntry)> = keys
            .iter()
            .filter(|(key, _)| prefix.map_or(true, |p| key.has_prefix(p)))
            .flat_map(|(key, entries)| {
                entries
                    .iter()
                    .enumerate()
                    .map(move |(position, entry)| (key, position, entry))
            })
            .collect();

        let start = match cursor {
            None => 0,
            Some(cursor) => {
                let resumed = cursor.version_id_marker.as_deref().and_then(|marker| {
                    flat.iter().position(|(key, _, entry)| {
                        key.as_str() == cursor.key_marker && entry.version_id.as_str() == marker
                    })
                });
                match resumed {
                    Some(position) => position + 1,
                    None => flat
                        .iter()
                        .position(|(key, _, _)| key.as_str() > cursor.key_marker.as_str())
                        .unwrap_or(flat.len()),
                }
            }
        };

        let end = (start + self.page_size()).min(flat.len());
        let mut page = VersionPage::default();
        for (key, position, entry) in &flat[start..end] {
            let is_latest = *position == 0;
            if entry.is_delete_marker {
                page.delete_markers.push(DeleteMarkerRecord {
                    key: (*key).clone(),
                    version_id: entry.version_id.clone(),
                    is_latest,
                    last_modified: entry.last_modified,
                });
            } else {
                page.versions.push(VersionRecord {
                    key: (*key).clone(),
                    version_id: entry.version_id.clone(),
                    is_latest,
                    last_modified: entry.last_modified,
                });
            }
        }

        if end < flat.len() {
            if let Some((key, _, entry)) = flat[..end].last() {
                page.next_cursor = Some(ListCursor {
                    key_marker: key.to_string(),
                    version_id_marker: Some(entry.version_id.to_string()),
                });
            }
        }

        Ok(page)
    }

    async fn delete_objects(
        &self,
        bucket: &BucketName,
        objects: &[ObjectIdentifier],
        quiet: bool,
    ) -> StorageResult<DeleteObjectsOutcome> {
        let mut data = self.data.write().await;
        let call = data.delete_calls;
        data.delete_calls += 1;

        if data.credentials_rejected {
            return Err(rejected());
        }
        if objects.is_empty() || objects.len() > MAX_DELETE_BATCH {
            return Err(StorageError::Backend {
                status: 400,
                code: "MalformedXML".to_string(),
                message: format!("delete request carries {} objects", objects.len()),
            });
        }
        if data.failing_delete_requests.contains(&call) {
            return Err(StorageError::AccessDenied {
                operation: "DeleteObjects".to_string(),
                message: format!("injected failure on delete request {}", call),
            });
        }
        if !data.buckets.contains_key(bucket) {
            return Err(StorageError::BucketNotFound {
                bucket: bucket.to_string(),
            });
        }

        let denied = data.denied_keys.clone();
        let mut outcome = DeleteObjectsOutcome::default();
        let keys = data.buckets.entry(bucket.clone()).or_default();

        for object in objects {
            if denied.contains(&object.key) {
                outcome.errors.push(DeleteObjectError {
                    key: object.key.clone(),
                    version_id: object.version_id.clone(),
                    code: "AccessDenied".to_string(),
                    message: "Access Denied".to_string(),
                });
                continue;
            }

            // Only versioned deletes are modelled; deleting an unknown version succeeds
            if let (Some(entries), Some(version_id)) =
                (keys.get_mut(&object.key), object.version_id.as_ref())
            {
                entries.retain(|entry| &entry.version_id != version_id);
                if entries.is_empty() {
                    keys.remove(&object.key);
                }
            }

            if !quiet {
                outcome.deleted.push(DeletedObject {
                    key: object.key.clone(),
                    version_id: object.version_id.clone(),
                });
            }
        }

        data.accepted_deletes.push(objects.to_vec());
        Ok(outcome)
    }
}

fn rejected() -> StorageError {
    StorageError::AuthenticationFailed {
        message: "The AWS Access Key Id you provided does not exist in our records.".to_string(),
    }
}
