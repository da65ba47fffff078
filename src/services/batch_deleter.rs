use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    domain::{
        errors::StorageError,
        models::{
            BatchResult, ConfirmedDeletion, DeletionCandidate, DeletionSummary, ItemDeleteFailure,
            MAX_DELETE_BATCH,
        },
        value_objects::{BucketName, ObjectKey, VersionId},
    },
    ports::storage::{ObjectIdentifier, VersionedBucketClient},
};

/// Split `candidates` into consecutive chunks of at most `batch_size`,
/// preserving order.
pub fn partition(
    candidates: &[DeletionCandidate],
    batch_size: usize,
) -> std::slice::Chunks<'_, DeletionCandidate> {
    candidates.chunks(batch_size.clamp(1, MAX_DELETE_BATCH))
}

/// Number of requests needed for `candidates` items
pub fn batch_count(candidates: usize, batch_size: usize) -> usize {
    candidates.div_ceil(batch_size.clamp(1, MAX_DELETE_BATCH))
}

/// Why a deletion run stopped before its last batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchDeleteHalt {
    /// A whole request failed; `summary` holds the batches completed before it
    Failed {
        summary: DeletionSummary,
        source: StorageError,
    },
    Cancelled { summary: DeletionSummary },
}

/// Issues multi-object delete requests, one batch at a time
#[derive(Clone)]
pub struct BatchDeleter {
    client: Arc<dyn VersionedBucketClient>,
    quiet: bool,
    batch_size: usize,
}

impl BatchDeleter {
    pub fn new(client: Arc<dyn VersionedBucketClient>) -> Self {
        Self {
            client,
            quiet: true,
            batch_size: MAX_DELETE_BATCH,
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_DELETE_BATCH);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Delete every candidate, sequentially, in order.
    ///
    /// Keys the backend refuses are recorded in the batch result and never
    /// resubmitted. `cancel` is checked before each request.
    pub async fn delete_batches(
        &self,
        bucket: &BucketName,
        candidates: &[DeletionCandidate],
        cancel: &CancellationToken,
    ) -> Result<DeletionSummary, BatchDeleteHalt> {
        let mut summary = DeletionSummary::new(batch_count(candidates.len(), self.batch_size));

        for (index, batch) in partition(candidates, self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                return Err(BatchDeleteHalt::Cancelled { summary });
            }

            let objects: Vec<ObjectIdentifier> = batch.iter().map(ObjectIdentifier::from).collect();
            let outcome = match self.client.delete_objects(bucket, &objects, self.quiet).await {
                Ok(outcome) => outcome,
                Err(source) => return Err(BatchDeleteHalt::Failed { summary, source }),
            };

            let failed: HashSet<(&ObjectKey, Option<&VersionId>)> = outcome
                .errors
                .iter()
                .map(|e| (&e.key, e.version_id.as_ref()))
                .collect();

            let mut result = BatchResult {
                index,
                submitted: batch.len(),
                deleted_versions: 0,
                deleted_markers: 0,
                confirmed: Vec::new(),
                failures: Vec::new(),
            };

            for candidate in batch {
                let refused = failed.contains(&(&candidate.key, Some(&candidate.version_id)))
                    || failed.contains(&(&candidate.key, None));
                if !refused {
                    result.record_deleted(candidate.kind);
                }
            }

            if !self.quiet {
                result.confirmed = outcome
                    .deleted
                    .into_iter()
                    .map(|d| ConfirmedDeletion {
                        key: d.key,
                        version_id: d.version_id,
                    })
                    .collect();
            }

            for error in &outcome.errors {
                warn!(
                    bucket = %bucket,
                    key = %error.key,
                    version_id = error.version_id.as_ref().map(|v| v.as_str()),
                    code = %error.code,
                    "Failed to delete object version: {}",
                    error.message
                );
                result.failures.push(ItemDeleteFailure {
                    key: error.key.clone(),
                    version_id: error.version_id.clone(),
                    code: error.code.clone(),
                    message: error.message.clone(),
                });
            }

            debug!(
                bucket = %bucket,
                batch = index + 1,
                of = summary.batches_total,
                submitted = result.submitted,
                deleted = result.deleted(),
                confirmed = result.confirmed.len(),
                failed = result.failures.len(),
                "Delete request completed"
            );
            summary.batches.push(result);
        }

        Ok(summary)
    }
}
