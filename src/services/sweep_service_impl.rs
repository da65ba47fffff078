use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{
    batch_deleter::{batch_count, BatchDeleteHalt, BatchDeleter},
    classifier::Classifier,
    enumerator::{EnumerationHalt, Enumerator},
    reconciler::Reconciler,
};
use crate::{
    domain::{
        errors::{StorageError, SweepError, SweepResult},
        models::{
            CandidateKind, DeletionSummary, RetentionPolicy, SweepProgress, SweepReport,
            SweepRequest, SweepStage, VersionCounts,
        },
        value_objects::BucketName,
    },
    ports::{services::SweepService, storage::VersionedBucketClient},
};

/// Implementation of the SweepService
#[derive(Clone)]
pub struct RetentionSweepService {
    client: Arc<dyn VersionedBucketClient>,
    enumerator: Enumerator,
    reconciler: Reconciler,
}

impl RetentionSweepService {
    pub fn new(client: Arc<dyn VersionedBucketClient>) -> Self {
        Self {
            enumerator: Enumerator::new(client.clone()),
            reconciler: Reconciler::new(client.clone()),
            client,
        }
    }
}

#[async_trait]
impl SweepService for RetentionSweepService {
    async fn verify_credentials(&self) -> SweepResult<()> {
        match self.client.list_buckets().await {
            Ok(buckets) => {
                info!(buckets = buckets.len(), "Credentials accepted");
                Ok(())
            }
            Err(
                source @ (StorageError::AuthenticationFailed { .. }
                | StorageError::AccessDenied { .. }),
            ) => Err(SweepError::Authentication { source }),
            Err(source) => Err(SweepError::Connection { source }),
        }
    }

    async fn sweep(
        &self,
        request: SweepRequest,
        cancel: CancellationToken,
    ) -> SweepResult<SweepReport> {
        let policy = RetentionPolicy::new(
            request.retention_days,
            request.reference_time.unwrap_or_else(Utc::now),
        );
        let bucket = &request.bucket;
        let prefix = request.prefix.as_deref();

        info!(
            bucket = %bucket,
            prefix = prefix.unwrap_or(""),
            retention_days = policy.retention_days,
            reference_time = %policy.reference_time,
            dry_run = request.dry_run,
            "Starting retention sweep"
        );

        self.verify_credentials().await.map_err(|e| {
            error!(bucket = %bucket, "Credential check failed: {}", e);
            e
        })?;

        let mut progress = SweepProgress::new();

        // Enumerate and classify
        progress.stage = SweepStage::EnumeratingForDelete;
        info!(bucket = %bucket, "Paginating bucket");
        let mut classifier = Classifier::new(policy);
        let pages = self
            .enumerator
            .for_each_page(bucket, prefix, &cancel, |page| classifier.observe_page(page))
            .await
            .map_err(|halt| enumeration_failure(halt, &mut progress))?;
        progress.pages_listed = pages;

        let classification = classifier.finish();
        let before = classification.counts;
        progress.candidates = classification.candidates.len();
        info!(
            bucket = %bucket,
            pages,
            current = before.current,
            non_current = before.non_current,
            delete_markers = classification.delete_markers_seen,
            candidates = progress.candidates,
            "Before deleting objects"
        );

        let mut report = SweepReport {
            bucket: bucket.clone(),
            prefix: request.prefix.clone(),
            retention_days: policy.retention_days,
            reference_time: policy.reference_time,
            dry_run: request.dry_run,
            current_before: before.current,
            non_current_before: before.non_current,
            current_after: before.current,
            non_current_after: before.non_current,
            delete_markers_seen: classification.delete_markers_seen,
            candidate_versions: classification.candidate_count(CandidateKind::Version),
            candidate_markers: classification.candidate_count(CandidateKind::DeleteMarker),
            batches_issued: 0,
            deleted_versions: 0,
            deleted_markers: 0,
            confirmed_deletions: Vec::new(),
            item_failures: Vec::new(),
            progress: progress.clone(),
        };

        if request.dry_run {
            progress.stage = SweepStage::Done;
            report.progress = progress;
            info!(
                bucket = %bucket,
                candidates = report.candidates(),
                "Dry run complete, no objects deleted"
            );
            return Ok(report);
        }

        // Delete
        progress.stage = SweepStage::Deleting;
        progress.batches_total = batch_count(classification.candidates.len(), request.batch_size);
        info!(
            bucket = %bucket,
            candidates = progress.candidates,
            batches = progress.batches_total,
            "Deleting objects"
        );
        let deleter = BatchDeleter::new(self.client.clone())
            .with_quiet(request.quiet)
            .with_batch_size(request.batch_size);
        let summary = deleter
            .delete_batches(bucket, &classification.candidates, &cancel)
            .await
            .map_err(|halt| deletion_failure(halt, &mut progress))?;
        record_deletions(&mut progress, &summary);
        apply_summary(&mut report, summary);

        // Reconcile
        progress.stage = SweepStage::Reconciling;
        let recount_prefix = request.reconcile_prefix();
        info!(bucket = %bucket, prefix = recount_prefix.unwrap_or(""), "Recounting bucket");
        let after = self
            .reconciler
            .recount(bucket, recount_prefix, &cancel)
            .await
            .map_err(|halt| recount_failure(halt, &progress))?;
        report.current_after = after.current;
        report.non_current_after = after.non_current;
        progress.stage = SweepStage::Done;
        report.progress = progress;

        info!(
            bucket = %bucket,
            current = after.current,
            non_current = after.non_current,
            deleted = report.deleted(),
            failed = report.item_failures.len(),
            "After deleting objects"
        );
        if report.has_item_failures() {
            warn!(
                bucket = %bucket,
                failed = report.item_failures.len(),
                "Sweep completed with objects that could not be deleted"
            );
        }

        Ok(report)
    }

    async fn count_versions(
        &self,
        bucket: &BucketName,
        prefix: Option<&str>,
    ) -> SweepResult<VersionCounts> {
        let mut progress = SweepProgress::new();
        progress.stage = SweepStage::Reconciling;
        self.reconciler
            .recount(bucket, prefix, &CancellationToken::new())
            .await
            .map_err(|halt| recount_failure(halt, &progress))
    }
}

fn enumeration_failure(halt: EnumerationHalt, progress: &mut SweepProgress) -> SweepError {
    match halt {
        EnumerationHalt::Failed(err) => {
            progress.pages_listed = err.pages_fetched;
            error!(pages = err.pages_fetched, "Listing failed: {}", err.source);
            match err.source {
                source if err.pages_fetched == 0 && source.is_credential_failure() => {
                    SweepError::Authentication { source }
                }
                StorageError::BucketNotFound { bucket } => SweepError::BucketNotFound {
                    bucket,
                    progress: progress.clone(),
                },
                source => SweepError::TransientList {
                    progress: progress.clone(),
                    source,
                },
            }
        }
        EnumerationHalt::Cancelled { pages_fetched } => {
            progress.pages_listed = pages_fetched;
            warn!(pages = pages_fetched, "Sweep cancelled during enumeration");
            SweepError::Cancelled {
                progress: progress.clone(),
            }
        }
    }
}

fn deletion_failure(halt: BatchDeleteHalt, progress: &mut SweepProgress) -> SweepError {
    match halt {
        BatchDeleteHalt::Failed { summary, source } => {
            record_deletions(progress, &summary);
            error!(
                completed = progress.batches_completed,
                total = progress.batches_total,
                "Delete request failed: {}",
                source
            );
            SweepError::BatchDelete {
                progress: progress.clone(),
                source,
            }
        }
        BatchDeleteHalt::Cancelled { summary } => {
            record_deletions(progress, &summary);
            warn!(
                completed = progress.batches_completed,
                total = progress.batches_total,
                "Sweep cancelled during deletion"
            );
            SweepError::Cancelled {
                progress: progress.clone(),
            }
        }
    }
}

fn recount_failure(halt: EnumerationHalt, progress: &SweepProgress) -> SweepError {
    match halt {
        EnumerationHalt::Failed(err) => {
            error!(pages = err.pages_fetched, "Recount failed: {}", err.source);
            SweepError::Reconcile {
                progress: progress.clone(),
                source: err.source,
            }
        }
        EnumerationHalt::Cancelled { .. } => {
            warn!("Sweep cancelled during reconciliation");
            SweepError::Cancelled {
                progress: progress.clone(),
            }
        }
    }
}

fn record_deletions(progress: &mut SweepProgress, summary: &DeletionSummary) {
    progress.batches_completed = summary.batches_completed();
    progress.objects_deleted = summary.deleted();
}

fn apply_summary(report: &mut SweepReport, summary: DeletionSummary) {
    report.batches_issued = summary.batches_completed();
    report.deleted_versions = summary.deleted_versions();
    report.deleted_markers = summary.deleted_markers();
    report.confirmed_deletions = summary.confirmed().cloned().collect();
    report.item_failures = summary.failures().cloned().collect();
}
