use crate::domain::value_objects::BucketName;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Largest number of objects a single multi-object delete request may carry
pub const MAX_DELETE_BATCH: usize = 1000;

/// Which part of the bucket the post-deletion recount covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileScope {
    /// Recount only keys under the sweep's prefix
    #[default]
    SweepPrefix,
    /// Recount every key in the bucket
    WholeBucket,
}

/// Parameters of one sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRequest {
    pub bucket: BucketName,
    pub prefix: Option<String>,
    pub retention_days: u32,
    /// Fixed "now" for age comparisons; captured at sweep start when unset
    pub reference_time: Option<DateTime<Utc>>,
    pub quiet: bool,
    pub batch_size: usize,
    pub reconcile_scope: ReconcileScope,
    pub dry_run: bool,
}

impl SweepRequest {
    pub fn new(bucket: BucketName, retention_days: u32) -> Self {
        Self {
            bucket,
            prefix: None,
            retention_days,
            reference_time: None,
            quiet: true,
            batch_size: MAX_DELETE_BATCH,
            reconcile_scope: ReconcileScope::default(),
            dry_run: false,
        }
    }

    /// Restrict the sweep to keys under `prefix`; an empty prefix means the whole bucket
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }

    pub fn with_reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Objects per delete request, clamped to `1..=MAX_DELETE_BATCH`
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_DELETE_BATCH);
        self
    }

    pub fn with_reconcile_scope(mut self, scope: ReconcileScope) -> Self {
        self.reconcile_scope = scope;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Prefix the reconciliation pass lists under
    pub fn reconcile_prefix(&self) -> Option<&str> {
        match self.reconcile_scope {
            ReconcileScope::SweepPrefix => self.prefix.as_deref(),
            ReconcileScope::WholeBucket => None,
        }
    }
}

/// Lifecycle of a single sweep. A failed sweep reports the stage it failed
/// in through its `SweepError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStage {
    Start,
    EnumeratingForDelete,
    Deleting,
    Reconciling,
    Done,
}

impl SweepStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepStage::Start => "start",
            SweepStage::EnumeratingForDelete => "enumerating",
            SweepStage::Deleting => "deleting",
            SweepStage::Reconciling => "reconciling",
            SweepStage::Done => "done",
        }
    }
}

impl std::fmt::Display for SweepStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a sweep got. Attached to every stage-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepProgress {
    /// Stage that was running when the sweep stopped
    pub stage: SweepStage,
    pub pages_listed: usize,
    pub candidates: usize,
    pub batches_completed: usize,
    pub batches_total: usize,
    pub objects_deleted: usize,
}

impl SweepProgress {
    pub fn new() -> Self {
        Self {
            stage: SweepStage::Start,
            pages_listed: 0,
            candidates: 0,
            batches_completed: 0,
            batches_total: 0,
            objects_deleted: 0,
        }
    }

    /// True once at least one delete request has been answered
    pub fn deletions_issued(&self) -> bool {
        self.batches_completed > 0
    }
}

impl Default for SweepProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SweepProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.stage {
            SweepStage::Start => write!(f, "before listing the bucket"),
            SweepStage::EnumeratingForDelete => write!(
                f,
                "during enumeration after {} page(s), before any deletions",
                self.pages_listed
            ),
            SweepStage::Deleting => write!(
                f,
                "during deletion after completing {} of {} batch(es), {} object(s) deleted",
                self.batches_completed, self.batches_total, self.objects_deleted
            ),
            SweepStage::Reconciling => write!(
                f,
                "during reconciliation after all {} batch(es), {} object(s) deleted",
                self.batches_completed, self.objects_deleted
            ),
            SweepStage::Done => write!(
                f,
                "after {} of {} batch(es), {} object(s) deleted",
                self.batches_completed, self.batches_total, self.objects_deleted
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> BucketName {
        BucketName::new("archive-bucket").unwrap()
    }

    #[test]
    fn test_empty_prefix_means_whole_bucket() {
        let request = SweepRequest::new(bucket(), 1).with_prefix("");
        assert_eq!(request.prefix, None);

        let request = SweepRequest::new(bucket(), 1).with_prefix("logs/");
        assert_eq!(request.prefix.as_deref(), Some("logs/"));
    }

    #[test]
    fn test_batch_size_is_clamped() {
        assert_eq!(SweepRequest::new(bucket(), 1).with_batch_size(0).batch_size, 1);
        assert_eq!(
            SweepRequest::new(bucket(), 1).with_batch_size(5000).batch_size,
            MAX_DELETE_BATCH
        );
        assert_eq!(SweepRequest::new(bucket(), 1).with_batch_size(250).batch_size, 250);
    }

    #[test]
    fn test_reconcile_prefix_follows_scope() {
        let request = SweepRequest::new(bucket(), 1).with_prefix("logs/");
        assert_eq!(request.reconcile_prefix(), Some("logs/"));

        let request = request.with_reconcile_scope(ReconcileScope::WholeBucket);
        assert_eq!(request.reconcile_prefix(), None);
    }

    #[test]
    fn test_progress_describes_stage() {
        let mut progress = SweepProgress::new();
        progress.stage = SweepStage::EnumeratingForDelete;
        progress.pages_listed = 3;
        assert_eq!(
            progress.to_string(),
            "during enumeration after 3 page(s), before any deletions"
        );

        progress.stage = SweepStage::Deleting;
        progress.batches_completed = 2;
        progress.batches_total = 3;
        progress.objects_deleted = 2000;
        assert_eq!(
            progress.to_string(),
            "during deletion after completing 2 of 3 batch(es), 2000 object(s) deleted"
        );
        assert!(progress.deletions_issued());
    }
}
