use super::sweep::SweepProgress;
use super::version::{CandidateKind, VersionRecord};
use crate::domain::value_objects::{BucketName, ObjectKey, VersionId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tally of current and non-current versions. Delete markers count in neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VersionCounts {
    pub current: u64,
    pub non_current: u64,
}

impl VersionCounts {
    pub fn observe(&mut self, version: &VersionRecord) {
        if version.is_latest {
            self.current += 1;
        } else {
            self.non_current += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.current + self.non_current
    }
}

/// A single key the backend refused to delete inside an otherwise accepted batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDeleteFailure {
    pub key: ObjectKey,
    pub version_id: Option<VersionId>,
    pub code: String,
    pub message: String,
}

/// A key the backend confirmed as deleted. Only verbose delete requests
/// return these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedDeletion {
    pub key: ObjectKey,
    pub version_id: Option<VersionId>,
}

/// Result of one delete request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// Zero-based position of the batch in the sweep
    pub index: usize,
    pub submitted: usize,
    pub deleted_versions: usize,
    pub deleted_markers: usize,
    pub confirmed: Vec<ConfirmedDeletion>,
    pub failures: Vec<ItemDeleteFailure>,
}

impl BatchResult {
    pub fn deleted(&self) -> usize {
        self.deleted_versions + self.deleted_markers
    }

    pub fn record_deleted(&mut self, kind: CandidateKind) {
        match kind {
            CandidateKind::Version => self.deleted_versions += 1,
            CandidateKind::DeleteMarker => self.deleted_markers += 1,
        }
    }
}

/// Every batch a sweep issued, in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    pub batches_total: usize,
    pub batches: Vec<BatchResult>,
}

impl DeletionSummary {
    pub fn new(batches_total: usize) -> Self {
        Self {
            batches_total,
            batches: Vec::with_capacity(batches_total),
        }
    }

    pub fn batches_completed(&self) -> usize {
        self.batches.len()
    }

    pub fn deleted(&self) -> usize {
        self.batches.iter().map(BatchResult::deleted).sum()
    }

    pub fn deleted_versions(&self) -> usize {
        self.batches.iter().map(|b| b.deleted_versions).sum()
    }

    pub fn deleted_markers(&self) -> usize {
        self.batches.iter().map(|b| b.deleted_markers).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemDeleteFailure> {
        self.batches.iter().flat_map(|b| b.failures.iter())
    }

    pub fn confirmed(&self) -> impl Iterator<Item = &ConfirmedDeletion> {
        self.batches.iter().flat_map(|b| b.confirmed.iter())
    }
}

/// Summary of a completed sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub bucket: BucketName,
    pub prefix: Option<String>,
    pub retention_days: u32,
    pub reference_time: DateTime<Utc>,
    pub dry_run: bool,

    pub current_before: u64,
    pub non_current_before: u64,
    pub current_after: u64,
    pub non_current_after: u64,

    pub delete_markers_seen: u64,
    pub candidate_versions: usize,
    pub candidate_markers: usize,

    pub batches_issued: usize,
    pub deleted_versions: usize,
    pub deleted_markers: usize,
    /// Per-key successes, filled in verbose delete mode only
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub confirmed_deletions: Vec<ConfirmedDeletion>,
    pub item_failures: Vec<ItemDeleteFailure>,

    /// Final progress of the sweep, stage `done`
    pub progress: SweepProgress,
}

impl SweepReport {
    pub fn candidates(&self) -> usize {
        self.candidate_versions + self.candidate_markers
    }

    pub fn deleted(&self) -> usize {
        self.deleted_versions + self.deleted_markers
    }

    pub fn before(&self) -> VersionCounts {
        VersionCounts {
            current: self.current_before,
            non_current: self.non_current_before,
        }
    }

    pub fn after(&self) -> VersionCounts {
        VersionCounts {
            current: self.current_after,
            non_current: self.non_current_after,
        }
    }

    pub fn has_item_failures(&self) -> bool {
        !self.item_failures.is_empty()
    }
}

impl std::fmt::Display for SweepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rule = "-".repeat(20);
        writeln!(f, "{}", rule)?;
        writeln!(f, "Bucket: {}", self.bucket)?;
        if let Some(prefix) = &self.prefix {
            writeln!(f, "Prefix: {}", prefix)?;
        }
        writeln!(
            f,
            "Retention: {} day(s) as of {}",
            self.retention_days,
            self.reference_time.to_rfc3339()
        )?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Before deleting objects")?;
        writeln!(f, "  current objects: {}", self.current_before)?;
        writeln!(f, "  non-current objects: {}", self.non_current_before)?;
        writeln!(f, "{}", rule)?;
        if self.dry_run {
            writeln!(
                f,
                "Dry run: {} version(s) and {} delete marker(s) would be deleted",
                self.candidate_versions, self.candidate_markers
            )?;
        } else {
            writeln!(
                f,
                "Deleted {} of {} candidate(s) in {} batch(es)",
                self.deleted(),
                self.candidates(),
                self.batches_issued
            )?;
            for deleted in &self.confirmed_deletions {
                writeln!(
                    f,
                    "  deleted: {} ({})",
                    deleted.key,
                    deleted.version_id.as_ref().map_or("-", |v| v.as_str())
                )?;
            }
            for failure in &self.item_failures {
                writeln!(
                    f,
                    "  failed: {} ({}) {}: {}",
                    failure.key,
                    failure.version_id.as_ref().map_or("-", |v| v.as_str()),
                    failure.code,
                    failure.message
                )?;
            }
        }
        writeln!(f, "{}", rule)?;
        writeln!(f, "After deleting objects")?;
        writeln!(f, "  current objects: {}", self.current_after)?;
        writeln!(f, "  non-current objects: {}", self.non_current_after)?;
        write!(f, "{}", rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn failure(key: &str) -> ItemDeleteFailure {
        ItemDeleteFailure {
            key: ObjectKey::new(key).unwrap(),
            version_id: Some(VersionId::new("v1").unwrap()),
            code: "AccessDenied".to_string(),
            message: "Access Denied".to_string(),
        }
    }

    #[test]
    fn test_summary_totals() {
        let mut summary = DeletionSummary::new(2);
        summary.batches.push(BatchResult {
            index: 0,
            submitted: 3,
            deleted_versions: 2,
            deleted_markers: 1,
            confirmed: vec![],
            failures: vec![],
        });
        summary.batches.push(BatchResult {
            index: 1,
            submitted: 2,
            deleted_versions: 1,
            deleted_markers: 0,
            confirmed: vec![],
            failures: vec![failure("a.txt")],
        });

        assert_eq!(summary.batches_completed(), 2);
        assert_eq!(summary.deleted(), 4);
        assert_eq!(summary.deleted_versions(), 3);
        assert_eq!(summary.deleted_markers(), 1);
        assert_eq!(summary.failures().count(), 1);
    }

    #[test]
    fn test_report_display_lists_counts() {
        let report = SweepReport {
            bucket: BucketName::new("archive-bucket").unwrap(),
            prefix: Some("logs/".to_string()),
            retention_days: 1,
            reference_time: Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap(),
            dry_run: false,
            current_before: 1,
            non_current_before: 1,
            current_after: 1,
            non_current_after: 0,
            delete_markers_seen: 1,
            candidate_versions: 1,
            candidate_markers: 1,
            batches_issued: 1,
            deleted_versions: 1,
            deleted_markers: 1,
            confirmed_deletions: vec![ConfirmedDeletion {
                key: ObjectKey::new("logs/a.txt").unwrap(),
                version_id: Some(VersionId::new("v1").unwrap()),
            }],
            item_failures: vec![],
            progress: SweepProgress::new(),
        };

        let text = report.to_string();
        assert!(text.contains("Before deleting objects"));
        assert!(text.contains("  non-current objects: 1"));
        assert!(text.contains("Deleted 2 of 2 candidate(s) in 1 batch(es)"));
        assert!(text.contains("After deleting objects"));
        assert!(text.contains("Prefix: logs/"));
        assert!(text.contains("  deleted: logs/a.txt (v1)"));
        assert_eq!(report.before().total(), 2);
        assert_eq!(report.after().non_current, 0);
    }
}
