use crate::domain::models::{
    CandidateKind, DeletionCandidate, Disposition, RetentionPolicy, VersionCounts, VersionPage,
};

/// What one classification pass over a bucket produced
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub counts: VersionCounts,
    pub delete_markers_seen: u64,
    pub candidates: Vec<DeletionCandidate>,
}

impl Classification {
    pub fn candidate_count(&self, kind: CandidateKind) -> usize {
        self.candidates.iter().filter(|c| c.kind == kind).count()
    }
}

/// Applies a retention policy to every record of an enumeration pass,
/// accumulating deletion candidates and the "before" counts.
#[derive(Debug)]
pub struct Classifier {
    policy: RetentionPolicy,
    counts: VersionCounts,
    delete_markers_seen: u64,
    candidates: Vec<DeletionCandidate>,
}

impl Classifier {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            counts: VersionCounts::default(),
            delete_markers_seen: 0,
            candidates: Vec::new(),
        }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    pub fn observe_page(&mut self, page: &VersionPage) {
        for marker in &page.delete_markers {
            self.delete_markers_seen += 1;
            if self.policy.classify_delete_marker(marker) == Disposition::Delete {
                self.candidates.push(marker.into());
            }
        }

        for version in &page.versions {
            self.counts.observe(version);
            if self.policy.classify_version(version) == Disposition::Delete {
                self.candidates.push(version.into());
            }
        }
    }

    pub fn counts(&self) -> VersionCounts {
        self.counts
    }

    pub fn candidates(&self) -> &[DeletionCandidate] {
        &self.candidates
    }

    pub fn finish(self) -> Classification {
        Classification {
            counts: self.counts,
            delete_markers_seen: self.delete_markers_seen,
            candidates: self.candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DeleteMarkerRecord, VersionRecord};
    use crate::domain::value_objects::{ObjectKey, VersionId};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn version(key: &str, id: &str, is_latest: bool, age_days: i64) -> VersionRecord {
        VersionRecord {
            key: ObjectKey::new(key).unwrap(),
            version_id: VersionId::new(id).unwrap(),
            is_latest,
            last_modified: reference() - Duration::days(age_days),
        }
    }

    fn marker(key: &str, id: &str, age_days: i64) -> DeleteMarkerRecord {
        DeleteMarkerRecord {
            key: ObjectKey::new(key).unwrap(),
            version_id: VersionId::new(id).unwrap(),
            is_latest: true,
            last_modified: reference() - Duration::days(age_days),
        }
    }

    #[test]
    fn test_counts_and_candidates_for_mixed_page() {
        let mut classifier = Classifier::new(RetentionPolicy::new(1, reference()));
        classifier.observe_page(&VersionPage {
            versions: vec![
                version("a", "a2", true, 0),
                version("a", "a1", false, 10),
            ],
            delete_markers: vec![marker("b", "b1", 10)],
            next_cursor: None,
        });

        let result = classifier.finish();
        assert_eq!(result.counts.current, 1);
        assert_eq!(result.counts.non_current, 1);
        assert_eq!(result.delete_markers_seen, 1);
        assert_eq!(result.candidates.len(), 2);
        assert_eq!(result.candidate_count(CandidateKind::Version), 1);
        assert_eq!(result.candidate_count(CandidateKind::DeleteMarker), 1);
        assert!(result
            .candidates
            .iter()
            .any(|c| c.version_id.as_str() == "a1"));
        assert!(result
            .candidates
            .iter()
            .any(|c| c.version_id.as_str() == "b1"));
    }

    #[test]
    fn test_fresh_records_produce_no_candidates() {
        let mut classifier = Classifier::new(RetentionPolicy::new(1, reference()));
        classifier.observe_page(&VersionPage {
            versions: vec![
                version("a", "a2", true, 0),
                version("a", "a1", false, 0),
            ],
            delete_markers: vec![marker("b", "b1", 0)],
            next_cursor: None,
        });

        assert!(classifier.candidates().is_empty());
        assert_eq!(classifier.counts().non_current, 1);
    }

    #[test]
    fn test_counts_accumulate_across_pages() {
        let mut classifier = Classifier::new(RetentionPolicy::new(5, reference()));
        for i in 0..3 {
            classifier.observe_page(&VersionPage {
                versions: vec![
                    version("k", &format!("cur{}", i), true, 0),
                    version("k", &format!("old{}", i), false, 6),
                ],
                delete_markers: vec![],
                next_cursor: None,
            });
        }

        assert_eq!(classifier.counts().current, 3);
        assert_eq!(classifier.counts().non_current, 3);
        assert_eq!(classifier.candidates().len(), 3);
    }
}
