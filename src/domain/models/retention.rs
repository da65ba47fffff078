use super::version::{DeleteMarkerRecord, VersionRecord};
use chrono::{DateTime, Utc};

/// Outcome of classifying a single listed record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Delete,
}

/// How long non-current versions and delete markers are kept.
///
/// `reference_time` is captured once when a sweep starts and every age
/// comparison in that sweep is made against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub retention_days: u32,
    pub reference_time: DateTime<Utc>,
}

impl RetentionPolicy {
    pub fn new(retention_days: u32, reference_time: DateTime<Utc>) -> Self {
        Self {
            retention_days,
            reference_time,
        }
    }

    /// Policy whose reference time is the current instant
    pub fn starting_now(retention_days: u32) -> Self {
        Self::new(retention_days, Utc::now())
    }

    /// Whole days elapsed since `last_modified`, truncated.
    ///
    /// Less than 24 hours is day 0. Timestamps after the reference time
    /// yield zero or a negative age and are never expired.
    pub fn age_in_days(&self, last_modified: DateTime<Utc>) -> i64 {
        self.reference_time
            .signed_duration_since(last_modified)
            .num_days()
    }

    /// Strictly older than the retention window
    pub fn is_expired(&self, last_modified: DateTime<Utc>) -> bool {
        self.age_in_days(last_modified) > i64::from(self.retention_days)
    }

    pub fn classify_version(&self, version: &VersionRecord) -> Disposition {
        if version.is_latest {
            return Disposition::Keep;
        }

        if self.is_expired(version.last_modified) {
            Disposition::Delete
        } else {
            Disposition::Keep
        }
    }

    pub fn classify_delete_marker(&self, marker: &DeleteMarkerRecord) -> Disposition {
        if self.is_expired(marker.last_modified) {
            Disposition::Delete
        } else {
            Disposition::Keep
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{ObjectKey, VersionId};
    use chrono::{Duration, TimeZone};

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn version(is_latest: bool, last_modified: DateTime<Utc>) -> VersionRecord {
        VersionRecord {
            key: ObjectKey::new("docs/report.pdf").unwrap(),
            version_id: VersionId::new("v1").unwrap(),
            is_latest,
            last_modified,
        }
    }

    fn marker(last_modified: DateTime<Utc>) -> DeleteMarkerRecord {
        DeleteMarkerRecord {
            key: ObjectKey::new("docs/report.pdf").unwrap(),
            version_id: VersionId::new("m1").unwrap(),
            is_latest: true,
            last_modified,
        }
    }

    #[test]
    fn test_latest_version_is_never_deleted() {
        let policy = RetentionPolicy::new(0, reference());
        let ancient = reference() - Duration::days(10_000);

        assert_eq!(
            policy.classify_version(&version(true, ancient)),
            Disposition::Keep
        );
    }

    #[test]
    fn test_non_current_version_past_retention_is_deleted() {
        let policy = RetentionPolicy::new(1, reference());
        let old = reference() - Duration::days(10);

        assert_eq!(
            policy.classify_version(&version(false, old)),
            Disposition::Delete
        );
    }

    #[test]
    fn test_age_equal_to_retention_is_kept() {
        let policy = RetentionPolicy::new(3, reference());
        let exactly_three = reference() - Duration::days(3);
        let just_under_four = reference() - Duration::days(4) + Duration::seconds(1);

        assert_eq!(
            policy.classify_version(&version(false, exactly_three)),
            Disposition::Keep
        );
        assert_eq!(
            policy.classify_version(&version(false, just_under_four)),
            Disposition::Keep
        );
        assert_eq!(
            policy.classify_version(&version(false, reference() - Duration::days(4))),
            Disposition::Delete
        );
    }

    #[test]
    fn test_zero_retention_spares_same_day_records() {
        let policy = RetentionPolicy::new(0, reference());
        let this_morning = reference() - Duration::hours(6);
        let yesterday = reference() - Duration::hours(25);

        assert_eq!(policy.age_in_days(this_morning), 0);
        assert_eq!(
            policy.classify_version(&version(false, this_morning)),
            Disposition::Keep
        );
        assert_eq!(
            policy.classify_delete_marker(&marker(this_morning)),
            Disposition::Keep
        );
        assert_eq!(
            policy.classify_version(&version(false, yesterday)),
            Disposition::Delete
        );
    }

    #[test]
    fn test_delete_marker_governed_by_age_alone() {
        let policy = RetentionPolicy::new(1, reference());

        assert_eq!(
            policy.classify_delete_marker(&marker(reference() - Duration::days(10))),
            Disposition::Delete
        );
        assert_eq!(
            policy.classify_delete_marker(&marker(reference() - Duration::hours(30))),
            Disposition::Keep
        );
    }

    #[test]
    fn test_future_timestamps_are_not_expired() {
        let policy = RetentionPolicy::new(0, reference());
        let skewed = reference() + Duration::days(2);

        assert!(policy.age_in_days(skewed) < 0);
        assert!(!policy.is_expired(skewed));
    }
}
