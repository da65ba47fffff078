use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::enumerator::{EnumerationHalt, Enumerator};
use crate::{
    domain::{models::VersionCounts, value_objects::BucketName},
    ports::storage::VersionedBucketClient,
};

/// Recounts current and non-current versions with a fresh listing
#[derive(Clone)]
pub struct Reconciler {
    enumerator: Enumerator,
}

impl Reconciler {
    pub fn new(client: Arc<dyn VersionedBucketClient>) -> Self {
        Self {
            enumerator: Enumerator::new(client),
        }
    }

    pub async fn recount(
        &self,
        bucket: &BucketName,
        prefix: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<VersionCounts, EnumerationHalt> {
        let mut counts = VersionCounts::default();
        self.enumerator
            .for_each_page(bucket, prefix, cancel, |page| {
                for version in &page.versions {
                    counts.observe(version);
                }
            })
            .await?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::storage::InMemoryVersionedBucket;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_recount_ignores_delete_markers() {
        let store = InMemoryVersionedBucket::new().with_page_size(2);
        let bucket = BucketName::new("archive-bucket").unwrap();
        store.create_bucket(&bucket).await;
        let now = Utc::now();

        store.put_version(&bucket, "a", now - Duration::days(3)).await.unwrap();
        store.put_version(&bucket, "a", now - Duration::days(2)).await.unwrap();
        store.put_version(&bucket, "a", now).await.unwrap();
        store.put_version(&bucket, "b", now - Duration::days(1)).await.unwrap();
        store.put_delete_marker(&bucket, "b", now).await.unwrap();

        let reconciler = Reconciler::new(Arc::new(store));
        let counts = reconciler
            .recount(&bucket, None, &CancellationToken::new())
            .await
            .unwrap();

        // b's only version is non-current once the marker sits on top
        assert_eq!(counts.current, 1);
        assert_eq!(counts.non_current, 3);
    }

    #[tokio::test]
    async fn test_recount_respects_prefix() {
        let store = InMemoryVersionedBucket::new();
        let bucket = BucketName::new("archive-bucket").unwrap();
        store.create_bucket(&bucket).await;
        let now = Utc::now();

        store.put_version(&bucket, "logs/a", now).await.unwrap();
        store.put_version(&bucket, "data/b", now).await.unwrap();

        let reconciler = Reconciler::new(Arc::new(store));
        let cancel = CancellationToken::new();

        let scoped = reconciler.recount(&bucket, Some("logs/"), &cancel).await.unwrap();
        let whole = reconciler.recount(&bucket, None, &cancel).await.unwrap();
        assert_eq!(scoped.current, 1);
        assert_eq!(whole.current, 2);
    }
}
