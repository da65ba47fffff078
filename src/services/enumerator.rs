use async_stream::try_stream;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    domain::{
        errors::StorageError,
        models::{ListCursor, VersionPage},
        value_objects::BucketName,
    },
    ports::storage::VersionedBucketClient,
};

/// A page fetch failed after `pages_fetched` successful pages
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationError {
    pub pages_fetched: usize,
    pub source: StorageError,
}

/// Why a full traversal stopped early
#[derive(Debug, Clone, PartialEq)]
pub enum EnumerationHalt {
    Failed(EnumerationError),
    Cancelled { pages_fetched: usize },
}

/// Walks a bucket's version history page by page
#[derive(Clone)]
pub struct Enumerator {
    client: Arc<dyn VersionedBucketClient>,
}

impl Enumerator {
    pub fn new(client: Arc<dyn VersionedBucketClient>) -> Self {
        Self { client }
    }

    /// Lazily list every page under `prefix`, following the backend's cursor
    /// until it reports no further pages.
    ///
    /// Each call starts a fresh traversal against current bucket state.
    pub fn enumerate<'a>(
        &'a self,
        bucket: &'a BucketName,
        prefix: Option<&'a str>,
    ) -> impl Stream<Item = Result<VersionPage, EnumerationError>> + Send + 'a {
        try_stream! {
            let mut cursor: Option<ListCursor> = None;
            let mut pages_fetched = 0usize;

            loop {
                let page = self
                    .client
                    .list_object_versions(bucket, prefix, cursor.as_ref())
                    .await
                    .map_err(|source| EnumerationError {
                        pages_fetched,
                        source,
                    })?;
                pages_fetched += 1;

                debug!(
                    bucket = %bucket,
                    page = pages_fetched,
                    versions = page.versions.len(),
                    delete_markers = page.delete_markers.len(),
                    "Listed version page"
                );

                let next = page.next_cursor.clone();
                yield page;

                match next {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
        }
    }

    /// Drive a full traversal, handing every page to `visit`.
    ///
    /// `cancel` is checked before each page fetch. Returns the number of
    /// pages listed.
    pub async fn for_each_page<F>(
        &self,
        bucket: &BucketName,
        prefix: Option<&str>,
        cancel: &CancellationToken,
        mut visit: F,
    ) -> Result<usize, EnumerationHalt>
    where
        F: FnMut(&VersionPage) + Send,
    {
        let pages = self.enumerate(bucket, prefix);
        futures::pin_mut!(pages);

        let mut pages_fetched = 0usize;
        loop {
            if cancel.is_cancelled() {
                return Err(EnumerationHalt::Cancelled { pages_fetched });
            }

            match pages.next().await {
                Some(Ok(page)) => {
                    pages_fetched += 1;
                    visit(&page);
                }
                Some(Err(err)) => return Err(EnumerationHalt::Failed(err)),
                None => return Ok(pages_fetched),
            }
        }
    }
}
