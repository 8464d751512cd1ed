use anyhow::{Context, Result};
use tracing::debug;

use crate::config::RetryConfig;
use crate::migrate::retry::retry;
use crate::storage::Storage;
use crate::types::ObjectRecord;

/// Walks the source bucket key space page by page and collects every
/// object record before any transfer starts.
pub struct ObjectEnumerator {
    source: Storage,
    retry_config: RetryConfig,
}

impl ObjectEnumerator {
    pub fn new(source: Storage, retry_config: RetryConfig) -> Self {
        Self {
            source,
            retry_config,
        }
    }

    pub async fn list_all(&self, bucket: &str) -> Result<Vec<ObjectRecord>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let token = continuation_token.clone();
            let page = retry(
                "list_objects",
                || {
                    let token = token.clone();
                    async move { self.source.list_objects(bucket, token).await }
                },
                self.retry_config.max_retries,
                self.retry_config.base_delay(),
            )
            .await
            .with_context(|| format!("listing objects in bucket {bucket} failed."))?;

            debug!(
                bucket = bucket,
                page_objects = page.objects.len(),
                "listed one page."
            );

            objects.extend(page.objects);
            match page.next_token {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }

        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::storage::mock::MemoryStore;
    use crate::types::error::StorageError;

    fn retry_config() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            retry_base_delay_milliseconds: 1,
        }
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::with_page_size(2);
        store.insert_object("photos", "a.jpg", Bytes::from_static(b"aaaa"));
        store.insert_object("photos", "b.jpg", Bytes::from_static(b"bb"));
        store.insert_object("photos", "c/d.jpg", Bytes::from_static(b"c"));
        store.insert_object("photos", "e.jpg", Bytes::from_static(b"eeeee"));
        store.insert_object("photos", "f.jpg", Bytes::from_static(b""));
        store
    }

    #[tokio::test]
    async fn collects_all_pages() {
        init_dummy_tracing_subscriber();

        let store = seeded_store();
        let enumerator = ObjectEnumerator::new(store.boxed(), retry_config());

        let objects = enumerator.list_all("photos").await.unwrap();
        assert_eq!(objects.len(), 5);
        assert_eq!(objects[0].key, "a.jpg");
        assert_eq!(objects[0].size, 4);
        assert_eq!(objects[4].key, "f.jpg");
        assert_eq!(objects[4].size, 0);
        assert_eq!(store.calls("list_objects"), 3);
    }

    #[tokio::test]
    async fn empty_bucket_lists_no_objects() {
        init_dummy_tracing_subscriber();

        let store = MemoryStore::new();
        store.insert_bucket("empty");
        let enumerator = ObjectEnumerator::new(store.boxed(), retry_config());

        let objects = enumerator.list_all("empty").await.unwrap();
        assert!(objects.is_empty());
    }

    #[tokio::test]
    async fn transient_listing_error_is_retried() {
        init_dummy_tracing_subscriber();

        let store = seeded_store();
        store.inject_failure(
            "list_objects",
            StorageError::Service {
                code: "ServiceUnavailable".to_string(),
                message: "try again.".to_string(),
            },
        );
        let enumerator = ObjectEnumerator::new(store.boxed(), retry_config());

        let objects = enumerator.list_all("photos").await.unwrap();
        assert_eq!(objects.len(), 5);
        assert_eq!(store.calls("list_objects"), 4);
    }

    #[tokio::test]
    async fn missing_bucket_is_an_error() {
        init_dummy_tracing_subscriber();

        let store = MemoryStore::new();
        let enumerator = ObjectEnumerator::new(store.boxed(), retry_config());

        assert!(enumerator.list_all("nonexistent").await.is_err());
    }

    fn init_dummy_tracing_subscriber() {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new("dummy=trace"))
                    .unwrap(),
            )
            .try_init()
            .unwrap_or_default();
    }
}
