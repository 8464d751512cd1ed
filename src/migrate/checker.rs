use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::migrate::retry::retry;
use crate::storage::Storage;
use crate::types::ObjectRecord;

/// Decides whether an object already present at the target can be
/// skipped. Presence is judged by key and size only.
pub struct ExistenceChecker {
    target: Storage,
    skip_existing: bool,
    retry_config: RetryConfig,
}

impl ExistenceChecker {
    pub fn new(target: Storage, skip_existing: bool, retry_config: RetryConfig) -> Self {
        Self {
            target,
            skip_existing,
            retry_config,
        }
    }

    /// A check failure never blocks a transfer. When the target cannot be
    /// queried the object is copied again, which is safe because transfers
    /// are idempotent.
    pub async fn should_skip(&self, bucket: &str, record: &ObjectRecord) -> bool {
        if !self.skip_existing {
            return false;
        }

        // Zero-byte directory markers are always rewritten.
        if record.key.ends_with('/') {
            return false;
        }

        let result = retry(
            "head_object",
            || async move { self.target.head_object(bucket, &record.key).await },
            self.retry_config.max_retries,
            self.retry_config.base_delay(),
        )
        .await;

        match result {
            Ok(Some(target_size)) if target_size == record.size => {
                debug!(
                    bucket = bucket,
                    key = &record.key,
                    size = record.size,
                    "object already exists at the target. skipping."
                );
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(
                    bucket = bucket,
                    key = &record.key,
                    error = %e,
                    "existence check failed. transferring anyway."
                );
                false
            }
        }
    }
}
