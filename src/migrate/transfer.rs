use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, info, warn};

use crate::config::{RetryConfig, TransferConfig};
use crate::migrate::checker::ExistenceChecker;
use crate::migrate::retry::retry;
use crate::storage::{MultipartPart, Storage};
use crate::types::error::is_not_found_error;
use crate::types::{ObjectRecord, TransferOutcome};

const PART_PROGRESS_INTERVAL: u64 = 10;

/// Copies one object at a time from the source store to the target
/// store, choosing between a single-request transfer and a chunked
/// multipart transfer based on object size.
pub struct TransferDispatcher {
    source: Storage,
    target: Storage,
    checker: ExistenceChecker,
    transfer_config: TransferConfig,
    retry_config: RetryConfig,
    worker_index: u16,
}

impl TransferDispatcher {
    pub fn new(
        source: Storage,
        target: Storage,
        transfer_config: TransferConfig,
        retry_config: RetryConfig,
        skip_existing: bool,
        worker_index: u16,
    ) -> Self {
        let checker = ExistenceChecker::new(
            dyn_clone::clone_box(&*target),
            skip_existing,
            retry_config,
        );

        Self {
            source,
            target,
            checker,
            transfer_config,
            retry_config,
            worker_index,
        }
    }

    /// Transfer failures are captured in the outcome instead of being
    /// propagated, so one broken object never stops the worker.
    pub async fn dispatch(&self, bucket: &str, record: &ObjectRecord) -> TransferOutcome {
        if self.checker.should_skip(bucket, record).await {
            return TransferOutcome::success(&record.key, record.size);
        }

        let result = if record.size == 0
            || self.transfer_config.direct_read
            || self.transfer_config.is_direct_transfer(record.size)
        {
            self.copy_direct(bucket, record).await
        } else {
            self.copy_multipart(bucket, record).await
        };

        match result {
            Ok(bytes_transferred) => {
                debug!(
                    worker_index = self.worker_index,
                    bucket = bucket,
                    key = &record.key,
                    bytes_transferred = bytes_transferred,
                    "object transferred."
                );
                TransferOutcome::success(&record.key, bytes_transferred)
            }
            Err(e) => {
                error!(
                    worker_index = self.worker_index,
                    bucket = bucket,
                    key = &record.key,
                    error = %e,
                    "object transfer failed."
                );
                TransferOutcome::failure(&record.key, format!("{e:#}"))
            }
        }
    }

    async fn copy_direct(&self, bucket: &str, record: &ObjectRecord) -> Result<u64> {
        let body = retry(
            "get_object",
            || async move { self.source.get_object(bucket, &record.key, None).await },
            self.retry_config.max_retries,
            self.retry_config.base_delay(),
        )
        .await
        .map_err(|e| {
            // The source listing can be stale; the object may be gone by now.
            if is_not_found_error(&e) {
                anyhow!("source object missing: {}", record.key)
            } else {
                e.context(format!("reading source object {} failed.", record.key))
            }
        })?;

        let bytes_transferred = body.len() as u64;
        retry(
            "put_object",
            || {
                let body = body.clone();
                async move { self.target.put_object(bucket, &record.key, body).await }
            },
            self.retry_config.max_retries,
            self.retry_config.base_delay(),
        )
        .await
        .with_context(|| format!("writing target object {} failed.", record.key))?;

        Ok(bytes_transferred)
    }

    async fn copy_multipart(&self, bucket: &str, record: &ObjectRecord) -> Result<u64> {
        let upload_id = retry(
            "create_multipart_upload",
            || async move {
                self.target
                    .create_multipart_upload(bucket, &record.key)
                    .await
            },
            self.retry_config.max_retries,
            self.retry_config.base_delay(),
        )
        .await
        .with_context(|| format!("creating multipart upload for {} failed.", record.key))?;

        match self
            .upload_parts_and_complete(bucket, record, &upload_id)
            .await
        {
            Ok(bytes_transferred) => Ok(bytes_transferred),
            Err(e) => {
                // The abort is best effort. Its own failure is logged but the
                // transfer error is the one reported.
                let upload_id = upload_id.as_str();
                let abort_result = retry(
                    "abort_multipart_upload",
                    || async move {
                        self.target
                            .abort_multipart_upload(bucket, &record.key, upload_id)
                            .await
                    },
                    self.retry_config.max_retries,
                    self.retry_config.base_delay(),
                )
                .await;

                if let Err(abort_error) = abort_result {
                    warn!(
                        bucket = bucket,
                        key = &record.key,
                        upload_id = upload_id,
                        error = %abort_error,
                        "aborting multipart upload failed."
                    );
                }

                Err(e)
            }
        }
    }

    async fn upload_parts_and_complete(
        &self,
        bucket: &str,
        record: &ObjectRecord,
        upload_id: &str,
    ) -> Result<u64> {
        let chunk_size = self.transfer_config.chunk_size;
        let part_count = record.size.div_ceil(chunk_size);
        let mut parts = Vec::with_capacity(part_count as usize);
        let mut bytes_transferred = 0u64;

        for index in 0..part_count {
            let (start, end) = part_range(index, chunk_size, record.size);
            let part_number = (index + 1) as i32;

            let body = retry(
                "get_object",
                || async move {
                    self.source
                        .get_object(bucket, &record.key, Some((start, end)))
                        .await
                },
                self.retry_config.max_retries,
                self.retry_config.base_delay(),
            )
            .await
            .with_context(|| {
                format!("reading part {part_number} of source object {} failed.", record.key)
            })?;

            bytes_transferred += body.len() as u64;
            let e_tag = retry(
                "upload_part",
                || {
                    let body = body.clone();
                    async move {
                        self.target
                            .upload_part(bucket, &record.key, upload_id, part_number, body)
                            .await
                    }
                },
                self.retry_config.max_retries,
                self.retry_config.base_delay(),
            )
            .await
            .with_context(|| {
                format!("uploading part {part_number} of {} failed.", record.key)
            })?;

            parts.push(MultipartPart { part_number, e_tag });

            if (index + 1) % PART_PROGRESS_INTERVAL == 0 || index + 1 == part_count {
                info!(
                    worker_index = self.worker_index,
                    bucket = bucket,
                    key = &record.key,
                    part = part_number,
                    part_count = part_count,
                    "multipart upload progress."
                );
            }
        }

        let parts_ref = &parts;
        retry(
            "complete_multipart_upload",
            || async move {
                self.target
                    .complete_multipart_upload(bucket, &record.key, upload_id, parts_ref)
                    .await
            },
            self.retry_config.max_retries,
            self.retry_config.base_delay(),
        )
        .await
        .with_context(|| format!("completing multipart upload for {} failed.", record.key))?;

        Ok(bytes_transferred)
    }
}

/// Inclusive byte range of the part at `index`. The last part may be
/// shorter than `chunk_size`.
fn part_range(index: u64, chunk_size: u64, size: u64) -> (u64, u64) {
    let start = index * chunk_size;
    let end = ((index + 1) * chunk_size - 1).min(size - 1);
    (start, end)
}
