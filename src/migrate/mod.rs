use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::migrate::enumerator::ObjectEnumerator;
use crate::migrate::retry::retry;
use crate::migrate::transfer::TransferDispatcher;
use crate::storage::Storage;
use crate::storage::s3::S3ObjectStore;
use crate::types::error::is_bucket_already_exists_error;
use crate::types::token::MigrationCancellationToken;
use crate::types::{BucketReport, MigrationReport, ObjectRecord, TransferOutcome, format_size};

pub mod checker;
pub mod enumerator;
pub mod retry;
pub mod transfer;

const OBJECT_PROGRESS_INTERVAL: u64 = 10;
const FAILED_KEYS_LOG_LIMIT: usize = 10;
const CHANNEL_CAPACITY: usize = 1000;

/// Drives the whole migration. Buckets are processed sequentially;
/// objects inside a bucket are transferred by a bounded worker pool.
pub struct Migrator {
    config: Config,
    source: Storage,
    target: Storage,
    cancellation_token: MigrationCancellationToken,
}

impl Migrator {
    pub async fn new(config: Config, cancellation_token: MigrationCancellationToken) -> Self {
        let source = S3ObjectStore::boxed(config.source.create_client().await);
        let target = S3ObjectStore::boxed(config.target.create_client().await);

        Self::with_stores(config, source, target, cancellation_token)
    }

    pub fn with_stores(
        config: Config,
        source: Storage,
        target: Storage,
        cancellation_token: MigrationCancellationToken,
    ) -> Self {
        Self {
            config,
            source,
            target,
            cancellation_token,
        }
    }

    /// A bucket that fails outright is recorded in the report and the
    /// remaining buckets are still migrated.
    pub async fn migrate_all(&self) -> MigrationReport {
        let started = Instant::now();
        let mut report = MigrationReport::default();

        for bucket in &self.config.buckets {
            if self.cancellation_token.is_cancelled() {
                warn!(bucket = bucket, "migration cancelled. skipping remaining buckets.");
                break;
            }

            info!(bucket = bucket, "bucket migration started.");
            match self.migrate_bucket(bucket).await {
                Ok(bucket_report) => {
                    info!(
                        bucket = bucket,
                        objects_total = bucket_report.objects_total,
                        objects_succeeded = bucket_report.objects_succeeded,
                        objects_failed = bucket_report.objects_failed,
                        bytes_copied = format_size(bucket_report.bytes_copied),
                        "bucket migration finished."
                    );
                    report.add_bucket(bucket_report);
                }
                Err(e) => {
                    error!(bucket = bucket, error = %e, "bucket migration failed.");
                    report.add_bucket_failure();
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            buckets = report.buckets.len(),
            buckets_failed = report.buckets_failed,
            objects_succeeded = report.objects_succeeded(),
            objects_failed = report.objects_failed(),
            bytes_copied = format_size(report.bytes_copied()),
            success_rate = format!("{:.1}%", report.success_rate()),
            elapsed_seconds = report.elapsed.as_secs(),
            "migration finished."
        );

        report
    }

    async fn migrate_bucket(&self, bucket: &str) -> Result<BucketReport> {
        self.ensure_target_bucket(bucket).await?;

        let enumerator = ObjectEnumerator::new(
            dyn_clone::clone_box(&*self.source),
            self.config.retry_config,
        );
        let objects = enumerator.list_all(bucket).await?;
        let mut report = BucketReport::new(bucket, objects.len() as u64);

        if objects.is_empty() {
            info!(bucket = bucket, "bucket is empty.");
            return Ok(report);
        }
        info!(
            bucket = bucket,
            objects_total = report.objects_total,
            "bucket enumerated."
        );

        let worker_count = self.config.worker_count.max(1);
        let (record_sender, record_receiver) =
            async_channel::bounded::<ObjectRecord>(CHANNEL_CAPACITY);
        let (outcome_sender, outcome_receiver) =
            async_channel::bounded::<TransferOutcome>(CHANNEL_CAPACITY);

        let mut workers = Vec::with_capacity(worker_count as usize);
        for worker_index in 0..worker_count {
            let dispatcher = TransferDispatcher::new(
                dyn_clone::clone_box(&*self.source),
                dyn_clone::clone_box(&*self.target),
                self.config.transfer_config,
                self.config.retry_config,
                self.config.skip_existing,
                worker_index,
            );
            let record_receiver = record_receiver.clone();
            let outcome_sender = outcome_sender.clone();
            let cancellation_token = self.cancellation_token.clone();
            let bucket = bucket.to_string();

            workers.push(tokio::spawn(async move {
                while let Ok(record) = record_receiver.recv().await {
                    if cancellation_token.is_cancelled() {
                        break;
                    }

                    let outcome = dispatcher.dispatch(&bucket, &record).await;
                    if outcome_sender.send(outcome).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(record_receiver);
        drop(outcome_sender);

        let feeder = tokio::spawn(async move {
            for record in objects {
                if record_sender.send(record).await.is_err() {
                    break;
                }
            }
        });

        let mut processed = 0u64;
        while let Ok(outcome) = outcome_receiver.recv().await {
            report.apply(&outcome);
            processed += 1;

            if processed % OBJECT_PROGRESS_INTERVAL == 0 || processed == report.objects_total {
                info!(
                    bucket = bucket,
                    processed = processed,
                    objects_total = report.objects_total,
                    "transfer progress."
                );
            }
        }

        feeder.await.context("feeder task panicked.")?;
        for worker in workers {
            worker.await.context("worker task panicked.")?;
        }

        if !report.failed_keys.is_empty() {
            report_failed_keys(bucket, &report.failed_keys);
        }

        Ok(report)
    }

    async fn ensure_target_bucket(&self, bucket: &str) -> Result<()> {
        let exists = retry(
            "bucket_exists",
            || async move { self.target.bucket_exists(bucket).await },
            self.config.retry_config.max_retries,
            self.config.retry_config.base_delay(),
        )
        .await
        .with_context(|| format!("checking target bucket {bucket} failed."))?;

        if exists {
            return Ok(());
        }

        info!(bucket = bucket, "creating bucket at the target.");
        let result = retry(
            "create_bucket",
            || async move { self.target.create_bucket(bucket).await },
            self.config.retry_config.max_retries,
            self.config.retry_config.base_delay(),
        )
        .await;

        if let Err(e) = result {
            // Another run may have created the bucket in the meantime.
            if is_bucket_already_exists_error(&e) {
                return Ok(());
            }
            return Err(e).with_context(|| format!("creating target bucket {bucket} failed."));
        }

        Ok(())
    }
}

fn report_failed_keys(bucket: &str, failed_keys: &[String]) {
    for key in failed_keys.iter().take(FAILED_KEYS_LOG_LIMIT) {
        warn!(bucket = bucket, key = key, "object was not transferred.");
    }
    if failed_keys.len() > FAILED_KEYS_LOG_LIMIT {
        warn!(
            bucket = bucket,
            remaining = failed_keys.len() - FAILED_KEYS_LOG_LIMIT,
            "more objects were not transferred."
        );
    }

    match write_failed_keys_to(Path::new("."), bucket, failed_keys) {
        Ok(path) => {
            info!(bucket = bucket, path = %path.display(), "failed object keys written.");
        }
        Err(e) => {
            warn!(bucket = bucket, error = %e, "writing failed object keys failed.");
        }
    }
}

fn write_failed_keys_to(dir: &Path, bucket: &str, failed_keys: &[String]) -> std::io::Result<PathBuf> {
    let path = dir.join(format!(
        "failed_objects_{bucket}_{}.txt",
        chrono::Utc::now().timestamp()
    ));

    let mut contents = failed_keys.join("\n");
    contents.push('\n');
    std::fs::write(&path, contents)?;

    Ok(path)
}
