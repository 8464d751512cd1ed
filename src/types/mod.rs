use std::fmt;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

use zeroize_derive::{Zeroize, ZeroizeOnDrop};

pub mod error;
pub mod token;

const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// One key in a source bucket, as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub key: String,
    pub size: u64,
}

/// Result of processing exactly one [`ObjectRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub key: String,
    pub success: bool,
    pub bytes_transferred: u64,
    pub error_reason: Option<String>,
}

impl TransferOutcome {
    pub fn success(key: &str, bytes_transferred: u64) -> Self {
        Self {
            key: key.to_string(),
            success: true,
            bytes_transferred,
            error_reason: None,
        }
    }

    pub fn failure(key: &str, error_reason: String) -> Self {
        Self {
            key: key.to_string(),
            success: false,
            bytes_transferred: 0,
            error_reason: Some(error_reason),
        }
    }
}

/// Per-bucket aggregate. Mutated only on the collecting side of the
/// worker pool, never inside worker tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketReport {
    pub bucket: String,
    pub objects_total: u64,
    pub objects_succeeded: u64,
    pub objects_failed: u64,
    pub bytes_copied: u64,
    pub failed_keys: Vec<String>,
}

impl BucketReport {
    pub fn new(bucket: &str, objects_total: u64) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects_total,
            ..Default::default()
        }
    }

    pub fn apply(&mut self, outcome: &TransferOutcome) {
        if outcome.success {
            self.objects_succeeded += 1;
            self.bytes_copied += outcome.bytes_transferred;
        } else {
            self.objects_failed += 1;
            self.failed_keys.push(outcome.key.clone());
        }
    }
}

/// Whole-run aggregate, owned by the orchestrator.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub buckets: Vec<BucketReport>,
    pub buckets_failed: u64,
    pub elapsed: Duration,
}

impl MigrationReport {
    pub fn add_bucket(&mut self, report: BucketReport) {
        self.buckets.push(report);
    }

    pub fn add_bucket_failure(&mut self) {
        self.buckets_failed += 1;
    }

    pub fn objects_total(&self) -> u64 {
        self.buckets.iter().map(|report| report.objects_total).sum()
    }

    pub fn objects_succeeded(&self) -> u64 {
        self.buckets
            .iter()
            .map(|report| report.objects_succeeded)
            .sum()
    }

    pub fn objects_failed(&self) -> u64 {
        self.buckets
            .iter()
            .map(|report| report.objects_failed)
            .sum()
    }

    pub fn bytes_copied(&self) -> u64 {
        self.buckets.iter().map(|report| report.bytes_copied).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.buckets_failed != 0 || self.objects_failed() != 0
    }

    /// Succeeded objects over all processed units. A whole-bucket
    /// failure counts as one failed unit.
    pub fn success_rate(&self) -> f64 {
        let processed = self.objects_succeeded() + self.objects_failed() + self.buckets_failed;
        if processed == 0 {
            return 0.0;
        }

        self.objects_succeeded() as f64 / processed as f64 * 100.0
    }
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **");
        keys.finish()
    }
}

/// Human readable byte size, unit boundaries at powers of 1024,
/// rounded to two decimals.
pub fn format_size(size: u64) -> String {
    if size == 0 {
        return "0B".to_string();
    }

    let exponent = ((size as f64).log(1024.0).floor() as usize).min(SIZE_UNITS.len() - 1);
    let value = size as f64 / 1024f64.powi(exponent as i32);
    let hundredths = (value * 100.0).round();
    let rounded = hundredths / 100.0;
    let unit = SIZE_UNITS[exponent];

    if hundredths % 10.0 == 0.0 {
        format!("{rounded:.1} {unit}")
    } else {
        format!("{rounded:.2} {unit}")
    }
}
