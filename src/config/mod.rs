use std::time::Duration;

use crate::types::AccessKeys;

pub mod args;
pub mod file;

#[derive(Debug, Clone)]
pub struct Config {
    pub source: ClientConfig,
    pub target: ClientConfig,
    pub buckets: Vec<String>,
    pub worker_count: u16,
    pub transfer_config: TransferConfig,
    pub retry_config: RetryConfig,
    pub skip_existing: bool,
    pub tracing_config: Option<TracingConfig>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint_url: String,
    pub access_keys: AccessKeys,
    pub region: Option<String>,
    pub force_path_style: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TransferConfig {
    pub chunk_size: u64,
    pub direct_read: bool,
    pub max_direct_size: u64,
}

impl TransferConfig {
    pub fn is_direct_transfer(&self, size: u64) -> bool {
        size <= self.max_direct_size
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub retry_base_delay_milliseconds: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_milliseconds)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub disable_color_tracing: bool,
}
