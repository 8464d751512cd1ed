use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

use crate::config::args::value_parser::human_bytes;
use crate::config::args::value_parser::url;
use crate::config::file::{self, ConfigFile, EndpointSection};
use crate::config::{ClientConfig, Config, RetryConfig, TracingConfig, TransferConfig};
use crate::types::AccessKeys;

pub mod value_parser;

const DEFAULT_WORKER_COUNT: u16 = 10;
const DEFAULT_CHUNK_SIZE: &str = "8MiB";
const DEFAULT_MAX_DIRECT_SIZE: &str = "500MiB";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MILLISECONDS: u64 = 2000;
const DEFAULT_SKIP_EXISTING: bool = true;
const DEFAULT_DIRECT_READ: bool = false;
const DEFAULT_FORCE_PATH_STYLE: bool = false;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;

#[derive(Parser, Debug, Clone)]
#[command(name = "s3migrate", version, about = "Bucket-to-bucket migration tool for S3-compatible object storage.")]
pub struct CLIArgs {
    /// path to a TOML configuration file. command line options override it
    #[arg(long, env = "S3MIGRATE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// source endpoint url
    #[arg(long, env, value_parser = url::check_scheme, help_heading = "Source Options")]
    source_endpoint_url: Option<String>,

    /// source access key
    #[arg(long, env, help_heading = "Source Options")]
    source_access_key: Option<String>,

    /// source secret access key
    #[arg(long, env, help_heading = "Source Options")]
    source_secret_access_key: Option<String>,

    /// source region
    #[arg(long, env, help_heading = "Source Options")]
    source_region: Option<String>,

    /// force path-style addressing for the source endpoint
    #[arg(long, env, default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "Source Options")]
    source_force_path_style: bool,

    /// target endpoint url
    #[arg(long, env, value_parser = url::check_scheme, help_heading = "Target Options")]
    target_endpoint_url: Option<String>,

    /// target access key
    #[arg(long, env, help_heading = "Target Options")]
    target_access_key: Option<String>,

    /// target secret access key
    #[arg(long, env, help_heading = "Target Options")]
    target_secret_access_key: Option<String>,

    /// target region
    #[arg(long, env, help_heading = "Target Options")]
    target_region: Option<String>,

    /// force path-style addressing for the target endpoint
    #[arg(long, env, default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "Target Options")]
    target_force_path_style: bool,

    /// buckets to migrate, comma-delimited
    #[arg(long, env, value_delimiter = ',', help_heading = "Migration")]
    buckets: Option<Vec<String>>,

    /// number of concurrent transfer workers
    #[arg(long, env, value_parser = clap::value_parser!(u16).range(1..), help_heading = "Migration")]
    worker_count: Option<u16>,

    /// multipart chunk size, e.g. 8MiB
    #[arg(long, env, value_parser = human_bytes::check_chunk_size, help_heading = "Migration")]
    chunk_size: Option<String>,

    /// largest object that is copied with a single request, e.g. 500MiB
    #[arg(long, env, value_parser = human_bytes::check_human_bytes, help_heading = "Migration")]
    max_direct_size: Option<String>,

    /// always copy with a single request, regardless of object size
    #[arg(long, env, default_value_t = DEFAULT_DIRECT_READ, help_heading = "Migration")]
    direct_read: bool,

    /// copy objects that already exist at the target
    #[arg(long, env, default_value_t = false, help_heading = "Migration")]
    no_skip_existing: bool,

    /// retry budget per storage operation
    #[arg(long, env, help_heading = "Migration")]
    max_retries: Option<u32>,

    /// backoff base delay in milliseconds
    #[arg(long, env, help_heading = "Migration")]
    retry_delay_milliseconds: Option<u64>,

    /// output tracing as json
    #[arg(long, env, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Tracing")]
    json_tracing: bool,

    /// enable aws sdk tracing
    #[arg(long, env, default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Tracing")]
    aws_sdk_tracing: bool,

    /// disable ansi colors in tracing output
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Tracing")]
    disable_color_tracing: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

struct EndpointArgs {
    endpoint_url: Option<String>,
    access_key: Option<String>,
    secret_access_key: Option<String>,
    region: Option<String>,
    force_path_style: bool,
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(value: CLIArgs) -> Result<Self, Self::Error> {
        let config_file = match &value.config {
            Some(path) => file::load(path).map_err(|e| format!("{e:#}\n"))?,
            None => ConfigFile::default(),
        };

        let mut missing_keys = Vec::new();

        let source = resolve_endpoint(
            "source",
            EndpointArgs {
                endpoint_url: value.source_endpoint_url,
                access_key: value.source_access_key,
                secret_access_key: value.source_secret_access_key,
                region: value.source_region,
                force_path_style: value.source_force_path_style,
            },
            &config_file.source,
            &mut missing_keys,
        );
        let target = resolve_endpoint(
            "target",
            EndpointArgs {
                endpoint_url: value.target_endpoint_url,
                access_key: value.target_access_key,
                secret_access_key: value.target_secret_access_key,
                region: value.target_region,
                force_path_style: value.target_force_path_style,
            },
            &config_file.target,
            &mut missing_keys,
        );

        let buckets: Vec<String> = value
            .buckets
            .or_else(|| config_file.migration.buckets.clone())
            .unwrap_or_default()
            .into_iter()
            .filter(|bucket| !bucket.is_empty())
            .collect();
        if buckets.is_empty() {
            missing_keys.push("buckets (--buckets)".to_string());
        }

        // Everything that is missing is reported at once.
        if !missing_keys.is_empty() {
            return Err(format!(
                "missing required configuration: {}\n",
                missing_keys.join(", ")
            ));
        }

        let chunk_size = match value.chunk_size.or_else(|| config_file.migration.chunk_size.clone())
        {
            Some(chunk_size) => human_bytes::parse_chunk_size(&chunk_size)
                .map_err(|e| format!("migration.chunk_size: {e}\n"))?,
            None => human_bytes::parse_chunk_size(DEFAULT_CHUNK_SIZE).unwrap(),
        };
        let max_direct_size = match value
            .max_direct_size
            .or_else(|| config_file.migration.max_direct_size.clone())
        {
            Some(max_direct_size) => human_bytes::parse_human_bytes(&max_direct_size)
                .map_err(|e| format!("migration.max_direct_size: {e}\n"))?,
            None => human_bytes::parse_human_bytes(DEFAULT_MAX_DIRECT_SIZE).unwrap(),
        };

        let skip_existing = if value.no_skip_existing {
            false
        } else {
            config_file
                .migration
                .skip_existing
                .unwrap_or(DEFAULT_SKIP_EXISTING)
        };

        let tracing_config = value.verbosity.log_level().map(|log_level| TracingConfig {
            tracing_level: log_level,
            json_tracing: value.json_tracing,
            aws_sdk_tracing: value.aws_sdk_tracing,
            disable_color_tracing: value.disable_color_tracing,
        });

        Ok(Config {
            source: source.unwrap(),
            target: target.unwrap(),
            buckets,
            worker_count: value
                .worker_count
                .or(config_file.migration.worker_count)
                .unwrap_or(DEFAULT_WORKER_COUNT),
            transfer_config: TransferConfig {
                chunk_size,
                direct_read: value.direct_read
                    || config_file.migration.direct_read.unwrap_or(DEFAULT_DIRECT_READ),
                max_direct_size,
            },
            retry_config: RetryConfig {
                max_retries: value
                    .max_retries
                    .or(config_file.migration.max_retries)
                    .unwrap_or(DEFAULT_MAX_RETRIES),
                retry_base_delay_milliseconds: value
                    .retry_delay_milliseconds
                    .or(config_file.migration.retry_delay_milliseconds)
                    .unwrap_or(DEFAULT_RETRY_DELAY_MILLISECONDS),
            },
            skip_existing,
            tracing_config,
        })
    }
}

fn resolve_endpoint(
    side: &str,
    args: EndpointArgs,
    section: &EndpointSection,
    missing_keys: &mut Vec<String>,
) -> Option<ClientConfig> {
    let endpoint_url = args.endpoint_url.or_else(|| section.endpoint_url.clone());
    let access_key = args.access_key.or_else(|| section.access_key.clone());
    let secret_access_key = args
        .secret_access_key
        .or_else(|| section.secret_key.clone());

    if endpoint_url.is_none() {
        missing_keys.push(format!("{side} endpoint url (--{side}-endpoint-url)"));
    }
    if access_key.is_none() {
        missing_keys.push(format!("{side} access key (--{side}-access-key)"));
    }
    if secret_access_key.is_none() {
        missing_keys.push(format!(
            "{side} secret access key (--{side}-secret-access-key)"
        ));
    }

    Some(ClientConfig {
        endpoint_url: endpoint_url?,
        access_keys: AccessKeys {
            access_key: access_key?,
            secret_access_key: secret_access_key?,
        },
        region: args.region.or_else(|| section.region.clone()),
        force_path_style: args.force_path_style || section.force_path_style.unwrap_or_default(),
    })
}
