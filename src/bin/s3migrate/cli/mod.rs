use anyhow::{Result, anyhow};
use tokio::time::Instant;
use tracing::{error, trace, warn};

use s3migrate::Config;
use s3migrate::migrate::Migrator;
use s3migrate::types::token::create_migration_cancellation_token;

mod ctrl_c_handler;

#[allow(dead_code)]
const EXIT_CODE_SUCCESS: i32 = 0;
#[allow(dead_code)]
const EXIT_CODE_ERROR: i32 = 1;
#[allow(dead_code)]
const EXIT_CODE_INVALID_ARGS: i32 = 2;
const EXIT_CODE_INTERRUPTED: i32 = 130;

pub async fn run(config: Config) -> Result<()> {
    let cancellation_token = create_migration_cancellation_token();

    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let start_time = Instant::now();
    trace!("migration start.");

    let migrator = Migrator::new(config, cancellation_token.clone()).await;
    let report = migrator.migrate_all().await;

    if cancellation_token.is_cancelled() {
        warn!("migration interrupted.");
        std::process::exit(EXIT_CODE_INTERRUPTED);
    }

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    if report.has_failures() {
        error!(duration_sec = duration_sec, "s3migrate failed.");

        return Err(anyhow!("s3migrate failed."));
    }

    trace!(duration_sec = duration_sec, "s3migrate has been completed.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use s3migrate::CLIArgs;

    use super::*;

    #[tokio::test]
    async fn run_reports_failure_for_unreachable_endpoints() {
        init_dummy_tracing_subscriber();

        let args = vec![
            "s3migrate",
            "--source-endpoint-url",
            "https://localhost:1",
            "--source-access-key",
            "source_access_key",
            "--source-secret-access-key",
            "source_secret_access_key",
            "--target-endpoint-url",
            "https://localhost:1",
            "--target-access-key",
            "target_access_key",
            "--target-secret-access-key",
            "target_secret_access_key",
            "--buckets",
            "photos",
            "--max-retries",
            "1",
            "--retry-delay-milliseconds",
            "1",
        ];
        let config = Config::try_from(CLIArgs::try_parse_from(args).unwrap()).unwrap();

        assert!(run(config).await.is_err());
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
