/*!
# Overview
s3migrate copies every object of a set of buckets from one S3-compatible
object storage to another. It is built for endpoint-to-endpoint
migrations, for example from a self-hosted MinIO cluster to another
vendor's storage, where server-side copy is not available and every
object has to travel through the machine running the tool.

Objects are transferred by a bounded worker pool. Small objects are
copied with a single get/put request pair; large objects are streamed
chunk by chunk through a multipart upload. Objects that already exist at
the target with the same size are skipped, so an interrupted migration
can simply be run again.

## As a library
The CLI is a thin wrapper around this crate. The same migration can be
driven programmatically:

```no_run
use clap::Parser;

use s3migrate::migrate::Migrator;
use s3migrate::types::token::create_migration_cancellation_token;
use s3migrate::{CLIArgs, Config};

#[tokio::main]
async fn main() {
    let args = CLIArgs::parse_from([
        "s3migrate",
        "--source-endpoint-url",
        "https://source.example.com",
        "--source-access-key",
        "source_access_key",
        "--source-secret-access-key",
        "source_secret_access_key",
        "--target-endpoint-url",
        "https://target.example.com",
        "--target-access-key",
        "target_access_key",
        "--target-secret-access-key",
        "target_secret_access_key",
        "--buckets",
        "photos,documents",
    ]);
    let config = Config::try_from(args).unwrap();

    let migrator = Migrator::new(config, create_migration_cancellation_token()).await;
    let report = migrator.migrate_all().await;

    assert!(!report.has_failures());
}
```
*/
pub use crate::config::Config;
pub use crate::config::args::CLIArgs;

pub mod config;
pub mod migrate;
pub mod storage;
pub mod types;
