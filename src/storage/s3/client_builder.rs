use aws_config::BehaviorVersion;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Builder;
use aws_types::region::Region;

use crate::config::ClientConfig;

const DEFAULT_REGION: &str = "us-east-1";

impl ClientConfig {
    pub async fn create_client(&self) -> Client {
        let credentials = aws_sdk_s3::config::Credentials::new(
            self.access_keys.access_key.to_string(),
            self.access_keys.secret_access_key.to_string(),
            None,
            None,
            "s3migrate",
        );

        let region_provider = RegionProviderChain::first_try(self.region.clone().map(Region::new))
            .or_else(Region::new(DEFAULT_REGION));

        // The migration retrier owns all retry decisions. A second retry
        // layer inside the SDK would multiply the attempt count.
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(region_provider)
            .endpoint_url(&self.endpoint_url)
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        Client::from_conf(
            Builder::from(&sdk_config)
                .force_path_style(self.force_path_style)
                .build(),
        )
    }
}
