use std::fmt::{Debug, Formatter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Optional TOML configuration file. Every key can also be given on the
/// command line; command line values win.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub source: EndpointSection,
    #[serde(default)]
    pub target: EndpointSection,
    #[serde(default)]
    pub migration: MigrationSection,
}

#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSection {
    pub endpoint_url: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
    pub force_path_style: Option<bool>,
}

impl Debug for EndpointSection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointSection")
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key", &self.access_key)
            .field(
                "secret_key",
                &self.secret_key.as_ref().map(|_| "** redacted **"),
            )
            .field("region", &self.region)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationSection {
    pub buckets: Option<Vec<String>>,
    pub worker_count: Option<u16>,
    pub chunk_size: Option<String>,
    pub max_direct_size: Option<String>,
    pub direct_read: Option<bool>,
    pub skip_existing: Option<bool>,
    pub max_retries: Option<u32>,
    pub retry_delay_milliseconds: Option<u64>,
}

pub fn load(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration file {} failed.", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("parsing configuration file {} failed.", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_a_complete_file() {
        init_dummy_tracing_subscriber();

        let file = write_config_file(
            r#"
[source]
endpoint_url = "https://source.example.com"
access_key = "source_access_key"
secret_key = "source_secret_key"
region = "eu-west-1"
force_path_style = true

[target]
endpoint_url = "https://target.example.com"
access_key = "target_access_key"
secret_key = "target_secret_key"

[migration]
buckets = ["photos", "documents"]
worker_count = 4
chunk_size = "16MiB"
max_direct_size = "1GiB"
skip_existing = false
max_retries = 5
retry_delay_milliseconds = 500
"#,
        );

        let config_file = load(file.path()).unwrap();
        assert_eq!(
            config_file.source.endpoint_url.unwrap(),
            "https://source.example.com"
        );
        assert_eq!(config_file.source.region.unwrap(), "eu-west-1");
        assert_eq!(config_file.source.force_path_style, Some(true));
        assert_eq!(
            config_file.migration.buckets.unwrap(),
            vec!["photos".to_string(), "documents".to_string()]
        );
        assert_eq!(config_file.migration.worker_count, Some(4));
        assert_eq!(config_file.migration.skip_existing, Some(false));
    }

    #[test]
    fn empty_file_has_no_values() {
        init_dummy_tracing_subscriber();

        let file = write_config_file("");
        let config_file = load(file.path()).unwrap();

        assert!(config_file.source.endpoint_url.is_none());
        assert!(config_file.migration.buckets.is_none());
    }

    #[test]
    fn unknown_key_is_rejected() {
        init_dummy_tracing_subscriber();

        let file = write_config_file("[migration]\nworkers = 4\n");
        assert!(load(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        init_dummy_tracing_subscriber();

        assert!(load(Path::new("/nonexistent/config.toml")).is_err());
    }

    #[test]
    fn debug_output_redacts_the_secret_key() {
        init_dummy_tracing_subscriber();

        let section = EndpointSection {
            endpoint_url: Some("https://source.example.com".to_string()),
            access_key: Some("my_access_key".to_string()),
            secret_key: Some("my_secret_key".to_string()),
            region: None,
            force_path_style: None,
        };

        let debug_output = format!("{section:?}");
        assert!(!debug_output.contains("my_secret_key"));
        assert!(debug_output.contains("** redacted **"));
    }

    fn write_config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
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
