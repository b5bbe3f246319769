use core::str::FromStr;
use core::time::Duration;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;

/// Default resource-name and object-key prefix.
const DEFAULT_PREFIX: &str = "retaildemo";

/// Default location of the inter-stage state database.
const DEFAULT_STATE_URL: &str = "sqlite://personalize_state.db?mode=rwc";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bucket receiving the dataset files
    pub bucket: String,

    /// AWS region override (SDK default chain when unset)
    pub region: Option<String>,

    /// Directory holding `interactions.csv`, `items.csv` and `users.csv`
    pub data_dir: PathBuf,

    /// Prefix for resource names and object keys
    pub prefix: String,

    /// Name of the IAM role the service assumes to read the bucket
    pub role_name: String,

    /// `sqlx` connection URL of the state database
    pub state_url: String,

    /// Poll interval when waiting on a single resource
    pub poll_interval: Duration,

    /// Poll interval when waiting on several resources at once
    pub batch_poll_interval: Duration,

    /// Give up waiting on a resource after this long
    pub max_wait: Duration,

    /// Minimum provisioned transactions per second for campaigns
    pub campaign_min_tps: i32,

    /// Wait after creating the access role so IAM can propagate it
    pub role_propagation_wait: Duration,

    /// Optional log file written alongside console output
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `PERSONALIZE_BUCKET`: bucket receiving the dataset files
    ///
    /// Optional environment variables:
    /// - `AWS_REGION`
    /// - `PERSONALIZE_DATA_DIR` (default: `./data`)
    /// - `PERSONALIZE_PREFIX` (default: `retaildemo`)
    /// - `PERSONALIZE_ROLE_NAME` (default: `<prefix>-personalize-role`)
    /// - `PERSONALIZE_STATE_URL` (default: `sqlite://personalize_state.db?mode=rwc`)
    /// - `PERSONALIZE_POLL_SECONDS` (default: 15)
    /// - `PERSONALIZE_BATCH_POLL_SECONDS` (default: 60)
    /// - `PERSONALIZE_MAX_WAIT_SECONDS` (default: 10800)
    /// - `PERSONALIZE_CAMPAIGN_MIN_TPS` (default: 1)
    /// - `PERSONALIZE_ROLE_PROPAGATION_SECONDS` (default: 60)
    /// - `PERSONALIZE_LOG_FILE`
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a number fails
    /// to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a number fails
    /// to parse.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bucket = lookup("PERSONALIZE_BUCKET")
            .filter(|value| !value.trim().is_empty())
            .context("PERSONALIZE_BUCKET environment variable not set")?;

        let prefix = lookup("PERSONALIZE_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        let role_name =
            lookup("PERSONALIZE_ROLE_NAME").unwrap_or_else(|| format!("{prefix}-personalize-role"));

        let campaign_min_tps = parse_or(&lookup, "PERSONALIZE_CAMPAIGN_MIN_TPS", 1)?;
        if campaign_min_tps < 1 {
            anyhow::bail!("PERSONALIZE_CAMPAIGN_MIN_TPS must be at least 1");
        }

        Ok(Self {
            bucket,
            region: lookup("AWS_REGION"),
            data_dir: lookup("PERSONALIZE_DATA_DIR").map_or_else(|| PathBuf::from("data"), PathBuf::from),
            prefix,
            role_name,
            state_url: lookup("PERSONALIZE_STATE_URL")
                .unwrap_or_else(|| DEFAULT_STATE_URL.to_string()),
            poll_interval: seconds_or(&lookup, "PERSONALIZE_POLL_SECONDS", 15)?,
            batch_poll_interval: seconds_or(&lookup, "PERSONALIZE_BATCH_POLL_SECONDS", 60)?,
            max_wait: seconds_or(&lookup, "PERSONALIZE_MAX_WAIT_SECONDS", 3 * 60 * 60)?,
            campaign_min_tps,
            role_propagation_wait: seconds_or(&lookup, "PERSONALIZE_ROLE_PROPAGATION_SECONDS", 60)?,
            log_file: lookup("PERSONALIZE_LOG_FILE").map(PathBuf::from),
        })
    }

    /// Builds a resource name from the configured prefix.
    #[must_use]
    pub fn resource_name(&self, suffix: &str) -> String {
        format!("{}-{suffix}", self.prefix)
    }

    /// Returns the object key a local dataset file is uploaded to.
    #[must_use]
    pub fn object_key(&self, file_name: &str) -> String {
        format!("{}/{file_name}", self.prefix)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: core::error::Error + Send + Sync + 'static,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .with_context(|| format!("{key} is not a valid number: {raw}"))
    })
}

fn seconds_or<F>(lookup: &F, key: &str, default: u64) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default).map(Duration::from_secs)
}

/// Builds the object store for the configured bucket.
///
/// Credentials come from the standard AWS environment variables.
///
/// # Errors
///
/// Returns an error if the store cannot be configured.
pub fn build_object_store(config: &Config) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);

    if let Some(region) = &config.region {
        builder = builder.with_region(region);
    }

    let store = builder.build().context("Failed to create object store")?;

    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("PERSONALIZE_BUCKET", "retail-data")])).unwrap();

        assert_eq!(config.bucket, "retail-data");
        assert_eq!(config.prefix, "retaildemo");
        assert_eq!(config.role_name, "retaildemo-personalize-role");
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.batch_poll_interval, Duration::from_secs(60));
        assert_eq!(config.max_wait, Duration::from_secs(10_800));
        assert_eq!(config.campaign_min_tps, 1);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_missing_bucket() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("PERSONALIZE_BUCKET", " ")])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PERSONALIZE_BUCKET", "b"),
            ("PERSONALIZE_PREFIX", "shop"),
            ("PERSONALIZE_POLL_SECONDS", "5"),
            ("PERSONALIZE_MAX_WAIT_SECONDS", "600"),
        ]))
        .unwrap();

        assert_eq!(config.role_name, "shop-personalize-role");
        assert_eq!(config.resource_name("dataset-group"), "shop-dataset-group");
        assert_eq!(config.object_key("items.csv"), "shop/items.csv");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_wait, Duration::from_secs(600));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(
            Config::from_lookup(lookup_from(&[
                ("PERSONALIZE_BUCKET", "b"),
                ("PERSONALIZE_POLL_SECONDS", "soon"),
            ]))
            .is_err()
        );
        assert!(
            Config::from_lookup(lookup_from(&[
                ("PERSONALIZE_BUCKET", "b"),
                ("PERSONALIZE_CAMPAIGN_MIN_TPS", "0"),
            ]))
            .is_err()
        );
    }
}
