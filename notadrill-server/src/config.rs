use rusoto_core::Region;
use std::time::Duration;

pub const DEFAULT_BUCKET: &str = "notdrills";
pub const DEFAULT_CORS_ORIGIN: &str = "*";

/// Everything an invocation needs to know, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: String,
    pub region: Region,
    /// Stop enumerating the bucket after this many keys
    pub max_keys: Option<usize>,
    pub cors_origin: String,
    pub invocation_timeout: Duration,
    /// Upper bound for a single listing call, so a hung call can be retried
    pub attempt_timeout: Duration,
    pub retry_backoff: Duration,
}

impl Config {
    pub fn new(bucket: String, region: Region) -> Config {
        Config {
            bucket,
            region,
            ..Default::default()
        }
    }

    /// Region name as it appears in public object urls
    pub fn region_name(&self) -> &str {
        self.region.name()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.into(),
            region: Region::EuWest2,
            max_keys: None,
            cors_origin: DEFAULT_CORS_ORIGIN.into(),
            invocation_timeout: Duration::from_millis(3000),
            attempt_timeout: Duration::from_millis(1000),
            retry_backoff: Duration::from_millis(100),
        }
    }
}
