use log::{debug, error, info};
use notadrill_openapi::{AssetResponse, ResponseEnvelope};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::envelope;
use crate::errors::SelectorError;
use crate::file_server::FileServer;

/// Picks a random object out of a bucket and tells where to find it.
pub struct AssetSelector {
    file_server: FileServer,
    bucket: String,
    region_name: String,
    cors_origin: String,
    invocation_timeout: Duration,
}

impl AssetSelector {
    pub fn new(config: &Config, file_server: FileServer) -> AssetSelector {
        AssetSelector {
            file_server,
            bucket: config.bucket.clone(),
            region_name: config.region_name().to_owned(),
            cors_origin: config.cors_origin.clone(),
            invocation_timeout: config.invocation_timeout,
        }
    }

    pub fn cors_origin(&self) -> &str {
        &self.cors_origin
    }

    pub async fn pick(&self) -> Result<AssetResponse, SelectorError> {
        let deadline = Instant::now() + self.invocation_timeout;
        let keys = self.file_server.list_keys(deadline).await?;

        let key = choose(&keys, &mut rand::thread_rng()).ok_or_else(|| {
            SelectorError::EmptyBucket {
                bucket: self.bucket.clone(),
            }
        })?;

        Ok(AssetResponse::new(
            public_url(&self.bucket, &self.region_name, key),
            derive_name(key).to_owned(),
        ))
    }

    /// Run one invocation. Failures end up in the envelope, never in a panic.
    pub async fn handle(&self, event: &serde_json::Value) -> ResponseEnvelope {
        info!("Event: {}", event);

        match self.pick().await {
            Ok(asset) => envelope::ok(&asset, &self.cors_origin),
            Err(e) => {
                error!("cannot pick an asset from {}: {:?}", self.bucket, e);
                if e.status_code().is_server_error() {
                    sentry::capture_message(
                        &format!("cannot pick an asset from {}: {}", self.bucket, e),
                        sentry::Level::Error,
                    );
                }
                envelope::error(&e, &self.cors_origin)
            }
        }
    }
}

/// Uniformly pick one key, `None` when there is nothing to pick from.
pub fn choose<'a, R: Rng + ?Sized>(keys: &'a [String], rng: &mut R) -> Option<&'a str> {
    keys.choose(rng).map(String::as_str)
}

/// The key without its extension.
///
/// The extension starts at the last `.` of the last path segment. Keys with
/// no extension, or whose last segment is a dotfile, are used whole.
pub fn derive_name(key: &str) -> &str {
    let segment_start = key.rfind('/').map_or(0, |i| i + 1);

    match key[segment_start..].rfind('.') {
        Some(0) | None => {
            debug!("object key {:?} has no extension, using it as name", key);
            key
        }
        Some(dot) => &key[..segment_start + dot],
    }
}

pub fn public_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
}
