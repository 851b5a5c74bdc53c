//! Device Farm Client
//!
//! Wraps the SDK client together with the region it talks to. Timeouts and
//! retries are configured here, on the handle, never in finders or sweepers.

use super::auth;
use anyhow::Result;
use aws_sdk_devicefarm::config::retry::RetryConfig;
use aws_sdk_devicefarm::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_devicefarm::{Client, Config};

/// Device Farm client handle
#[derive(Clone, Debug)]
pub struct DeviceFarmClient {
    conn: Client,
    region: String,
}

impl DeviceFarmClient {
    /// Create a client using the default credential chain
    pub async fn new(
        region: &str,
        profile: Option<&str>,
        endpoint_url: Option<&str>,
        max_attempts: Option<u32>,
    ) -> Result<Self> {
        if !auth::validate_region(region) {
            anyhow::bail!("Invalid AWS region: {}", region);
        }
        if !auth::is_device_farm_region(region) && endpoint_url.is_none() {
            tracing::warn!("Device Farm is not served from {}, calls will likely fail", region);
        }

        let sdk_config = auth::load_sdk_config(region, profile, endpoint_url, max_attempts).await;
        if sdk_config.credentials_provider().is_none() {
            tracing::warn!("No AWS credentials provider resolved");
        }

        tracing::info!("Device Farm client ready for {}", region);

        Ok(Self {
            conn: Client::new(&sdk_config),
            region: region.to_string(),
        })
    }

    /// Create a client with fixed credentials and no retries
    ///
    /// Meant for local endpoints (mock servers, emulators) where the default
    /// credential chain would only get in the way.
    pub fn with_static_credentials(
        endpoint_url: &str,
        region: &str,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<Self> {
        if !url_has_scheme(endpoint_url) {
            anyhow::bail!("Endpoint URL needs a scheme: {}", endpoint_url);
        }

        let config = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "tdfarm-static",
            ))
            .endpoint_url(endpoint_url)
            .retry_config(RetryConfig::disabled())
            .build();

        Ok(Self::from_conf(config, region))
    }

    /// Wrap an already configured SDK client
    pub fn from_conf(config: Config, region: &str) -> Self {
        Self {
            conn: Client::from_conf(config),
            region: region.to_string(),
        }
    }

    /// The SDK connection handle finders take
    pub fn conn(&self) -> &Client {
        &self.conn
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

fn url_has_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_client_keeps_region() {
        let client =
            DeviceFarmClient::with_static_credentials("http://127.0.0.1:4566", "us-west-2", "AKID", "SECRET")
                .unwrap();
        assert_eq!(client.region(), "us-west-2");
    }

    #[test]
    fn test_static_client_rejects_bare_host() {
        let result = DeviceFarmClient::with_static_credentials("localhost:4566", "us-west-2", "AKID", "SECRET");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_region() {
        let result = DeviceFarmClient::new("nowhere", None, None, None).await;
        assert!(result.is_err());
    }
}
