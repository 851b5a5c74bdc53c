//! AWS Authentication
//!
//! Resolves credentials through the standard AWS provider chain (environment,
//! shared config/credentials files, SSO, IMDS) and works out which region and
//! profile to use.

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::path::PathBuf;

/// Regions where the Device Farm API is served
pub const DEVICE_FARM_REGIONS: &[&str] = &["us-west-2"];

/// Fallback when nothing else names a region
pub const DEFAULT_REGION: &str = "us-west-2";

/// Load shared SDK configuration through the default provider chain
pub async fn load_sdk_config(
    region: &str,
    profile: Option<&str>,
    endpoint_url: Option<&str>,
    max_attempts: Option<u32>,
) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));

    if let Some(profile) = profile {
        tracing::debug!("Using AWS profile {}", profile);
        loader = loader.profile_name(profile);
    }
    if let Some(url) = endpoint_url {
        tracing::debug!("Using endpoint override {}", url);
        loader = loader.endpoint_url(url);
    }
    if let Some(attempts) = max_attempts {
        loader = loader.retry_config(RetryConfig::standard().with_max_attempts(attempts.max(1)));
    }

    loader.load().await
}

/// Path of the shared AWS config file
pub fn get_aws_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AWS_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|p| p.join(".aws").join("config"))
}

/// Validate an AWS region name
/// Regions look like `us-west-2` or `us-gov-west-1`: lowercase words joined by
/// hyphens, ending in a number
pub fn validate_region(region: &str) -> bool {
    if region.len() < 9 || region.len() > 25 {
        return false;
    }

    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }

    let Some((last, words)) = parts.split_last() else {
        return false;
    };

    !last.is_empty()
        && last.chars().all(|c| c.is_ascii_digit())
        && words
            .iter()
            .all(|w| !w.is_empty() && w.chars().all(|c| c.is_ascii_lowercase()))
}

/// Read the default region from the environment or the shared config file
pub fn get_default_region() -> Option<String> {
    for var in ["AWS_REGION", "AWS_DEFAULT_REGION"] {
        if let Ok(region) = std::env::var(var) {
            if validate_region(&region) {
                return Some(region);
            }
            tracing::warn!("Invalid region format in {}", var);
        }
    }

    let content = std::fs::read_to_string(get_aws_config_path()?).ok()?;
    let profile = get_default_profile().unwrap_or_else(|| "default".to_string());
    region_from_config(&content, &profile)
}

/// Read the profile named by the environment
pub fn get_default_profile() -> Option<String> {
    std::env::var("AWS_PROFILE")
        .ok()
        .filter(|p| !p.trim().is_empty())
}

/// Find `region = ...` inside a profile section of an AWS config file
fn region_from_config(content: &str, profile: &str) -> Option<String> {
    let wanted = if profile == "default" {
        "[default]".to_string()
    } else {
        format!("[profile {}]", profile)
    };

    let mut in_section = false;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_section = line == wanted;
        } else if in_section && line.starts_with("region") && line.contains('=') {
            if let Some(value) = line.split('=').nth(1) {
                let region = value.trim().to_string();
                if validate_region(&region) {
                    return Some(region);
                }
            }
        }
    }

    None
}

/// Whether the Device Farm API is available in a region
pub fn is_device_farm_region(region: &str) -> bool {
    DEVICE_FARM_REGIONS.contains(&region)
}
