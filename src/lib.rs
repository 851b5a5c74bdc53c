//! tdfarm: find and sweep AWS Device Farm resources
//!
//! - [`finder`] - Look up resources by ARN with a uniform not-found signal
//! - [`sweep`] - Clean up resources left behind by acceptance tests
//! - [`aws`] - Client construction and remote error classification
//! - [`config`] - Persistent user configuration

pub mod aws;
pub mod config;
pub mod finder;
pub mod sweep;

/// Version injected at compile time via TDFARM_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("TDFARM_VERSION") {
    Some(v) => v,
    None => "dev",
};
