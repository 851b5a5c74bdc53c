//! AWS interaction module
//!
//! This module provides the plumbing for talking to AWS Device Farm:
//! credentials and region resolution, client construction, and error-code
//! classification.
//!
//! # Module Structure
//!
//! - [`auth`] - Credential provider chain and region defaults
//! - [`client`] - Device Farm client handle
//! - [`errors`] - Remote error-code classification
//!
//! # Example
//!
//! ```ignore
//! use tdfarm::aws::client::DeviceFarmClient;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = DeviceFarmClient::new("us-west-2", None, None, None).await?;
//!     let projects = client.conn().list_projects().send().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod errors;

pub use client::DeviceFarmClient;
