//! Device Farm finders
//!
//! One typed finder per resource kind, all built on [`find`]. Each issues a
//! single `Get*` call keyed by ARN.

use super::{find, FindError, LookupRequest, ResourceKind, NOT_FOUND_EXCEPTION};
use crate::aws::errors::error_chain;
use aws_sdk_devicefarm::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_devicefarm::operation::get_device_pool::GetDevicePoolError;
use aws_sdk_devicefarm::operation::get_instance_profile::GetInstanceProfileError;
use aws_sdk_devicefarm::operation::get_network_profile::GetNetworkProfileError;
use aws_sdk_devicefarm::operation::get_project::GetProjectError;
use aws_sdk_devicefarm::operation::get_upload::GetUploadError;
use aws_sdk_devicefarm::types::{DevicePool, InstanceProfile, NetworkProfile, Project, Upload};
use aws_sdk_devicefarm::Client;
use serde::Serialize;
use std::error::Error as StdError;
use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A remote failure with its code lifted out, for the kind-dispatched path
///
/// The original SDK error stays reachable through `source` and
/// [`RemoteError::downcast_ref`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub code: Option<String>,
    pub message: String,
    #[source]
    pub source: BoxError,
}

impl RemoteError {
    pub fn new<E>(err: E) -> Self
    where
        E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    {
        Self {
            code: err.code().map(str::to_string),
            message: error_chain(&err),
            source: Box::new(err),
        }
    }

    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.source.downcast_ref::<T>()
    }
}

/// Sentinel predicate for Device Farm errors
pub fn is_not_found_exception<E: ProvideErrorMetadata>(err: &E) -> bool {
    err.code() == Some(NOT_FOUND_EXCEPTION)
}

pub async fn find_device_pool_by_arn(
    conn: &Client,
    arn: &str,
) -> Result<DevicePool, FindError<SdkError<GetDevicePoolError>>> {
    find(
        LookupRequest::new(ResourceKind::DevicePool.operation(), arn),
        |arn| conn.get_device_pool().arn(arn).send(),
        |output| output.device_pool,
        is_not_found_exception,
    )
    .await
}

pub async fn find_project_by_arn(
    conn: &Client,
    arn: &str,
) -> Result<Project, FindError<SdkError<GetProjectError>>> {
    find(
        LookupRequest::new(ResourceKind::Project.operation(), arn),
        |arn| conn.get_project().arn(arn).send(),
        |output| output.project,
        is_not_found_exception,
    )
    .await
}

pub async fn find_upload_by_arn(
    conn: &Client,
    arn: &str,
) -> Result<Upload, FindError<SdkError<GetUploadError>>> {
    find(
        LookupRequest::new(ResourceKind::Upload.operation(), arn),
        |arn| conn.get_upload().arn(arn).send(),
        |output| output.upload,
        is_not_found_exception,
    )
    .await
}

pub async fn find_network_profile_by_arn(
    conn: &Client,
    arn: &str,
) -> Result<NetworkProfile, FindError<SdkError<GetNetworkProfileError>>> {
    find(
        LookupRequest::new(ResourceKind::NetworkProfile.operation(), arn),
        |arn| conn.get_network_profile().arn(arn).send(),
        |output| output.network_profile,
        is_not_found_exception,
    )
    .await
}

pub async fn find_instance_profile_by_arn(
    conn: &Client,
    arn: &str,
) -> Result<InstanceProfile, FindError<SdkError<GetInstanceProfileError>>> {
    find(
        LookupRequest::new(ResourceKind::InstanceProfile.operation(), arn),
        |arn| conn.get_instance_profile().arn(arn).send(),
        |output| output.instance_profile,
        is_not_found_exception,
    )
    .await
}

/// A found resource of any kind
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    DevicePool(DevicePool),
    Project(Project),
    Upload(Upload),
    NetworkProfile(NetworkProfile),
    InstanceProfile(InstanceProfile),
}

impl Descriptor {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::DevicePool(_) => ResourceKind::DevicePool,
            Self::Project(_) => ResourceKind::Project,
            Self::Upload(_) => ResourceKind::Upload,
            Self::NetworkProfile(_) => ResourceKind::NetworkProfile,
            Self::InstanceProfile(_) => ResourceKind::InstanceProfile,
        }
    }

    pub fn arn(&self) -> Option<&str> {
        match self {
            Self::DevicePool(d) => d.arn(),
            Self::Project(d) => d.arn(),
            Self::Upload(d) => d.arn(),
            Self::NetworkProfile(d) => d.arn(),
            Self::InstanceProfile(d) => d.arn(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::DevicePool(d) => d.name(),
            Self::Project(d) => d.name(),
            Self::Upload(d) => d.name(),
            Self::NetworkProfile(d) => d.name(),
            Self::InstanceProfile(d) => d.name(),
        }
    }

    /// Kind-specific status line, when the resource has one
    fn detail(&self) -> Option<String> {
        match self {
            Self::DevicePool(d) => d.r#type().map(|t| t.as_str().to_string()),
            Self::Upload(d) => d.status().map(|s| s.as_str().to_string()),
            Self::NetworkProfile(d) => d.r#type().map(|t| t.as_str().to_string()),
            Self::Project(d) => d.default_job_timeout_minutes().map(|m| format!("{m}m job timeout")),
            Self::InstanceProfile(d) => d.description().map(str::to_string),
        }
    }

    pub fn summary(&self) -> DescriptorSummary {
        DescriptorSummary {
            kind: self.kind(),
            arn: self.arn().unwrap_or("-").to_string(),
            name: self.name().unwrap_or("-").to_string(),
            detail: self.detail(),
        }
    }
}

/// Printable view of a [`Descriptor`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorSummary {
    pub kind: ResourceKind,
    pub arn: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Look up a resource whose kind is only known at runtime
pub async fn find_by_arn(
    conn: &Client,
    kind: ResourceKind,
    arn: &str,
) -> Result<Descriptor, FindError<RemoteError>> {
    match kind {
        ResourceKind::DevicePool => find_device_pool_by_arn(conn, arn)
            .await
            .map(Descriptor::DevicePool)
            .map_err(|e| e.map_remote(RemoteError::new)),
        ResourceKind::Project => find_project_by_arn(conn, arn)
            .await
            .map(Descriptor::Project)
            .map_err(|e| e.map_remote(RemoteError::new)),
        ResourceKind::Upload => find_upload_by_arn(conn, arn)
            .await
            .map(Descriptor::Upload)
            .map_err(|e| e.map_remote(RemoteError::new)),
        ResourceKind::NetworkProfile => find_network_profile_by_arn(conn, arn)
            .await
            .map(Descriptor::NetworkProfile)
            .map_err(|e| e.map_remote(RemoteError::new)),
        ResourceKind::InstanceProfile => find_instance_profile_by_arn(conn, arn)
            .await
            .map(Descriptor::InstanceProfile)
            .map_err(|e| e.map_remote(RemoteError::new)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_uses_placeholders() {
        let pool = DevicePool::builder().arn("arn:aws:devicefarm:us-west-2:1:devicepool:p/d").build();
        let summary = Descriptor::DevicePool(pool).summary();

        assert_eq!(summary.kind, ResourceKind::DevicePool);
        assert_eq!(summary.arn, "arn:aws:devicefarm:us-west-2:1:devicepool:p/d");
        assert_eq!(summary.name, "-");
        assert_eq!(summary.detail, None);
    }

    #[test]
    fn test_summary_serializes_kind_in_snake_case() {
        let project = Project::builder().arn("arn:p").name("tf-acc-test-1").build();
        let json = serde_json::to_value(Descriptor::Project(project).summary()).unwrap();

        assert_eq!(json["kind"], "project");
        assert_eq!(json["name"], "tf-acc-test-1");
        assert!(json.get("detail").is_none());
    }
}
