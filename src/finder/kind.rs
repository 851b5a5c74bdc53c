//! Device Farm resource kinds

use serde::Serialize;
use std::fmt;

/// A Device Farm resource type the finders know how to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    DevicePool,
    Project,
    Upload,
    NetworkProfile,
    InstanceProfile,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::DevicePool,
        ResourceKind::Project,
        ResourceKind::Upload,
        ResourceKind::NetworkProfile,
        ResourceKind::InstanceProfile,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DevicePool => "Device Pool",
            Self::Project => "Project",
            Self::Upload => "Upload",
            Self::NetworkProfile => "Network Profile",
            Self::InstanceProfile => "Instance Profile",
        }
    }

    /// Terraform resource type name, also used to name sweepers
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::DevicePool => "aws_devicefarm_device_pool",
            Self::Project => "aws_devicefarm_project",
            Self::Upload => "aws_devicefarm_upload",
            Self::NetworkProfile => "aws_devicefarm_network_profile",
            Self::InstanceProfile => "aws_devicefarm_instance_profile",
        }
    }

    /// Remote operation used to look up one resource of this kind
    pub fn operation(&self) -> &'static str {
        match self {
            Self::DevicePool => "GetDevicePool",
            Self::Project => "GetProject",
            Self::Upload => "GetUpload",
            Self::NetworkProfile => "GetNetworkProfile",
            Self::InstanceProfile => "GetInstanceProfile",
        }
    }

    /// Resource segment of the ARN (`arn:aws:devicefarm:<region>:<account>:<segment>:...`)
    pub fn arn_segment(&self) -> &'static str {
        match self {
            Self::DevicePool => "devicepool",
            Self::Project => "project",
            Self::Upload => "upload",
            Self::NetworkProfile => "networkprofile",
            Self::InstanceProfile => "instanceprofile",
        }
    }

    /// Match a resource segment, ignoring case, dashes and underscores
    pub fn from_segment(segment: &str) -> Option<Self> {
        let normalized: String = segment
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Self::ALL
            .into_iter()
            .find(|kind| kind.arn_segment() == normalized)
    }

    /// Infer the kind from a Device Farm ARN
    ///
    /// Returns `None` for anything that isn't shaped like
    /// `arn:<partition>:devicefarm:<region>:<account>:<segment>:<id>`.
    pub fn from_arn(arn: &str) -> Option<Self> {
        let mut parts = arn.splitn(6, ':');
        if parts.next()? != "arn" {
            return None;
        }
        let _partition = parts.next()?;
        if parts.next()? != "devicefarm" {
            return None;
        }
        let _region = parts.next()?;
        let _account = parts.next()?;
        let resource = parts.next()?;

        let segment = resource.split([':', '/']).next()?;
        Self::from_segment(segment)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
