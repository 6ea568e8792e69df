use std::fmt;

use serde::{Deserialize, Serialize};

/// How compute is sourced for a task run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchMode {
    /// Serverless capacity.
    #[default]
    Fargate,
    /// Capacity from registered container instances.
    Ec2,
    /// Externally managed capacity.
    External,
    /// Discounted serverless capacity, requested through a capacity-provider strategy.
    FargateSpot,
}

impl LaunchMode {
    /// Returns `true` for the serverless variants, which size resources at task level.
    pub fn is_serverless(&self) -> bool {
        matches!(self, LaunchMode::Fargate | LaunchMode::FargateSpot)
    }

    /// Returns `true` when the request must carry a capacity-provider strategy instead of a launch type.
    pub fn uses_capacity_provider(&self) -> bool {
        matches!(self, LaunchMode::FargateSpot)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchMode::Fargate => "FARGATE",
            LaunchMode::Ec2 => "EC2",
            LaunchMode::External => "EXTERNAL",
            LaunchMode::FargateSpot => "FARGATE_SPOT",
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
