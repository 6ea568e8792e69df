use std::{fmt, time::Duration};

use skiff_model::{Arn, ModelError, TaskStatus};
use thiserror::Error;

use crate::service::ServiceError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Static pre-flight failure, raised before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(
        "failed to run task, cluster {cluster:?} not found; confirm that the cluster is configured in your region"
    )]
    ClusterNotFound {
        cluster: String,
        #[source]
        source: ServiceError,
    },

    #[error(
        "failed to run task, cluster {cluster:?} does not appear to have any container instances associated with it; confirm that you have instances available"
    )]
    InsufficientCapacity {
        cluster: String,
        #[source]
        source: ServiceError,
    },

    #[error(
        "failed to run task: log configuration was requested but the execution role is missing log permissions (logs:CreateLogGroup, logs:CreateLogStream, logs:PutLogEvents)"
    )]
    LoggingPermission {
        #[source]
        source: ServiceError,
    },

    #[error("network configuration cannot be inferred: {message} {hint}")]
    NetworkConfiguration { message: String, hint: NetworkHint },

    #[error("task {task_arn} in cluster {cluster:?} did not reach RUNNING within {timeout:?}")]
    TaskStartTimeout {
        cluster: String,
        task_arn: Arn,
        timeout: Duration,
    },

    #[error("task {task_arn} stopped before reaching {target}: {}", stop_cause(.code, .reason))]
    TaskStoppedBeforeRunning {
        task_arn: Arn,
        target: TaskStatus,
        code: Option<String>,
        reason: Option<String>,
    },

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("worker failed: {0}")]
    Worker(String),
}

fn stop_cause(code: &Option<String>, reason: &Option<String>) -> String {
    format!(
        "{} ({})",
        code.as_deref().unwrap_or("unknown stop code"),
        reason.as_deref().unwrap_or("no reason reported")
    )
}

impl EngineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Which remediation applies when network discovery fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkHint {
    /// No id was given and the account has no default network.
    PassExplicitId,
    /// An explicit id was given but the network was not found.
    CheckNetworkExists,
    /// The network exists but has no subnets.
    AddSubnets,
}

impl fmt::Display for NetworkHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hint = match self {
            NetworkHint::PassExplicitId => "Pass an explicit `vpc_id` or configure a default VPC.",
            NetworkHint::CheckNetworkExists => "Check that the VPC exists in the current region.",
            NetworkHint::AddSubnets => {
                "Create subnets in the VPC or pass an explicit `networkConfiguration`."
            }
        };
        f.write_str(hint)
    }
}
