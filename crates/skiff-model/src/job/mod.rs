mod command;
pub use command::CommandLine;

mod launch;
pub use launch::LaunchMode;

mod variables;
pub use variables::JobVariables;

use std::{collections::BTreeMap, time::Duration};

use serde_json::{Map, Value};

use crate::{Arn, CacheKey, NetworkMode, TaskDefinition};

/// Conventional name of the container the job runs in.
pub const DEFAULT_CONTAINER_NAME: &str = "skiff";
/// Family used when neither the caller nor the template names one.
pub const DEFAULT_FAMILY: &str = "skiff";
/// Default task cpu units.
pub const DEFAULT_CPU: u32 = 1024;
/// Default task memory in MiB.
pub const DEFAULT_MEMORY: u32 = 2048;
/// Default log group for jobs that configure logging.
pub const DEFAULT_LOG_GROUP: &str = "skiff";

/// Requested resource sizing. `None` falls back to the template, then to the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resources {
    pub cpu: Option<u32>,
    pub memory: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingPreference {
    /// Attach a log configuration to the orchestration container.
    pub configure: bool,
    /// Relay the container's log lines while the task runs.
    pub stream_output: bool,
    /// Options merged over the generated log configuration.
    pub options: BTreeMap<String, String>,
}

/// Fully-typed job configuration, built once per invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfiguration {
    /// Job name. Feeds the log stream prefix and the fallback family.
    pub name: Option<String>,
    /// Orchestration container. `None` until it can be inferred from the full definition.
    pub container_name: Option<String>,
    pub image: Option<String>,
    pub command: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub resources: Resources,
    pub launch_mode: LaunchMode,
    pub network_mode: Option<NetworkMode>,
    pub logging: LoggingPreference,
    pub cluster: Option<String>,
    pub execution_role_arn: Option<Arn>,
    pub task_role_arn: Option<Arn>,
    pub vpc_id: Option<String>,
    pub family: Option<String>,
    /// Pre-existing definition to use as the template.
    pub task_definition_arn: Option<Arn>,
    pub task_definition: Option<TaskDefinition>,
    /// Caller values merged over the computed run request.
    pub run_request_overrides: Map<String, Value>,
    pub cache_key: Option<CacheKey>,
    pub poll_interval: Duration,
    pub start_timeout: Duration,
}

impl JobConfiguration {
    /// Cluster the run targets, as the service names it when none is given.
    pub fn cluster_or_default(&self) -> &str {
        self.cluster.as_deref().unwrap_or("default")
    }

    /// Stream prefix used for the generated log configuration.
    pub fn stream_prefix(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_CONTAINER_NAME)
    }
}
