use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Arn, CacheKey, CommandLine, LaunchMode, NetworkMode, TaskDefinition};

/// Raw job variables as submitted by the caller. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct JobVariables {
    pub name: Option<String>,
    pub container_name: Option<String>,
    pub image: Option<String>,
    pub command: Option<CommandLine>,
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub cpu: Option<u32>,
    pub memory: Option<u32>,
    pub launch_type: Option<LaunchMode>,
    pub network_mode: Option<NetworkMode>,
    /// Defaults to `stream_output` when unset.
    pub configure_logs: Option<bool>,
    pub stream_output: Option<bool>,
    pub log_options: BTreeMap<String, String>,
    pub cluster: Option<String>,
    pub execution_role_arn: Option<Arn>,
    pub task_role_arn: Option<Arn>,
    pub vpc_id: Option<String>,
    pub family: Option<String>,
    pub task_definition_arn: Option<Arn>,
    pub task_definition: Option<TaskDefinition>,
    pub task_run_request: Option<Map<String, Value>>,
    pub cache_key: Option<CacheKey>,
    pub poll_interval_secs: Option<u64>,
    pub start_timeout_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_sparse_input() {
        let vars: JobVariables = serde_json::from_value(json!({
            "image": "alpine",
            "command": "echo hi",
            "launch_type": "FARGATE_SPOT",
        }))
        .unwrap();

        assert_eq!(vars.image.as_deref(), Some("alpine"));
        assert_eq!(vars.command, Some(CommandLine::Line("echo hi".into())));
        assert_eq!(vars.launch_type, Some(LaunchMode::FargateSpot));
        assert!(vars.env.is_empty());
        assert!(vars.cpu.is_none());
    }

    #[test]
    fn command_accepts_token_list() {
        let vars: JobVariables = serde_json::from_value(json!({
            "command": ["python", "-m", "job"],
        }))
        .unwrap();
        assert_eq!(
            vars.command,
            Some(CommandLine::Args(vec!["python".into(), "-m".into(), "job".into()]))
        );
    }
}
