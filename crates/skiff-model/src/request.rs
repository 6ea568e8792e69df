use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Arn, KeyValue, LaunchMode, ModelError, NameValue, NetworkConfiguration};

/// Capacity provider backing serverless-spot launches.
pub const CAPACITY_PROVIDER_FARGATE_SPOT: &str = "FARGATE_SPOT";

/// Launch request for one run of a registered task definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunRequest {
    pub task_definition: Arn,
    /// Direct launch mode. Left empty when a capacity-provider strategy is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_type: Option<LaunchMode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capacity_provider_strategy: Vec<CapacityProviderStrategyItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_configuration: Option<NetworkConfiguration>,
    #[serde(default)]
    pub overrides: TaskOverride,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<KeyValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskRunRequest {
    pub fn container_override(&self, name: &str) -> Option<&ContainerOverride> {
        self.overrides
            .container_overrides
            .iter()
            .find(|o| o.name.as_deref() == Some(name))
    }

    pub fn to_value(&self) -> Result<Value, ModelError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityProviderStrategyItem {
    pub capacity_provider: String,
    pub weight: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<u32>,
}

impl CapacityProviderStrategyItem {
    pub fn fargate_spot() -> Self {
        Self {
            capacity_provider: CAPACITY_PROVIDER_FARGATE_SPOT.to_string(),
            weight: 1,
            base: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOverride {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_overrides: Vec<ContainerOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_role_arn: Option<Arn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_role_arn: Option<Arn>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<NameValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
