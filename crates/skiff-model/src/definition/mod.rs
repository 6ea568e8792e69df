mod container;
pub use container::{ContainerDefinition, LOG_DRIVER_AWSLOGS, LogConfiguration};

mod network_mode;
pub use network_mode::NetworkMode;

mod numeric;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Arn, ModelError};

/// Compatibility entry required for serverless launches.
pub const COMPATIBILITY_FARGATE: &str = "FARGATE";

/// A task definition document.
///
/// Used both for caller-supplied templates (any field may be missing) and for documents
/// read back from the service. Unmodelled fields are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_definition_arn: Option<Arn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_definitions: Vec<ContainerDefinition>,
    /// Task-level cpu units. Accepts numbers on input, always serialized as a string.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "numeric::string_or_number"
    )]
    pub cpu: Option<String>,
    /// Task-level memory (MiB). Accepts numbers on input, always serialized as a string.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "numeric::string_or_number"
    )]
    pub memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<NetworkMode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_compatibilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_role_arn: Option<Arn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_role_arn: Option<Arn>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskDefinition {
    pub fn container(&self, name: &str) -> Option<&ContainerDefinition> {
        self.container_definitions.iter().find(|c| c.name == name)
    }

    pub fn container_mut(&mut self, name: &str) -> Option<&mut ContainerDefinition> {
        self.container_definitions
            .iter_mut()
            .find(|c| c.name == name)
    }

    /// Returns the named container, appending an empty one if it is missing.
    pub fn ensure_container(&mut self, name: &str) -> &mut ContainerDefinition {
        let idx = match self.container_definitions.iter().position(|c| c.name == name) {
            Some(idx) => idx,
            None => {
                self.container_definitions
                    .push(ContainerDefinition::named(name));
                self.container_definitions.len() - 1
            }
        };
        &mut self.container_definitions[idx]
    }

    pub fn first_container_name(&self) -> Option<&str> {
        self.container_definitions
            .first()
            .map(|c| c.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn requires_compatibility(&self, compatibility: &str) -> bool {
        self.requires_compatibilities
            .iter()
            .any(|c| c == compatibility)
    }

    pub fn to_value(&self) -> Result<Value, ModelError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        Ok(serde_json::from_value(value)?)
    }
}
