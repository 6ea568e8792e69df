use serde::{Deserialize, Serialize};

use crate::{Arn, ModelError, TaskStatus};

const IDENTIFIER_SEPARATOR: &str = "::";

/// Description of a task as returned by the service's describe call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescription {
    pub task_arn: Arn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_arn: Option<Arn>,
    #[serde(default)]
    pub last_status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<ContainerDescription>,
}

impl TaskDescription {
    pub fn container(&self, name: &str) -> Option<&ContainerDescription> {
        self.containers.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<TaskStatus>,
}

/// Local view of one task run.
///
/// `status` is the most recently observed status, `last_status` the one seen on the poll before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunRecord {
    pub cluster: String,
    pub task_arn: Arn,
    pub status: TaskStatus,
    pub last_status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_reason: Option<String>,
}

impl TaskRunRecord {
    pub fn new(cluster: impl Into<String>, task_arn: impl Into<Arn>) -> Self {
        Self {
            cluster: cluster.into(),
            task_arn: task_arn.into(),
            status: TaskStatus::Unknown,
            last_status: TaskStatus::Unknown,
            stop_code: None,
            stopped_reason: None,
        }
    }

    /// Fold a fresh description into the record.
    ///
    /// Returns `true` when the observed status differs from the previous one.
    pub fn observe(&mut self, task: &TaskDescription) -> bool {
        self.last_status = self.status;
        self.status = task.last_status;
        if task.stop_code.is_some() {
            self.stop_code = task.stop_code.clone();
        }
        if task.stopped_reason.is_some() {
            self.stopped_reason = task.stopped_reason.clone();
        }
        self.status != self.last_status
    }

    /// Trailing segment of the task ARN, the service's short task id.
    pub fn run_id(&self) -> &str {
        self.task_arn
            .rsplit('/')
            .next()
            .unwrap_or(self.task_arn.as_str())
    }

    /// Compact identifier callers can hand back to cancel the run.
    pub fn identifier(&self) -> String {
        format!("{}{IDENTIFIER_SEPARATOR}{}", self.cluster, self.task_arn)
    }

    /// Split an identifier produced by [`TaskRunRecord::identifier`] into `(cluster, task_arn)`.
    pub fn parse_identifier(identifier: &str) -> Result<(String, Arn), ModelError> {
        match identifier.split_once(IDENTIFIER_SEPARATOR) {
            Some((cluster, arn)) if !cluster.is_empty() && !arn.is_empty() => {
                Ok((cluster.to_string(), arn.to_string()))
            }
            _ => Err(ModelError::InvalidIdentifier(identifier.to_string())),
        }
    }
}
