//! Seam between the engine and the remote scheduling service.
//!
//! Production clients and test doubles both implement [`ContainerService`]. Credential and
//! session handling live behind the implementation; the engine only issues the calls below.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use skiff_model::{
    Arn, LogEventsPage, LogEventsQuery, Network, Subnet, TaskDefinition, TaskDescription,
    TaskRunRecord, TaskRunRequest,
};

/// Failure reported by the remote service.
///
/// `code` carries the service's error type (e.g. `ClusterNotFoundException`), `message` its text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {code}: {message}")]
pub struct ServiceError {
    pub operation: &'static str,
    pub code: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(
        operation: &'static str,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if either the code or the message contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.code.contains(needle) || self.message.contains(needle)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == "ResourceNotFoundException"
    }
}

/// Operations the engine needs from the container-scheduling, log and network services.
#[async_trait]
pub trait ContainerService: Send + Sync + 'static {
    /// Region the client is bound to.
    fn region(&self) -> String;

    async fn register_task_definition(
        &self,
        definition: &TaskDefinition,
    ) -> Result<Arn, ServiceError>;

    async fn describe_task_definition(&self, arn: &str) -> Result<TaskDefinition, ServiceError>;

    /// Launch one task. Returns the new run with status `UNKNOWN`.
    async fn run_task(&self, request: &TaskRunRequest) -> Result<TaskRunRecord, ServiceError>;

    async fn describe_tasks(
        &self,
        cluster: &str,
        task_arns: &[Arn],
    ) -> Result<Vec<TaskDescription>, ServiceError>;

    async fn stop_task(&self, cluster: &str, task_arn: &str, reason: &str)
    -> Result<(), ServiceError>;

    async fn get_log_events(&self, query: &LogEventsQuery) -> Result<LogEventsPage, ServiceError>;

    /// Describe the network with `id`, or the account's default network when `id` is `None`.
    async fn describe_network(&self, id: Option<&str>) -> Result<Option<Network>, ServiceError>;

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>, ServiceError>;
}
