use async_trait::async_trait;

use skiff_model::{Arn, LogEvent, TaskStatus};

/// Status change of a watched task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub cluster: String,
    pub task_arn: Arn,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// Receives lifecycle notifications from [`crate::TaskWatcher`].
///
/// `on_status` is called once per observed transition, never for repeated polls of the same
/// status. `on_output` is called once per relayed log line, in stream order.
#[async_trait]
pub trait Subscribe: Send + Sync {
    async fn on_status(&self, event: &StatusEvent);

    async fn on_output(&self, _task_arn: &Arn, _event: &LogEvent) {}

    fn name(&self) -> &'static str;
}
