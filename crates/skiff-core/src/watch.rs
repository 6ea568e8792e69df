use std::{sync::Arc, time::Duration};

use skiff_model::{LogEvent, TaskDescription, TaskRunRecord, TaskStatus};
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::{ContainerService, EngineError, LogTail, ServiceError, StatusEvent, Subscribe};

/// Shortest pause between two polls.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polls a task until it reaches a target status.
pub struct TaskWatcher<'a> {
    service: &'a dyn ContainerService,
    subscribers: &'a [Arc<dyn Subscribe>],
    poll_interval: Duration,
}

impl<'a> TaskWatcher<'a> {
    pub fn new(
        service: &'a dyn ContainerService,
        subscribers: &'a [Arc<dyn Subscribe>],
        poll_interval: Duration,
    ) -> Self {
        Self {
            service,
            subscribers,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// Poll until `record` is at or past `target`.
    ///
    /// Subscribers hear about every observed status change. When `tail` is given it is drained
    /// once per poll, including the poll that observes the target. `timeout = None` waits forever.
    pub async fn wait_for(
        &self,
        record: &mut TaskRunRecord,
        target: TaskStatus,
        timeout: Option<Duration>,
        mut tail: Option<&mut LogTail<'_>>,
    ) -> Result<TaskDescription, EngineError> {
        let started = Instant::now();
        loop {
            let task = self.describe(record).await?;

            let from = record.status;
            if record.observe(&task) {
                debug!(
                    target: "skiff.watch",
                    task_arn = %record.task_arn,
                    cluster = %record.cluster,
                    from = %from,
                    status = %record.status,
                    "task status changed"
                );
                self.notify(StatusEvent {
                    cluster: record.cluster.clone(),
                    task_arn: record.task_arn.clone(),
                    from,
                    to: record.status,
                })
                .await;
            }

            if let Some(tail) = tail.as_deref_mut() {
                let events = tail.drain().await?;
                self.relay(record, &events).await;
            }

            if record.status.is_terminal() && target != TaskStatus::Stopped {
                return Err(EngineError::TaskStoppedBeforeRunning {
                    task_arn: record.task_arn.clone(),
                    target,
                    code: task.stop_code.clone(),
                    reason: task.stopped_reason.clone(),
                });
            }
            if record.status.has_reached(target) {
                return Ok(task);
            }

            let mut wait = self.poll_interval;
            if let Some(timeout) = timeout {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    return Err(EngineError::TaskStartTimeout {
                        cluster: record.cluster.clone(),
                        task_arn: record.task_arn.clone(),
                        timeout,
                    });
                }
                wait = wait.min(timeout - elapsed);
            }
            trace!(target: "skiff.watch", task_arn = %record.task_arn, status = %record.status, ?wait, "waiting");
            sleep(wait).await;
        }
    }

    async fn describe(&self, record: &TaskRunRecord) -> Result<TaskDescription, EngineError> {
        let tasks = self
            .service
            .describe_tasks(&record.cluster, std::slice::from_ref(&record.task_arn))
            .await?;
        tasks
            .into_iter()
            .find(|t| t.task_arn == record.task_arn)
            .ok_or_else(|| {
                ServiceError::new(
                    "DescribeTasks",
                    "MISSING",
                    format!("task {} not found in cluster {}", record.task_arn, record.cluster),
                )
                .into()
            })
    }

    async fn notify(&self, event: StatusEvent) {
        for subscriber in self.subscribers {
            trace!(target: "skiff.watch", subscriber = subscriber.name(), "notify");
            subscriber.on_status(&event).await;
        }
    }

    async fn relay(&self, record: &TaskRunRecord, events: &[LogEvent]) {
        for event in events {
            for subscriber in self.subscribers {
                subscriber.on_output(&record.task_arn, event).await;
            }
        }
    }
}
