use skiff_core::StatusEvent;
use skiff_model::TaskStatus;
use tracing::{debug, info, trace, warn};

#[inline]
pub fn message_for(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Unknown => "task status is not known yet",
        TaskStatus::Provisioning => "task is provisioning resources",
        TaskStatus::Pending => "task is waiting to be placed",
        TaskStatus::Activating => "task is activating",
        TaskStatus::Running => "task is running",
        TaskStatus::Deactivating => "task is deactivating",
        TaskStatus::Stopping => "task is stopping",
        TaskStatus::Deprovisioning => "task is releasing resources",
        TaskStatus::Stopped => "task stopped",
    }
}

#[inline]
pub fn log_status(e: &StatusEvent) {
    let msg = message_for(e.to);
    let task_arn = e.task_arn.as_str();
    let cluster = e.cluster.as_str();
    let from = e.from.as_str();

    match e.to {
        TaskStatus::Unknown => warn!(target: "skiff.journal", task_arn, cluster, from, "{msg}"),

        // placement
        TaskStatus::Provisioning | TaskStatus::Pending | TaskStatus::Activating => {
            debug!(target: "skiff.journal", task_arn, cluster, from, "{msg}")
        }

        TaskStatus::Running => info!(target: "skiff.journal", task_arn, cluster, from, "{msg}"),

        // teardown
        TaskStatus::Deactivating | TaskStatus::Stopping | TaskStatus::Deprovisioning => {
            trace!(target: "skiff.journal", task_arn, cluster, from, "{msg}")
        }

        TaskStatus::Stopped => {
            if e.from.has_reached(TaskStatus::Running) {
                info!(target: "skiff.journal", task_arn, cluster, from, "{msg}")
            } else {
                warn!(target: "skiff.journal", task_arn, cluster, from, "task stopped before it started running")
            }
        }
    }
}
