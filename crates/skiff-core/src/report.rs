use skiff_model::{ExecutionResult, TaskDescription, UNKNOWN_EXIT_CODE};
use tracing::{error, info, warn};

/// Read the orchestration container's exit code from the final description of a run.
pub fn report(task: &TaskDescription, container_name: &str, identifier: String) -> ExecutionResult {
    let exit_code = task
        .container(container_name)
        .and_then(|container| container.exit_code);

    let status_code = match exit_code {
        None => {
            error!(
                target: "skiff.engine",
                task_arn = %task.task_arn,
                container = container_name,
                stop_code = ?task.stop_code,
                reason = ?task.stopped_reason,
                "container exited without an exit code"
            );
            UNKNOWN_EXIT_CODE
        }
        Some(0) => {
            info!(target: "skiff.engine", task_arn = %task.task_arn, container = container_name, "container exited successfully");
            0
        }
        Some(code) => {
            warn!(target: "skiff.engine", task_arn = %task.task_arn, container = container_name, exit_code = code, "container exited with non-zero exit code");
            code
        }
    };

    ExecutionResult {
        identifier,
        status_code,
    }
}
