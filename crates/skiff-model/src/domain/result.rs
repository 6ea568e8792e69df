use serde::{Deserialize, Serialize};

/// Status code reported when the orchestration container never produced an exit code.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Final outcome of one task run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Run identifier (`<cluster>::<task-arn>`).
    pub identifier: String,
    pub status_code: i32,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status_code == 0
    }
}
