use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a remote task, as reported by the scheduling service.
///
/// Live variants are declared in lifecycle order. `Unknown` is the local view before
/// the first poll and also absorbs any status the service introduces later.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Provisioning,
    Pending,
    Activating,
    Running,
    Deactivating,
    Stopping,
    Deprovisioning,
    Stopped,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Returns `true` once the task will not transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Stopped)
    }

    /// Returns `true` if this status is at or past `target` in lifecycle order.
    ///
    /// `Unknown` never counts as having reached anything but itself.
    pub fn has_reached(&self, target: TaskStatus) -> bool {
        if *self == TaskStatus::Unknown {
            return target == TaskStatus::Unknown;
        }
        self.rank() >= target.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Unknown => "UNKNOWN",
            TaskStatus::Provisioning => "PROVISIONING",
            TaskStatus::Pending => "PENDING",
            TaskStatus::Activating => "ACTIVATING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Deactivating => "DEACTIVATING",
            TaskStatus::Stopping => "STOPPING",
            TaskStatus::Deprovisioning => "DEPROVISIONING",
            TaskStatus::Stopped => "STOPPED",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            TaskStatus::Unknown => 0,
            live => *live as u8 + 1,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_stopped_is_terminal() {
        assert!(TaskStatus::Stopped.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::Deprovisioning.is_terminal());
        assert!(!TaskStatus::Unknown.is_terminal());
    }

    #[test]
    fn later_states_reach_earlier_targets() {
        assert!(TaskStatus::Running.has_reached(TaskStatus::Running));
        assert!(TaskStatus::Deactivating.has_reached(TaskStatus::Running));
        assert!(!TaskStatus::Pending.has_reached(TaskStatus::Running));
        assert!(!TaskStatus::Unknown.has_reached(TaskStatus::Running));
        assert!(TaskStatus::Provisioning.has_reached(TaskStatus::Unknown));
    }

    #[test]
    fn default_is_unknown() {
        assert_eq!(TaskStatus::default(), TaskStatus::Unknown);
        assert_eq!(serde_json::to_string(&TaskStatus::Unknown).unwrap(), r#""UNKNOWN""#);
    }

    #[test]
    fn unrecognized_status_parses_as_unknown() {
        let status: TaskStatus = serde_json::from_str(r#""WARMING_UP""#).unwrap();
        assert_eq!(status, TaskStatus::Unknown);

        let status: TaskStatus = serde_json::from_str(r#""DEPROVISIONING""#).unwrap();
        assert_eq!(status, TaskStatus::Deprovisioning);
    }
}
