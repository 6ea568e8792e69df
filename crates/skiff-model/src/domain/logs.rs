use serde::{Deserialize, Serialize};

/// One log line as returned by the log service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingestion_time: Option<i64>,
}

impl LogEvent {
    pub fn new(timestamp: i64, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            ingestion_time: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEventsQuery {
    pub log_group_name: String,
    pub log_stream_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    pub start_from_head: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEventsPage {
    #[serde(default)]
    pub events: Vec<LogEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_forward_token: Option<String>,
}

/// Resume point for tailing a task's log stream.
///
/// Invariant: a line with `timestamp <= last_timestamp` is never emitted again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCursor {
    pub log_group: String,
    pub log_stream: String,
    pub last_timestamp: Option<i64>,
    pub next_token: Option<String>,
}

impl LogCursor {
    pub fn new(log_group: impl Into<String>, log_stream: impl Into<String>) -> Self {
        Self {
            log_group: log_group.into(),
            log_stream: log_stream.into(),
            last_timestamp: None,
            next_token: None,
        }
    }

    /// Stream name `<prefix>/<family>/<task id>`, where the task id is the trailing ARN segment.
    pub fn stream_name(prefix: &str, family: &str, task_arn: &str) -> String {
        let task_id = task_arn.rsplit('/').next().unwrap_or(task_arn);
        format!("{prefix}/{family}/{task_id}")
    }

    /// First timestamp the next query may return.
    pub fn start_time(&self) -> Option<i64> {
        self.last_timestamp.map(|ts| ts + 1)
    }

    /// Returns `true` if an event at `timestamp` has not been emitted yet.
    pub fn is_fresh(&self, timestamp: i64) -> bool {
        self.last_timestamp.is_none_or(|last| timestamp > last)
    }

    pub fn advance(&mut self, timestamp: i64) {
        if self.is_fresh(timestamp) {
            self.last_timestamp = Some(timestamp);
        }
    }

    pub fn query(&self) -> LogEventsQuery {
        LogEventsQuery {
            log_group_name: self.log_group.clone(),
            log_stream_name: self.log_stream.clone(),
            start_time: self.start_time(),
            next_token: self.next_token.clone(),
            start_from_head: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_name_uses_task_id_suffix() {
        let name = LogCursor::stream_name(
            "nightly",
            "skiff_nightly",
            "arn:aws:ecs:us-east-1:1:task/default/abc123",
        );
        assert_eq!(name, "nightly/skiff_nightly/abc123");
    }

    #[test]
    fn start_time_follows_last_emitted() {
        let mut cursor = LogCursor::new("group", "stream");
        assert_eq!(cursor.start_time(), None);

        cursor.advance(100);
        assert_eq!(cursor.start_time(), Some(101));

        cursor.advance(50);
        assert_eq!(cursor.last_timestamp, Some(100));
        assert!(!cursor.is_fresh(100));
        assert!(cursor.is_fresh(101));
    }
}
