//! Relays a task's log stream while it runs.

use skiff_model::{
    Arn, DEFAULT_FAMILY, JobConfiguration, LogCursor, LogEvent, LogEventsPage, TaskDefinition,
};
use tracing::{debug, info, warn};

use crate::{ContainerService, EngineError};

/// Upper bound on pages fetched by a single drain.
const MAX_PAGES_PER_DRAIN: usize = 1_000;

pub struct LogTail<'a> {
    service: &'a dyn ContainerService,
    cursor: LogCursor,
}

impl<'a> LogTail<'a> {
    pub fn new(service: &'a dyn ContainerService, cursor: LogCursor) -> Self {
        Self { service, cursor }
    }

    /// Tail for the orchestration container of a run, if its output can be relayed.
    ///
    /// Returns `None` with a warning when streaming was requested but the container has no
    /// `awslogs` configuration to read from.
    pub fn for_run(
        service: &'a dyn ContainerService,
        config: &JobConfiguration,
        definition: &TaskDefinition,
        container_name: &str,
        task_arn: &Arn,
    ) -> Option<Self> {
        if !config.logging.stream_output {
            return None;
        }
        let Some(container) = definition.container(container_name) else {
            warn!(target: "skiff.logs", container = container_name, "container not found in task definition; output will not be streamed");
            return None;
        };
        let Some(log) = &container.log_configuration else {
            warn!(target: "skiff.logs", container = container_name, "container has no log configuration; output will not be streamed");
            return None;
        };
        if !log.is_awslogs() {
            warn!(
                target: "skiff.logs",
                container = container_name,
                driver = %log.log_driver,
                "log driver does not support streaming; output will not be streamed"
            );
            return None;
        }
        let (Some(group), Some(prefix)) = (log.option("awslogs-group"), log.option("awslogs-stream-prefix"))
        else {
            warn!(target: "skiff.logs", container = container_name, "log configuration lacks a group or stream prefix; output will not be streamed");
            return None;
        };

        let family = definition.family.as_deref().unwrap_or(DEFAULT_FAMILY);
        let stream = LogCursor::stream_name(prefix, family, task_arn);
        debug!(target: "skiff.logs", group, stream = %stream, "tailing task output");
        Some(Self::new(service, LogCursor::new(group, stream)))
    }

    pub fn cursor(&self) -> &LogCursor {
        &self.cursor
    }

    /// Fetch everything written since the last drain and emit it in arrival order.
    ///
    /// Lines at or before the cursor's last timestamp are dropped. A stream that does not
    /// exist yet reads as empty.
    pub async fn drain(&mut self) -> Result<Vec<LogEvent>, EngineError> {
        let floor = self.cursor.clone();
        self.cursor.next_token = None;

        let mut emitted = Vec::new();
        let mut newest = None;
        for _ in 0..MAX_PAGES_PER_DRAIN {
            let mut query = floor.query();
            query.next_token = self.cursor.next_token.clone();

            let page = match self.service.get_log_events(&query).await {
                Ok(page) => page,
                Err(e) if e.is_not_found() => LogEventsPage::default(),
                Err(e) => return Err(e.into()),
            };

            for event in page.events {
                if !floor.is_fresh(event.timestamp) {
                    continue;
                }
                info!(target: "skiff.task.output", "{}", event.message);
                newest = newest.max(Some(event.timestamp));
                emitted.push(event);
            }

            match page.next_forward_token {
                Some(token) if Some(&token) != self.cursor.next_token.as_ref() => {
                    self.cursor.next_token = Some(token);
                }
                _ => break,
            }
        }

        if let Some(ts) = newest {
            self.cursor.advance(ts);
        }
        Ok(emitted)
    }
}
