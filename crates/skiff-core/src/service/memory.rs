//! In-process [`ContainerService`] with scripted task lifecycles.
//!
//! Used by the engine's tests and the local demo. Definitions get real-looking ARNs and revisions,
//! each run walks through a [`TaskScript`] one status per describe call, and log streams are
//! paginated with forward tokens the way the log service does it.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use skiff_model::{
    Arn, ContainerDescription, LogCursor, LogEvent, LogEventsPage, LogEventsQuery, Network,
    NetworkMode, Subnet, TaskDefinition, TaskDescription, TaskRunRecord, TaskRunRequest,
    TaskStatus,
};

use super::{ContainerService, ServiceError};

const ACCOUNT_ID: &str = "000000000000";
const DEFAULT_PAGE_SIZE: usize = 100;
const LOG_CLOCK_START_MS: i64 = 1_700_000_000_000;

/// Lifecycle a launched task plays back, one entry per describe call.
///
/// The last status repeats once the script is exhausted. `exit_code` is reported on every
/// container once the task is `STOPPED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskScript {
    pub statuses: Vec<TaskStatus>,
    pub stop_code: Option<String>,
    pub stopped_reason: Option<String>,
    pub exit_code: Option<i32>,
    /// Lines written to the task's log stream when it first reports `RUNNING` or later.
    pub log_lines: Vec<String>,
}

impl Default for TaskScript {
    fn default() -> Self {
        Self {
            statuses: vec![
                TaskStatus::Provisioning,
                TaskStatus::Pending,
                TaskStatus::Running,
                TaskStatus::Running,
                TaskStatus::Stopped,
            ],
            stop_code: Some("EssentialContainerExited".into()),
            stopped_reason: Some("Essential container in task exited".into()),
            exit_code: Some(0),
            log_lines: Vec::new(),
        }
    }
}

impl TaskScript {
    /// Default lifecycle ending with `exit_code`.
    pub fn exiting(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            ..Self::default()
        }
    }

    /// Stops without ever reaching `RUNNING`.
    pub fn stopped_early(stop_code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            statuses: vec![TaskStatus::Provisioning, TaskStatus::Pending, TaskStatus::Stopped],
            stop_code: Some(stop_code.into()),
            stopped_reason: Some(reason.into()),
            exit_code: None,
            log_lines: Vec::new(),
        }
    }

    /// Never leaves `PENDING`.
    pub fn stuck_pending() -> Self {
        Self {
            statuses: vec![TaskStatus::Provisioning, TaskStatus::Pending],
            exit_code: None,
            ..Self::default()
        }
    }

    pub fn with_log_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.log_lines = lines.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug)]
struct StoredDefinition {
    definition: TaskDefinition,
    revision: u32,
}

#[derive(Debug)]
struct TaskState {
    cluster: String,
    definition_arn: Arn,
    script: TaskScript,
    step: usize,
    log_target: Option<(String, String)>,
    logs_written: bool,
    stopped_by: Option<String>,
}

#[derive(Debug)]
struct State {
    definitions: HashMap<Arn, StoredDefinition>,
    revisions: HashMap<String, u32>,
    registrations: usize,
    scripts: VecDeque<TaskScript>,
    tasks: HashMap<Arn, TaskState>,
    run_requests: Vec<TaskRunRequest>,
    stopped: Vec<(Arn, String)>,
    streams: HashMap<(String, String), Vec<LogEvent>>,
    log_clock: i64,
    page_size: usize,
    networks: Vec<Network>,
    subnets: Vec<Subnet>,
    clusters: Option<HashSet<String>>,
    run_failures: VecDeque<ServiceError>,
    describe_definition_failures: VecDeque<ServiceError>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            definitions: HashMap::new(),
            revisions: HashMap::new(),
            registrations: 0,
            scripts: VecDeque::new(),
            tasks: HashMap::new(),
            run_requests: Vec::new(),
            stopped: Vec::new(),
            streams: HashMap::new(),
            log_clock: LOG_CLOCK_START_MS,
            page_size: DEFAULT_PAGE_SIZE,
            networks: Vec::new(),
            subnets: Vec::new(),
            clusters: None,
            run_failures: VecDeque::new(),
            describe_definition_failures: VecDeque::new(),
        }
    }
}

impl State {
    fn append_log(&mut self, group: String, stream: String, message: String) {
        self.log_clock += 1;
        let event = LogEvent::new(self.log_clock, message);
        self.streams.entry((group, stream)).or_default().push(event);
    }
}

#[derive(Debug)]
pub struct InMemoryService {
    region: String,
    state: Mutex<State>,
}

impl InMemoryService {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Register a network and its subnets. A network flagged `is_default` answers id-less lookups.
    pub fn with_network(mut self, network: Network, subnets: Vec<Subnet>) -> Self {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.networks.push(network);
        state.subnets.extend(subnets);
        self
    }

    /// Restrict launches to the named clusters. Unknown clusters fail with `ClusterNotFoundException`.
    pub fn with_clusters<I, S>(mut self, clusters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.clusters = Some(clusters.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .page_size = page_size.max(1);
        self
    }

    /// Queue the lifecycle for the next launched task. Launches without a queued script use the default.
    pub fn push_script(&self, script: TaskScript) {
        self.lock().scripts.push_back(script);
    }

    pub fn fail_next_run(&self, error: ServiceError) {
        self.lock().run_failures.push_back(error);
    }

    pub fn fail_next_describe_definition(&self, error: ServiceError) {
        self.lock().describe_definition_failures.push_back(error);
    }

    /// Append events to a log stream, creating it if needed.
    pub fn push_log_events(&self, group: &str, stream: &str, events: Vec<LogEvent>) {
        let mut state = self.lock();
        let entry = state
            .streams
            .entry((group.to_string(), stream.to_string()))
            .or_default();
        entry.extend(events);
        entry.sort_by_key(|e| e.timestamp);
    }

    /// Number of successful definition registrations.
    pub fn registrations(&self) -> usize {
        self.lock().registrations
    }

    /// Registered document behind `arn`, as it was submitted.
    pub fn definition(&self, arn: &str) -> Option<TaskDefinition> {
        self.lock()
            .definitions
            .get(arn)
            .map(|stored| stored.definition.clone())
    }

    pub fn run_requests(&self) -> Vec<TaskRunRequest> {
        self.lock().run_requests.clone()
    }

    /// `(task_arn, reason)` for every accepted stop call.
    pub fn stopped(&self) -> Vec<(Arn, String)> {
        self.lock().stopped.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn describe_one(region: &str, state: &mut State, task_arn: &Arn) -> Option<TaskDescription> {
        let task = state.tasks.get_mut(task_arn)?;

        let status = match &task.stopped_by {
            Some(_) => TaskStatus::Stopped,
            None => {
                let last = task.script.statuses.len().saturating_sub(1);
                let status = task
                    .script
                    .statuses
                    .get(task.step.min(last))
                    .copied()
                    .unwrap_or(TaskStatus::Stopped);
                task.step += 1;
                status
            }
        };

        let write_logs = !task.logs_written && status.has_reached(TaskStatus::Running);
        let pending_logs = if write_logs {
            task.logs_written = true;
            task.log_target
                .clone()
                .map(|target| (target, task.script.log_lines.clone()))
        } else {
            None
        };

        let stopped = status.is_terminal();
        let (stop_code, stopped_reason, exit_code) = match (&task.stopped_by, stopped) {
            (Some(reason), _) => (Some("UserInitiated".to_string()), Some(reason.clone()), None),
            (None, true) => (
                task.script.stop_code.clone(),
                task.script.stopped_reason.clone(),
                task.script.exit_code,
            ),
            (None, false) => (None, None, None),
        };
        let cluster = task.cluster.clone();
        let definition_arn = task.definition_arn.clone();

        let containers = state
            .definitions
            .get(&definition_arn)
            .map(|stored| {
                stored
                    .definition
                    .container_definitions
                    .iter()
                    .map(|c| ContainerDescription {
                        name: c.name.clone(),
                        exit_code,
                        reason: None,
                        last_status: Some(status),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(((group, stream), lines)) = pending_logs {
            for line in lines {
                state.append_log(group.clone(), stream.clone(), line);
            }
        }

        Some(TaskDescription {
            task_arn: task_arn.clone(),
            cluster_arn: Some(format!("arn:aws:ecs:{region}:{ACCOUNT_ID}:cluster/{cluster}")),
            last_status: status,
            desired_status: Some(if stopped {
                TaskStatus::Stopped
            } else {
                TaskStatus::Running
            }),
            stop_code,
            stopped_reason,
            containers,
        })
    }
}

/// Log group and stream the awslogs driver of `definition` would write to for `task_arn`.
fn log_target(definition: &TaskDefinition, task_arn: &str) -> Option<(String, String)> {
    let family = definition.family.as_deref().unwrap_or_default();
    definition
        .container_definitions
        .iter()
        .filter_map(|c| c.log_configuration.as_ref())
        .filter(|log| log.is_awslogs())
        .find_map(|log| {
            let group = log.option("awslogs-group")?;
            let prefix = log.option("awslogs-stream-prefix")?;
            Some((
                group.to_string(),
                LogCursor::stream_name(prefix, family, task_arn),
            ))
        })
}

#[async_trait]
impl ContainerService for InMemoryService {
    fn region(&self) -> String {
        self.region.clone()
    }

    async fn register_task_definition(
        &self,
        definition: &TaskDefinition,
    ) -> Result<Arn, ServiceError> {
        if definition.container_definitions.is_empty() {
            return Err(ServiceError::new(
                "RegisterTaskDefinition",
                "ClientException",
                "Container definitions must not be empty.",
            ));
        }
        let family = definition.family.clone().unwrap_or_default();
        let mut state = self.lock();
        let revision = {
            let revision = state.revisions.entry(family.clone()).or_insert(0);
            *revision += 1;
            *revision
        };
        let arn = format!(
            "arn:aws:ecs:{}:{ACCOUNT_ID}:task-definition/{family}:{revision}",
            self.region
        );
        let mut stored = definition.clone();
        stored.task_definition_arn = Some(arn.clone());
        state.definitions.insert(
            arn.clone(),
            StoredDefinition {
                definition: stored,
                revision,
            },
        );
        state.registrations += 1;
        Ok(arn)
    }

    async fn describe_task_definition(&self, arn: &str) -> Result<TaskDefinition, ServiceError> {
        let mut state = self.lock();
        if let Some(error) = state.describe_definition_failures.pop_front() {
            return Err(error);
        }
        let stored = state.definitions.get(arn).ok_or_else(|| {
            ServiceError::new(
                "DescribeTaskDefinition",
                "ClientException",
                format!("Unable to describe task definition {arn}."),
            )
        })?;

        let mut definition = stored.definition.clone();
        definition.extra.insert("revision".into(), json!(stored.revision));
        definition.extra.insert("status".into(), json!("ACTIVE"));
        definition
            .extra
            .insert("compatibilities".into(), json!(["EC2", "FARGATE"]));
        definition
            .extra
            .insert("registeredAt".into(), json!("2024-01-01T00:00:00Z"));
        if !definition
            .container_definitions
            .iter()
            .any(|c| c.essential == Some(true))
        {
            if let Some(first) = definition.container_definitions.first_mut() {
                first.essential.get_or_insert(true);
            }
        }
        definition
            .network_mode
            .get_or_insert(NetworkMode::SERVICE_DEFAULT);
        Ok(definition)
    }

    async fn run_task(&self, request: &TaskRunRequest) -> Result<TaskRunRecord, ServiceError> {
        let mut state = self.lock();
        if let Some(error) = state.run_failures.pop_front() {
            return Err(error);
        }

        let cluster = request.cluster.clone().unwrap_or_else(|| "default".into());
        if let Some(clusters) = &state.clusters {
            if !clusters.contains(&cluster) {
                return Err(ServiceError::new(
                    "RunTask",
                    "ClusterNotFoundException",
                    "Cluster not found.",
                ));
            }
        }
        let definition = state
            .definitions
            .get(&request.task_definition)
            .map(|stored| stored.definition.clone())
            .ok_or_else(|| {
                ServiceError::new(
                    "RunTask",
                    "ClientException",
                    format!("TaskDefinition not found: {}", request.task_definition),
                )
            })?;

        let task_arn = format!(
            "arn:aws:ecs:{}:{ACCOUNT_ID}:task/{cluster}/{}",
            self.region,
            Uuid::new_v4().simple()
        );
        let script = state.scripts.pop_front().unwrap_or_default();
        state.tasks.insert(
            task_arn.clone(),
            TaskState {
                cluster: cluster.clone(),
                definition_arn: request.task_definition.clone(),
                script,
                step: 0,
                log_target: log_target(&definition, &task_arn),
                logs_written: false,
                stopped_by: None,
            },
        );
        state.run_requests.push(request.clone());
        Ok(TaskRunRecord::new(cluster, task_arn))
    }

    async fn describe_tasks(
        &self,
        _cluster: &str,
        task_arns: &[Arn],
    ) -> Result<Vec<TaskDescription>, ServiceError> {
        let mut state = self.lock();
        Ok(task_arns
            .iter()
            .filter_map(|arn| Self::describe_one(&self.region, &mut state, arn))
            .collect())
    }

    async fn stop_task(
        &self,
        _cluster: &str,
        task_arn: &str,
        reason: &str,
    ) -> Result<(), ServiceError> {
        let mut state = self.lock();
        let task = state.tasks.get_mut(task_arn).ok_or_else(|| {
            ServiceError::new(
                "StopTask",
                "InvalidParameterException",
                "The referenced task was not found.",
            )
        })?;
        task.stopped_by = Some(reason.to_string());
        state.stopped.push((task_arn.to_string(), reason.to_string()));
        Ok(())
    }

    async fn get_log_events(&self, query: &LogEventsQuery) -> Result<LogEventsPage, ServiceError> {
        let state = self.lock();
        let key = (query.log_group_name.clone(), query.log_stream_name.clone());
        let stream = state.streams.get(&key).ok_or_else(|| {
            ServiceError::new(
                "GetLogEvents",
                "ResourceNotFoundException",
                "The specified log stream does not exist.",
            )
        })?;

        let mut idx = query
            .next_token
            .as_deref()
            .and_then(|token| token.strip_prefix("f/"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);
        let mut events = Vec::new();
        while idx < stream.len() && events.len() < state.page_size {
            let event = &stream[idx];
            idx += 1;
            if query.start_time.is_some_and(|start| event.timestamp < start) {
                continue;
            }
            events.push(event.clone());
        }

        Ok(LogEventsPage {
            events,
            next_forward_token: Some(format!("f/{idx}")),
        })
    }

    async fn describe_network(&self, id: Option<&str>) -> Result<Option<Network>, ServiceError> {
        let state = self.lock();
        Ok(state
            .networks
            .iter()
            .find(|n| match id {
                Some(id) => n.id == id,
                None => n.is_default,
            })
            .cloned())
    }

    async fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>, ServiceError> {
        let state = self.lock();
        Ok(state
            .subnets
            .iter()
            .filter(|s| s.network_id == network_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_model::ContainerDefinition;

    fn definition() -> TaskDefinition {
        TaskDefinition {
            family: Some("etl".into()),
            container_definitions: vec![ContainerDefinition::named("skiff")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn revisions_increase_per_family() {
        let service = InMemoryService::new("eu-west-1");
        let first = service.register_task_definition(&definition()).await.unwrap();
        let second = service.register_task_definition(&definition()).await.unwrap();

        assert_eq!(first, "arn:aws:ecs:eu-west-1:000000000000:task-definition/etl:1");
        assert_eq!(second, "arn:aws:ecs:eu-west-1:000000000000:task-definition/etl:2");
    }

    #[tokio::test]
    async fn described_definition_carries_service_defaults() {
        let service = InMemoryService::new("eu-west-1");
        let arn = service.register_task_definition(&definition()).await.unwrap();
        let described = service.describe_task_definition(&arn).await.unwrap();

        assert_eq!(described.network_mode, Some(NetworkMode::Bridge));
        assert_eq!(described.container_definitions[0].essential, Some(true));
        assert!(described.extra.contains_key("revision"));
    }

    #[tokio::test]
    async fn script_plays_back_one_status_per_describe() {
        let service = InMemoryService::new("eu-west-1");
        let arn = service.register_task_definition(&definition()).await.unwrap();
        let record = service
            .run_task(&TaskRunRequest {
                task_definition: arn,
                ..Default::default()
            })
            .await
            .unwrap();

        let mut seen = Vec::new();
        for _ in 0..6 {
            let tasks = service
                .describe_tasks(&record.cluster, std::slice::from_ref(&record.task_arn))
                .await
                .unwrap();
            seen.push(tasks[0].last_status);
        }
        assert_eq!(seen.first(), Some(&TaskStatus::Provisioning));
        assert_eq!(seen.last(), Some(&TaskStatus::Stopped));
    }

    #[tokio::test]
    async fn log_pages_follow_forward_tokens() {
        let service = InMemoryService::new("eu-west-1").with_page_size(2);
        service.push_log_events(
            "skiff",
            "s",
            (1..=3).map(|ts| LogEvent::new(ts, format!("line {ts}"))).collect(),
        );

        let mut query = LogEventsQuery {
            log_group_name: "skiff".into(),
            log_stream_name: "s".into(),
            start_time: None,
            next_token: None,
            start_from_head: true,
        };
        let first = service.get_log_events(&query).await.unwrap();
        assert_eq!(first.events.len(), 2);

        query.next_token = first.next_forward_token.clone();
        let second = service.get_log_events(&query).await.unwrap();
        assert_eq!(second.events.len(), 1);

        query.next_token = second.next_forward_token.clone();
        let third = service.get_log_events(&query).await.unwrap();
        assert!(third.events.is_empty());
        assert_eq!(third.next_forward_token, second.next_forward_token);
    }

    #[tokio::test]
    async fn unknown_cluster_is_rejected() {
        let service = InMemoryService::new("eu-west-1").with_clusters(["prod"]);
        let arn = service.register_task_definition(&definition()).await.unwrap();
        let err = service
            .run_task(&TaskRunRequest {
                task_definition: arn,
                cluster: Some("staging".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.mentions("ClusterNotFoundException"));
    }
}
