mod launch;
mod preview;

use std::sync::Arc;

use skiff_model::{
    Arn, ExecutionResult, JobConfiguration, JobVariables, TaskDefinition, TaskRunRecord,
    TaskRunRequest, TaskStatus,
};
use tokio::{
    sync::{Semaphore, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, instrument};

use crate::{
    ContainerService, DefinitionCache, EngineConfig, EngineError, LogTail, Subscribe, TaskWatcher,
    definition, diff::task_definitions_equal, network, normalize, orchestration_container_name,
    report::report, request, resolve_definition_arn,
};

/// Everything needed to launch one run, computed before the launch call.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub definition: TaskDefinition,
    pub definition_arn: Arn,
    pub request: TaskRunRequest,
    pub container_name: String,
}

/// Drives task runs against a [`ContainerService`].
///
/// Cheap to clone; clones share the service, the definition cache and the worker pool.
#[derive(Clone)]
pub struct Engine {
    service: Arc<dyn ContainerService>,
    cache: DefinitionCache,
    subscribers: Vec<Arc<dyn Subscribe>>,
    permits: Arc<Semaphore>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(service: Arc<dyn ContainerService>, config: EngineConfig) -> Self {
        Self {
            service,
            cache: DefinitionCache::new(),
            subscribers: Vec::new(),
            permits: Arc::new(Semaphore::new(config.workers.max(1))),
            config,
        }
    }

    /// Share an existing cache, e.g. one owned by a longer-lived component.
    pub fn with_cache(mut self, cache: DefinitionCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn cache(&self) -> &DefinitionCache {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Normalize raw job variables using this engine's defaults.
    pub fn configure(&self, vars: JobVariables) -> Result<JobConfiguration, EngineError> {
        normalize(vars, &self.config)
    }

    /// Resolve the definition ARN, network and run request for `config`.
    #[instrument(level = "debug", target = "skiff.engine", skip_all, fields(name = ?config.name))]
    pub async fn prepare(&self, config: &JobConfiguration) -> Result<PreparedRun, EngineError> {
        let region = self.service.region();

        let linked = match &config.task_definition_arn {
            Some(arn) => Some(self.service.describe_task_definition(arn).await?),
            None => None,
        };
        let template = linked
            .clone()
            .or_else(|| config.task_definition.clone())
            .unwrap_or_default();

        let definition = definition::build(&template, config, &region)?;
        let definition_arn = self
            .resolve_definition(config, linked.as_ref(), &definition)
            .await?;

        let network = if request::needs_network(config, &definition) {
            Some(network::resolve(config.vpc_id.as_deref(), self.service.as_ref()).await?)
        } else {
            None
        };
        let request = request::build(config, &definition, &definition_arn, network)?;
        let container_name = orchestration_container_name(config, &definition);

        Ok(PreparedRun {
            definition,
            definition_arn,
            request,
            container_name,
        })
    }

    async fn resolve_definition(
        &self,
        config: &JobConfiguration,
        linked: Option<&TaskDefinition>,
        definition: &TaskDefinition,
    ) -> Result<Arn, EngineError> {
        if let (Some(arn), Some(linked)) = (&config.task_definition_arn, linked) {
            if task_definitions_equal(linked, definition)? {
                debug!(target: "skiff.engine", arn = %arn, "linked task definition is up to date");
                return Ok(arn.clone());
            }
        }

        match &config.cache_key {
            Some(key) => {
                resolve_definition_arn(&self.cache, key, definition, self.service.as_ref()).await
            }
            None => {
                let arn = self.service.register_task_definition(definition).await?;
                info!(
                    target: "skiff.engine",
                    arn = %arn,
                    family = ?definition.family,
                    "registered task definition"
                );
                Ok(arn)
            }
        }
    }

    /// Submit the prepared request. Launch failures are classified into actionable errors.
    pub async fn launch(
        &self,
        config: &JobConfiguration,
        prepared: &PreparedRun,
    ) -> Result<TaskRunRecord, EngineError> {
        let record = self
            .service
            .run_task(&prepared.request)
            .await
            .map_err(|e| launch::classify(e, config, &prepared.request))?;
        info!(
            target: "skiff.engine",
            task_arn = %record.task_arn,
            cluster = %record.cluster,
            family = ?prepared.definition.family,
            "task launched"
        );
        Ok(record)
    }

    /// Run one job to completion on the current task.
    pub async fn run(&self, config: JobConfiguration) -> Result<ExecutionResult, EngineError> {
        self.execute(config, None).await
    }

    /// Run one job on the worker pool.
    ///
    /// The run waits for a free worker before anything is registered or launched.
    pub fn submit(&self, config: JobConfiguration) -> RunHandle {
        let engine = self.clone();
        let (started_tx, started_rx) = oneshot::channel();
        let join = tokio::spawn(async move {
            let _permit = engine
                .permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| EngineError::Worker(e.to_string()))?;
            engine.execute(config, Some(started_tx)).await
        });
        RunHandle {
            started: Some(started_rx),
            record: None,
            join,
        }
    }

    async fn execute(
        &self,
        config: JobConfiguration,
        started: Option<oneshot::Sender<TaskRunRecord>>,
    ) -> Result<ExecutionResult, EngineError> {
        let prepared = self.prepare(&config).await?;
        let mut record = self.launch(&config, &prepared).await?;
        if let Some(started) = started {
            let _ = started.send(record.clone());
        }

        let watcher = TaskWatcher::new(
            self.service.as_ref(),
            &self.subscribers,
            config.poll_interval,
        );
        watcher
            .wait_for(
                &mut record,
                TaskStatus::Running,
                Some(config.start_timeout),
                None,
            )
            .await?;

        let mut tail = LogTail::for_run(
            self.service.as_ref(),
            &config,
            &prepared.definition,
            &prepared.container_name,
            &record.task_arn,
        );
        let task = watcher
            .wait_for(&mut record, TaskStatus::Stopped, None, tail.as_mut())
            .await?;

        Ok(report(&task, &prepared.container_name, record.identifier()))
    }

    /// Ask the service to stop a run.
    pub async fn stop(&self, record: &TaskRunRecord, reason: &str) -> Result<(), EngineError> {
        self.service
            .stop_task(&record.cluster, &record.task_arn, reason)
            .await?;
        info!(target: "skiff.engine", task_arn = %record.task_arn, cluster = %record.cluster, reason, "stop requested");
        Ok(())
    }

    /// Stop a run by the identifier reported in its [`ExecutionResult`].
    pub async fn stop_by_identifier(&self, identifier: &str, reason: &str) -> Result<(), EngineError> {
        let (cluster, task_arn) = TaskRunRecord::parse_identifier(identifier)?;
        self.stop(&TaskRunRecord::new(cluster, task_arn), reason).await
    }

    /// Render the documents a run of `config` would submit, without any service call.
    pub fn preview(&self, config: &JobConfiguration) -> Result<String, EngineError> {
        preview::render(config, &self.service.region())
    }
}

/// Handle to a run submitted with [`Engine::submit`].
pub struct RunHandle {
    started: Option<oneshot::Receiver<TaskRunRecord>>,
    record: Option<TaskRunRecord>,
    join: JoinHandle<Result<ExecutionResult, EngineError>>,
}

impl RunHandle {
    /// The launched run, available before it reaches `RUNNING`.
    ///
    /// Returns `None` if the run failed before launching.
    pub async fn started(&mut self) -> Option<TaskRunRecord> {
        if let Some(rx) = self.started.take() {
            self.record = rx.await.ok();
        }
        self.record.clone()
    }

    pub async fn wait(self) -> Result<ExecutionResult, EngineError> {
        self.join
            .await
            .map_err(|e| EngineError::Worker(e.to_string()))?
    }
}
