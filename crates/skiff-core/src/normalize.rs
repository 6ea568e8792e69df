//! Turns raw [`JobVariables`] into a [`JobConfiguration`].

use std::time::Duration;

use skiff_model::{
    COMPATIBILITY_FARGATE, CommandLine, ContainerDefinition, DEFAULT_CONTAINER_NAME,
    JobConfiguration, JobVariables, LaunchMode, LoggingPreference, NetworkMode, Resources,
    TaskDefinition,
};
use tracing::{debug, instrument};

use crate::{EngineConfig, EngineError};

/// Build the job configuration for one invocation.
///
/// Pure transform. When no container name is given it is inferred from the template: the
/// conventional default name if a container carries it, else the first container. With a
/// linked definition and no template the name stays unresolved until the definition is known.
#[instrument(level = "trace", skip_all, fields(name = ?vars.name))]
pub fn normalize(vars: JobVariables, defaults: &EngineConfig) -> Result<JobConfiguration, EngineError> {
    let launch_mode = vars.launch_type.unwrap_or_default();
    let stream_output = vars.stream_output.unwrap_or(false);
    let logging = LoggingPreference {
        configure: vars.configure_logs.unwrap_or(stream_output),
        stream_output,
        options: vars.log_options,
    };

    let template_role = vars
        .task_definition
        .as_ref()
        .and_then(|template| template.execution_role_arn.as_ref());
    if logging.configure
        && vars.execution_role_arn.is_none()
        && template_role.is_none()
        && vars.task_definition_arn.is_none()
    {
        return Err(missing_execution_role());
    }

    if vars.poll_interval_secs == Some(0) {
        return Err(EngineError::configuration("poll interval must be at least one second"));
    }

    let task_definition = match (vars.task_definition, &vars.task_definition_arn) {
        (Some(template), _) => Some(template),
        (None, Some(_)) => None,
        (None, None) => Some(default_template(launch_mode)),
    };

    let container_name = vars
        .container_name
        .or_else(|| task_definition.as_ref().and_then(infer_container_name));

    let command = match vars.command {
        None => Vec::new(),
        Some(CommandLine::Args(args)) => args,
        Some(CommandLine::Line(line)) => shell_words::split(&line).map_err(|e| {
            EngineError::configuration(format!("cannot split command {line:?}: {e}"))
        })?,
    };

    let config = JobConfiguration {
        name: vars.name,
        container_name,
        image: vars.image,
        command,
        env: vars.env,
        labels: vars.labels,
        resources: Resources {
            cpu: vars.cpu,
            memory: vars.memory,
        },
        launch_mode,
        network_mode: vars.network_mode,
        logging,
        cluster: vars.cluster,
        execution_role_arn: vars.execution_role_arn,
        task_role_arn: vars.task_role_arn,
        vpc_id: vars.vpc_id,
        family: vars.family,
        task_definition_arn: vars.task_definition_arn,
        task_definition,
        run_request_overrides: vars.task_run_request.unwrap_or_default(),
        cache_key: vars.cache_key,
        poll_interval: vars
            .poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.default_poll_interval),
        start_timeout: vars
            .start_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.default_start_timeout),
    };

    debug!(
        container = ?config.container_name,
        launch_mode = %config.launch_mode,
        "job configuration normalized"
    );
    Ok(config)
}

/// Name of the container that receives the command and reports the exit code.
///
/// Explicit configuration wins; otherwise the same inference as [`normalize`] runs against the
/// full definition, falling back to the conventional default name.
pub fn orchestration_container_name(config: &JobConfiguration, definition: &TaskDefinition) -> String {
    config
        .container_name
        .clone()
        .or_else(|| infer_container_name(definition))
        .unwrap_or_else(|| DEFAULT_CONTAINER_NAME.to_string())
}

fn infer_container_name(definition: &TaskDefinition) -> Option<String> {
    if definition.container(DEFAULT_CONTAINER_NAME).is_some() {
        return Some(DEFAULT_CONTAINER_NAME.to_string());
    }
    definition.first_container_name().map(str::to_string)
}

fn default_template(launch_mode: LaunchMode) -> TaskDefinition {
    let mut template = TaskDefinition {
        container_definitions: vec![ContainerDefinition::named(DEFAULT_CONTAINER_NAME)],
        ..Default::default()
    };
    if launch_mode.is_serverless() {
        template.network_mode = Some(NetworkMode::Awsvpc);
        template.requires_compatibilities = vec![COMPATIBILITY_FARGATE.to_string()];
    }
    template
}

pub(crate) fn missing_execution_role() -> EngineError {
    EngineError::configuration(
        "an execution role ARN must be provided to configure logs or stream output",
    )
}
