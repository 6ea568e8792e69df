//! Builds the task definition document a run is registered from.

use std::collections::BTreeMap;

use skiff_model::{
    COMPATIBILITY_FARGATE, DEFAULT_CPU, DEFAULT_FAMILY, DEFAULT_LOG_GROUP, DEFAULT_MEMORY,
    JobConfiguration, LOG_DRIVER_AWSLOGS, LaunchMode, LogConfiguration, NetworkMode,
    TaskDefinition,
};
use tracing::{debug, warn};

use crate::{
    EngineError, diff::strip_post_registration, normalize::missing_execution_role,
    orchestration_container_name,
};

const FAMILY_MAX_LEN: usize = 255;

/// Build the document to register for `config`, starting from `template`.
///
/// `template` is never mutated. The result carries no ARN and no registration bookkeeping.
/// Commands are not applied here; they travel as run-time overrides.
pub fn build(
    template: &TaskDefinition,
    config: &JobConfiguration,
    region: &str,
) -> Result<TaskDefinition, EngineError> {
    let mut definition = template.clone();
    definition.task_definition_arn = None;
    strip_post_registration(&mut definition.extra);

    let container_name = orchestration_container_name(config, &definition);
    let container = definition.ensure_container(&container_name);
    if let Some(image) = &config.image {
        container.image = Some(image.clone());
    }

    if config.logging.configure {
        let mut options = BTreeMap::from([
            ("awslogs-create-group".to_string(), "true".to_string()),
            ("awslogs-group".to_string(), DEFAULT_LOG_GROUP.to_string()),
            ("awslogs-region".to_string(), region.to_string()),
            (
                "awslogs-stream-prefix".to_string(),
                config.stream_prefix().to_string(),
            ),
        ]);
        options.extend(
            config
                .logging
                .options
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        container.log_configuration = Some(LogConfiguration {
            log_driver: LOG_DRIVER_AWSLOGS.to_string(),
            options,
            extra: Default::default(),
        });
    }

    let family = config
        .family
        .clone()
        .or_else(|| definition.family.clone())
        .or_else(|| config.name.as_ref().map(|name| format!("{DEFAULT_FAMILY}_{name}")))
        .unwrap_or_else(|| DEFAULT_FAMILY.to_string());
    definition.family = Some(sanitize_family(&family));

    let cpu = config
        .resources
        .cpu
        .map(|v| v.to_string())
        .or_else(|| definition.cpu.clone())
        .unwrap_or_else(|| DEFAULT_CPU.to_string());
    let memory = config
        .resources
        .memory
        .map(|v| v.to_string())
        .or_else(|| definition.memory.clone())
        .unwrap_or_else(|| DEFAULT_MEMORY.to_string());

    match config.launch_mode {
        LaunchMode::Fargate | LaunchMode::FargateSpot => {
            definition.cpu = Some(cpu);
            definition.memory = Some(memory);
            if !definition.requires_compatibility(COMPATIBILITY_FARGATE) {
                definition
                    .requires_compatibilities
                    .push(COMPATIBILITY_FARGATE.to_string());
            }
            if let Some(mode) = config.network_mode {
                definition.network_mode = Some(mode);
            }
            match definition.network_mode {
                None => definition.network_mode = Some(NetworkMode::Awsvpc),
                Some(mode) if !mode.is_attached() => {
                    warn!(
                        target: "skiff.engine",
                        network_mode = %mode,
                        launch_mode = %config.launch_mode,
                        "network mode is not supported by serverless launches; the run may be rejected"
                    );
                }
                Some(_) => {}
            }
        }
        LaunchMode::Ec2 => {
            if let Some(mode) = config.network_mode {
                definition.network_mode = Some(mode);
            }
            let cpu = parse_units("cpu", &cpu)?;
            let memory = parse_units("memory", &memory)?;
            let container = definition.ensure_container(&container_name);
            if config.resources.cpu.is_some() {
                container.cpu = Some(cpu);
            } else {
                container.cpu.get_or_insert(cpu);
            }
            if config.resources.memory.is_some() {
                container.memory = Some(memory);
            } else {
                container.memory.get_or_insert(memory);
            }
        }
        LaunchMode::External => {
            if let Some(mode) = config.network_mode {
                definition.network_mode = Some(mode);
            }
        }
    }

    if let Some(role) = &config.execution_role_arn {
        if config.task_definition_arn.is_none() || definition.execution_role_arn.is_none() {
            definition.execution_role_arn = Some(role.clone());
        }
    }
    if let Some(role) = &config.task_role_arn {
        if config.task_definition_arn.is_none() || definition.task_role_arn.is_none() {
            definition.task_role_arn = Some(role.clone());
        }
    }

    if config.logging.configure && definition.execution_role_arn.is_none() {
        return Err(missing_execution_role());
    }

    debug!(
        target: "skiff.engine",
        family = ?definition.family,
        container = %container_name,
        "task definition built"
    );
    Ok(definition)
}

/// Replace characters outside `[A-Za-z0-9_-]` with `-` and cap the length.
pub fn sanitize_family(family: &str) -> String {
    let sanitized: String = family
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .take(FAMILY_MAX_LEN)
        .collect();
    if sanitized.is_empty() {
        DEFAULT_FAMILY.to_string()
    } else {
        sanitized
    }
}

fn parse_units(field: &str, value: &str) -> Result<i64, EngineError> {
    value.trim().parse().map_err(|_| {
        EngineError::configuration(format!(
            "{field} value {value:?} cannot be used as a container-level integer"
        ))
    })
}
