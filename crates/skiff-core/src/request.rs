//! Builds the launch request for one run.

use serde_json::{Map, Value};
use skiff_model::{
    Arn, CapacityProviderStrategyItem, ContainerOverride, JobConfiguration, NetworkConfiguration,
    TaskDefinition, TaskOverride, TaskRunRequest, to_key_values, to_name_values,
};
use tracing::debug;

use crate::{EngineError, orchestration_container_name};

/// Returns `true` when a run of `definition` needs subnets discovered for it.
pub fn needs_network(config: &JobConfiguration, definition: &TaskDefinition) -> bool {
    definition.network_mode.is_some_and(|mode| mode.is_attached())
        && !config
            .run_request_overrides
            .contains_key("networkConfiguration")
}

/// Build the request that launches `definition_arn` for `config`.
///
/// Caller overrides are merged last and win. Objects merge recursively, arrays and scalars
/// replace, except `overrides.containerOverrides` which merges entry by container name.
pub fn build(
    config: &JobConfiguration,
    definition: &TaskDefinition,
    definition_arn: &Arn,
    network: Option<NetworkConfiguration>,
) -> Result<TaskRunRequest, EngineError> {
    let container_name = orchestration_container_name(config, definition);

    let mut request = TaskRunRequest {
        task_definition: definition_arn.clone(),
        cluster: config.cluster.clone(),
        network_configuration: network,
        tags: to_key_values(&config.labels),
        ..Default::default()
    };
    if config.launch_mode.uses_capacity_provider() {
        request.capacity_provider_strategy = vec![CapacityProviderStrategyItem::fargate_spot()];
    } else {
        request.launch_type = Some(config.launch_mode);
    }

    let mut overrides = TaskOverride {
        cpu: config.resources.cpu.map(|v| v.to_string()),
        memory: config.resources.memory.map(|v| v.to_string()),
        execution_role_arn: config.execution_role_arn.clone(),
        task_role_arn: config.task_role_arn.clone(),
        ..Default::default()
    };
    overrides.container_overrides.push(ContainerOverride {
        name: Some(container_name.clone()),
        command: config.command.clone(),
        environment: to_name_values(&config.env),
        ..Default::default()
    });
    request.overrides = overrides;

    if !config.run_request_overrides.is_empty() {
        let mut merged = request.to_value()?;
        merge_request(&mut merged, &config.run_request_overrides, &container_name);
        request = TaskRunRequest::from_value(merged)?;
    }

    if &request.task_definition != definition_arn {
        return Err(EngineError::configuration(format!(
            "run request overrides changed taskDefinition to {:?}, expected {definition_arn:?}",
            request.task_definition
        )));
    }

    for entry in &mut request.overrides.container_overrides {
        if entry.name.is_none() {
            entry.name = Some(container_name.clone());
        }
    }

    debug!(
        target: "skiff.engine",
        task_definition = %request.task_definition,
        cluster = ?request.cluster,
        launch_type = ?request.launch_type,
        "run request built"
    );
    Ok(request)
}

fn merge_request(target: &mut Value, overrides: &Map<String, Value>, container_name: &str) {
    let Some(target) = target.as_object_mut() else {
        return;
    };
    for (key, value) in overrides {
        if key == "overrides" {
            let slot = target
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            merge_task_override(slot, value, container_name);
        } else {
            merge_value(target.entry(key.clone()).or_insert(Value::Null), value);
        }
    }
}

fn merge_task_override(target: &mut Value, overrides: &Value, container_name: &str) {
    let Some(overrides) = overrides.as_object() else {
        *target = overrides.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Some(target) = target.as_object_mut() else {
        return;
    };
    for (key, value) in overrides {
        let slot = target.entry(key.clone()).or_insert(Value::Null);
        if key == "containerOverrides" {
            merge_container_overrides(slot, value, container_name);
        } else {
            merge_value(slot, value);
        }
    }
}

/// Entries are matched by `name`; an unnamed entry targets the orchestration container.
fn merge_container_overrides(target: &mut Value, overrides: &Value, container_name: &str) {
    let Some(incoming) = overrides.as_array() else {
        *target = overrides.clone();
        return;
    };
    if !target.is_array() {
        *target = Value::Array(Vec::new());
    }
    let Some(existing) = target.as_array_mut() else {
        return;
    };
    for entry in incoming {
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(container_name);
        match existing
            .iter_mut()
            .find(|e| e.get("name").and_then(Value::as_str) == Some(name))
        {
            Some(current) => merge_value(current, entry),
            None => existing.push(entry.clone()),
        }
    }
}

fn merge_value(target: &mut Value, value: &Value) {
    match (target, value) {
        (Value::Object(target), Value::Object(value)) => {
            for (key, v) in value {
                merge_value(target.entry(key.clone()).or_insert(Value::Null), v);
            }
        }
        (target, value) => *target = value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, definition, normalize};
    use serde_json::json;
    use skiff_model::{LaunchMode, NameValue};

    const ARN: &str = "arn:aws:ecs:us-east-1:000000000000:task-definition/skiff:1";

    fn config(value: Value) -> JobConfiguration {
        normalize(serde_json::from_value(value).unwrap(), &EngineConfig::default()).unwrap()
    }

    fn build_for(config: &JobConfiguration) -> Result<TaskRunRequest, EngineError> {
        let template = config.task_definition.clone().unwrap_or_default();
        let definition = definition::build(&template, config, "us-east-1").unwrap();
        build(config, &definition, &ARN.to_string(), None)
    }

    #[test]
    fn direct_launch_sets_launch_type() {
        let request = build_for(&config(json!({"command": "echo hi"}))).unwrap();
        assert_eq!(request.launch_type, Some(LaunchMode::Fargate));
        assert!(request.capacity_provider_strategy.is_empty());

        let over = request.container_override("skiff").unwrap();
        assert_eq!(over.command, vec!["echo", "hi"]);
    }

    #[test]
    fn orchestration_container_is_always_overridden() {
        let request = build_for(&config(json!({}))).unwrap();
        let value = request.to_value().unwrap();
        assert_eq!(
            value["overrides"]["containerOverrides"],
            json!([{"name": "skiff"}])
        );
    }

    #[test]
    fn spot_omits_launch_type() {
        let request = build_for(&config(json!({"launch_type": "FARGATE_SPOT"}))).unwrap();
        let value = request.to_value().unwrap();

        assert!(value.get("launchType").is_none());
        assert_eq!(
            value["capacityProviderStrategy"],
            json!([{"capacityProvider": "FARGATE_SPOT", "weight": 1}])
        );
    }

    #[test]
    fn env_and_labels_use_list_shapes() {
        let request = build_for(&config(json!({
            "env": {"B": "2", "A": "1"},
            "labels": {"team": "data"}
        })))
        .unwrap();
        let value = request.to_value().unwrap();

        assert_eq!(
            value["overrides"]["containerOverrides"][0]["environment"],
            json!([{"name": "A", "value": "1"}, {"name": "B", "value": "2"}])
        );
        assert_eq!(value["tags"], json!([{"key": "team", "value": "data"}]));
    }

    #[test]
    fn resource_overrides_are_strings() {
        let request = build_for(&config(json!({"cpu": 256, "memory": 512}))).unwrap();
        let value = request.to_value().unwrap();
        assert_eq!(value["overrides"]["cpu"], json!("256"));
        assert_eq!(value["overrides"]["memory"], json!("512"));
    }

    #[test]
    fn caller_overrides_merge_by_container_name() {
        let request = build_for(&config(json!({
            "command": ["run"],
            "env": {"A": "1"},
            "task_run_request": {
                "startedBy": "nightly",
                "overrides": {
                    "containerOverrides": [
                        {"environment": [{"name": "Z", "value": "9"}]},
                        {"name": "sidecar", "command": ["tail"]}
                    ]
                }
            }
        })))
        .unwrap();

        assert_eq!(request.extra["startedBy"], json!("nightly"));
        let main = request.container_override("skiff").unwrap();
        assert_eq!(main.command, vec!["run"]);
        assert_eq!(main.environment, vec![NameValue::new("Z", "9")]);
        assert!(request.container_override("sidecar").is_some());
    }

    #[test]
    fn unnamed_override_defaults_to_orchestration_container() {
        let request = build_for(&config(json!({
            "container_name": "app",
            "task_run_request": {
                "overrides": {"containerOverrides": [{"command": ["x"]}]}
            }
        })))
        .unwrap();
        assert_eq!(request.container_override("app").unwrap().command, vec!["x"]);
    }

    #[test]
    fn caller_network_configuration_wins() {
        let cfg = config(json!({
            "task_run_request": {
                "networkConfiguration": {"awsvpcConfiguration": {"subnets": ["subnet-x"]}}
            }
        }));
        let template = cfg.task_definition.clone().unwrap();
        let definition = definition::build(&template, &cfg, "us-east-1").unwrap();
        assert!(!needs_network(&cfg, &definition));

        let request = build(&cfg, &definition, &ARN.to_string(), None).unwrap();
        let network = request.network_configuration.unwrap();
        assert_eq!(network.awsvpc_configuration.subnets, vec!["subnet-x"]);
    }

    #[test]
    fn changing_task_definition_is_rejected() {
        let err = build_for(&config(json!({
            "task_run_request": {"taskDefinition": "arn:other"}
        })))
        .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
