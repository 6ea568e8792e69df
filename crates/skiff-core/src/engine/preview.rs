//! Offline rendering of what a run would submit.

use serde_json::Value;
use skiff_model::{JobConfiguration, ModelError};

use crate::{EngineError, definition, request};

const REGISTERED_AT_RUNTIME: &str = "<registered at runtime>";

/// Render the task definition and run request for `config` without calling the service.
///
/// Values only known after network calls are shown as placeholders. A linked definition
/// without a template is not rendered; its ARN is used as-is.
pub(crate) fn render(config: &JobConfiguration, region: &str) -> Result<String, EngineError> {
    let definition = config
        .task_definition
        .as_ref()
        .map(|template| definition::build(template, config, region))
        .transpose()?;

    let arn = match (&definition, &config.task_definition_arn) {
        (None, Some(linked)) => linked.clone(),
        _ => REGISTERED_AT_RUNTIME.to_string(),
    };

    let (request, network_pending) = match &definition {
        Some(definition) => (
            request::build(config, definition, &arn, None)?,
            request::needs_network(config, definition),
        ),
        None => (
            request::build(config, &Default::default(), &arn, None)?,
            false,
        ),
    };

    let mut request = request.to_value()?;
    if network_pending {
        if let Some(obj) = request.as_object_mut() {
            obj.insert(
                "networkConfiguration".into(),
                Value::String(network_placeholder(config.vpc_id.as_deref())),
            );
        }
    }

    let mut out = String::new();
    if let Some(definition) = &definition {
        out.push_str("---\n# Task definition\n");
        out.push_str(&pretty(&definition.to_value()?)?);
        out.push('\n');
    }
    out.push_str("---\n# Task run request\n");
    out.push_str(&pretty(&request)?);
    out.push('\n');
    Ok(out)
}

fn network_placeholder(vpc_id: Option<&str>) -> String {
    match vpc_id {
        Some(id) => format!("<loaded from {id} at runtime>"),
        None => "<loaded from the default VPC at runtime>".to_string(),
    }
}

fn pretty(value: &Value) -> Result<String, ModelError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, normalize};
    use serde_json::json;

    fn config(value: Value) -> JobConfiguration {
        normalize(serde_json::from_value(value).unwrap(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn placeholders_stand_in_for_runtime_values() {
        let out = render(&config(json!({"image": "alpine", "command": "echo hi"})), "us-east-1").unwrap();

        assert!(out.contains("# Task definition"));
        assert!(out.contains("\"taskDefinition\": \"<registered at runtime>\""));
        assert!(out.contains("<loaded from the default VPC at runtime>"));
        assert!(out.contains("\"alpine\""));
    }

    #[test]
    fn explicit_vpc_is_named() {
        let out = render(&config(json!({"vpc_id": "vpc-123"})), "us-east-1").unwrap();
        assert!(out.contains("<loaded from vpc-123 at runtime>"));
    }

    #[test]
    fn linked_definition_renders_request_only() {
        let out = render(
            &config(json!({"task_definition_arn": "arn:aws:ecs:us-east-1:1:task-definition/etl:3"})),
            "us-east-1",
        )
        .unwrap();
        assert!(!out.contains("# Task definition"));
        assert!(out.contains("task-definition/etl:3"));
    }
}
