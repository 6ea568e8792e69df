//! Structural comparison of task definition documents.
//!
//! The service fills in defaults and bookkeeping fields on registration, so a document read back
//! never equals the one that was sent. Both sides are passed through the same rules before they
//! are compared. The rules approximate the service's behavior; a false "different" only costs one
//! extra registration.

use serde_json::{Map, Value};
use skiff_model::{ModelError, NetworkMode, TaskDefinition};

/// Fields the service adds on registration that never appear in a submitted document.
pub const POST_REGISTRATION_FIELDS: &[&str] = &[
    "compatibilities",
    "taskDefinitionArn",
    "revision",
    "status",
    "requiresAttributes",
    "registeredAt",
    "registeredBy",
    "deregisteredAt",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationRule {
    /// Mark the first container essential when no container says so.
    DefaultEssential,
    /// Missing network mode means the service default.
    DefaultNetworkMode,
    /// Drop null, empty strings, empty lists and empty maps at any depth.
    StripEmpty,
    StripPostRegistration,
}

/// Rules in application order.
pub const NORMALIZATION_RULES: &[NormalizationRule] = &[
    NormalizationRule::DefaultEssential,
    NormalizationRule::DefaultNetworkMode,
    NormalizationRule::StripEmpty,
    NormalizationRule::StripPostRegistration,
];

impl NormalizationRule {
    fn apply(self, doc: &mut Value) {
        match self {
            NormalizationRule::DefaultEssential => default_essential(doc),
            NormalizationRule::DefaultNetworkMode => {
                if let Some(obj) = doc.as_object_mut() {
                    let mode = obj
                        .entry("networkMode")
                        .or_insert(Value::Null);
                    if mode.is_null() {
                        *mode = Value::String(NetworkMode::SERVICE_DEFAULT.as_str().to_string());
                    }
                }
            }
            NormalizationRule::StripEmpty => strip_empty(doc),
            NormalizationRule::StripPostRegistration => {
                if let Some(obj) = doc.as_object_mut() {
                    strip_post_registration(obj);
                }
            }
        }
    }
}

/// Apply [`NORMALIZATION_RULES`] to a copy of `doc`.
pub fn normalize(doc: &Value) -> Value {
    let mut doc = doc.clone();
    for rule in NORMALIZATION_RULES {
        rule.apply(&mut doc);
    }
    doc
}

/// Compare two documents after normalization.
pub fn definitions_equal(a: &Value, b: &Value) -> bool {
    normalize(a) == normalize(b)
}

pub fn task_definitions_equal(a: &TaskDefinition, b: &TaskDefinition) -> Result<bool, ModelError> {
    Ok(definitions_equal(&a.to_value()?, &b.to_value()?))
}

/// Remove the [`POST_REGISTRATION_FIELDS`] from a document's top level.
pub fn strip_post_registration(doc: &mut Map<String, Value>) {
    for field in POST_REGISTRATION_FIELDS {
        doc.remove(*field);
    }
}

fn default_essential(doc: &mut Value) {
    let Some(containers) = doc
        .get_mut("containerDefinitions")
        .and_then(Value::as_array_mut)
    else {
        return;
    };
    let any_essential = containers
        .iter()
        .any(|c| c.get("essential").and_then(Value::as_bool) == Some(true));
    if any_essential {
        return;
    }
    if let Some(first) = containers.first_mut().and_then(Value::as_object_mut) {
        first
            .entry("essential")
            .or_insert(Value::Bool(true));
    }
}

fn strip_empty(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                strip_empty(child);
            }
            map.retain(|_, v| !is_empty(v));
        }
        Value::Array(items) => {
            for child in items.iter_mut() {
                strip_empty(child);
            }
            items.retain(|v| !is_empty(v));
        }
        _ => {}
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registration_bookkeeping_is_ignored() {
        let sent = json!({
            "family": "etl",
            "containerDefinitions": [{"name": "skiff", "image": "alpine", "essential": true}],
            "networkMode": "awsvpc",
        });
        let read_back = json!({
            "family": "etl",
            "taskDefinitionArn": "arn:aws:ecs:us-east-1:1:task-definition/etl:4",
            "revision": 4,
            "status": "ACTIVE",
            "compatibilities": ["EC2", "FARGATE"],
            "registeredAt": "2024-01-01T00:00:00Z",
            "containerDefinitions": [{
                "name": "skiff",
                "image": "alpine",
                "essential": true,
                "environment": [],
                "mountPoints": [],
            }],
            "networkMode": "awsvpc",
            "volumes": [],
        });
        assert!(definitions_equal(&sent, &read_back));
    }

    #[test]
    fn essential_and_network_mode_defaults_match_service() {
        let sent = json!({"containerDefinitions": [{"name": "a"}, {"name": "b"}]});
        let read_back = json!({
            "containerDefinitions": [{"name": "a", "essential": true}, {"name": "b"}],
            "networkMode": "bridge",
        });
        assert!(definitions_equal(&sent, &read_back));
    }

    #[test]
    fn false_and_zero_are_not_stripped() {
        let doc = normalize(&json!({
            "containerDefinitions": [{"name": "a", "essential": true, "cpu": 0, "privileged": false}]
        }));
        assert_eq!(doc["containerDefinitions"][0]["cpu"], json!(0));
        assert_eq!(doc["containerDefinitions"][0]["privileged"], json!(false));
    }

    #[test]
    fn nested_empties_collapse() {
        let doc = normalize(&json!({"networkMode": "host", "x": {"y": {"z": []}}}));
        assert!(doc.get("x").is_none());
    }

    #[test]
    fn image_change_is_detected() {
        let a = json!({"containerDefinitions": [{"name": "skiff", "image": "alpine:3.19"}]});
        let b = json!({"containerDefinitions": [{"name": "skiff", "image": "alpine:3.20"}]});
        assert!(!definitions_equal(&a, &b));
    }
}
