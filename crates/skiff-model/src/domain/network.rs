use serde::{Deserialize, Serialize};

/// Value of `assignPublicIp` used for discovered networks.
pub const ASSIGN_PUBLIC_IP_ENABLED: &str = "ENABLED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    pub id: String,
    pub network_id: String,
}

/// Network section of a task run request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfiguration {
    pub awsvpc_configuration: AwsVpcConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsVpcConfiguration {
    pub subnets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign_public_ip: Option<String>,
}

impl NetworkConfiguration {
    /// Configuration for the given subnets with a public address assigned.
    pub fn public(subnets: Vec<String>) -> Self {
        Self {
            awsvpc_configuration: AwsVpcConfiguration {
                subnets,
                security_groups: Vec::new(),
                assign_public_ip: Some(ASSIGN_PUBLIC_IP_ENABLED.to_string()),
            },
        }
    }
}
