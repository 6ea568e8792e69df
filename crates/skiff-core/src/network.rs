//! Subnet discovery for attached-network runs.

use skiff_model::NetworkConfiguration;
use tracing::debug;

use crate::{ContainerService, EngineError, NetworkHint};

/// Resolve subnets for `vpc_id`, or for the account's default network when it is `None`.
pub async fn resolve(
    vpc_id: Option<&str>,
    service: &dyn ContainerService,
) -> Result<NetworkConfiguration, EngineError> {
    let Some(network) = service.describe_network(vpc_id).await? else {
        return Err(match vpc_id {
            None => EngineError::NetworkConfiguration {
                message: "Failed to find the default VPC.".into(),
                hint: NetworkHint::PassExplicitId,
            },
            Some(id) => EngineError::NetworkConfiguration {
                message: format!("Failed to find VPC with ID {id}."),
                hint: NetworkHint::CheckNetworkExists,
            },
        });
    };

    let subnets = service.list_subnets(&network.id).await?;
    if subnets.is_empty() {
        return Err(EngineError::NetworkConfiguration {
            message: format!("Failed to find subnets for VPC with ID {}.", network.id),
            hint: NetworkHint::AddSubnets,
        });
    }

    debug!(
        target: "skiff.engine",
        vpc = %network.id,
        subnets = subnets.len(),
        "network configuration resolved"
    );
    Ok(NetworkConfiguration::public(
        subnets.into_iter().map(|s| s.id).collect(),
    ))
}
