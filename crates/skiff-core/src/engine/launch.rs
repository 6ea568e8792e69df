use skiff_model::{JobConfiguration, LaunchMode, TaskRunRequest};

use crate::{EngineError, ServiceError};

/// Map a failed launch onto the error a caller can act on.
///
/// Anything not recognised passes through unchanged as [`EngineError::Service`].
pub(crate) fn classify(
    error: ServiceError,
    config: &JobConfiguration,
    request: &TaskRunRequest,
) -> EngineError {
    let cluster = request
        .cluster
        .clone()
        .unwrap_or_else(|| config.cluster_or_default().to_string());

    if error.mentions("ClusterNotFoundException") {
        EngineError::ClusterNotFound {
            cluster,
            source: error,
        }
    } else if config.launch_mode == LaunchMode::Ec2 && error.mentions("No Container Instances") {
        EngineError::InsufficientCapacity {
            cluster,
            source: error,
        }
    } else if config.logging.configure && error.mentions("AccessDenied") && error.mentions("logs:") {
        EngineError::LoggingPermission { source: error }
    } else {
        EngineError::Service(error)
    }
}
