use std::fmt;

use serde::{Deserialize, Serialize};

/// Docker networking mode of a task definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// Each task gets its own elastic network interface ("attached" networking).
    Awsvpc,
    Bridge,
    Host,
    None,
}

impl NetworkMode {
    /// Mode the service assumes when a definition does not set one.
    pub const SERVICE_DEFAULT: NetworkMode = NetworkMode::Bridge;

    /// Returns `true` when runs need an explicit subnet configuration.
    pub fn is_attached(&self) -> bool {
        matches!(self, NetworkMode::Awsvpc)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::Awsvpc => "awsvpc",
            NetworkMode::Bridge => "bridge",
            NetworkMode::Host => "host",
            NetworkMode::None => "none",
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
