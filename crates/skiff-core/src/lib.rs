//! Task orchestration and lifecycle engine for a remote container-scheduling service.
//!
//! The engine turns a [`skiff_model::JobConfiguration`] into a registered task definition,
//! launches a run, watches it until it stops (optionally tailing its logs), and reports the
//! orchestration container's exit status.

pub mod error;
pub use error::{EngineError, NetworkHint};

pub mod config;
pub use config::EngineConfig;

pub mod service;
pub use service::{ContainerService, ServiceError};

pub mod subscriber;
pub use subscriber::{StatusEvent, Subscribe};

pub mod normalize;
pub use normalize::{normalize, orchestration_container_name};

pub mod definition;
pub mod network;
pub mod diff;

pub mod cache;
pub use cache::{DefinitionCache, resolve_definition_arn};

pub mod request;
pub mod watch;
pub use watch::TaskWatcher;

pub mod logs;
pub use logs::LogTail;

pub mod report;

pub mod engine;
pub use engine::{Engine, PreparedRun, RunHandle};
