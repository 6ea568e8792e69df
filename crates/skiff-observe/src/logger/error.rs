use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?}; skiff writes text, json or journald")]
    InvalidFormat(String),
    #[error("journald output needs Linux and skiff-observe built with the `journald` feature")]
    JournaldNotSupported,
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
    #[error("cannot install the skiff logger: {0}")]
    InitializationFailed(String),
    #[error("invalid filter directive {directive:?}: {reason}")]
    InvalidLogLevel { directive: String, reason: String },
}
