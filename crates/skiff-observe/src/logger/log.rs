use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, fmt::time::OffsetTime, layer::Layered, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

/// Directive used when the configured level is blank.
pub(crate) const DEFAULT_DIRECTIVE: &str = "warn,skiff=info";

type Filtered = Layered<EnvFilter, Registry>;

pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let base = tracing_subscriber::registry().with(filter(&cfg.level)?);
    match cfg.format {
        LoggerFormat::Text => finish(
            base.with(
                fmt::layer()
                    .with_ansi(cfg.use_color)
                    .with_target(cfg.with_targets)
                    .with_timer(local_rfc3339()),
            ),
        ),
        LoggerFormat::Json => finish(
            base.with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_target(cfg.with_targets)
                    .with_timer(local_rfc3339()),
            ),
        ),
        LoggerFormat::Journald => journald(base),
    }
}

/// Parse `level` as an `EnvFilter` directive list. Targets match by prefix, so `skiff`
/// covers every `skiff.*` target.
pub(crate) fn filter(level: &str) -> Result<EnvFilter, LoggerError> {
    let directive = match level.trim() {
        "" => DEFAULT_DIRECTIVE,
        trimmed => trimmed,
    };
    EnvFilter::try_new(directive).map_err(|e| LoggerError::InvalidLogLevel {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

fn local_rfc3339() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn finish<S>(subscriber: S) -> Result<(), LoggerError>
where
    S: Subscriber + Send + Sync + 'static,
{
    if tracing::dispatcher::has_been_set() {
        return Err(LoggerError::AlreadyInitialized);
    }
    subscriber
        .try_init()
        .map_err(|e| LoggerError::InitializationFailed(e.to_string()))
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald(base: Filtered) -> Result<(), LoggerError> {
    let layer = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald socket: {e}")))?
        .with_syslog_identifier("skiff".to_string());
    finish(base.with(layer))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald(_base: Filtered) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
