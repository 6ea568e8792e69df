use std::io::IsTerminal;

use crate::logger::{error::LoggerError, format::LoggerFormat, log::DEFAULT_DIRECTIVE};

/// Variable holding the `EnvFilter` directive list.
pub const LEVEL_ENV: &str = "SKIFF_LOG";
/// Variable holding the output format name.
pub const FORMAT_ENV: &str = "SKIFF_LOG_FORMAT";

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive, e.g. `info` or `skiff.watch=debug,info`.
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: DEFAULT_DIRECTIVE.to_string(),
            with_targets: true,
            use_color: std::io::stdout().is_terminal(),
        }
    }
}

impl LoggerConfig {
    /// Show relayed task output only, without skiff's own diagnostics.
    pub fn task_output_only() -> Self {
        Self {
            level: "off,skiff.task.output=info".to_string(),
            with_targets: false,
            ..Self::default()
        }
    }

    /// Defaults overridden by `SKIFF_LOG` and `SKIFF_LOG_FORMAT` when set.
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LoggerError> {
        let mut cfg = Self::default();
        if let Some(level) = lookup(LEVEL_ENV) {
            cfg.level = level;
        }
        if let Some(format) = lookup(FORMAT_ENV) {
            cfg.format = format.parse()?;
        }
        if cfg.format == LoggerFormat::Json {
            cfg.use_color = false;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_environment_keeps_defaults() {
        let cfg = LoggerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.level, DEFAULT_DIRECTIVE);
        assert_eq!(cfg.format, LoggerFormat::Text);
    }

    #[test]
    fn environment_overrides_level_and_format() {
        let cfg = LoggerConfig::from_lookup(|name| match name {
            LEVEL_ENV => Some("skiff.watch=debug".into()),
            FORMAT_ENV => Some("json".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.level, "skiff.watch=debug");
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert!(!cfg.use_color);
    }

    #[test]
    fn bad_format_in_environment_is_an_error() {
        let err = LoggerConfig::from_lookup(|name| (name == FORMAT_ENV).then(|| "xml".into()));
        assert!(matches!(err, Err(LoggerError::InvalidFormat(_))));
    }
}
