use std::{fmt, str::FromStr};

use crate::logger::error::LoggerError;

/// Where and how skiff writes its diagnostics and relayed task output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoggerFormat {
    /// Human-readable lines on stdout.
    #[default]
    Text,
    /// One JSON object per event, for log shippers.
    Json,
    /// Native systemd journal entries.
    Journald,
}

impl LoggerFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoggerFormat::Text => "text",
            LoggerFormat::Json => "json",
            LoggerFormat::Journald => "journald",
        }
    }

    fn journald() -> Result<Self, LoggerError> {
        if cfg!(all(target_os = "linux", feature = "journald")) {
            Ok(LoggerFormat::Journald)
        } else {
            Err(LoggerError::JournaldNotSupported)
        }
    }
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("text") || name.eq_ignore_ascii_case("plain") {
            Ok(LoggerFormat::Text)
        } else if name.eq_ignore_ascii_case("json") || name.eq_ignore_ascii_case("ndjson") {
            Ok(LoggerFormat::Json)
        } else if name.eq_ignore_ascii_case("journald") || name.eq_ignore_ascii_case("journal") {
            Self::journald()
        } else {
            Err(LoggerError::InvalidFormat(s.to_string()))
        }
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
