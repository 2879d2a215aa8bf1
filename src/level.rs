// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::Deserialize;
use std::fmt::Display;
use std::str::FromStr;

/// Severity of a log record.
///
/// The numeric values follow the conventional 10/20/30/40/50 ladder so that
/// configuration files written for other leveled loggers read the same way.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Level {
    /// Detailed diagnostics, usually only enabled for the `debug` sink.
    /// The default, being the most permissive level.
    #[default]
    Debug = 10,
    /// Routine operational messages
    Info = 20,
    /// RPC-shaped payloads, see [crate::LogSink::grpc]
    Grpc = 25,
    /// Suspicious condition, the default level for timing reports
    Warning = 30,
    /// Runtime error, the default level for exception reports
    Error = 40,
    /// The process is unlikely to continue
    Critical = 50,
}

impl Level {
    /// The upper-case name used in configuration and formatted output.
    pub const fn name(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Grpc => "GRPC",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of [Level::as_u8]; values between levels round down to the next level.
    pub const fn from_u8(value: u8) -> Level {
        match value {
            0..=19 => Level::Debug,
            20..=24 => Level::Info,
            25..=29 => Level::Grpc,
            30..=39 => Level::Warning,
            40..=49 => Level::Error,
            _ => Level::Critical,
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "GRPC" => Ok(Level::Grpc),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" | "FATAL" => Ok(Level::Critical),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Level {
    type Error = ParseLevelError;

    fn try_from(value: String) -> Result<Self, ParseLevelError> {
        value.parse()
    }
}
