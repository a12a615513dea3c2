//! Logging configuration

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default)]
    pub level: LogLevel,

    /// Log encoding
    #[serde(default)]
    pub encoding: LogEncoding,

    /// Output paths; `stderr`/`stdout` select the console streams
    #[serde(default = "default_output_paths")]
    pub output_paths: Vec<String>,

    /// Fields attached to every log record
    #[serde(default)]
    pub initial_fields: HashMap<String, serde_json::Value>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            encoding: LogEncoding::Text,
            output_paths: default_output_paths(),
            initial_fields: HashMap::new(),
        }
    }
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The `tracing` filter directive for this level
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Log encoding enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEncoding {
    Json,
    #[default]
    Text,
}

impl FromStr for LogEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogEncoding::Json),
            "text" | "console" => Ok(LogEncoding::Text),
            _ => Err(format!("Invalid log encoding: {}", s)),
        }
    }
}

impl Validatable for LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.output_paths.is_empty() {
            return Err(self.validation_error("at least one output path must be configured"));
        }

        for path in &self.output_paths {
            if path.is_empty() {
                return Err(self.validation_error("output paths cannot be empty"));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runtime.loggingConfig"
    }
}

// Default value functions
fn default_output_paths() -> Vec<String> {
    vec!["stderr".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("WARNING").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("loud").is_err());
    }

    #[test]
    fn test_log_encoding_from_str() {
        assert_eq!(LogEncoding::from_str("json").unwrap(), LogEncoding::Json);
        assert_eq!(LogEncoding::from_str("console").unwrap(), LogEncoding::Text);
        assert!(LogEncoding::from_str("xml").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.encoding, LogEncoding::Text);
        assert_eq!(config.output_paths, vec!["stderr".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_output_paths_rejected() {
        let config = LoggingConfig {
            output_paths: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
