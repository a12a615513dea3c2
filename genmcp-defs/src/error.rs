//! Catalogue error types

use thiserror::Error;

/// Catalogue result type
pub type DefsResult<T> = Result<T, DefsError>;

/// Errors raised while loading or validating a tool-definitions document
#[derive(Error, Debug)]
pub enum DefsError {
    /// IO error reading the document
    #[error("Failed to read tool definitions: {0}")]
    FileReadError(#[from] std::io::Error),

    /// YAML/JSON parsing error
    #[error("Failed to parse tool definitions: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("Failed to process JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unsupported document version
    #[error("invalid mcp file version '{found}', expected '{expected}'")]
    InvalidVersion { expected: String, found: String },

    /// Unexpected document kind
    #[error("Invalid document kind '{found}', expected '{expected}'")]
    InvalidKind { expected: String, found: String },

    /// A single entry-level validation problem
    #[error("Invalid {kind} '{name}': {message}")]
    InvalidEntry {
        kind: &'static str,
        name: String,
        message: String,
    },

    /// Schema resolution or validation problem
    #[error("Schema error: {0}")]
    Schema(String),

    /// Every problem found during document validation, collected
    #[error("{}", format_collected(.0))]
    Collected(Vec<DefsError>),
}

impl DefsError {
    /// Build an entry-level error
    pub fn entry(kind: &'static str, name: impl Into<String>, message: impl Into<String>) -> Self {
        DefsError::InvalidEntry {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Collapse a list of problems into a single error, or `Ok(())`
    pub fn from_collected(errors: Vec<DefsError>) -> DefsResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.into_iter().next().unwrap()),
            _ => Err(DefsError::Collected(errors)),
        }
    }
}

fn format_collected(errors: &[DefsError]) -> String {
    let lines: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!("{} validation errors: {}", errors.len(), lines.join("; "))
}
