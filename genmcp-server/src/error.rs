//! Server-level error types

use thiserror::Error;

/// Server result type
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised while assembling or running the server
#[derive(Error, Debug)]
pub enum ServerError {
    /// Server-config document failure
    #[error(transparent)]
    Config(#[from] genmcp_config::ConfigError),

    /// Tool-definitions document failure
    #[error(transparent)]
    Defs(#[from] genmcp_defs::DefsError),

    /// Invoker construction failure
    #[error(transparent)]
    Invoke(#[from] genmcp_invoke::InvokeError),

    /// Outbound client construction failure
    #[error("Failed to build outbound HTTP client: {0}")]
    HttpClient(String),

    /// Authentication setup failure (JWKS fetch, key parse)
    #[error("Authentication setup failed: {0}")]
    AuthSetup(String),

    /// Transport bind or serve failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
