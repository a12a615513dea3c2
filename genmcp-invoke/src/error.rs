//! Invocation error types
//!
//! Request-time failures split into what the caller may see and what only
//! the server-side log records. `client_message` is the only text that
//! crosses the trust boundary; it never contains upstream bodies, rendered
//! commands or stack traces.

use thiserror::Error;

/// Invocation result type
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Errors raised while building or executing invocations
#[derive(Error, Debug)]
pub enum InvokeError {
    /// Kind-specific config rejected at load time; every problem collected
    #[error("Invalid {kind} invocation config: {}", problems.join("; "))]
    ConfigParse { kind: String, problems: Vec<String> },

    /// The invocation kind is not registered
    #[error("Unknown invocation kind '{kind}'")]
    UnknownKind { kind: String },

    /// A field was targeted by more than one extends operation
    #[error("Extends conflict: field '{field}' is targeted by both {first} and {second}")]
    ExtendsConflict {
        field: String,
        first: &'static str,
        second: &'static str,
    },

    /// Extends composition failed structurally
    #[error("Extends error: {0}")]
    Extends(String),

    /// The request payload could not be parsed
    #[error("Request parse error: {0}")]
    RequestParse(String),

    /// The request payload failed schema validation
    #[error("Request validation error: {0}")]
    RequestValidate(String),

    /// A resource-template URI did not match the request URI
    #[error(transparent)]
    TemplateMismatch(#[from] genmcp_template::TemplateError),

    /// The upstream answered outside the 2xx range
    #[error("Upstream returned HTTP {status}")]
    UpstreamHttp { status: u16 },

    /// DNS, TCP, TLS or body-read failure talking upstream
    #[error("Upstream transport error: {0}")]
    UpstreamTransport(String),

    /// The shell interpreter could not be spawned
    #[error("Failed to spawn subprocess: {0}")]
    SubprocessSpawn(String),

    /// The subprocess exited non-zero
    #[error("Subprocess exited with status {status}")]
    SubprocessNonZero { status: i32 },

    /// The inbound request was cancelled mid-flight
    #[error("Invocation cancelled")]
    Cancelled,

    /// Schema machinery failure
    #[error(transparent)]
    Schema(#[from] genmcp_defs::DefsError),
}

impl InvokeError {
    /// The generic category text safe to surface to callers
    pub fn client_message(&self) -> String {
        match self {
            InvokeError::RequestParse(_) => "parse error".to_string(),
            InvokeError::RequestValidate(_) | InvokeError::Schema(_) => "validation error".to_string(),
            InvokeError::TemplateMismatch(_) => "request URI does not match the resource template".to_string(),
            InvokeError::UpstreamHttp { status } => format!("upstream request failed with status {}", status),
            InvokeError::UpstreamTransport(_) => "upstream request failed".to_string(),
            InvokeError::SubprocessSpawn(_) | InvokeError::SubprocessNonZero { .. } => {
                "command execution failed".to_string()
            }
            InvokeError::Cancelled => "execution cancelled".to_string(),
            InvokeError::ConfigParse { .. }
            | InvokeError::UnknownKind { .. }
            | InvokeError::ExtendsConflict { .. }
            | InvokeError::Extends(_) => "server configuration error".to_string(),
        }
    }

    /// Whether this error came from a non-2xx upstream answer
    pub fn is_upstream_status(&self) -> bool {
        matches!(self, InvokeError::UpstreamHttp { .. })
    }
}
