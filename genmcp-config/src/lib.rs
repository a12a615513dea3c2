//! Server configuration for GenMCP
//!
//! The server-config document selects the transport and carries the
//! transport-specific sub-records (TLS, authentication, health endpoints,
//! outbound-client trust and logging policy). Documents are YAML or JSON,
//! loaded once at startup, overridable field-by-field through `GENMCP_*`
//! environment variables, validated, and then immutable.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

pub use domains::{
    client_tls::ClientTlsConfig,
    logging::{LogEncoding, LogLevel, LoggingConfig},
    runtime::{
        AuthConfig, HealthConfig, RuntimeConfig, StdioConfig, StreamableHttpConfig, TlsConfig,
        TransportProtocol,
    },
    ServerConfigDoc,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

/// Expected `kind` value of a server-config document
pub const SERVER_CONFIG_KIND: &str = "MCPServerConfig";
