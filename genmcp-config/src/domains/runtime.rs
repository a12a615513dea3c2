//! Runtime configuration: transport selection and transport sub-records

use crate::error::ConfigResult;
use crate::validation::{validate_path, validate_port_range, validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    /// Transport the server speaks
    pub transport_protocol: TransportProtocol,

    /// Streamable-HTTP transport settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streamable_http_config: Option<StreamableHttpConfig>,

    /// Stdio transport settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdio_config: Option<StdioConfig>,

    /// Outbound HTTP client trust settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_tls_config: Option<super::client_tls::ClientTlsConfig>,

    /// Logging policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging_config: Option<super::logging::LoggingConfig>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            transport_protocol: TransportProtocol::StreamableHttp,
            streamable_http_config: None,
            stdio_config: None,
            client_tls_config: None,
            logging_config: None,
        }
    }
}

impl RuntimeConfig {
    /// The effective streamable-HTTP settings, defaulted when absent
    pub fn http(&self) -> StreamableHttpConfig {
        self.streamable_http_config.clone().unwrap_or_default()
    }
}

/// Transport protocol selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportProtocol {
    /// MCP streamable-HTTP transport
    #[serde(rename = "streamablehttp")]
    StreamableHttp,

    /// MCP stdio transport on process stdin/stdout
    #[serde(rename = "stdio")]
    Stdio,
}

impl FromStr for TransportProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "streamablehttp" => Ok(TransportProtocol::StreamableHttp),
            "stdio" => Ok(TransportProtocol::Stdio),
            _ => Err(format!("Invalid transport protocol: {}", s)),
        }
    }
}

/// Streamable-HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamableHttpConfig {
    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base path the MCP endpoint is mounted on
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Whether sessions are stateless
    #[serde(default = "default_true")]
    pub stateless: bool,

    /// Inbound TLS settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,

    /// Token-validation settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// Health endpoint settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthConfig>,
}

impl Default for StreamableHttpConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            base_path: default_base_path(),
            stateless: true,
            tls: None,
            auth: None,
            health: None,
        }
    }
}

/// Stdio transport settings
///
/// Present for schema completeness; the stdio transport currently has no
/// tunables of its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StdioConfig {}

/// Inbound TLS settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// Path to the certificate file
    pub cert_file: String,

    /// Path to the private key file
    pub key_file: String,
}

/// Token-validation settings
///
/// Token issuance is out of scope; requests must carry a JWT that
/// validates against the JWKS document and names one of the configured
/// authorization servers as issuer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Accepted authorization-server URLs
    #[serde(default)]
    pub authorization_servers: Vec<String>,

    /// JWKS document URI used for signature validation
    pub jwks_uri: String,
}

/// Health endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthConfig {
    /// Whether health endpoints are served
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Liveness probe path
    #[serde(default = "default_liveness_path")]
    pub liveness_path: String,

    /// Readiness probe path
    #[serde(default = "default_readiness_path")]
    pub readiness_path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            liveness_path: default_liveness_path(),
            readiness_path: default_readiness_path(),
        }
    }
}

impl Validatable for RuntimeConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(ref http) = self.streamable_http_config {
            http.validate()?;
        }

        if let Some(ref client_tls) = self.client_tls_config {
            client_tls.validate()?;
        }

        if let Some(ref logging) = self.logging_config {
            logging.validate()?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runtime"
    }
}

impl Validatable for StreamableHttpConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_port_range(self.port, "port", self.domain_name())?;
        validate_path(&self.base_path, "basePath", self.domain_name())?;

        if let Some(ref tls) = self.tls {
            tls.validate()?;
        }

        if let Some(ref auth) = self.auth {
            auth.validate()?;
        }

        if let Some(ref health) = self.health {
            health.validate()?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runtime.streamableHttpConfig"
    }
}

impl Validatable for TlsConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.cert_file, "certFile", self.domain_name())?;
        validate_required_string(&self.key_file, "keyFile", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runtime.streamableHttpConfig.tls"
    }
}

impl Validatable for AuthConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.authorization_servers.is_empty() {
            return Err(self.validation_error("at least one authorization server is required"));
        }

        for server in &self.authorization_servers {
            validate_url(server, "authorizationServers", self.domain_name())?;
        }

        validate_url(&self.jwks_uri, "jwksUri", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runtime.streamableHttpConfig.auth"
    }
}

impl Validatable for HealthConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_path(&self.liveness_path, "livenessPath", self.domain_name())?;
        validate_path(&self.readiness_path, "readinessPath", self.domain_name())?;

        if self.liveness_path == self.readiness_path {
            return Err(self.validation_error("livenessPath and readinessPath must differ"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runtime.streamableHttpConfig.health"
    }
}

// Default value functions
fn default_port() -> u16 {
    8080
}

fn default_base_path() -> String {
    "/mcp".to_string()
}

fn default_liveness_path() -> String {
    "/healthz".to_string()
}

fn default_readiness_path() -> String {
    "/readyz".to_string()
}

fn default_true() -> bool {
    true
}
