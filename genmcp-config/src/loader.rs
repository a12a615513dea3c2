//! Configuration loading and environment variable handling
//!
//! Every field under `runtime` can be overridden through a
//! `GENMCP_<FIELDPATH>` environment variable, where the field path is
//! underscore-joined and uppercased (`GENMCP_STREAMABLEHTTPCONFIG_PORT`).
//! Optional sub-records are allocated only when one of their variables is
//! actually present, so a config that never mentions `auth` stays without
//! an auth block unless an `..._AUTH_*` variable exists.

use crate::domains::client_tls::ClientTlsConfig;
use crate::domains::logging::{LogEncoding, LogLevel, LoggingConfig};
use crate::domains::runtime::{AuthConfig, HealthConfig, StreamableHttpConfig, TlsConfig, TransportProtocol};
use crate::domains::ServerConfigDoc;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with the default `GENMCP` prefix
    pub fn new() -> Self {
        Self {
            prefix: "GENMCP".to_string(),
        }
    }

    /// Create a new config loader with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load a server-config document from a YAML or JSON file with
    /// environment overrides applied
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<ServerConfigDoc> {
        let content = std::fs::read_to_string(path)?;
        let mut config: ServerConfigDoc = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Build a config from defaults and environment overrides only
    pub fn from_env(&self) -> ConfigResult<ServerConfigDoc> {
        let mut config = ServerConfigDoc {
            schema_version: "v1".to_string(),
            kind: crate::SERVER_CONFIG_KIND.to_string(),
            runtime: crate::domains::runtime::RuntimeConfig::default(),
        };
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load from a file when given, else from defaults and environment
    pub fn load(&self, path: Option<impl AsRef<Path>>) -> ConfigResult<ServerConfigDoc> {
        match path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to a parsed document
    pub fn apply_env_overrides(&self, config: &mut ServerConfigDoc) -> ConfigResult<()> {
        if let Some(protocol) = self.get_env_var("TRANSPORTPROTOCOL") {
            config.runtime.transport_protocol = TransportProtocol::from_str(&protocol)
                .map_err(ConfigError::EnvError)?;
        }

        self.apply_http_overrides(&mut config.runtime.streamable_http_config)?;
        self.apply_client_tls_overrides(&mut config.runtime.client_tls_config)?;
        self.apply_logging_overrides(&mut config.runtime.logging_config)?;

        Ok(())
    }

    /// Apply streamable-HTTP overrides
    fn apply_http_overrides(&self, config: &mut Option<StreamableHttpConfig>) -> ConfigResult<()> {
        if !self.has_any_var("STREAMABLEHTTPCONFIG") {
            return Ok(());
        }

        let http = config.get_or_insert_with(StreamableHttpConfig::default);

        if let Some(port) = self.get_env_var("STREAMABLEHTTPCONFIG_PORT") {
            http.port = self.parse_scalar(&port, "STREAMABLEHTTPCONFIG_PORT")?;
        }

        if let Some(base_path) = self.get_env_var("STREAMABLEHTTPCONFIG_BASEPATH") {
            http.base_path = base_path;
        }

        if let Some(stateless) = self.get_env_var("STREAMABLEHTTPCONFIG_STATELESS") {
            http.stateless = self.parse_scalar(&stateless, "STREAMABLEHTTPCONFIG_STATELESS")?;
        }

        if self.has_any_var("STREAMABLEHTTPCONFIG_TLS") {
            let tls = http.tls.get_or_insert_with(TlsConfig::default);
            if let Some(cert) = self.get_env_var("STREAMABLEHTTPCONFIG_TLS_CERTFILE") {
                tls.cert_file = cert;
            }
            if let Some(key) = self.get_env_var("STREAMABLEHTTPCONFIG_TLS_KEYFILE") {
                tls.key_file = key;
            }
        }

        if self.has_any_var("STREAMABLEHTTPCONFIG_AUTH") {
            let auth = http.auth.get_or_insert_with(AuthConfig::default);
            if let Some(servers) = self.get_env_var("STREAMABLEHTTPCONFIG_AUTH_AUTHORIZATIONSERVERS") {
                auth.authorization_servers = split_list(&servers);
            }
            if let Some(jwks) = self.get_env_var("STREAMABLEHTTPCONFIG_AUTH_JWKSURI") {
                auth.jwks_uri = jwks;
            }
        }

        if self.has_any_var("STREAMABLEHTTPCONFIG_HEALTH") {
            let health = http.health.get_or_insert_with(HealthConfig::default);
            if let Some(enabled) = self.get_env_var("STREAMABLEHTTPCONFIG_HEALTH_ENABLED") {
                health.enabled = self.parse_scalar(&enabled, "STREAMABLEHTTPCONFIG_HEALTH_ENABLED")?;
            }
            if let Some(path) = self.get_env_var("STREAMABLEHTTPCONFIG_HEALTH_LIVENESSPATH") {
                health.liveness_path = path;
            }
            if let Some(path) = self.get_env_var("STREAMABLEHTTPCONFIG_HEALTH_READINESSPATH") {
                health.readiness_path = path;
            }
        }

        Ok(())
    }

    /// Apply outbound client trust overrides
    fn apply_client_tls_overrides(&self, config: &mut Option<ClientTlsConfig>) -> ConfigResult<()> {
        if !self.has_any_var("CLIENTTLSCONFIG") {
            return Ok(());
        }

        let client_tls = config.get_or_insert_with(ClientTlsConfig::default);

        if let Some(files) = self.get_env_var("CLIENTTLSCONFIG_CABUNDLEFILES") {
            client_tls.ca_bundle_files = split_list(&files);
        }

        if let Some(dir) = self.get_env_var("CLIENTTLSCONFIG_CADIRECTORY") {
            client_tls.ca_directory = Some(dir);
        }

        if let Some(skip) = self.get_env_var("CLIENTTLSCONFIG_INSECURESKIPVERIFY") {
            client_tls.insecure_skip_verify =
                self.parse_scalar(&skip, "CLIENTTLSCONFIG_INSECURESKIPVERIFY")?;
        }

        Ok(())
    }

    /// Apply logging overrides
    fn apply_logging_overrides(&self, config: &mut Option<LoggingConfig>) -> ConfigResult<()> {
        if !self.has_any_var("LOGGINGCONFIG") {
            return Ok(());
        }

        let logging = config.get_or_insert_with(LoggingConfig::default);

        if let Some(level) = self.get_env_var("LOGGINGCONFIG_LEVEL") {
            logging.level = LogLevel::from_str(&level).map_err(ConfigError::EnvError)?;
        }

        if let Some(encoding) = self.get_env_var("LOGGINGCONFIG_ENCODING") {
            logging.encoding = LogEncoding::from_str(&encoding).map_err(ConfigError::EnvError)?;
        }

        if let Some(paths) = self.get_env_var("LOGGINGCONFIG_OUTPUTPATHS") {
            logging.output_paths = split_list(&paths);
        }

        if let Some(fields) = self.get_env_var("LOGGINGCONFIG_INITIALFIELDS") {
            logging.initial_fields = serde_json::from_str(&fields).map_err(|e| {
                ConfigError::EnvError(format!("Invalid LOGGINGCONFIG_INITIALFIELDS: {}", e))
            })?;
        }

        Ok(())
    }

    /// Parse a scalar override, reporting the variable name on failure
    fn parse_scalar<T>(&self, value: &str, name: &str) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {}_{}: {}", self.prefix, name, e)))
    }

    /// Get an environment variable with the configured prefix
    fn get_env_var(&self, name: &str) -> Option<String> {
        std::env::var(format!("{}_{}", self.prefix, name)).ok()
    }

    /// Whether any variable beginning with the prefixed group name is set
    fn has_any_var(&self, group: &str) -> bool {
        let group_prefix = format!("{}_{}_", self.prefix, group);
        std::env::vars().any(|(name, _)| name.starts_with(&group_prefix))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a comma-separated override value into a trimmed list
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
