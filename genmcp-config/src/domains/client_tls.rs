//! Outbound HTTP client trust configuration

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Trust settings for the shared outbound HTTP client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientTlsConfig {
    /// PEM bundle files added to the trust store
    #[serde(default)]
    pub ca_bundle_files: Vec<String>,

    /// Directory whose *.pem / *.crt files are added to the trust store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_directory: Option<String>,

    /// Skip upstream certificate verification entirely
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl ClientTlsConfig {
    /// Whether any custom trust material is configured
    pub fn has_custom_trust(&self) -> bool {
        !self.ca_bundle_files.is_empty() || self.ca_directory.is_some()
    }
}

impl Validatable for ClientTlsConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.insecure_skip_verify && self.has_custom_trust() {
            return Err(self.validation_error(
                "insecureSkipVerify makes caBundleFiles/caDirectory meaningless; configure one or the other",
            ));
        }

        for file in &self.ca_bundle_files {
            if file.is_empty() {
                return Err(self.validation_error("caBundleFiles entries cannot be empty"));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runtime.clientTlsConfig"
    }
}
