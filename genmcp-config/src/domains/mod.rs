//! Domain-specific configuration modules

pub mod client_tls;
pub mod logging;
pub mod runtime;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Top-level server-config document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfigDoc {
    /// Document schema version
    pub schema_version: String,

    /// Document kind tag, must be `MCPServerConfig`
    pub kind: String,

    /// Runtime configuration selecting transport and middleware
    #[serde(default)]
    pub runtime: runtime::RuntimeConfig,
}

impl ServerConfigDoc {
    /// Validate the document and every domain it carries
    pub fn validate_all(&self) -> ConfigResult<()> {
        if self.kind != crate::SERVER_CONFIG_KIND {
            return Err(crate::error::ConfigError::InvalidKind {
                expected: crate::SERVER_CONFIG_KIND.to_string(),
                found: self.kind.clone(),
            });
        }

        self.runtime.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_kind_is_checked() {
        let doc: ServerConfigDoc = serde_yaml::from_str(
            "schemaVersion: v1\nkind: SomethingElse\nruntime:\n  transportProtocol: stdio\n",
        )
        .unwrap();
        assert!(doc.validate_all().is_err());
    }

    #[test]
    fn test_minimal_stdio_document() {
        let doc: ServerConfigDoc = serde_yaml::from_str(
            "schemaVersion: v1\nkind: MCPServerConfig\nruntime:\n  transportProtocol: stdio\n",
        )
        .unwrap();
        assert!(doc.validate_all().is_ok());
    }
}
