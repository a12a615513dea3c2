//! Outbound HTTP client construction
//!
//! One `reqwest::Client` is built at startup from the client-TLS domain and
//! shared by every invocation for the process lifetime. Custom trust comes
//! from PEM bundle files and/or a directory of certificates; skip-verify
//! disables upstream verification entirely and is logged loudly.

use crate::error::{ServerError, ServerResult};
use genmcp_config::ClientTlsConfig;
use tracing::{debug, warn};

/// Build the shared outbound client from the client-TLS settings
pub fn build_http_client(config: Option<&ClientTlsConfig>) -> ServerResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().use_rustls_tls();

    let Some(config) = config else {
        return builder
            .build()
            .map_err(|e| ServerError::HttpClient(e.to_string()));
    };

    if config.insecure_skip_verify {
        warn!("outbound TLS verification is DISABLED (insecureSkipVerify)");
        builder = builder.danger_accept_invalid_certs(true);
    }

    for path in &config.ca_bundle_files {
        builder = add_pem_file(builder, path)?;
    }

    if let Some(directory) = &config.ca_directory {
        let entries = std::fs::read_dir(directory)
            .map_err(|e| ServerError::HttpClient(format!("cannot read caDirectory '{}': {}", directory, e)))?;
        for entry in entries {
            let path = entry
                .map_err(|e| ServerError::HttpClient(e.to_string()))?
                .path();
            let is_cert = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| matches!(ext, "pem" | "crt"));
            if is_cert {
                builder = add_pem_file(builder, &path.to_string_lossy())?;
            }
        }
    }

    builder
        .build()
        .map_err(|e| ServerError::HttpClient(e.to_string()))
}

fn add_pem_file(builder: reqwest::ClientBuilder, path: &str) -> ServerResult<reqwest::ClientBuilder> {
    let pem = std::fs::read(path)
        .map_err(|e| ServerError::HttpClient(format!("cannot read CA bundle '{}': {}", path, e)))?;

    let certificates = reqwest::Certificate::from_pem_bundle(&pem)
        .map_err(|e| ServerError::HttpClient(format!("invalid CA bundle '{}': {}", path, e)))?;

    debug!(path, count = certificates.len(), "added CA certificates to outbound trust store");

    let mut builder = builder;
    for certificate in certificates {
        builder = builder.add_root_certificate(certificate);
    }
    Ok(builder)
}
