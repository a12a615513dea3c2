//! Logging initialisation
//!
//! The logging domain of the server config drives level, encoding and
//! output paths. When no logging config is present the fallback is a
//! console sink at info level so startup messages stay visible. Under the
//! stdio transport stdout belongs to the protocol, so console output is
//! forced onto stderr.

use genmcp_config::{LogEncoding, LoggingConfig};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialise the global subscriber from the logging domain
///
/// Returns the appender guards; dropping them stops background writers,
/// so the caller holds them for the process lifetime.
pub fn init_logging(config: Option<&LoggingConfig>, force_stderr: bool) -> Vec<WorkerGuard> {
    let default = LoggingConfig::default();
    let config = config.unwrap_or(&default);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));

    let mut guards = Vec::new();

    // A file path wins over console selection; otherwise stderr/stdout
    let file_path = config
        .output_paths
        .iter()
        .find(|path| path.as_str() != "stderr" && path.as_str() != "stdout");

    let use_stdout = !force_stderr && config.output_paths.iter().any(|p| p == "stdout");

    match file_path {
        Some(path) => {
            let path = std::path::Path::new(path);
            let directory = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("genmcp.log"));
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);

            match config.encoding {
                LogEncoding::Json => tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .init(),
                LogEncoding::Text => tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .with_ansi(false)
                    .init(),
            }
        }
        None if use_stdout => match config.encoding {
            LogEncoding::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init(),
            LogEncoding::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        },
        None => match config.encoding {
            LogEncoding::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init(),
            LogEncoding::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init(),
        },
    }

    if !config.initial_fields.is_empty() {
        let fields = serde_json::to_string(&config.initial_fields).unwrap_or_default();
        info!(initial_fields = %fields, "logging initialised");
    }

    guards
}
