//! Liveness and readiness endpoints
//!
//! Health paths are mounted before authentication so probes work without
//! credentials. Liveness answers as soon as the process serves HTTP;
//! readiness flips once the catalogue is registered and the transport is
//! accepting work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared health state
#[derive(Debug, Clone, Default)]
pub struct HealthState {
    ready: Arc<AtomicBool>,
}

impl HealthState {
    /// New state, not yet ready
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the server ready to take traffic
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Mark the server as draining
    pub fn mark_not_ready(&self) {
        self.ready.store(false, Ordering::Release);
    }

    /// Whether the server is ready
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Liveness handler body
pub fn liveness_body() -> serde_json::Value {
    serde_json::json!({"status": "ok"})
}

/// Readiness handler body plus HTTP status
pub fn readiness_body(state: &HealthState) -> (http::StatusCode, serde_json::Value) {
    if state.is_ready() {
        (http::StatusCode::OK, serde_json::json!({"status": "ready"}))
    } else {
        (
            http::StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({"status": "starting"}),
        )
    }
}
