//! MCP transports
//!
//! Two transports share the same dispatcher: streamable-HTTP on axum with
//! auth and health middleware, and stdio line framing for local process
//! integration where auth and health are disabled.

pub mod stdio;
pub mod streamable_http;

pub use stdio::run_stdio;
pub use streamable_http::{build_router, serve_http, AppState};
