//! Server assembly and transports for GenMCP
//!
//! This crate wires the catalogue and server-config documents into a
//! running MCP server: one invoker per entry registered against the method
//! dispatcher, the shared outbound HTTP client injected per request,
//! JWT/JWKS authentication and health endpoints mounted in front of the
//! streamable-HTTP transport, and an alternative stdio transport where
//! auth and health are disabled and stderr is reserved for logging.

pub mod assemble;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod logging;
pub mod security;
pub mod transport;

pub use assemble::ServerAssembler;
pub use dispatch::{McpServer, RequestMeta};
pub use error::{ServerError, ServerResult};
pub use security::JwksAuth;
