//! Invocation pipeline for GenMCP
//!
//! This crate turns catalogue entries into executable invokers. Each entry
//! is backed by either an outbound HTTP call or a local shell command, with
//! extends composition resolved eagerly at load time through the kind
//! registry. Invokers expose the four MCP call shapes (tool, prompt,
//! resource, resource template) and shape structurally correct MCP
//! results; request-time failures are isolated per invocation and surface
//! as generic error categories while details stay in the server log.

pub mod cli;
pub mod context;
pub mod error;
pub mod extends;
pub mod http;
pub mod invoker;
pub mod registry;

pub use cli::{CliInvocationConfig, CliInvoker, TemplateVariableConfig};
pub use context::InvocationContext;
pub use error::{InvokeError, InvokeResult};
pub use extends::resolve_extends;
pub use http::{HttpInvocationConfig, HttpInvoker};
pub use invoker::{Invoker, PrimitiveKind, PrimitiveSpec};
pub use registry::{InvocationRegistry, ParsedConfig};
