//! Tool-definition documents for GenMCP
//!
//! A tool-definitions document is the catalogue of everything one MCP
//! server exposes: tools, prompts, resources and resource templates, plus
//! the invocation bases that entries can extend. This crate owns the
//! document model, load-time validation, and the JSON-Schema machinery
//! (reference resolution, dot-path lookup, format specifiers) that the
//! template engine and the invokers build on.

pub mod catalog;
pub mod error;
pub mod schema;

pub use catalog::{
    ExtendsSpec, InvocationSpec, PromptDef, ResourceDef, ResourceTemplateDef, ToolAnnotationsDef,
    ToolDef, ToolDefinitions, MCP_FILE_VERSION, TOOL_DEFINITIONS_KIND,
};
pub use error::{DefsError, DefsResult};
pub use schema::{FormatSpec, ResolvedSchema};
