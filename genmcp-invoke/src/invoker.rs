//! The invoker trait and the primitive view invokers are built from

use crate::context::InvocationContext;
use crate::error::InvokeResult;
use async_trait::async_trait;
use genmcp_protocol::{CallToolResult, GetPromptResult, ReadResourceResult};
use serde_json::Value;
use std::collections::HashMap;

/// Which catalogue kind a primitive belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Tool,
    Prompt,
    Resource,
    ResourceTemplate,
}

impl PrimitiveKind {
    /// Lowercase name used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Tool => "tool",
            PrimitiveKind::Prompt => "prompt",
            PrimitiveKind::Resource => "resource",
            PrimitiveKind::ResourceTemplate => "resourceTemplate",
        }
    }
}

/// The slice of a catalogue entry an invoker needs at construction time
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveSpec<'a> {
    /// Entry kind
    pub kind: PrimitiveKind,

    /// Entry name
    pub name: &'a str,

    /// Raw input schema, absent only for static resources
    pub input_schema: Option<&'a Value>,

    /// RFC 6570 URI template, present only for resource templates
    pub uri_template: Option<&'a str>,
}

/// An executable invocation behind one catalogue entry
///
/// Invokers are constructed once at load time and called concurrently;
/// they hold only immutable parsed state. Each of the four call shapes
/// shares the same bind → render → execute → shape skeleton.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Execute a tools/call request
    async fn call_tool(
        &self,
        arguments: Option<&Value>,
        ctx: &InvocationContext,
    ) -> InvokeResult<CallToolResult>;

    /// Execute a prompts/get request
    async fn get_prompt(
        &self,
        arguments: &HashMap<String, String>,
        ctx: &InvocationContext,
    ) -> InvokeResult<GetPromptResult>;

    /// Execute a resources/read request against a static resource
    async fn read_resource(
        &self,
        uri: &str,
        ctx: &InvocationContext,
    ) -> InvokeResult<ReadResourceResult>;

    /// Execute a resources/read request against a resource template
    async fn read_resource_template(
        &self,
        uri: &str,
        ctx: &InvocationContext,
    ) -> InvokeResult<ReadResourceResult>;
}
