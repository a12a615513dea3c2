//! MCP protocol types for GenMCP
//!
//! This crate holds the wire-level vocabulary shared by every other GenMCP
//! crate: JSON-RPC 2.0 envelopes, the MCP method set, and the typed
//! parameter/result structures for tools, prompts, resources and resource
//! templates. It has no I/O of its own; transports and invokers consume
//! these types and nothing else crosses that seam.

pub mod jsonrpc;
pub mod messages;

pub use jsonrpc::{JsonRpcError, JsonRpcErrorCode, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
pub use messages::{
    CallToolParams, CallToolResult, ContentItem, GetPromptParams, GetPromptResult,
    InitializeParams, InitializeResult, ListPromptsResult, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, Prompt, PromptArgument, PromptMessage,
    ReadResourceParams, ReadResourceResult, Resource, ResourceContents, ResourceTemplate, Role,
    ServerCapabilities, ServerInfo, Tool, ToolAnnotations, MCP_PROTOCOL_VERSION,
    SUPPORTED_PROTOCOL_VERSIONS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        let _version = MCP_PROTOCOL_VERSION;
        let _supported = SUPPORTED_PROTOCOL_VERSIONS;
        let _error = JsonRpcError::method_not_found("tools/call");
    }
}
