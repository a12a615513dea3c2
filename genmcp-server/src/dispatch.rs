//! MCP method dispatch
//!
//! One dispatcher instance serves both transports. Catalogue entries are
//! registered once at assembly and never mutated; per-request state flows
//! in through [`RequestMeta`]. Failure policy follows the invocation error
//! taxonomy: tool and prompt failures become error envelopes in the result
//! payload, resource failures against an upstream non-2xx surface as
//! resource-not-found protocol errors, and everything the caller sees is a
//! generic category while details go to the server-side log.

use genmcp_invoke::{InvocationContext, InvokeError, Invoker};
use genmcp_protocol::{
    CallToolParams, CallToolResult, GetPromptParams, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListPromptsResult, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, Prompt, ReadResourceParams, Resource, ResourceTemplate,
    ServerCapabilities, ServerInfo, Tool, MCP_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A registered tool entry
pub struct RegisteredTool {
    /// Metadata served by tools/list
    pub tool: Tool,

    /// OAuth scopes the caller's token must grant
    pub required_scopes: Vec<String>,

    /// The invoker backing tools/call
    pub invoker: Arc<dyn Invoker>,
}

/// A registered prompt entry
pub struct RegisteredPrompt {
    /// Metadata served by prompts/list
    pub prompt: Prompt,

    /// The invoker backing prompts/get
    pub invoker: Arc<dyn Invoker>,
}

/// A registered static resource entry
pub struct RegisteredResource {
    /// Metadata served by resources/list
    pub resource: Resource,

    /// The invoker backing resources/read
    pub invoker: Arc<dyn Invoker>,
}

/// A registered resource-template entry
pub struct RegisteredResourceTemplate {
    /// Metadata served by resources/templates/list
    pub template: ResourceTemplate,

    /// Parsed URI template used for request routing
    pub uri_template: genmcp_template::UriTemplate,

    /// The invoker backing resources/read for matching URIs
    pub invoker: Arc<dyn Invoker>,
}

/// Request-scoped state handed to the dispatcher by a transport
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Inbound transport headers; empty under stdio
    pub headers: HashMap<String, String>,

    /// Scopes granted by the caller's token; `None` when auth is disabled
    pub scopes: Option<Vec<String>>,

    /// Cancellation signal for the inbound request
    pub cancellation: CancellationToken,
}

/// The assembled MCP server core
pub struct McpServer {
    /// Identity advertised in initialize
    server_info: ServerInfo,

    /// Usage instructions from the catalogue
    instructions: Option<String>,

    /// Registered tools in catalogue order
    tools: Vec<RegisteredTool>,

    /// Registered prompts in catalogue order
    prompts: Vec<RegisteredPrompt>,

    /// Registered static resources in catalogue order
    resources: Vec<RegisteredResource>,

    /// Registered resource templates in catalogue order
    resource_templates: Vec<RegisteredResourceTemplate>,

    /// Shared outbound HTTP client
    http_client: reqwest::Client,
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("server_info", &self.server_info)
            .field("instructions", &self.instructions)
            .field("tool_count", &self.tools.len())
            .field("prompt_count", &self.prompts.len())
            .field("resource_count", &self.resources.len())
            .field("resource_template_count", &self.resource_templates.len())
            .finish()
    }
}

impl McpServer {
    /// Create a server core; entries are added by the assembler
    pub fn new(
        server_info: ServerInfo,
        instructions: Option<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            server_info,
            instructions,
            tools: Vec::new(),
            prompts: Vec::new(),
            resources: Vec::new(),
            resource_templates: Vec::new(),
            http_client,
        }
    }

    /// Register a tool entry
    pub fn register_tool(&mut self, tool: Tool, required_scopes: Vec<String>, invoker: Arc<dyn Invoker>) {
        self.tools.push(RegisteredTool {
            tool,
            required_scopes,
            invoker,
        });
    }

    /// Register a prompt entry
    pub fn register_prompt(&mut self, prompt: Prompt, invoker: Arc<dyn Invoker>) {
        self.prompts.push(RegisteredPrompt { prompt, invoker });
    }

    /// Register a static resource entry
    pub fn register_resource(&mut self, resource: Resource, invoker: Arc<dyn Invoker>) {
        self.resources.push(RegisteredResource { resource, invoker });
    }

    /// Register a resource-template entry
    pub fn register_resource_template(
        &mut self,
        template: ResourceTemplate,
        uri_template: genmcp_template::UriTemplate,
        invoker: Arc<dyn Invoker>,
    ) {
        self.resource_templates.push(RegisteredResourceTemplate {
            template,
            uri_template,
            invoker,
        });
    }

    /// The identity advertised in initialize
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// The shared outbound HTTP client
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Number of registered entries across all kinds
    pub fn entry_count(&self) -> usize {
        self.tools.len() + self.prompts.len() + self.resources.len() + self.resource_templates.len()
    }

    /// Handle one JSON-RPC request; `None` for notifications
    #[tracing::instrument(name = "mcp_request", skip_all, fields(method = %request.method, id = ?request.id))]
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        meta: RequestMeta,
    ) -> Option<JsonRpcResponse> {
        debug!("handling MCP request");

        if request.is_notification() {
            if request.method == "notifications/initialized" {
                info!("client initialized");
            }
            return None;
        }

        let id = request.id.clone();
        let result = self.dispatch(&request, meta).await;

        Some(match result {
            Ok(value) => JsonRpcResponse::success(value, id),
            Err(error) => JsonRpcResponse::error(error, id),
        })
    }

    async fn dispatch(
        &self,
        request: &JsonRpcRequest,
        meta: RequestMeta,
    ) -> Result<Value, JsonRpcError> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params.as_ref()),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => to_value(ListToolsResult {
                tools: self.tools.iter().map(|t| t.tool.clone()).collect(),
            }),
            "tools/call" => self.handle_tools_call(request.params.as_ref(), meta).await,
            "prompts/list" => to_value(ListPromptsResult {
                prompts: self.prompts.iter().map(|p| p.prompt.clone()).collect(),
            }),
            "prompts/get" => self.handle_prompts_get(request.params.as_ref(), meta).await,
            "resources/list" => to_value(ListResourcesResult {
                resources: self.resources.iter().map(|r| r.resource.clone()).collect(),
            }),
            "resources/templates/list" => to_value(ListResourceTemplatesResult {
                resource_templates: self
                    .resource_templates
                    .iter()
                    .map(|t| t.template.clone())
                    .collect(),
            }),
            "resources/read" => self.handle_resources_read(request.params.as_ref(), meta).await,
            method => Err(JsonRpcError::method_not_found(method)),
        }
    }

    fn handle_initialize(&self, params: Option<&Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = parse_params(params)?;

        let protocol_version = if SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
            params.protocol_version
        } else {
            MCP_PROTOCOL_VERSION.to_string()
        };

        to_value(InitializeResult {
            protocol_version,
            capabilities: ServerCapabilities::full(),
            server_info: self.server_info.clone(),
            instructions: self.instructions.clone(),
        })
    }

    async fn handle_tools_call(
        &self,
        params: Option<&Value>,
        meta: RequestMeta,
    ) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = parse_params(params)?;

        let tool = self
            .tools
            .iter()
            .find(|t| t.tool.name == params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("unknown tool '{}'", params.name)))?;

        if let Some(granted) = &meta.scopes {
            let missing = tool
                .required_scopes
                .iter()
                .any(|scope| !granted.iter().any(|g| g == scope));
            if missing {
                warn!(tool = %params.name, "caller token lacks a required scope");
                return Err(JsonRpcError::new(-32000, "Insufficient scope", None));
            }
        }

        let ctx = self.context_for(&meta);
        match tool.invoker.call_tool(params.arguments.as_ref(), &ctx).await {
            Ok(result) => to_value(result),
            Err(error) => {
                warn!(tool = %params.name, error = %error, "tool invocation failed");
                to_value(CallToolResult::error(error.client_message()))
            }
        }
    }

    async fn handle_prompts_get(
        &self,
        params: Option<&Value>,
        meta: RequestMeta,
    ) -> Result<Value, JsonRpcError> {
        let params: GetPromptParams = parse_params(params)?;

        let prompt = self
            .prompts
            .iter()
            .find(|p| p.prompt.name == params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("unknown prompt '{}'", params.name)))?;

        let ctx = self.context_for(&meta);
        match prompt.invoker.get_prompt(&params.arguments, &ctx).await {
            Ok(result) => to_value(result),
            // Upstream failures stay inside the result payload as an error
            // envelope rather than becoming a protocol-level error
            Err(error) => {
                warn!(prompt = %params.name, error = %error, "prompt invocation failed");
                to_value(CallToolResult::error(error.client_message()))
            }
        }
    }

    async fn handle_resources_read(
        &self,
        params: Option<&Value>,
        meta: RequestMeta,
    ) -> Result<Value, JsonRpcError> {
        let params: ReadResourceParams = parse_params(params)?;
        let ctx = self.context_for(&meta);

        if let Some(resource) = self.resources.iter().find(|r| r.resource.uri == params.uri) {
            return match resource.invoker.read_resource(&params.uri, &ctx).await {
                Ok(result) => to_value(result),
                Err(error) => Err(resource_error(&params.uri, &error)),
            };
        }

        if let Some(template) = self
            .resource_templates
            .iter()
            .find(|t| t.uri_template.match_uri(&params.uri).is_ok())
        {
            return match template.invoker.read_resource_template(&params.uri, &ctx).await {
                Ok(result) => to_value(result),
                Err(error) => Err(resource_error(&params.uri, &error)),
            };
        }

        Err(JsonRpcError::resource_not_found(&params.uri))
    }

    fn context_for(&self, meta: &RequestMeta) -> InvocationContext {
        InvocationContext::new(self.http_client.clone())
            .with_headers(meta.headers.clone())
            .with_cancellation(meta.cancellation.clone())
    }
}

/// Map a resource invocation failure onto the protocol error channel
fn resource_error(uri: &str, error: &InvokeError) -> JsonRpcError {
    warn!(uri = %uri, error = %error, "resource read failed");
    match error {
        InvokeError::UpstreamHttp { .. } => JsonRpcError::resource_not_found(uri),
        InvokeError::TemplateMismatch(_)
        | InvokeError::RequestParse(_)
        | InvokeError::RequestValidate(_)
        | InvokeError::Schema(_) => JsonRpcError::invalid_params(error.client_message()),
        other => JsonRpcError::internal_error(other.client_message()),
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<&Value>) -> Result<T, JsonRpcError> {
    let params = params.cloned().unwrap_or(Value::Null);
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}
