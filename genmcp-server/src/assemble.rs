//! Server assembly
//!
//! Turns validated documents into a ready [`McpServer`]: one invoker per
//! catalogue entry built through the invocation registry, entry metadata
//! shaped for the MCP list endpoints, and the shared outbound client built
//! from the client-TLS domain. Assembly collects every entry failure so a
//! broken catalogue reports all of its defects at once.

use crate::client::build_http_client;
use crate::dispatch::McpServer;
use crate::error::{ServerError, ServerResult};
use genmcp_config::ServerConfigDoc;
use genmcp_defs::{
    PromptDef, ResourceDef, ResourceTemplateDef, ToolAnnotationsDef, ToolDef, ToolDefinitions,
};
use genmcp_invoke::{InvocationRegistry, PrimitiveKind, PrimitiveSpec};
use genmcp_protocol::{
    Prompt, PromptArgument, Resource, ResourceTemplate, ServerInfo, Tool, ToolAnnotations,
};
use genmcp_template::UriTemplate;
use serde_json::Value;
use tracing::{debug, info};

/// Builds a dispatch-ready server from the two documents
pub struct ServerAssembler {
    registry: InvocationRegistry,
}

impl ServerAssembler {
    /// An assembler over the standard invocation registry
    pub fn new() -> Self {
        Self {
            registry: InvocationRegistry::standard(),
        }
    }

    /// An assembler over a custom registry
    pub fn with_registry(registry: InvocationRegistry) -> Self {
        Self { registry }
    }

    /// Assemble the server core from validated documents
    pub fn assemble(
        &self,
        catalog: &ToolDefinitions,
        config: &ServerConfigDoc,
    ) -> ServerResult<McpServer> {
        let http_client = build_http_client(config.runtime.client_tls_config.as_ref())?;

        let mut server = McpServer::new(
            ServerInfo {
                name: catalog.name.clone(),
                version: catalog.version.clone(),
            },
            catalog.instructions.clone(),
            http_client,
        );

        let mut problems: Vec<String> = Vec::new();

        for tool in &catalog.tools {
            match self.build_tool(catalog, tool) {
                Ok((metadata, invoker)) => {
                    server.register_tool(metadata, tool.required_scopes.clone(), invoker)
                }
                Err(e) => problems.push(format!("tool '{}': {}", tool.name, e)),
            }
        }

        for prompt in &catalog.prompts {
            match self.build_prompt(catalog, prompt) {
                Ok((metadata, invoker)) => server.register_prompt(metadata, invoker),
                Err(e) => problems.push(format!("prompt '{}': {}", prompt.name, e)),
            }
        }

        for resource in &catalog.resources {
            match self.build_resource(catalog, resource) {
                Ok((metadata, invoker)) => server.register_resource(metadata, invoker),
                Err(e) => problems.push(format!("resource '{}': {}", resource.name, e)),
            }
        }

        for template in &catalog.resource_templates {
            match self.build_resource_template(catalog, template) {
                Ok((metadata, uri_template, invoker)) => {
                    server.register_resource_template(metadata, uri_template, invoker)
                }
                Err(e) => problems.push(format!("resourceTemplate '{}': {}", template.name, e)),
            }
        }

        if !problems.is_empty() {
            return Err(ServerError::Invoke(genmcp_invoke::InvokeError::ConfigParse {
                kind: "catalog".to_string(),
                problems,
            }));
        }

        info!(
            server = %catalog.name,
            tools = catalog.tools.len(),
            prompts = catalog.prompts.len(),
            resources = catalog.resources.len(),
            resource_templates = catalog.resource_templates.len(),
            "catalogue assembled"
        );

        Ok(server)
    }

    fn build_tool(
        &self,
        catalog: &ToolDefinitions,
        def: &ToolDef,
    ) -> ServerResult<(Tool, std::sync::Arc<dyn genmcp_invoke::Invoker>)> {
        debug!(tool = %def.name, kind = def.invocation.kind_name(), "building invoker");

        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::Tool,
            name: &def.name,
            input_schema: Some(&def.input_schema),
            uri_template: None,
        };
        let invoker = self.registry.build(&def.invocation, catalog, &primitive)?;

        let metadata = Tool {
            name: def.name.clone(),
            title: def.title.clone(),
            description: def.description.clone(),
            input_schema: def.input_schema.clone(),
            output_schema: def.output_schema.clone(),
            annotations: def.annotations.as_ref().map(to_protocol_annotations),
        };

        Ok((metadata, invoker))
    }

    fn build_prompt(
        &self,
        catalog: &ToolDefinitions,
        def: &PromptDef,
    ) -> ServerResult<(Prompt, std::sync::Arc<dyn genmcp_invoke::Invoker>)> {
        debug!(prompt = %def.name, kind = def.invocation.kind_name(), "building invoker");

        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::Prompt,
            name: &def.name,
            input_schema: Some(&def.input_schema),
            uri_template: None,
        };
        let invoker = self.registry.build(&def.invocation, catalog, &primitive)?;

        let metadata = Prompt {
            name: def.name.clone(),
            title: def.title.clone(),
            description: def.description.clone(),
            arguments: prompt_arguments(&def.input_schema),
        };

        Ok((metadata, invoker))
    }

    fn build_resource(
        &self,
        catalog: &ToolDefinitions,
        def: &ResourceDef,
    ) -> ServerResult<(Resource, std::sync::Arc<dyn genmcp_invoke::Invoker>)> {
        debug!(resource = %def.name, kind = def.invocation.kind_name(), "building invoker");

        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::Resource,
            name: &def.name,
            input_schema: def.input_schema.as_ref(),
            uri_template: None,
        };
        let invoker = self.registry.build(&def.invocation, catalog, &primitive)?;

        let metadata = Resource {
            uri: def.uri.clone(),
            name: def.name.clone(),
            title: def.title.clone(),
            description: def.description.clone(),
            mime_type: def.mime_type.clone(),
            size: def.size,
        };

        Ok((metadata, invoker))
    }

    fn build_resource_template(
        &self,
        catalog: &ToolDefinitions,
        def: &ResourceTemplateDef,
    ) -> ServerResult<(ResourceTemplate, UriTemplate, std::sync::Arc<dyn genmcp_invoke::Invoker>)>
    {
        debug!(resource_template = %def.name, kind = def.invocation.kind_name(), "building invoker");

        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::ResourceTemplate,
            name: &def.name,
            input_schema: Some(&def.input_schema),
            uri_template: Some(&def.uri_template),
        };
        let invoker = self.registry.build(&def.invocation, catalog, &primitive)?;

        let uri_template = UriTemplate::parse(&def.uri_template)
            .map_err(|e| ServerError::Transport(format!("uriTemplate: {}", e)))?;

        let metadata = ResourceTemplate {
            uri_template: def.uri_template.clone(),
            name: def.name.clone(),
            title: def.title.clone(),
            description: Some(def.description.clone()),
            mime_type: def.mime_type.clone(),
        };

        Ok((metadata, uri_template, invoker))
    }
}

impl Default for ServerAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn to_protocol_annotations(def: &ToolAnnotationsDef) -> ToolAnnotations {
    ToolAnnotations {
        destructive_hint: def.destructive_hint,
        idempotent_hint: def.idempotent_hint,
        open_world_hint: def.open_world_hint,
        read_only_hint: def.read_only_hint,
    }
}

/// Derive prompt argument metadata from the input schema
fn prompt_arguments(schema: &Value) -> Vec<PromptArgument> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, leaf)| PromptArgument {
            name: name.clone(),
            description: leaf
                .get("description")
                .and_then(Value::as_str)
                .map(|s| s.to_string()),
            required: required.contains(&name.as_str()),
        })
        .collect()
}
