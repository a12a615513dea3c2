//! Tool-definitions document model
//!
//! The document is YAML or JSON with the same schema. Parsing is strict
//! about the envelope (`mcpFileVersion`, `kind`) and collects every
//! entry-level problem before reporting, so an operator sees the full list
//! of defects in one pass instead of fixing them one at a time.

use crate::error::{DefsError, DefsResult};
use crate::schema::ResolvedSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// The document version this build understands
pub const MCP_FILE_VERSION: &str = "0.2.0";

/// Expected `kind` value of a tool-definitions document
pub const TOOL_DEFINITIONS_KIND: &str = "MCPToolDefinitions";

/// A complete tool-definitions document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinitions {
    /// Document schema version, must equal [`MCP_FILE_VERSION`]
    pub mcp_file_version: String,

    /// Document kind tag, must be `MCPToolDefinitions`
    pub kind: String,

    /// Server name
    pub name: String,

    /// Server semantic version
    pub version: String,

    /// Usage instructions surfaced through initialize
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Named partial invocation descriptors referenced via extends
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub invocation_bases: HashMap<String, InvocationSpec>,

    /// Tool entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDef>,

    /// Prompt entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prompts: Vec<PromptDef>,

    /// Static resource entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourceDef>,

    /// Resource-template entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_templates: Vec<ResourceTemplateDef>,
}

impl ToolDefinitions {
    /// Load a document from a YAML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> DefsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_document(&content)
    }

    /// Parse and validate a document from its textual form
    pub fn from_document(content: &str) -> DefsResult<Self> {
        let doc: ToolDefinitions = serde_yaml::from_str(content)?;
        doc.validate_all()?;
        Ok(doc)
    }

    /// Validate the envelope and every catalogue entry, collecting errors
    pub fn validate_all(&self) -> DefsResult<()> {
        if self.mcp_file_version != MCP_FILE_VERSION {
            return Err(DefsError::InvalidVersion {
                expected: MCP_FILE_VERSION.to_string(),
                found: self.mcp_file_version.clone(),
            });
        }

        if self.kind != TOOL_DEFINITIONS_KIND {
            return Err(DefsError::InvalidKind {
                expected: TOOL_DEFINITIONS_KIND.to_string(),
                found: self.kind.clone(),
            });
        }

        let mut errors = Vec::new();

        if self.name.is_empty() {
            errors.push(DefsError::entry("document", "", "server name cannot be empty"));
        }
        if self.version.is_empty() {
            errors.push(DefsError::entry("document", "", "server version cannot be empty"));
        }

        for (name, base) in &self.invocation_bases {
            if matches!(base, InvocationSpec::Extends(_)) {
                errors.push(DefsError::entry(
                    "invocationBase",
                    name.clone(),
                    "an invocation base cannot itself use extends",
                ));
            }
        }

        self.check_unique("tool", self.tools.iter().map(|t| t.name.as_str()), &mut errors);
        self.check_unique("prompt", self.prompts.iter().map(|p| p.name.as_str()), &mut errors);
        self.check_unique("resource", self.resources.iter().map(|r| r.name.as_str()), &mut errors);
        self.check_unique(
            "resourceTemplate",
            self.resource_templates.iter().map(|r| r.name.as_str()),
            &mut errors,
        );

        for tool in &self.tools {
            tool.validate(self, &mut errors);
        }
        for prompt in &self.prompts {
            prompt.validate(self, &mut errors);
        }
        for resource in &self.resources {
            resource.validate(self, &mut errors);
        }
        for template in &self.resource_templates {
            template.validate(self, &mut errors);
        }

        DefsError::from_collected(errors)
    }

    /// Look up an invocation base by name
    pub fn invocation_base(&self, name: &str) -> Option<&InvocationSpec> {
        self.invocation_bases.get(name)
    }

    fn check_unique<'a>(
        &self,
        kind: &'static str,
        names: impl Iterator<Item = &'a str>,
        errors: &mut Vec<DefsError>,
    ) {
        let mut seen = HashSet::new();
        for name in names {
            if name.is_empty() {
                errors.push(DefsError::entry(kind, name, "name cannot be empty"));
            }
            if !seen.insert(name) {
                errors.push(DefsError::entry(kind, name, "duplicate name within its kind"));
            }
        }
    }
}

/// The executable action backing a primitive
///
/// Exactly one invocation kind per entry; the document form is a map with
/// a single `http`, `cli` or `extends` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawInvocation", into = "RawInvocation")]
pub enum InvocationSpec {
    /// Outbound HTTP call, config parsed by the HTTP invoker
    Http(Value),

    /// Local shell command, config parsed by the CLI invoker
    Cli(Value),

    /// Composition over a named invocation base
    Extends(ExtendsSpec),
}

impl InvocationSpec {
    /// The registry kind tag for this invocation
    pub fn kind_name(&self) -> &'static str {
        match self {
            InvocationSpec::Http(_) => "http",
            InvocationSpec::Cli(_) => "cli",
            InvocationSpec::Extends(_) => "extends",
        }
    }
}

/// Wire form of an invocation block
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawInvocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    http: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cli: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extends: Option<ExtendsSpec>,
}

impl TryFrom<RawInvocation> for InvocationSpec {
    type Error = String;

    fn try_from(raw: RawInvocation) -> Result<Self, Self::Error> {
        match (raw.http, raw.cli, raw.extends) {
            (Some(http), None, None) => Ok(InvocationSpec::Http(http)),
            (None, Some(cli), None) => Ok(InvocationSpec::Cli(cli)),
            (None, None, Some(extends)) => Ok(InvocationSpec::Extends(extends)),
            (None, None, None) => Err("invocation block must name exactly one of http, cli, extends".to_string()),
            _ => Err("invocation block must name exactly one kind, found several".to_string()),
        }
    }
}

impl From<InvocationSpec> for RawInvocation {
    fn from(spec: InvocationSpec) -> Self {
        match spec {
            InvocationSpec::Http(http) => RawInvocation {
                http: Some(http),
                cli: None,
                extends: None,
            },
            InvocationSpec::Cli(cli) => RawInvocation {
                http: None,
                cli: Some(cli),
                extends: None,
            },
            InvocationSpec::Extends(extends) => RawInvocation {
                http: None,
                cli: None,
                extends: Some(extends),
            },
        }
    }
}

/// Composition of a named base with extend/override/remove operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendsSpec {
    /// Name of the invocation base to start from
    pub from: String,

    /// Fields merged into the base (strings concatenate, lists append, maps union)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extend: Option<Value>,

    /// Fields replaced wholesale
    #[serde(rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_with: Option<Value>,

    /// Fields emptied or elements/keys deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove: Option<Value>,
}

/// Behavioural hints carried by a tool entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotationsDef {
    /// The tool may perform destructive updates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,

    /// Repeated calls with the same arguments have no additional effect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,

    /// The tool interacts with entities beyond the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,

    /// The tool only reads state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
}

/// A tool entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDef {
    /// Tool name, unique among tools
    pub name: String,

    /// Human-readable display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Tool description
    pub description: String,

    /// JSON-Schema for the arguments, root must be an object
    pub input_schema: Value,

    /// Optional JSON-Schema for the result payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,

    /// Behavioural hints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotationsDef>,

    /// OAuth scopes the caller must hold
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_scopes: Vec<String>,

    /// The executable action backing the tool
    pub invocation: InvocationSpec,
}

impl ToolDef {
    fn validate(&self, doc: &ToolDefinitions, errors: &mut Vec<DefsError>) {
        validate_common(
            "tool",
            &self.name,
            &self.description,
            Some(&self.input_schema),
            true,
            &self.invocation,
            doc,
            errors,
        );
    }
}

/// A prompt entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDef {
    /// Prompt name, unique among prompts
    pub name: String,

    /// Human-readable display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Prompt description
    pub description: String,

    /// JSON-Schema for the arguments, root must be an object
    pub input_schema: Value,

    /// The executable action backing the prompt
    pub invocation: InvocationSpec,
}

impl PromptDef {
    fn validate(&self, doc: &ToolDefinitions, errors: &mut Vec<DefsError>) {
        validate_common(
            "prompt",
            &self.name,
            &self.description,
            Some(&self.input_schema),
            true,
            &self.invocation,
            doc,
            errors,
        );
    }
}

/// A static resource entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDef {
    /// Resource name, unique among resources
    pub name: String,

    /// Human-readable display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Resource description
    pub description: String,

    /// The URI this resource is served under
    pub uri: String,

    /// MIME type, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Size in bytes, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Optional JSON-Schema; static resources take no arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,

    /// The executable action backing the resource
    pub invocation: InvocationSpec,
}

impl ResourceDef {
    fn validate(&self, doc: &ToolDefinitions, errors: &mut Vec<DefsError>) {
        if self.uri.is_empty() {
            errors.push(DefsError::entry("resource", self.name.clone(), "uri cannot be empty"));
        }
        validate_common(
            "resource",
            &self.name,
            &self.description,
            self.input_schema.as_ref(),
            false,
            &self.invocation,
            doc,
            errors,
        );
    }
}

/// A resource-template entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplateDef {
    /// Template name, unique among resource templates
    pub name: String,

    /// Human-readable display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Template description
    pub description: String,

    /// RFC 6570 URI template the request URI must match
    pub uri_template: String,

    /// MIME type of produced resources, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// JSON-Schema for the template variables, root must be an object
    pub input_schema: Value,

    /// The executable action backing the template
    pub invocation: InvocationSpec,
}

impl ResourceTemplateDef {
    fn validate(&self, doc: &ToolDefinitions, errors: &mut Vec<DefsError>) {
        if self.uri_template.is_empty() {
            errors.push(DefsError::entry(
                "resourceTemplate",
                self.name.clone(),
                "uriTemplate cannot be empty",
            ));
        }
        validate_common(
            "resourceTemplate",
            &self.name,
            &self.description,
            Some(&self.input_schema),
            true,
            &self.invocation,
            doc,
            errors,
        );
    }
}

/// Checks shared by all four entry kinds
#[allow(clippy::too_many_arguments)]
fn validate_common(
    kind: &'static str,
    name: &str,
    description: &str,
    input_schema: Option<&Value>,
    schema_required: bool,
    invocation: &InvocationSpec,
    doc: &ToolDefinitions,
    errors: &mut Vec<DefsError>,
) {
    if description.is_empty() {
        errors.push(DefsError::entry(kind, name, "description cannot be empty"));
    }

    match input_schema {
        Some(schema) => match ResolvedSchema::resolve(schema) {
            Ok(resolved) => {
                if let Err(e) = resolved.require_object_root() {
                    errors.push(DefsError::entry(kind, name, e.to_string()));
                }
                if let Err(e) = resolved.require_declared_required() {
                    errors.push(DefsError::entry(kind, name, e.to_string()));
                }
            }
            Err(e) => errors.push(DefsError::entry(kind, name, e.to_string())),
        },
        None if schema_required => {
            errors.push(DefsError::entry(kind, name, "input schema is required"));
        }
        None => {}
    }

    if let InvocationSpec::Extends(extends) = invocation {
        if extends.from.is_empty() {
            errors.push(DefsError::entry(kind, name, "extends.from cannot be empty"));
        } else if doc.invocation_base(&extends.from).is_none() {
            errors.push(DefsError::entry(
                kind,
                name,
                format!("extends.from names unknown invocation base '{}'", extends.from),
            ));
        }
    }
}
