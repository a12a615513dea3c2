//! CLI invoker
//!
//! Backs a catalogue entry with a local shell command. Exactly one
//! interpreter is ever invoked (`sh -c`); operators choose which commands
//! appear in the catalogue. Command templates render through per-variable
//! formatters so absent values collapse to empty slots, and every
//! unconsumed top-level argument is appended as `--name=value` in sorted
//! key order.

use crate::context::InvocationContext;
use crate::error::{InvokeError, InvokeResult};
use crate::invoker::{Invoker, PrimitiveKind, PrimitiveSpec};
use async_trait::async_trait;
use genmcp_defs::{FormatSpec, ResolvedSchema};
use genmcp_protocol::{
    CallToolResult, GetPromptResult, PromptMessage, ReadResourceResult, ResourceContents,
};
use genmcp_template::{
    Binding, ParsedTemplate, RequestBinding, Segment, UriTemplate, VariableFormatter, VariableSource,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::process::Stdio;
use tracing::{debug, warn};

/// Raw CLI invocation block as written in the document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CliInvocationConfig {
    /// Command template
    pub command: String,

    /// Per-placeholder formatter declarations
    #[serde(default)]
    pub template_variables: HashMap<String, TemplateVariableConfig>,
}

/// One declared template variable
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TemplateVariableConfig {
    /// Sub-template with at most one placeholder
    pub template: String,

    /// Suppress output when the bound value is boolean `false`
    #[serde(default)]
    pub omit_if_false: bool,
}

impl CliInvocationConfig {
    /// Parse and validate a raw config block, collecting every problem
    pub fn parse(raw: &Value, primitive: &PrimitiveSpec<'_>) -> InvokeResult<Self> {
        let config: CliInvocationConfig =
            serde_json::from_value(raw.clone()).map_err(|e| InvokeError::ConfigParse {
                kind: "cli".to_string(),
                problems: vec![e.to_string()],
            })?;

        let mut problems = Vec::new();

        if config.command.is_empty() {
            problems.push("command is required".to_string());
        }

        if let Err(e) = ParsedTemplate::parse(&config.command) {
            problems.push(format!("command: {}", e));
        }

        for (name, variable) in &config.template_variables {
            if let Err(e) = VariableFormatter::parse(&variable.template, variable.omit_if_false) {
                problems.push(format!("templateVariables.{}: {}", name, e));
            }
        }

        if primitive.kind == PrimitiveKind::ResourceTemplate {
            if let Some(uri_template) = primitive.uri_template {
                if let Err(e) = UriTemplate::parse(uri_template) {
                    problems.push(format!("uriTemplate: {}", e));
                }
            } else {
                problems.push("resource templates require a uriTemplate".to_string());
            }
        }

        if problems.is_empty() {
            Ok(config)
        } else {
            Err(InvokeError::ConfigParse {
                kind: "cli".to_string(),
                problems,
            })
        }
    }
}

/// A shell-command-backed invoker, immutable after construction
pub struct CliInvoker {
    /// Entry name, used in logs only
    name: String,

    /// Parsed command template, bound to the input schema
    command_template: ParsedTemplate,

    /// Formatters for declared template variables
    formatters: HashMap<String, VariableFormatter>,

    /// Default MIME type for resource results
    mime_type: String,

    /// Resolved input schema; absent only for static resources
    schema: Option<ResolvedSchema>,

    /// Parsed URI template, present only for resource templates
    uri_template: Option<UriTemplate>,
}

impl CliInvoker {
    /// Build an invoker from a validated config and its primitive
    pub fn create(config: CliInvocationConfig, primitive: &PrimitiveSpec<'_>) -> InvokeResult<Self> {
        let schema = primitive
            .input_schema
            .map(ResolvedSchema::resolve)
            .transpose()?;

        let mut command_template = ParsedTemplate::parse(&config.command).map_err(config_error)?;

        match &schema {
            // Static resources take no arguments; their command must render
            // without a binding even when a schema is declared
            Some(schema) if primitive.kind != PrimitiveKind::Resource => {
                command_template.bind_schema(schema).map_err(config_error)?
            }
            _ => command_template.require_static().map_err(config_error)?,
        }

        let mut formatters = HashMap::with_capacity(config.template_variables.len());
        for (name, variable) in &config.template_variables {
            formatters.insert(
                name.clone(),
                VariableFormatter::parse(&variable.template, variable.omit_if_false)
                    .map_err(config_error)?,
            );
        }

        let uri_template = match (primitive.kind, primitive.uri_template) {
            (PrimitiveKind::ResourceTemplate, Some(text)) => {
                let parsed = UriTemplate::parse(text).map_err(config_error)?;
                let schema = schema.as_ref().ok_or_else(|| InvokeError::ConfigParse {
                    kind: "cli".to_string(),
                    problems: vec!["resource templates require an input schema".to_string()],
                })?;
                for variable in parsed.variable_names() {
                    if !schema.has_property(variable) {
                        return Err(InvokeError::ConfigParse {
                            kind: "cli".to_string(),
                            problems: vec![format!(
                                "uriTemplate variable '{}' is not declared in the input schema",
                                variable
                            )],
                        });
                    }
                }
                Some(parsed)
            }
            _ => None,
        };

        Ok(Self {
            name: primitive.name.to_string(),
            command_template,
            formatters,
            mime_type: "text/plain".to_string(),
            schema,
            uri_template,
        })
    }

    /// Validate an argument object against the resolved schema
    fn validate_arguments(&self, arguments: &Value) -> InvokeResult<()> {
        if !arguments.is_object() {
            return Err(InvokeError::RequestParse("arguments must be a JSON object".to_string()));
        }
        if let Some(schema) = &self.schema {
            schema
                .validate(arguments)
                .map_err(|e| InvokeError::RequestValidate(e.to_string()))?;
        }
        Ok(())
    }

    /// Render the command line for one request
    fn render_command(&self, binding: &RequestBinding, arguments: &Value) -> InvokeResult<String> {
        let mut command = String::new();

        for segment in self.command_template.segments() {
            match segment {
                Segment::Literal(text) => command.push_str(text),
                Segment::Variable(variable) => match &variable.source {
                    VariableSource::Property => {
                        let formatter = self
                            .formatters
                            .get(&variable.name)
                            .cloned()
                            .unwrap_or_else(VariableFormatter::identity);
                        let value = binding.get_property(&variable.name);
                        let format = variable.format.unwrap_or(FormatSpec::Text);
                        let rendered = formatter
                            .render(value.as_ref(), format)
                            .map_err(|e| InvokeError::RequestValidate(e.to_string()))?;
                        command.push_str(&rendered);
                    }
                    VariableSource::Header(header) => {
                        let value = binding.get_header(header).ok_or_else(|| {
                            InvokeError::RequestValidate(format!("header '{}' is not present", header))
                        })?;
                        command.push_str(&value);
                    }
                    VariableSource::Env(env) => {
                        let value = binding.get_env(env).ok_or_else(|| {
                            InvokeError::RequestValidate(format!("environment variable '{}' is not set", env))
                        })?;
                        command.push_str(&value);
                    }
                },
            }
        }

        // Unconsumed top-level arguments append as --name=value, sorted
        let consumed = self.command_template.consumed_root_fields();
        if let Some(object) = arguments.as_object() {
            let mut names: Vec<&String> = object
                .keys()
                .filter(|name| {
                    !consumed.contains(&name.as_str()) && !self.formatters.contains_key(*name)
                })
                .collect();
            names.sort();

            for name in names {
                let Some(text) = argument_to_string(&object[name.as_str()]) else {
                    continue;
                };
                command.push_str(&format!(" --{}={}", name, text));
            }
        }

        Ok(command)
    }

    /// Spawn `sh -c`, capture combined output, honour cancellation
    async fn execute(&self, command: &str, ctx: &InvocationContext) -> InvokeResult<String> {
        debug!(entry = %self.name, command = %command, "executing command");

        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                warn!(entry = %self.name, error = %e, "failed to spawn interpreter");
                InvokeError::SubprocessSpawn(e.to_string())
            })?;

        let output = tokio::select! {
            result = child.wait_with_output() => result.map_err(|e| {
                warn!(entry = %self.name, error = %e, "failed to collect command output");
                InvokeError::SubprocessSpawn(e.to_string())
            })?,
            _ = ctx.cancelled() => {
                // kill_on_drop reaps the child when the wait future drops
                return Err(InvokeError::Cancelled);
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            let status = output.status.code().unwrap_or(-1);
            warn!(entry = %self.name, status, output = %text, "command exited non-zero");
            return Err(InvokeError::SubprocessNonZero { status });
        }

        Ok(text)
    }

    /// Match a request URI and coerce captured values per the schema
    fn bind_uri(&self, uri: &str) -> InvokeResult<Value> {
        let template = self
            .uri_template
            .as_ref()
            .ok_or_else(|| InvokeError::RequestParse("entry has no URI template".to_string()))?;

        let captured = template.match_uri(uri)?;

        let mut arguments = Map::new();
        for (name, raw) in captured {
            let value = match self.schema.as_ref().and_then(|s| s.format_spec_for(&name).ok()) {
                Some(FormatSpec::Decimal) => raw
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::String(raw)),
                Some(FormatSpec::Float) => raw
                    .parse::<f64>()
                    .ok()
                    .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
                    .unwrap_or(Value::String(raw)),
                Some(FormatSpec::Bool) => match raw.as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    _ => Value::String(raw),
                },
                _ => Value::String(raw),
            };
            arguments.insert(name, value);
        }

        Ok(Value::Object(arguments))
    }

    async fn run(&self, arguments: Value, ctx: &InvocationContext) -> InvokeResult<String> {
        self.validate_arguments(&arguments)?;
        let binding = ctx.binding_for(arguments.clone());
        let command = self.render_command(&binding, &arguments)?;
        self.execute(&command, ctx).await
    }
}

#[async_trait]
impl Invoker for CliInvoker {
    async fn call_tool(
        &self,
        arguments: Option<&Value>,
        ctx: &InvocationContext,
    ) -> InvokeResult<CallToolResult> {
        let arguments = arguments.cloned().unwrap_or_else(|| Value::Object(Map::new()));
        let output = self.run(arguments, ctx).await?;
        Ok(CallToolResult::text(output))
    }

    async fn get_prompt(
        &self,
        arguments: &HashMap<String, String>,
        ctx: &InvocationContext,
    ) -> InvokeResult<GetPromptResult> {
        let arguments = Value::Object(
            arguments
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        );
        let output = self.run(arguments, ctx).await?;
        Ok(GetPromptResult {
            description: None,
            messages: vec![PromptMessage::assistant_text(output)],
        })
    }

    async fn read_resource(
        &self,
        uri: &str,
        ctx: &InvocationContext,
    ) -> InvokeResult<ReadResourceResult> {
        let output = self.run(Value::Object(Map::new()), ctx).await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: self.mime_type.clone(),
                text: output,
            }],
        })
    }

    async fn read_resource_template(
        &self,
        uri: &str,
        ctx: &InvocationContext,
    ) -> InvokeResult<ReadResourceResult> {
        let arguments = self.bind_uri(uri)?;
        let output = self.run(arguments, ctx).await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: self.mime_type.clone(),
                text: output,
            }],
        })
    }
}

fn config_error(e: genmcp_template::TemplateError) -> InvokeError {
    InvokeError::ConfigParse {
        kind: "cli".to_string(),
        problems: vec![e.to_string()],
    }
}

/// An argument's `--name=value` form; compound values serialise as JSON
fn argument_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clone_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "repoUrl": {"type": "string"},
                "verbose": {"type": "boolean"},
                "depth": {"type": "integer"}
            },
            "required": ["repoUrl"]
        })
    }

    fn clone_invoker(schema: &Value) -> CliInvoker {
        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::Tool,
            name: "git-clone",
            input_schema: Some(schema),
            uri_template: None,
        };
        let raw = json!({
            "command": "git clone {depth} {verbose} {repoUrl}",
            "templateVariables": {
                "verbose": {"template": "--verbose", "omitIfFalse": true},
                "depth": {"template": "--depth={depth}"}
            }
        });
        let config = CliInvocationConfig::parse(&raw, &primitive).unwrap();
        CliInvoker::create(config, &primitive).unwrap()
    }

    #[test]
    fn test_omit_if_false_and_null_collapse() {
        let schema = clone_schema();
        let invoker = clone_invoker(&schema);

        let arguments = json!({"repoUrl": "u", "verbose": false, "depth": null});
        let binding = RequestBinding::new(arguments.clone());
        let command = invoker.render_command(&binding, &arguments).unwrap();
        assert_eq!(command, "git clone   u");
    }

    #[test]
    fn test_declared_variables_render_flags() {
        let schema = clone_schema();
        let invoker = clone_invoker(&schema);

        let arguments = json!({"repoUrl": "u", "verbose": true, "depth": 3});
        let binding = RequestBinding::new(arguments.clone());
        let command = invoker.render_command(&binding, &arguments).unwrap();
        assert_eq!(command, "git clone --depth=3 --verbose u");
    }

    #[test]
    fn test_leftover_arguments_append_sorted() {
        let schema = json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "zeta": {"type": "string"},
                "alpha": {"type": "integer"}
            }
        });
        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::Tool,
            name: "lister",
            input_schema: Some(&schema),
            uri_template: None,
        };
        let raw = json!({"command": "ls {path}"});
        let config = CliInvocationConfig::parse(&raw, &primitive).unwrap();
        let invoker = CliInvoker::create(config, &primitive).unwrap();

        let arguments = json!({"path": "/tmp", "zeta": "z", "alpha": 1});
        let binding = RequestBinding::new(arguments.clone());
        let command = invoker.render_command(&binding, &arguments).unwrap();
        assert_eq!(command, "ls /tmp --alpha=1 --zeta=z");
    }

    #[test]
    fn test_config_parse_collects_problems() {
        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::Tool,
            name: "broken",
            input_schema: None,
            uri_template: None,
        };
        let raw = json!({
            "command": "",
            "templateVariables": {
                "x": {"template": "{a}{b}"}
            }
        });
        let err = CliInvocationConfig::parse(&raw, &primitive).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("command is required"));
        assert!(text.contains("templateVariables.x"));
    }

    #[tokio::test]
    async fn test_call_tool_captures_output() {
        let schema = json!({
            "type": "object",
            "properties": {"word": {"type": "string"}},
            "required": ["word"]
        });
        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::Tool,
            name: "echoer",
            input_schema: Some(&schema),
            uri_template: None,
        };
        let raw = json!({"command": "echo {word}"});
        let config = CliInvocationConfig::parse(&raw, &primitive).unwrap();
        let invoker = CliInvoker::create(config, &primitive).unwrap();

        let ctx = InvocationContext::new(reqwest::Client::new());
        let result = invoker.call_tool(Some(&json!({"word": "hello"})), &ctx).await.unwrap();
        assert!(!result.is_error);
        match &result.content[0] {
            genmcp_protocol::ContentItem::Text { text } => assert_eq!(text.trim(), "hello"),
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::Tool,
            name: "failer",
            input_schema: None,
            uri_template: None,
        };
        let raw = json!({"command": "exit 3"});
        let config = CliInvocationConfig::parse(&raw, &primitive).unwrap();
        let invoker = CliInvoker::create(config, &primitive).unwrap();

        let ctx = InvocationContext::new(reqwest::Client::new());
        let err = invoker.call_tool(None, &ctx).await.unwrap_err();
        assert!(matches!(err, InvokeError::SubprocessNonZero { status: 3 }));
        assert_eq!(err.client_message(), "command execution failed");
    }

    #[tokio::test]
    async fn test_combined_output_includes_stderr() {
        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::Tool,
            name: "mixed",
            input_schema: None,
            uri_template: None,
        };
        let raw = json!({"command": "echo out; echo err 1>&2"});
        let config = CliInvocationConfig::parse(&raw, &primitive).unwrap();
        let invoker = CliInvoker::create(config, &primitive).unwrap();

        let ctx = InvocationContext::new(reqwest::Client::new());
        let result = invoker.call_tool(None, &ctx).await.unwrap();
        match &result.content[0] {
            genmcp_protocol::ContentItem::Text { text } => {
                assert!(text.contains("out"));
                assert!(text.contains("err"));
            }
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resource_template_binds_uri() {
        let schema = json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        });
        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::ResourceTemplate,
            name: "city-echo",
            input_schema: Some(&schema),
            uri_template: Some("city://{city}"),
        };
        let raw = json!({"command": "echo {city}"});
        let config = CliInvocationConfig::parse(&raw, &primitive).unwrap();
        let invoker = CliInvoker::create(config, &primitive).unwrap();

        let ctx = InvocationContext::new(reqwest::Client::new());
        let result = invoker.read_resource_template("city://London", &ctx).await.unwrap();
        assert_eq!(result.contents[0].uri, "city://London");
        assert_eq!(result.contents[0].mime_type, "text/plain");
        assert_eq!(result.contents[0].text.trim(), "London");

        let err = invoker.read_resource_template("town://London", &ctx).await.unwrap_err();
        assert!(matches!(err, InvokeError::TemplateMismatch(_)));
    }
}
