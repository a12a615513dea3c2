//! HTTP invoker
//!
//! Backs a catalogue entry with an outbound HTTP call. Templates are
//! parsed once at construction; each request binds arguments, renders the
//! URL and headers, assembles a body or query string, executes through the
//! shared client from the request context, and shapes an MCP result.

use crate::context::InvocationContext;
use crate::error::{InvokeError, InvokeResult};
use crate::invoker::{Invoker, PrimitiveKind, PrimitiveSpec};
use async_trait::async_trait;
use genmcp_defs::ResolvedSchema;
use genmcp_protocol::{
    CallToolResult, GetPromptResult, PromptMessage, ReadResourceResult, ResourceContents,
};
use genmcp_template::{ParsedTemplate, RequestBinding, UriTemplate};
use http::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Methods the catalogue may name
const ALLOWED_METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE"];

/// Raw HTTP invocation block as written in the document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HttpInvocationConfig {
    /// URL template
    pub url: String,

    /// HTTP method, defaults to GET
    #[serde(default = "default_method")]
    pub method: String,

    /// Header-value templates by header name
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Dot-path into the arguments whose value becomes the raw body
    #[serde(default)]
    pub body_root: Option<String>,

    /// Wrap the entire argument object as a single-element JSON array
    #[serde(default)]
    pub body_as_array: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

impl HttpInvocationConfig {
    /// Parse and validate a raw config block, collecting every problem
    pub fn parse(raw: &Value, primitive: &PrimitiveSpec<'_>) -> InvokeResult<Self> {
        let config: HttpInvocationConfig =
            serde_json::from_value(raw.clone()).map_err(|e| InvokeError::ConfigParse {
                kind: "http".to_string(),
                problems: vec![e.to_string()],
            })?;

        let mut problems = Vec::new();

        if config.url.is_empty() {
            problems.push("url is required".to_string());
        }

        let method = config.method.to_uppercase();
        if !ALLOWED_METHODS.contains(&method.as_str()) {
            problems.push(format!(
                "invalid method '{}', expected one of {}",
                config.method,
                ALLOWED_METHODS.join(", ")
            ));
        }

        if config.body_root.is_some() && config.body_as_array {
            problems.push("bodyRoot and bodyAsArray are mutually exclusive".to_string());
        }

        if let Err(e) = ParsedTemplate::parse(&config.url) {
            problems.push(format!("url: {}", e));
        }

        for (name, template) in &config.headers {
            if let Err(e) = ParsedTemplate::parse(template) {
                problems.push(format!("header '{}': {}", name, e));
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
            Ok(HttpInvocationConfig {
                method,
                ..config
            })
        } else {
            Err(InvokeError::ConfigParse {
                kind: "http".to_string(),
                problems,
            })
        }
    }
}

/// An HTTP-backed invoker, immutable after construction
#[derive(Debug)]
pub struct HttpInvoker {
    /// Entry name, used in logs only
    name: String,

    /// Uppercased, validated method
    method: Method,

    /// Parsed URL template, bound to the input schema
    url_template: ParsedTemplate,

    /// Parsed header-value templates
    header_templates: Vec<(String, ParsedTemplate)>,

    /// Dot-path replacing the body, when configured
    body_root: Option<String>,

    /// Single-element array wrapping, when configured
    body_as_array: bool,

    /// Resolved input schema; absent only for static resources
    schema: Option<ResolvedSchema>,

    /// Parsed URI template, present only for resource templates
    uri_template: Option<UriTemplate>,
}

impl HttpInvoker {
    /// Build an invoker from a validated config and its primitive
    pub fn create(config: HttpInvocationConfig, primitive: &PrimitiveSpec<'_>) -> InvokeResult<Self> {
        let schema = primitive
            .input_schema
            .map(ResolvedSchema::resolve)
            .transpose()?;

        let mut url_template = ParsedTemplate::parse(&config.url).map_err(config_error)?;
        let mut header_templates = Vec::with_capacity(config.headers.len());
        for (name, template) in &config.headers {
            header_templates.push((name.clone(), ParsedTemplate::parse(template).map_err(config_error)?));
        }

        match &schema {
            // Static resources take no arguments, so their templates must
            // render without a binding even when a schema is declared
            Some(schema) if primitive.kind != PrimitiveKind::Resource => {
                url_template.bind_schema(schema).map_err(config_error)?;
                for (_, template) in &mut header_templates {
                    template.bind_schema(schema).map_err(config_error)?;
                }
            }
            _ => {
                url_template.require_static().map_err(config_error)?;
                for (_, template) in &header_templates {
                    template.require_static().map_err(config_error)?;
                }
            }
        }

        let uri_template = match (primitive.kind, primitive.uri_template) {
            (PrimitiveKind::ResourceTemplate, Some(text)) => {
                let parsed = UriTemplate::parse(text).map_err(config_error)?;
                let schema = schema.as_ref().ok_or_else(|| InvokeError::ConfigParse {
                    kind: "http".to_string(),
                    problems: vec!["resource templates require an input schema".to_string()],
                })?;
                for variable in parsed.variable_names() {
                    if !schema.has_property(variable) {
                        return Err(InvokeError::ConfigParse {
                            kind: "http".to_string(),
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

        let method = Method::from_bytes(config.method.as_bytes()).map_err(|_| {
            InvokeError::ConfigParse {
                kind: "http".to_string(),
                problems: vec![format!("invalid method '{}'", config.method)],
            }
        })?;

        Ok(Self {
            name: primitive.name.to_string(),
            method,
            url_template,
            header_templates,
            body_root: config.body_root,
            body_as_array: config.body_as_array,
            schema,
            uri_template,
        })
    }

    /// Whether this method conventionally carries a request body
    fn has_body(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
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

    /// Render the outbound URL, attaching leftover scalars as query params
    fn render_url(&self, binding: &RequestBinding, arguments: &Value) -> InvokeResult<url::Url> {
        let rendered = self
            .url_template
            .render(binding)
            .map_err(|e| InvokeError::RequestValidate(e.to_string()))?;

        let mut url = url::Url::parse(&rendered)
            .map_err(|e| InvokeError::RequestValidate(format!("rendered URL is invalid: {}", e)))?;

        if !self.has_body() {
            let consumed = self.url_template.consumed_root_fields();
            let leftovers: Vec<(&String, String)> = arguments
                .as_object()
                .map(|object| {
                    object
                        .iter()
                        .filter(|(key, _)| !consumed.contains(&key.as_str()))
                        .filter_map(|(key, value)| scalar_to_string(value).map(|text| (key, text)))
                        .collect()
                })
                .unwrap_or_default();

            if !leftovers.is_empty() {
                let mut pairs = url.query_pairs_mut();
                for (key, text) in leftovers {
                    pairs.append_pair(key, &text);
                }
            }
        }

        Ok(url)
    }

    /// Build the JSON body for body-carrying methods
    fn build_body(&self, arguments: &Value) -> InvokeResult<Option<String>> {
        if !self.has_body() {
            return Ok(None);
        }

        let mut body = arguments.clone();
        if let Some(object) = body.as_object_mut() {
            for field in self.url_template.consumed_root_fields() {
                object.remove(field);
            }
        }

        if let Some(root) = &self.body_root {
            let mut current = &body;
            for segment in root.split('.') {
                current = current.get(segment).ok_or_else(|| {
                    InvokeError::RequestValidate(format!("bodyRoot path '{}' is absent from the arguments", root))
                })?;
            }
            body = current.clone();
        }

        if self.body_as_array {
            body = Value::Array(vec![body]);
        }

        let encoded = serde_json::to_string(&body)
            .map_err(|e| InvokeError::RequestParse(format!("body is not JSON-serialisable: {}", e)))?;
        Ok(Some(encoded))
    }

    /// Render header templates against the binding
    fn render_headers(&self, binding: &RequestBinding) -> InvokeResult<Vec<(String, String)>> {
        let mut headers = Vec::with_capacity(self.header_templates.len());
        for (name, template) in &self.header_templates {
            let value = template
                .render(binding)
                .map_err(|e| InvokeError::RequestValidate(e.to_string()))?;
            headers.push((name.clone(), value));
        }
        Ok(headers)
    }

    /// Execute the assembled request, honouring cancellation
    async fn execute(
        &self,
        arguments: &Value,
        ctx: &InvocationContext,
    ) -> InvokeResult<UpstreamResponse> {
        let binding = ctx.binding_for(arguments.clone());

        let url = self.render_url(&binding, arguments)?;
        let body = self.build_body(arguments)?;
        let headers = self.render_headers(&binding)?;

        debug!(entry = %self.name, method = %self.method, url = %url, "dispatching upstream request");

        let mut request = ctx.http_client().request(self.method.clone(), url.clone());
        if let Some(body) = body {
            request = request
                .header(http::header::CONTENT_TYPE, "application/json; charset=UTF-8")
                .body(body);
        }
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = tokio::select! {
            result = request.send() => result.map_err(|e| {
                warn!(entry = %self.name, url = %url, error = %e, "upstream request failed");
                InvokeError::UpstreamTransport(e.to_string())
            })?,
            _ = ctx.cancelled() => return Err(InvokeError::Cancelled),
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let body = tokio::select! {
            result = response.text() => result.map_err(|e| {
                warn!(entry = %self.name, url = %url, error = %e, "failed to read upstream body");
                InvokeError::UpstreamTransport(e.to_string())
            })?,
            _ = ctx.cancelled() => return Err(InvokeError::Cancelled),
        };

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
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
                Some(spec) => coerce_captured(&raw, spec),
                None => Value::String(raw),
            };
            arguments.insert(name, value);
        }

        Ok(Value::Object(arguments))
    }
}

/// What came back from upstream, already drained
struct UpstreamResponse {
    status: u16,
    content_type: Option<String>,
    body: String,
}

impl UpstreamResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }

    fn mime_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| "text/plain".to_string())
    }
}

#[async_trait]
impl Invoker for HttpInvoker {
    async fn call_tool(
        &self,
        arguments: Option<&Value>,
        ctx: &InvocationContext,
    ) -> InvokeResult<CallToolResult> {
        let arguments = arguments.cloned().unwrap_or_else(|| Value::Object(Map::new()));
        self.validate_arguments(&arguments)?;

        let response = self.execute(&arguments, ctx).await?;

        let mut result = CallToolResult {
            content: vec![genmcp_protocol::ContentItem::Text {
                text: response.body.clone(),
            }],
            is_error: !response.is_success(),
            structured_content: None,
        };

        if response.is_json() {
            if let Ok(decoded) = serde_json::from_str(&response.body) {
                result.structured_content = Some(decoded);
            }
        }

        Ok(result)
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
        self.validate_arguments(&arguments)?;

        let response = self.execute(&arguments, ctx).await?;
        if !response.is_success() {
            return Err(InvokeError::UpstreamHttp {
                status: response.status,
            });
        }

        Ok(GetPromptResult {
            description: None,
            messages: vec![PromptMessage::assistant_text(response.body)],
        })
    }

    async fn read_resource(
        &self,
        uri: &str,
        ctx: &InvocationContext,
    ) -> InvokeResult<ReadResourceResult> {
        let arguments = Value::Object(Map::new());
        let response = self.execute(&arguments, ctx).await?;
        if !response.is_success() {
            return Err(InvokeError::UpstreamHttp {
                status: response.status,
            });
        }

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: response.mime_type(),
                text: response.body,
            }],
        })
    }

    async fn read_resource_template(
        &self,
        uri: &str,
        ctx: &InvocationContext,
    ) -> InvokeResult<ReadResourceResult> {
        let arguments = self.bind_uri(uri)?;
        self.validate_arguments(&arguments)?;

        let response = self.execute(&arguments, ctx).await?;
        if !response.is_success() {
            return Err(InvokeError::UpstreamHttp {
                status: response.status,
            });
        }

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: response.mime_type(),
                text: response.body,
            }],
        })
    }
}

fn config_error(e: genmcp_template::TemplateError) -> InvokeError {
    InvokeError::ConfigParse {
        kind: "http".to_string(),
        problems: vec![e.to_string()],
    }
}

/// A scalar's query-string form; compound values never become params
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse a URI-captured string according to its schema type
fn coerce_captured(raw: &str, spec: genmcp_defs::FormatSpec) -> Value {
    use genmcp_defs::FormatSpec;
    match spec {
        FormatSpec::Text => Value::String(raw.to_string()),
        FormatSpec::Decimal => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        FormatSpec::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
            .unwrap_or_else(|| Value::String(raw.to_string())),
        FormatSpec::Bool => match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_primitive<'a>(schema: &'a Value) -> PrimitiveSpec<'a> {
        PrimitiveSpec {
            kind: PrimitiveKind::Tool,
            name: "test-tool",
            input_schema: Some(schema),
            uri_template: None,
        }
    }

    fn id_query_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "q": {"type": "string"}
            },
            "required": ["id"]
        })
    }

    #[test]
    fn test_config_parse_collects_problems() {
        let raw = json!({
            "url": "",
            "method": "FETCH",
            "bodyRoot": "payload",
            "bodyAsArray": true
        });
        let schema = id_query_schema();
        let err = HttpInvocationConfig::parse(&raw, &tool_primitive(&schema)).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("url is required"));
        assert!(text.contains("invalid method 'FETCH'"));
        assert!(text.contains("mutually exclusive"));
    }

    #[test]
    fn test_config_method_is_uppercased() {
        let raw = json!({"url": "http://h/x", "method": "post"});
        let schema = id_query_schema();
        let config = HttpInvocationConfig::parse(&raw, &tool_primitive(&schema)).unwrap();
        assert_eq!(config.method, "POST");
    }

    #[test]
    fn test_create_rejects_unknown_placeholder() {
        let raw = json!({"url": "http://h/{missing}", "method": "GET"});
        let schema = id_query_schema();
        let config = HttpInvocationConfig::parse(&raw, &tool_primitive(&schema)).unwrap();
        assert!(HttpInvoker::create(config, &tool_primitive(&schema)).is_err());
    }

    #[test]
    fn test_static_resource_rejects_placeholders() {
        let raw = json!({"url": "http://h/{id}", "method": "GET"});
        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::Resource,
            name: "static",
            input_schema: None,
            uri_template: None,
        };
        let config = HttpInvocationConfig::parse(&raw, &primitive).unwrap();
        assert!(HttpInvoker::create(config, &primitive).is_err());
    }

    #[test]
    fn test_uri_template_variables_must_be_declared() {
        let schema = json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        });
        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::ResourceTemplate,
            name: "forecast",
            input_schema: Some(&schema),
            uri_template: Some("weather://forecast/{city}/{date}"),
        };
        let raw = json!({"url": "http://wx/{city}", "method": "GET"});
        let config = HttpInvocationConfig::parse(&raw, &primitive).unwrap();
        let err = HttpInvoker::create(config, &primitive).unwrap_err();
        assert!(err.to_string().contains("'date'"));
    }

    #[test]
    fn test_bind_uri_coerces_types() {
        let schema = json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "city": {"type": "string"}
            },
            "required": ["id", "city"]
        });
        let primitive = PrimitiveSpec {
            kind: PrimitiveKind::ResourceTemplate,
            name: "entry",
            input_schema: Some(&schema),
            uri_template: Some("app://items/{id}/{city}"),
        };
        let raw = json!({"url": "http://h/{id}/{city}", "method": "GET"});
        let config = HttpInvocationConfig::parse(&raw, &primitive).unwrap();
        let invoker = HttpInvoker::create(config, &primitive).unwrap();

        let bound = invoker.bind_uri("app://items/42/London").unwrap();
        assert_eq!(bound, json!({"id": 42, "city": "London"}));

        assert!(invoker.bind_uri("app://items/42").is_err());
    }

    #[test]
    fn test_body_building_rules() {
        let schema = json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "payload": {"type": "object"}
            }
        });
        let primitive = tool_primitive(&schema);

        // URL-consumed fields are deleted from the body
        let raw = json!({"url": "http://h/{id}", "method": "POST"});
        let config = HttpInvocationConfig::parse(&raw, &primitive).unwrap();
        let invoker = HttpInvoker::create(config, &primitive).unwrap();
        let body = invoker
            .build_body(&json!({"id": 7, "payload": {"a": 1}}))
            .unwrap()
            .unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({"payload": {"a": 1}})
        );

        // bodyRoot replaces the body with the addressed value
        let raw = json!({"url": "http://h/submit", "method": "POST", "bodyRoot": "payload"});
        let config = HttpInvocationConfig::parse(&raw, &primitive).unwrap();
        let invoker = HttpInvoker::create(config, &primitive).unwrap();
        let body = invoker
            .build_body(&json!({"payload": {"a": 1, "b": 2}}))
            .unwrap()
            .unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({"a": 1, "b": 2})
        );

        // Absent bodyRoot path is a request error
        assert!(invoker.build_body(&json!({"other": 1})).is_err());

        // bodyAsArray wraps the pruned object
        let raw = json!({"url": "http://h/submit", "method": "POST", "bodyAsArray": true});
        let config = HttpInvocationConfig::parse(&raw, &primitive).unwrap();
        let invoker = HttpInvoker::create(config, &primitive).unwrap();
        let body = invoker.build_body(&json!({"id": 1})).unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!([{"id": 1}])
        );
    }

    #[test]
    fn test_get_has_no_body() {
        let schema = id_query_schema();
        let primitive = tool_primitive(&schema);
        let raw = json!({"url": "http://h/{id}", "method": "GET"});
        let config = HttpInvocationConfig::parse(&raw, &primitive).unwrap();
        let invoker = HttpInvoker::create(config, &primitive).unwrap();
        assert_eq!(invoker.build_body(&json!({"id": 1})).unwrap(), None);
    }

    #[test]
    fn test_render_url_appends_leftover_scalars() {
        let schema = id_query_schema();
        let primitive = tool_primitive(&schema);
        let raw = json!({"url": "http://h/users/{id}", "method": "GET"});
        let config = HttpInvocationConfig::parse(&raw, &primitive).unwrap();
        let invoker = HttpInvoker::create(config, &primitive).unwrap();

        let arguments = json!({"id": 7, "q": "hi"});
        let binding = RequestBinding::new(arguments.clone());
        let url = invoker.render_url(&binding, &arguments).unwrap();
        assert_eq!(url.path(), "/users/7");
        assert_eq!(url.query(), Some("q=hi"));
    }
}
