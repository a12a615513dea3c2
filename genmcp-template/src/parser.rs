//! Template grammar and eager source resolution
//!
//! Grammar: literal characters interleaved with `{ident(.ident)*}`
//! variables. Unmatched or nested braces are syntax errors. `headers.` and
//! `env.` are reserved prefixes inside identifiers; `${NAME}` anywhere in
//! the string reads an environment variable, expanded at parse time when
//! the variable is already set and deferred to render time otherwise.

use crate::binding::Binding;
use crate::error::{TemplateError, TemplateResult};
use genmcp_defs::{FormatSpec, ResolvedSchema};

/// Where a template variable draws its value from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableSource {
    /// A schema property reachable by dot-path from the input-schema root
    Property,

    /// An inbound transport header (case-insensitive lookup)
    Header(String),

    /// A process environment variable
    Env(String),
}

/// A single variable occurrence inside a template
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRef {
    /// Full identifier as written, dot-path for properties
    pub name: String,

    /// Resolved source
    pub source: VariableSource,

    /// Format directive, filled in when the template is bound to a schema
    pub format: Option<FormatSpec>,
}

/// One parsed template segment
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text emitted verbatim
    Literal(String),

    /// A variable substituted at render time
    Variable(VariableRef),
}

/// An immutable, parsed template
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTemplate {
    /// Original template text
    source: String,

    /// Ordered literal/variable segments
    segments: Vec<Segment>,
}

impl ParsedTemplate {
    /// Parse template text into segments
    ///
    /// `${NAME}` expansions whose variable is currently set become literals
    /// here; everything else is resolved at render time.
    pub fn parse(input: &str) -> TemplateResult<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = input.char_indices().peekable();

        while let Some((position, ch)) = chars.next() {
            match ch {
                '$' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    let name = take_until_close(&mut chars, position, input)?;
                    validate_env_name(&name, position)?;
                    match std::env::var(&name) {
                        Ok(value) => literal.push_str(&value),
                        Err(_) => {
                            flush_literal(&mut literal, &mut segments);
                            segments.push(Segment::Variable(VariableRef {
                                name: name.clone(),
                                source: VariableSource::Env(name),
                                format: None,
                            }));
                        }
                    }
                }
                '{' => {
                    let name = take_until_close(&mut chars, position, input)?;
                    let variable = classify(&name, position)?;
                    flush_literal(&mut literal, &mut segments);
                    segments.push(Segment::Variable(variable));
                }
                '}' => {
                    return Err(TemplateError::Syntax {
                        position,
                        message: "unmatched '}'".to_string(),
                    });
                }
                other => literal.push(other),
            }
        }

        flush_literal(&mut literal, &mut segments);

        Ok(Self {
            source: input.to_string(),
            segments,
        })
    }

    /// The original template text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed segments in order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Every variable occurrence in order
    pub fn variables(&self) -> impl Iterator<Item = &VariableRef> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Variable(variable) => Some(variable),
            Segment::Literal(_) => None,
        })
    }

    /// Names of the schema properties this template consumes
    pub fn property_names(&self) -> Vec<&str> {
        self.variables()
            .filter(|v| v.source == VariableSource::Property)
            .map(|v| v.name.as_str())
            .collect()
    }

    /// Top-level argument fields consumed by property variables
    ///
    /// `user.address.city` consumes the top-level `user` field.
    pub fn consumed_root_fields(&self) -> Vec<&str> {
        self.property_names()
            .into_iter()
            .map(|name| name.split('.').next().unwrap_or(name))
            .collect()
    }

    /// Whether the template contains any placeholder at all
    pub fn has_variables(&self) -> bool {
        self.variables().next().is_some()
    }

    /// Eagerly resolve every property variable against the input schema
    ///
    /// Fills in the format directive per variable. Fails when a property
    /// path is unknown, and reports an ambiguity when the schema declares a
    /// top-level property shadowed by a reserved `headers.`/`env.` prefix
    /// used in this template.
    pub fn bind_schema(&mut self, schema: &ResolvedSchema) -> TemplateResult<()> {
        for segment in &mut self.segments {
            let Segment::Variable(variable) = segment else {
                continue;
            };

            match &variable.source {
                VariableSource::Property => {
                    let format = schema
                        .format_spec_for(&variable.name)
                        .map_err(|_| TemplateError::UnknownVariable {
                            name: variable.name.clone(),
                        })?;
                    variable.format = Some(format);
                }
                VariableSource::Header(_) => {
                    if schema.has_property("headers") {
                        return Err(TemplateError::AmbiguousSource {
                            name: variable.name.clone(),
                            conflict: "headers".to_string(),
                        });
                    }
                }
                VariableSource::Env(_) => {
                    // ${NAME} expansions never collide; only env.X can
                    if variable.name.starts_with("env.") && schema.has_property("env") {
                        return Err(TemplateError::AmbiguousSource {
                            name: variable.name.clone(),
                            conflict: "env".to_string(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Require the template to contain no placeholders
    ///
    /// Static resources must render without a binding.
    pub fn require_static(&self) -> TemplateResult<()> {
        if let Some(variable) = self.variables().next() {
            return Err(TemplateError::Syntax {
                position: 0,
                message: format!(
                    "static template cannot contain placeholders, found '{{{}}}'",
                    variable.name
                ),
            });
        }
        Ok(())
    }

    /// Render the template against a per-request binding
    ///
    /// Variables render left-to-right; values follow the format directive
    /// recorded at bind time, never an ambient string coercion.
    pub fn render(&self, binding: &dyn Binding) -> TemplateResult<String> {
        let mut output = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Variable(variable) => {
                    output.push_str(&render_variable(variable, binding)?);
                }
            }
        }

        Ok(output)
    }
}

/// Render a single variable occurrence
pub(crate) fn render_variable(variable: &VariableRef, binding: &dyn Binding) -> TemplateResult<String> {
    match &variable.source {
        VariableSource::Property => {
            let value = binding.get_property(&variable.name).ok_or_else(|| TemplateError::Render {
                name: variable.name.clone(),
                message: "argument is missing".to_string(),
            })?;

            let format = variable.format.ok_or_else(|| TemplateError::Render {
                name: variable.name.clone(),
                message: "template was not bound to a schema".to_string(),
            })?;

            format.render(&value).map_err(|e| TemplateError::Render {
                name: variable.name.clone(),
                message: e.to_string(),
            })
        }
        VariableSource::Header(header) => {
            binding.get_header(header).ok_or_else(|| TemplateError::Render {
                name: variable.name.clone(),
                message: format!("header '{}' is not present on the request", header),
            })
        }
        VariableSource::Env(env) => binding.get_env(env).ok_or_else(|| TemplateError::Render {
            name: variable.name.clone(),
            message: format!("environment variable '{}' is not set", env),
        }),
    }
}

/// Consume characters up to the matching '}' and return the identifier
fn take_until_close(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    open_position: usize,
    input: &str,
) -> TemplateResult<String> {
    let mut name = String::new();

    for (position, ch) in chars.by_ref() {
        match ch {
            '}' => return Ok(name),
            '{' => {
                return Err(TemplateError::Syntax {
                    position,
                    message: "nested '{' inside placeholder".to_string(),
                });
            }
            other => name.push(other),
        }
    }

    Err(TemplateError::Syntax {
        position: open_position,
        message: format!("unterminated placeholder in '{}'", input),
    })
}

/// Classify an identifier into its source
fn classify(name: &str, position: usize) -> TemplateResult<VariableRef> {
    if name.is_empty() {
        return Err(TemplateError::Syntax {
            position,
            message: "empty placeholder".to_string(),
        });
    }

    for segment in name.split('.') {
        if segment.is_empty() {
            return Err(TemplateError::Syntax {
                position,
                message: format!("empty path segment in '{}'", name),
            });
        }
        if !segment.chars().all(is_ident_char) {
            return Err(TemplateError::Syntax {
                position,
                message: format!("invalid character in identifier '{}'", name),
            });
        }
    }

    let source = if let Some(header) = name.strip_prefix("headers.") {
        VariableSource::Header(header.to_string())
    } else if let Some(env) = name.strip_prefix("env.") {
        VariableSource::Env(env.to_string())
    } else {
        VariableSource::Property
    };

    Ok(VariableRef {
        name: name.to_string(),
        source,
        format: None,
    })
}

fn validate_env_name(name: &str, position: usize) -> TemplateResult<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TemplateError::Syntax {
            position,
            message: format!("invalid environment variable name '${{{}}}'", name),
        });
    }
    Ok(())
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn flush_literal(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::RequestBinding;
    use genmcp_defs::ResolvedSchema;
    use serde_json::json;

    fn schema() -> ResolvedSchema {
        ResolvedSchema::resolve(&json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "city": {"type": "string"},
                "user": {
                    "type": "object",
                    "properties": {"name": {"type": "string"}}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_literals_and_variables() {
        let template = ParsedTemplate::parse("/users/{id}/posts").unwrap();
        assert_eq!(template.segments().len(), 3);
        assert_eq!(template.property_names(), vec!["id"]);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(ParsedTemplate::parse("/users/{id").is_err());
        assert!(ParsedTemplate::parse("/users/id}").is_err());
        assert!(ParsedTemplate::parse("/users/{{id}}").is_err());
        assert!(ParsedTemplate::parse("/users/{}").is_err());
        assert!(ParsedTemplate::parse("/users/{a..b}").is_err());
        assert!(ParsedTemplate::parse("/users/{a b}").is_err());
    }

    #[test]
    fn test_source_classification() {
        let template = ParsedTemplate::parse("{id}/{headers.X-Trace}/{env.HOME_DIR}").unwrap();
        let sources: Vec<_> = template.variables().map(|v| v.source.clone()).collect();
        assert_eq!(
            sources,
            vec![
                VariableSource::Property,
                VariableSource::Header("X-Trace".to_string()),
                VariableSource::Env("HOME_DIR".to_string()),
            ]
        );
    }

    #[test]
    fn test_dollar_expansion_at_parse_time() {
        std::env::set_var("GENMCP_TEST_PARSE_HOST", "api.example.com");
        let template = ParsedTemplate::parse("http://${GENMCP_TEST_PARSE_HOST}/v1").unwrap();
        assert!(!template.has_variables());
        assert_eq!(
            template.segments(),
            &[Segment::Literal("http://api.example.com/v1".to_string())]
        );
        std::env::remove_var("GENMCP_TEST_PARSE_HOST");
    }

    #[test]
    fn test_dollar_expansion_deferred_when_unset() {
        let template = ParsedTemplate::parse("http://${GENMCP_TEST_UNSET_HOST}/v1").unwrap();
        assert!(template.has_variables());
        let variable = template.variables().next().unwrap();
        assert_eq!(
            variable.source,
            VariableSource::Env("GENMCP_TEST_UNSET_HOST".to_string())
        );
    }

    #[test]
    fn test_bind_schema_fills_formats() {
        let mut template = ParsedTemplate::parse("/users/{id}/{user.name}").unwrap();
        template.bind_schema(&schema()).unwrap();

        let formats: Vec<_> = template.variables().map(|v| v.format).collect();
        assert_eq!(
            formats,
            vec![
                Some(genmcp_defs::FormatSpec::Decimal),
                Some(genmcp_defs::FormatSpec::Text)
            ]
        );
    }

    #[test]
    fn test_bind_schema_rejects_unknown_property() {
        let mut template = ParsedTemplate::parse("/users/{missing}").unwrap();
        assert!(matches!(
            template.bind_schema(&schema()),
            Err(TemplateError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn test_reserved_prefix_collision_is_ambiguous() {
        let colliding = ResolvedSchema::resolve(&json!({
            "type": "object",
            "properties": {"headers": {"type": "object"}}
        }))
        .unwrap();

        let mut template = ParsedTemplate::parse("{headers.Authorization}").unwrap();
        assert!(matches!(
            template.bind_schema(&colliding),
            Err(TemplateError::AmbiguousSource { .. })
        ));
    }

    #[test]
    fn test_render_left_to_right() {
        let mut template = ParsedTemplate::parse("/users/{id}?city={city}").unwrap();
        template.bind_schema(&schema()).unwrap();

        let binding = RequestBinding::new(json!({"id": 7, "city": "London"}));
        assert_eq!(template.render(&binding).unwrap(), "/users/7?city=London");
    }

    #[test]
    fn test_render_header_lookup_is_case_insensitive() {
        let template = ParsedTemplate::parse("{headers.X-Token}").unwrap();
        let binding = RequestBinding::new(json!({}))
            .with_header("x-token", "secret");
        assert_eq!(template.render(&binding).unwrap(), "secret");
    }

    #[test]
    fn test_static_requirement() {
        assert!(ParsedTemplate::parse("http://fixed.example.com")
            .unwrap()
            .require_static()
            .is_ok());
        assert!(ParsedTemplate::parse("http://{host}")
            .unwrap()
            .require_static()
            .is_err());
    }
}
