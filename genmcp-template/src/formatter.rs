//! Per-variable formatters for command templates
//!
//! A CLI entry may declare, per command placeholder, a sub-template with at
//! most one placeholder of its own plus an omit-if-false flag. Undeclared
//! placeholders fall back to the identity formatter, so an absent or null
//! argument always collapses to an empty slot rather than an error.

use crate::error::{TemplateError, TemplateResult};
use crate::parser::{ParsedTemplate, Segment};
use genmcp_defs::FormatSpec;
use serde_json::Value;

/// Renderer for one command-template variable
#[derive(Debug, Clone)]
pub struct VariableFormatter {
    /// Sub-template with at most one placeholder
    template: ParsedTemplate,

    /// Suppress output entirely when the value is boolean `false`
    omit_if_false: bool,
}

impl VariableFormatter {
    /// Parse a declared formatter sub-template
    pub fn parse(template: &str, omit_if_false: bool) -> TemplateResult<Self> {
        let parsed = ParsedTemplate::parse(template)?;

        let placeholders = parsed.variables().count();
        if placeholders > 1 {
            return Err(TemplateError::Syntax {
                position: 0,
                message: format!(
                    "formatter template '{}' may contain at most one placeholder, found {}",
                    template, placeholders
                ),
            });
        }

        Ok(Self {
            template: parsed,
            omit_if_false,
        })
    }

    /// The identity formatter used for undeclared placeholders
    pub fn identity() -> Self {
        Self {
            template: ParsedTemplate::parse("{value}").expect("identity template parses"),
            omit_if_false: false,
        }
    }

    /// Render the formatter for a bound value
    ///
    /// Absent and null values emit an empty string, as does boolean `false`
    /// under omit-if-false. Otherwise the formatted value replaces the
    /// sub-template's placeholder.
    pub fn render(&self, value: Option<&Value>, format: FormatSpec) -> TemplateResult<String> {
        let value = match value {
            None | Some(Value::Null) => return Ok(String::new()),
            Some(Value::Bool(false)) if self.omit_if_false => return Ok(String::new()),
            Some(value) => value,
        };

        let mut output = String::new();
        for segment in self.template.segments() {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Variable(variable) => {
                    let rendered = format.render(value).map_err(|e| TemplateError::Render {
                        name: variable.name.clone(),
                        message: e.to_string(),
                    })?;
                    output.push_str(&rendered);
                }
            }
        }

        Ok(output)
    }
}
