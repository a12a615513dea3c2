//! JSON-Schema resolution and request-time validation
//!
//! Raw schemas arrive with internal `$ref` pointers (frequently produced by
//! OpenAPI conversion). Resolution binds those pointers into a standalone
//! tree; a node that references itself through a cycle is replaced by a
//! shallow placeholder that keeps `type` and `description` and closes the
//! object with empty `additionalProperties`. The resolved tree is compiled
//! once and reused for every request.

use crate::error::{DefsError, DefsResult};
use jsonschema::{Draft, Validator};
use serde_json::{json, Map, Value};

/// Format directive used when substituting a value into a template
///
/// Decouples the template engine from any printf dialect: the schema type
/// decides the rendering, never an ambient string coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSpec {
    /// `string` properties render as-is
    Text,
    /// `integer` properties render in decimal
    Decimal,
    /// `number` properties render as floats
    Float,
    /// `boolean` properties render as literal `true`/`false`
    Bool,
}

impl FormatSpec {
    /// Map a JSON-Schema type name to its format directive
    pub fn for_type(type_name: &str) -> DefsResult<Self> {
        match type_name {
            "string" => Ok(FormatSpec::Text),
            "integer" => Ok(FormatSpec::Decimal),
            "number" => Ok(FormatSpec::Float),
            "boolean" => Ok(FormatSpec::Bool),
            other => Err(DefsError::Schema(format!(
                "type '{}' cannot be used in a template",
                other
            ))),
        }
    }

    /// Render a value under this directive
    pub fn render(&self, value: &Value) -> DefsResult<String> {
        match (self, value) {
            (FormatSpec::Text, Value::String(s)) => Ok(s.clone()),
            (FormatSpec::Decimal, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Ok(n.to_string())
            }
            (FormatSpec::Float, Value::Number(n)) => Ok(n.to_string()),
            (FormatSpec::Bool, Value::Bool(b)) => Ok(b.to_string()),
            _ => Err(DefsError::Schema(format!(
                "value {} does not match its declared template type",
                value
            ))),
        }
    }
}

/// A JSON-Schema with internal references expanded and bound
pub struct ResolvedSchema {
    /// The resolved schema tree
    root: Value,

    /// Compiled validator over the resolved tree
    compiled: Validator,
}

impl std::fmt::Debug for ResolvedSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSchema").field("root", &self.root).finish()
    }
}

impl ResolvedSchema {
    /// Resolve a raw schema and compile it for validation
    pub fn resolve(raw: &Value) -> DefsResult<Self> {
        let mut active = Vec::new();
        let root = resolve_node(raw, raw, &mut active)?;

        let compiled = Validator::options()
            .with_draft(Draft::Draft7)
            .build(&root)
            .map_err(|e| DefsError::Schema(format!("failed to compile schema: {}", e)))?;

        Ok(Self { root, compiled })
    }

    /// The resolved schema tree
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Validate a payload against the resolved schema
    pub fn validate(&self, data: &Value) -> DefsResult<()> {
        let messages: Vec<String> = self.compiled.iter_errors(data).map(|e| e.to_string()).collect();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(DefsError::Schema(format!("schema validation failed: {}", messages.join(", "))))
        }
    }

    /// Require the schema root to describe an object
    pub fn require_object_root(&self) -> DefsResult<()> {
        match self.root.get("type").and_then(Value::as_str) {
            Some("object") => Ok(()),
            other => Err(DefsError::Schema(format!(
                "input schema root must have type 'object', got {:?}",
                other.unwrap_or("none")
            ))),
        }
    }

    /// Require every name in `required` to be a declared property
    pub fn require_declared_required(&self) -> DefsResult<()> {
        let Some(required) = self.root.get("required").and_then(Value::as_array) else {
            return Ok(());
        };

        for name in required {
            let Some(name) = name.as_str() else {
                return Err(DefsError::Schema("'required' entries must be strings".to_string()));
            };
            if !self.has_property(name) {
                return Err(DefsError::Schema(format!(
                    "'required' names undeclared property '{}'",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Top-level property names declared by the schema
    pub fn property_names(&self) -> Vec<String> {
        self.properties()
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether the schema declares a given top-level property
    pub fn has_property(&self, name: &str) -> bool {
        self.properties().is_some_and(|props| props.contains_key(name))
    }

    /// Walk a dot-path through `properties`, returning the leaf schema
    pub fn lookup_property(&self, dot_path: &str) -> DefsResult<&Value> {
        let mut current = &self.root;
        for segment in dot_path.split('.') {
            current = current
                .get("properties")
                .and_then(|props| props.get(segment))
                .ok_or_else(|| {
                    DefsError::Schema(format!(
                        "property path '{}' has no segment '{}'",
                        dot_path, segment
                    ))
                })?;
        }
        Ok(current)
    }

    /// Format directive for the property at a dot-path
    pub fn format_spec_for(&self, dot_path: &str) -> DefsResult<FormatSpec> {
        let leaf = self.lookup_property(dot_path)?;
        let type_name = leaf.get("type").and_then(Value::as_str).ok_or_else(|| {
            DefsError::Schema(format!("property '{}' has no declared type", dot_path))
        })?;
        FormatSpec::for_type(type_name)
    }

    fn properties(&self) -> Option<&Map<String, Value>> {
        self.root.get("properties").and_then(Value::as_object)
    }
}

/// Recursively bind `$ref` pointers, breaking cycles with placeholders
fn resolve_node(node: &Value, root: &Value, active: &mut Vec<String>) -> DefsResult<Value> {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                return resolve_reference(reference, root, active);
            }

            let mut resolved = Map::with_capacity(map.len());
            for (key, value) in map {
                resolved.insert(key.clone(), resolve_node(value, root, active)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => {
            let resolved: DefsResult<Vec<Value>> =
                items.iter().map(|item| resolve_node(item, root, active)).collect();
            Ok(Value::Array(resolved?))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_reference(reference: &str, root: &Value, active: &mut Vec<String>) -> DefsResult<Value> {
    let pointer = reference.strip_prefix('#').ok_or_else(|| {
        DefsError::Schema(format!("only internal '#/...' references are supported, got '{}'", reference))
    })?;

    let target = root.pointer(pointer).ok_or_else(|| {
        DefsError::Schema(format!("unresolved schema reference '{}'", reference))
    })?;

    if active.iter().any(|seen| seen == pointer) {
        return Ok(cycle_placeholder(target));
    }

    active.push(pointer.to_string());
    let resolved = resolve_node(target, root, active);
    active.pop();
    resolved
}

/// Shallow stand-in for a node that references itself
fn cycle_placeholder(target: &Value) -> Value {
    let mut placeholder = Map::new();
    if let Some(type_name) = target.get("type") {
        placeholder.insert("type".to_string(), type_name.clone());
    }
    if let Some(description) = target.get("description") {
        placeholder.insert("description".to_string(), description.clone());
    }
    placeholder.insert("additionalProperties".to_string(), json!({}));
    Value::Object(placeholder)
}
