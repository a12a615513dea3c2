//! Extends resolution
//!
//! An extends block composes a deep copy of a named base config with three
//! operations applied in order: `extend` (strings concatenate, lists
//! append, maps union with the extension winning), `override` (per-field
//! replace of non-null fields) and `remove` (strings empty, list elements
//! delete by deep equality, map keys delete). A field targeted by more
//! than one operation is a load-time conflict. The composed config is
//! re-validated by the kind-specific parser afterwards.

use crate::error::{InvokeError, InvokeResult};
use genmcp_defs::ExtendsSpec;
use serde_json::{Map, Value};

/// Apply an extends descriptor to a base config, yielding the effective config
pub fn resolve_extends(base: &Value, spec: &ExtendsSpec) -> InvokeResult<Value> {
    let mut effective = base.clone();

    check_conflicts(spec)?;

    if let Some(extend) = &spec.extend {
        apply_extend(&mut effective, extend)?;
    }

    if let Some(override_with) = &spec.override_with {
        apply_override(&mut effective, override_with)?;
    }

    if let Some(remove) = &spec.remove {
        apply_remove(&mut effective, remove)?;
    }

    Ok(effective)
}

/// Reject descriptors where one field appears under several operations
fn check_conflicts(spec: &ExtendsSpec) -> InvokeResult<()> {
    let operations: [(&'static str, Option<&Value>); 3] = [
        ("extend", spec.extend.as_ref()),
        ("override", spec.override_with.as_ref()),
        ("remove", spec.remove.as_ref()),
    ];

    let mut seen: Vec<(&str, &'static str)> = Vec::new();
    for (operation, payload) in operations {
        let Some(fields) = payload.map(targeted_fields) else {
            continue;
        };
        let fields = fields?;

        for field in fields {
            if let Some((_, first)) = seen.iter().find(|(name, _)| *name == field) {
                return Err(InvokeError::ExtendsConflict {
                    field: field.to_string(),
                    first,
                    second: operation,
                });
            }
            seen.push((field, operation));
        }
    }

    Ok(())
}

/// The top-level fields an operation payload targets
fn targeted_fields(payload: &Value) -> InvokeResult<Vec<&str>> {
    match payload {
        Value::Object(map) => Ok(map.keys().map(String::as_str).collect()),
        // remove also accepts a plain list of field names
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| InvokeError::Extends("operation lists must contain field names".to_string()))
            })
            .collect(),
        _ => Err(InvokeError::Extends(
            "extend/override/remove payloads must be objects".to_string(),
        )),
    }
}

/// Per-field merge of the extension payload into the base
fn apply_extend(effective: &mut Value, extend: &Value) -> InvokeResult<()> {
    let extend = as_object(extend, "extend")?;
    let target = as_object_mut(effective)?;

    for (field, addition) in extend {
        match target.get_mut(field) {
            None => {
                target.insert(field.clone(), addition.clone());
            }
            Some(existing) => merge_field(field, existing, addition)?,
        }
    }

    Ok(())
}

fn merge_field(field: &str, existing: &mut Value, addition: &Value) -> InvokeResult<()> {
    match (existing, addition) {
        (Value::String(base), Value::String(extra)) => {
            base.push_str(extra);
            Ok(())
        }
        (Value::Array(base), Value::Array(extra)) => {
            base.extend(extra.iter().cloned());
            Ok(())
        }
        (Value::Object(base), Value::Object(extra)) => {
            // Extension wins on key collision
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
            Ok(())
        }
        _ => Err(InvokeError::Extends(format!(
            "field '{}' cannot be extended: base and extension types must both be string, list or map",
            field
        ))),
    }
}

/// Replace every non-null field of the override payload
fn apply_override(effective: &mut Value, override_with: &Value) -> InvokeResult<()> {
    let override_with = as_object(override_with, "override")?;
    let target = as_object_mut(effective)?;

    for (field, replacement) in override_with {
        if replacement.is_null() {
            continue;
        }
        target.insert(field.clone(), replacement.clone());
    }

    Ok(())
}

/// Empty, delete-from or prune the targeted fields
fn apply_remove(effective: &mut Value, remove: &Value) -> InvokeResult<()> {
    let target = as_object_mut(effective)?;

    match remove {
        // A list of field names empties each named field
        Value::Array(fields) => {
            for field in fields {
                let field = field
                    .as_str()
                    .ok_or_else(|| InvokeError::Extends("remove lists must contain field names".to_string()))?;
                if let Some(existing) = target.get_mut(field) {
                    remove_entirely(existing);
                }
            }
            Ok(())
        }
        Value::Object(map) => {
            for (field, what) in map {
                let Some(existing) = target.get_mut(field) else {
                    continue;
                };
                remove_from_field(field, existing, what)?;
            }
            Ok(())
        }
        _ => Err(InvokeError::Extends("remove payload must be an object or a list".to_string())),
    }
}

fn remove_from_field(field: &str, existing: &mut Value, what: &Value) -> InvokeResult<()> {
    match existing {
        Value::String(s) => {
            s.clear();
            Ok(())
        }
        Value::Array(items) => {
            let Value::Array(victims) = what else {
                return Err(InvokeError::Extends(format!(
                    "removing from list field '{}' requires a list of elements",
                    field
                )));
            };
            items.retain(|item| !victims.contains(item));
            Ok(())
        }
        Value::Object(map) => {
            // Keys arrive as either a list or a map carrying those keys
            let keys: Vec<&str> = match what {
                Value::Array(keys) => keys
                    .iter()
                    .map(|key| {
                        key.as_str().ok_or_else(|| {
                            InvokeError::Extends(format!("map keys removed from '{}' must be strings", field))
                        })
                    })
                    .collect::<InvokeResult<_>>()?,
                Value::Object(keys) => keys.keys().map(String::as_str).collect(),
                _ => {
                    return Err(InvokeError::Extends(format!(
                        "removing from map field '{}' requires a list of keys or a map",
                        field
                    )));
                }
            };
            for key in keys {
                map.remove(key);
            }
            Ok(())
        }
        _ => Err(InvokeError::Extends(format!(
            "field '{}' cannot be removed from: only strings, lists and maps support remove",
            field
        ))),
    }
}

fn remove_entirely(existing: &mut Value) {
    match existing {
        Value::String(s) => s.clear(),
        Value::Array(items) => items.clear(),
        Value::Object(map) => map.clear(),
        other => *other = Value::Null,
    }
}

fn as_object<'a>(value: &'a Value, operation: &str) -> InvokeResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| InvokeError::Extends(format!("{} payload must be an object", operation)))
}

fn as_object_mut(value: &mut Value) -> InvokeResult<&mut Map<String, Value>> {
    value
        .as_object_mut()
        .ok_or_else(|| InvokeError::Extends("base invocation config must be an object".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(extend: Option<Value>, override_with: Option<Value>, remove: Option<Value>) -> ExtendsSpec {
        ExtendsSpec {
            from: "base".to_string(),
            extend,
            override_with,
            remove,
        }
    }

    #[test]
    fn test_extend_and_override_merge() {
        let base = json!({"url": "http://h", "headers": {"A": "1"}});
        let result = resolve_extends(
            &base,
            &spec(
                Some(json!({"headers": {"B": "2"}})),
                Some(json!({"method": "POST"})),
                None,
            ),
        )
        .unwrap();

        assert_eq!(
            result,
            json!({
                "url": "http://h",
                "method": "POST",
                "headers": {"A": "1", "B": "2"}
            })
        );
    }

    #[test]
    fn test_conflicting_operations_rejected() {
        let base = json!({"headers": {"A": "1"}});
        let err = resolve_extends(
            &base,
            &spec(
                Some(json!({"headers": {"B": "2"}})),
                Some(json!({"headers": {"C": "3"}})),
                None,
            ),
        )
        .unwrap_err();

        assert!(matches!(err, InvokeError::ExtendsConflict { ref field, .. } if field == "headers"));
    }

    #[test]
    fn test_string_concatenation() {
        let base = json!({"url": "http://h"});
        let result = resolve_extends(&base, &spec(Some(json!({"url": "/v1"})), None, None)).unwrap();
        assert_eq!(result["url"], json!("http://h/v1"));
    }

    #[test]
    fn test_extension_wins_on_map_collision() {
        let base = json!({"headers": {"A": "1"}});
        let result =
            resolve_extends(&base, &spec(Some(json!({"headers": {"A": "9"}})), None, None)).unwrap();
        assert_eq!(result["headers"]["A"], json!("9"));
    }

    #[test]
    fn test_extend_then_remove_restores_list() {
        let original = json!({"args": ["-v", "-q"]});

        let extended = resolve_extends(&original, &spec(Some(json!({"args": ["-x"]})), None, None)).unwrap();
        assert_eq!(extended["args"], json!(["-v", "-q", "-x"]));

        let removed = resolve_extends(&extended, &spec(None, None, Some(json!({"args": ["-x"]})))).unwrap();
        assert_eq!(removed["args"], original["args"]);
    }

    #[test]
    fn test_override_is_last_writer_wins() {
        let base = json!({"method": "GET"});
        let once = resolve_extends(&base, &spec(None, Some(json!({"method": "PUT"})), None)).unwrap();
        let twice = resolve_extends(&once, &spec(None, Some(json!({"method": "POST"})), None)).unwrap();
        assert_eq!(twice["method"], json!("POST"));
    }

    #[test]
    fn test_remove_string_empties() {
        let base = json!({"bodyRoot": "payload"});
        let result = resolve_extends(&base, &spec(None, None, Some(json!({"bodyRoot": ""})))).unwrap();
        assert_eq!(result["bodyRoot"], json!(""));
    }

    #[test]
    fn test_remove_map_keys_as_list_or_map() {
        let base = json!({"headers": {"A": "1", "B": "2"}});

        let by_list =
            resolve_extends(&base, &spec(None, None, Some(json!({"headers": ["A"]})))).unwrap();
        assert_eq!(by_list["headers"], json!({"B": "2"}));

        let by_map =
            resolve_extends(&base, &spec(None, None, Some(json!({"headers": {"B": "x"}})))).unwrap();
        assert_eq!(by_map["headers"], json!({"A": "1"}));
    }

    #[test]
    fn test_remove_accepts_bare_field_list() {
        let base = json!({"headers": {"A": "1"}, "url": "http://h"});
        let result = resolve_extends(&base, &spec(None, None, Some(json!(["headers"])))).unwrap();
        assert_eq!(result["headers"], json!({}));
        assert_eq!(result["url"], json!("http://h"));
    }

    #[test]
    fn test_extend_scalar_is_an_error() {
        let base = json!({"port": 80});
        assert!(resolve_extends(&base, &spec(Some(json!({"port": 81})), None, None)).is_err());
    }

    #[test]
    fn test_override_null_is_ignored() {
        let base = json!({"method": "GET"});
        let result =
            resolve_extends(&base, &spec(None, Some(json!({"method": null})), None)).unwrap();
        assert_eq!(result["method"], json!("GET"));
    }

    #[test]
    fn test_base_is_not_mutated() {
        let base = json!({"headers": {"A": "1"}});
        let _ = resolve_extends(&base, &spec(Some(json!({"headers": {"B": "2"}})), None, None)).unwrap();
        assert_eq!(base, json!({"headers": {"A": "1"}}));
    }
}
