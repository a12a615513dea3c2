//! Per-request bindings for template rendering
//!
//! A binding is the request-scoped mapping from variable name to value:
//! parsed argument object, inbound transport headers and the process
//! environment. Bindings are read-only; rendering never touches shared
//! mutable state.

use serde_json::Value;
use std::collections::HashMap;

/// Value sources available while rendering one request
pub trait Binding: Send + Sync {
    /// Look up an argument by dot-path from the argument-object root
    fn get_property(&self, dot_path: &str) -> Option<Value>;

    /// Look up an inbound header, case-insensitively
    fn get_header(&self, name: &str) -> Option<String>;

    /// Look up a process environment variable
    fn get_env(&self, name: &str) -> Option<String>;
}

/// The standard binding over a parsed argument object
#[derive(Debug, Clone, Default)]
pub struct RequestBinding {
    /// Parsed argument object
    arguments: Value,

    /// Inbound headers, keys lowercased
    headers: HashMap<String, String>,
}

impl RequestBinding {
    /// Create a binding over an argument object
    pub fn new(arguments: Value) -> Self {
        Self {
            arguments,
            headers: HashMap::new(),
        }
    }

    /// Attach a single inbound header
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_lowercase(), value.into());
        self
    }

    /// Attach a set of inbound headers
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.to_lowercase(), value);
        }
        self
    }

    /// The argument object this binding reads from
    pub fn arguments(&self) -> &Value {
        &self.arguments
    }
}

impl Binding for RequestBinding {
    fn get_property(&self, dot_path: &str) -> Option<Value> {
        let mut current = &self.arguments;
        for segment in dot_path.split('.') {
            current = current.get(segment)?;
        }
        if current.is_null() {
            None
        } else {
            Some(current.clone())
        }
    }

    fn get_header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_lowercase()).cloned()
    }

    fn get_env(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}
