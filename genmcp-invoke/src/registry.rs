//! Invocation-config registry
//!
//! A process-wide mapping from invocation kind to a (parser, factory)
//! pair. The parser consumes the raw JSON block plus the enclosing
//! primitive and returns a typed config; the factory turns that config
//! into an invoker. Extends is resolved here: the named base is composed
//! with the entry's operations and the effective config re-enters the
//! registry under the base's kind.

use crate::cli::{CliInvocationConfig, CliInvoker};
use crate::error::{InvokeError, InvokeResult};
use crate::extends::resolve_extends;
use crate::http::{HttpInvocationConfig, HttpInvoker};
use crate::invoker::{Invoker, PrimitiveSpec};
use genmcp_defs::{InvocationSpec, ToolDefinitions};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque typed config passed from parser to factory
pub type ParsedConfig = Box<dyn Any + Send>;

/// Parses a raw config block for one kind
pub type ParseFn = fn(&Value, &PrimitiveSpec<'_>) -> InvokeResult<ParsedConfig>;

/// Builds an invoker from a parsed config
pub type FactoryFn = fn(ParsedConfig, &PrimitiveSpec<'_>) -> InvokeResult<Arc<dyn Invoker>>;

/// Registry of invocation kinds
pub struct InvocationRegistry {
    kinds: HashMap<&'static str, (ParseFn, FactoryFn)>,
}

impl InvocationRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// The registry with the built-in `http` and `cli` kinds
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("http", parse_http, create_http);
        registry.register("cli", parse_cli, create_cli);
        registry
    }

    /// Register a kind's parser and factory
    pub fn register(&mut self, kind: &'static str, parse: ParseFn, factory: FactoryFn) {
        self.kinds.insert(kind, (parse, factory));
    }

    /// Parse and construct an invoker for one catalogue entry
    ///
    /// Extends entries are flattened against the document's invocation
    /// bases first; the effective config is then validated by the base
    /// kind's parser like any directly written config.
    pub fn build(
        &self,
        invocation: &InvocationSpec,
        catalog: &ToolDefinitions,
        primitive: &PrimitiveSpec<'_>,
    ) -> InvokeResult<Arc<dyn Invoker>> {
        match invocation {
            InvocationSpec::Http(raw) => self.build_kind("http", raw, primitive),
            InvocationSpec::Cli(raw) => self.build_kind("cli", raw, primitive),
            InvocationSpec::Extends(extends) => {
                let base = catalog.invocation_base(&extends.from).ok_or_else(|| {
                    InvokeError::Extends(format!("unknown invocation base '{}'", extends.from))
                })?;

                let (kind, base_raw) = match base {
                    InvocationSpec::Http(raw) => ("http", raw),
                    InvocationSpec::Cli(raw) => ("cli", raw),
                    // Bases are validated to be non-extends at load time
                    InvocationSpec::Extends(_) => {
                        return Err(InvokeError::Extends(format!(
                            "invocation base '{}' must not itself use extends",
                            extends.from
                        )));
                    }
                };

                let effective = resolve_extends(base_raw, extends)?;
                self.build_kind(kind, &effective, primitive)
            }
        }
    }

    fn build_kind(
        &self,
        kind: &str,
        raw: &Value,
        primitive: &PrimitiveSpec<'_>,
    ) -> InvokeResult<Arc<dyn Invoker>> {
        let (parse, factory) = self.kinds.get(kind).ok_or_else(|| InvokeError::UnknownKind {
            kind: kind.to_string(),
        })?;

        let config = parse(raw, primitive)?;
        factory(config, primitive)
    }
}

impl Default for InvocationRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn parse_http(raw: &Value, primitive: &PrimitiveSpec<'_>) -> InvokeResult<ParsedConfig> {
    Ok(Box::new(HttpInvocationConfig::parse(raw, primitive)?))
}

fn create_http(config: ParsedConfig, primitive: &PrimitiveSpec<'_>) -> InvokeResult<Arc<dyn Invoker>> {
    let config = config
        .downcast::<HttpInvocationConfig>()
        .map_err(|_| internal_mismatch("http"))?;
    Ok(Arc::new(HttpInvoker::create(*config, primitive)?))
}

fn parse_cli(raw: &Value, primitive: &PrimitiveSpec<'_>) -> InvokeResult<ParsedConfig> {
    Ok(Box::new(CliInvocationConfig::parse(raw, primitive)?))
}

fn create_cli(config: ParsedConfig, primitive: &PrimitiveSpec<'_>) -> InvokeResult<Arc<dyn Invoker>> {
    let config = config
        .downcast::<CliInvocationConfig>()
        .map_err(|_| internal_mismatch("cli"))?;
    Ok(Arc::new(CliInvoker::create(*config, primitive)?))
}

fn internal_mismatch(kind: &str) -> InvokeError {
    InvokeError::ConfigParse {
        kind: kind.to_string(),
        problems: vec!["parser produced a config of the wrong type".to_string()],
    }
}
