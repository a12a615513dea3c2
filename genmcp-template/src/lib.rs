//! Template parsing and rendering for GenMCP
//!
//! Templates are the small expression language at the centre of the
//! invocation pipeline: literal text interleaved with `{name}` variables,
//! where a name binds to a schema property reachable by dot-path, an
//! inbound header (`headers.X`), or an environment variable (`env.X` or
//! `${NAME}`). Parsing is eager and source resolution happens at load
//! time; rendering at request time only reads the per-request binding and
//! formats values according to their schema type.

pub mod binding;
pub mod error;
pub mod formatter;
pub mod parser;
pub mod uri;

pub use binding::{Binding, RequestBinding};
pub use error::{TemplateError, TemplateResult};
pub use formatter::VariableFormatter;
pub use parser::{ParsedTemplate, Segment, VariableRef, VariableSource};
pub use uri::UriTemplate;
