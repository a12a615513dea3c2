//! Template error types

use thiserror::Error;

/// Template result type
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors raised while parsing, binding or rendering templates
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Malformed template text
    #[error("Template syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// A placeholder that resolves to no known source
    #[error("Template variable '{name}' is not a schema property, header or environment source")]
    UnknownVariable { name: String },

    /// A reserved prefix collides with a declared schema property
    #[error("Template variable '{name}' is ambiguous: the input schema declares a '{conflict}' property")]
    AmbiguousSource { name: String, conflict: String },

    /// A bound value was missing or had the wrong shape at render time
    #[error("Failed to render template variable '{name}': {message}")]
    Render { name: String, message: String },

    /// Schema interaction failed
    #[error(transparent)]
    Schema(#[from] genmcp_defs::DefsError),

    /// Malformed URI template
    #[error("URI template syntax error: {0}")]
    UriSyntax(String),

    /// A request URI did not match the entry's URI template
    #[error("URI '{uri}' does not match template '{template}'")]
    UriMismatch { template: String, uri: String },
}
