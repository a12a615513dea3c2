//! RFC 6570 URI templates (level 1)
//!
//! Resource templates declare URIs like `weather://forecast/{city}/{date}`.
//! Besides expansion this module supports the reverse direction: matching a
//! concrete request URI back into variable values, which is how
//! resources/read requests are routed to the owning template.

use crate::error::{TemplateError, TemplateResult};
use std::collections::HashMap;

/// One piece of a parsed URI template
#[derive(Debug, Clone, PartialEq)]
enum UriSegment {
    /// Literal text matched verbatim
    Literal(String),

    /// A simple-expansion variable
    Variable(String),
}

/// A parsed RFC 6570 (level 1) URI template
#[derive(Debug, Clone, PartialEq)]
pub struct UriTemplate {
    /// Original template text
    source: String,

    /// Ordered literal/variable segments
    segments: Vec<UriSegment>,
}

impl UriTemplate {
    /// Parse a URI template
    pub fn parse(input: &str) -> TemplateResult<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = input.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => {
                                return Err(TemplateError::UriSyntax(format!(
                                    "nested '{{' in '{}'",
                                    input
                                )));
                            }
                            Some(other) => name.push(other),
                            None => {
                                return Err(TemplateError::UriSyntax(format!(
                                    "unterminated expression in '{}'",
                                    input
                                )));
                            }
                        }
                    }

                    if name.is_empty() || !name.chars().all(is_varchar) {
                        return Err(TemplateError::UriSyntax(format!(
                            "invalid variable name '{{{}}}' in '{}'",
                            name, input
                        )));
                    }

                    if !literal.is_empty() {
                        segments.push(UriSegment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(UriSegment::Variable(name));
                }
                '}' => {
                    return Err(TemplateError::UriSyntax(format!("unmatched '}}' in '{}'", input)));
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(UriSegment::Literal(literal));
        }

        Ok(Self {
            source: input.to_string(),
            segments,
        })
    }

    /// The original template text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The variable names in template order
    pub fn variable_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                UriSegment::Variable(name) => Some(name.as_str()),
                UriSegment::Literal(_) => None,
            })
            .collect()
    }

    /// Match a concrete URI, producing one value per declared variable
    ///
    /// Every variable must capture a non-empty value; a literal mismatch or
    /// leftover text fails the match. Captured values are percent-decoded.
    pub fn match_uri(&self, uri: &str) -> TemplateResult<HashMap<String, String>> {
        let mut values = HashMap::new();
        let mut rest = uri;

        let mismatch = || TemplateError::UriMismatch {
            template: self.source.clone(),
            uri: uri.to_string(),
        };

        let mut segments = self.segments.iter().peekable();
        while let Some(segment) = segments.next() {
            match segment {
                UriSegment::Literal(text) => {
                    rest = rest.strip_prefix(text.as_str()).ok_or_else(mismatch)?;
                }
                UriSegment::Variable(name) => {
                    let captured = match segments.peek() {
                        Some(UriSegment::Literal(next)) => {
                            let end = rest.find(next.as_str()).ok_or_else(mismatch)?;
                            let (captured, remainder) = rest.split_at(end);
                            rest = remainder;
                            captured
                        }
                        // Adjacent variables cannot be delimited
                        Some(UriSegment::Variable(_)) => return Err(mismatch()),
                        None => std::mem::take(&mut rest),
                    };

                    // Simple expansion never produces '/' or an empty value
                    if captured.is_empty() || captured.contains('/') {
                        return Err(mismatch());
                    }

                    values.insert(name.clone(), percent_decode(captured).ok_or_else(mismatch)?);
                }
            }
        }

        if !rest.is_empty() {
            return Err(mismatch());
        }

        Ok(values)
    }
}

fn is_varchar(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// Decode percent-escapes, rejecting malformed sequences
fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = std::str::from_utf8(bytes.get(i + 1..i + 3)?).ok()?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(decoded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_variable_names() {
        let template = UriTemplate::parse("weather://forecast/{city}/{date}").unwrap();
        assert_eq!(template.variable_names(), vec!["city", "date"]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(UriTemplate::parse("weather://{city").is_err());
        assert!(UriTemplate::parse("weather://city}").is_err());
        assert!(UriTemplate::parse("weather://{ci{ty}}").is_err());
        assert!(UriTemplate::parse("weather://{}").is_err());
    }

    #[test]
    fn test_match_extracts_variables() {
        let template = UriTemplate::parse("weather://forecast/{city}/{date}").unwrap();
        let values = template
            .match_uri("weather://forecast/London/2025-10-07")
            .unwrap();
        assert_eq!(values["city"], "London");
        assert_eq!(values["date"], "2025-10-07");
    }

    #[test]
    fn test_match_rejects_wrong_shape() {
        let template = UriTemplate::parse("weather://forecast/{city}/{date}").unwrap();
        assert!(template.match_uri("weather://forecast/London").is_err());
        assert!(template.match_uri("weather://other/London/2025-10-07").is_err());
        assert!(template
            .match_uri("weather://forecast/London/2025-10-07/extra")
            .is_err());
        assert!(template.match_uri("weather://forecast//2025-10-07").is_err());
    }

    #[test]
    fn test_match_decodes_percent_escapes() {
        let template = UriTemplate::parse("files://{name}").unwrap();
        let values = template.match_uri("files://report%202025.txt").unwrap();
        assert_eq!(values["name"], "report 2025.txt");
    }

    #[test]
    fn test_match_rejects_bad_escape() {
        let template = UriTemplate::parse("files://{name}").unwrap();
        assert!(template.match_uri("files://bad%2").is_err());
        assert!(template.match_uri("files://bad%zz").is_err());
    }

    #[test]
    fn test_trailing_variable_captures_rest() {
        let template = UriTemplate::parse("users://{id}").unwrap();
        let values = template.match_uri("users://42").unwrap();
        assert_eq!(values["id"], "42");
    }
}
