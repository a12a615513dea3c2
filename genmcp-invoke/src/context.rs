//! Per-request invocation context
//!
//! Request-scoped state flows through every call as an explicit value:
//! inbound transport headers, the shared outbound HTTP client, and the
//! cancellation signal. Invokers never reach for globals.

use genmcp_template::RequestBinding;
use serde_json::Value;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Request-scoped state handed to every invoker call
#[derive(Debug, Clone)]
pub struct InvocationContext {
    /// Inbound transport headers, keys lowercased; empty under stdio
    headers: HashMap<String, String>,

    /// Shared outbound HTTP client, configured once at startup
    http_client: reqwest::Client,

    /// Cancellation signal propagated from the inbound request
    cancellation: CancellationToken,
}

impl InvocationContext {
    /// Create a context for one inbound request
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            headers: HashMap::new(),
            http_client,
            cancellation: CancellationToken::new(),
        }
    }

    /// Attach the inbound request headers
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.to_lowercase(), value);
        }
        self
    }

    /// Attach an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The shared outbound HTTP client
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// The cancellation token for this request
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Completes when the inbound request is cancelled
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// Build a template binding over an argument object plus these headers
    pub fn binding_for(&self, arguments: Value) -> RequestBinding {
        RequestBinding::new(arguments).with_headers(self.headers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genmcp_template::Binding;
    use serde_json::json;

    #[test]
    fn test_binding_carries_headers() {
        let ctx = InvocationContext::new(reqwest::Client::new())
            .with_headers([("X-Trace".to_string(), "abc".to_string())]);

        let binding = ctx.binding_for(json!({"id": 1}));
        assert_eq!(binding.get_header("x-trace"), Some("abc".to_string()));
        assert_eq!(binding.get_property("id"), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_cancellation_propagates() {
        let token = CancellationToken::new();
        let ctx = InvocationContext::new(reqwest::Client::new()).with_cancellation(token.clone());

        token.cancel();
        // Completes immediately once the token is cancelled
        ctx.cancelled().await;
    }
}
