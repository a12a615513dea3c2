//! Streamable-HTTP transport
//!
//! The MCP endpoint is a single route: POST carries JSON-RPC requests and
//! answers with plain JSON responses, GET answers with endpoint discovery
//! information. Authentication applies to the MCP route only; health
//! routes are mounted alongside and bypass it.

use crate::dispatch::{McpServer, RequestMeta};
use crate::error::{ServerError, ServerResult};
use crate::health::{liveness_body, readiness_body, HealthState};
use crate::security::JwksAuth;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use genmcp_config::StreamableHttpConfig;
use genmcp_protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, SUPPORTED_PROTOCOL_VERSIONS};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Shared state behind the HTTP routes
#[derive(Clone)]
pub struct AppState {
    /// The assembled dispatcher
    pub server: Arc<McpServer>,

    /// Token validator; `None` disables authentication
    pub auth: Option<Arc<JwksAuth>>,

    /// Health flag served by the readiness route
    pub health: HealthState,

    /// Whether sessions are stateless
    pub stateless: bool,
}

/// Build the axum router for the MCP endpoint plus health routes
pub fn build_router(state: AppState, config: &StreamableHttpConfig) -> Router {
    let mut router = Router::new().route(
        &config.base_path,
        get(endpoint_info_handler).post(mcp_post_handler),
    );

    if let Some(health) = &config.health {
        if health.enabled {
            let readiness_state = state.health.clone();
            router = router
                .route(&health.liveness_path, get(|| async { Json(liveness_body()) }))
                .route(
                    &health.readiness_path,
                    get(move || async move {
                        let (status, body) = readiness_body(&readiness_state);
                        (status, Json(body))
                    }),
                );
        }
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Handle GET requests to the MCP endpoint (discovery)
async fn endpoint_info_handler(State(state): State<AppState>) -> impl IntoResponse {
    let info = state.server.server_info();
    Json(serde_json::json!({
        "name": info.name,
        "version": info.version,
        "protocolVersions": SUPPORTED_PROTOCOL_VERSIONS,
        "transport": "streamablehttp",
        "stateless": state.stateless,
    }))
}

/// Handle POST requests to the MCP endpoint (JSON-RPC)
async fn mcp_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Authentication first; health routes never reach this handler
    let mut scopes = None;
    if let Some(auth) = &state.auth {
        let authorization = headers
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        match auth.validate_bearer(authorization) {
            Ok(claims) => {
                scopes = Some(claims.scopes().iter().map(|s| s.to_string()).collect());
            }
            Err(reason) => {
                debug!(reason = %reason, "rejecting unauthenticated request");
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"error": "unauthorized"})),
                )
                    .into_response();
            }
        }
    }

    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "request body is not valid JSON-RPC");
            let response =
                JsonRpcResponse::error(JsonRpcError::parse_error(None), None);
            return Json(response).into_response();
        }
    };

    let meta = RequestMeta {
        headers: header_map(&headers),
        scopes,
        cancellation: CancellationToken::new(),
    };

    let session_id = session_id_for(&state, &headers);

    match state.server.handle_request(request, meta).await {
        Some(response) => {
            let mut http_response = Json(response).into_response();
            if let Some(session_id) = session_id {
                if let Ok(value) = session_id.parse() {
                    http_response.headers_mut().insert("mcp-session-id", value);
                }
            }
            http_response
        }
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Echo or mint the session id for stateful mode
fn session_id_for(state: &AppState, headers: &HeaderMap) -> Option<String> {
    if state.stateless {
        return None;
    }

    Some(
        headers
            .get("mcp-session-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
    )
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

/// Bind and serve the router, with TLS when configured
pub async fn serve_http(
    router: Router,
    config: &StreamableHttpConfig,
    health: HealthState,
) -> ServerResult<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();

    health.mark_ready();

    match &config.tls {
        Some(tls) => {
            info!(%addr, base_path = %config.base_path, "starting HTTPS transport");
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                &tls.cert_file,
                &tls.key_file,
            )
            .await
            .map_err(|e| ServerError::Transport(format!("TLS setup failed: {}", e)))?;

            axum_server::bind_rustls(addr, tls_config)
                .serve(router.into_make_service())
                .await
                .map_err(|e| ServerError::Transport(e.to_string()))?;
        }
        None => {
            info!(%addr, base_path = %config.base_path, "starting HTTP transport");
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|e| ServerError::Transport(format!("bind failed: {}", e)))?;

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal(health.clone()))
                .await
                .map_err(|e| ServerError::Transport(e.to_string()))?;
        }
    }

    info!("HTTP transport stopped");
    Ok(())
}

/// Resolve on ctrl-c or SIGTERM, flipping readiness first
async fn shutdown_signal(health: HealthState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    health.mark_not_ready();
    info!("shutdown signal received, draining");
}

#[cfg(test)]
mod tests {
    use super::*;
    use genmcp_protocol::ServerInfo;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let server = McpServer::new(
            ServerInfo {
                name: "router-test".to_string(),
                version: "0.1.0".to_string(),
            },
            None,
            reqwest::Client::new(),
        );
        AppState {
            server: Arc::new(server),
            auth: None,
            health: HealthState::new(),
            stateless: true,
        }
    }

    fn http_config() -> StreamableHttpConfig {
        let mut config = StreamableHttpConfig::default();
        config.health = Some(genmcp_config::HealthConfig::default());
        config
    }

    #[tokio::test]
    async fn test_ping_round_trip() {
        let router = build_router(test_state(), &http_config());

        let request = http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                r#"{"jsonrpc":"2.0","method":"ping","id":1}"#,
            ))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let parsed: JsonRpcResponse = serde_json::from_slice(&body).unwrap();
        assert!(!parsed.is_error());
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let router = build_router(test_state(), &http_config());

        let request = http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .body(axum::body::Body::from("{nope"))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let parsed: JsonRpcResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.error.unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_health_routes_answer() {
        let state = test_state();
        let health = state.health.clone();
        let router = build_router(state, &http_config());

        let response = router
            .clone()
            .oneshot(
                http::Request::builder()
                    .uri("/healthz")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Not ready until marked
        let response = router
            .clone()
            .oneshot(
                http::Request::builder()
                    .uri("/readyz")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        health.mark_ready();
        let response = router
            .oneshot(
                http::Request::builder()
                    .uri("/readyz")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_discovery_on_get() {
        let router = build_router(test_state(), &http_config());

        let response = router
            .oneshot(
                http::Request::builder()
                    .uri("/mcp")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["name"], serde_json::json!("router-test"));
    }

    #[tokio::test]
    async fn test_auth_rejects_missing_token() {
        let mut state = test_state();
        state.auth = Some(Arc::new(JwksAuth::from_keys(
            std::collections::HashMap::new(),
            vec!["https://auth.example.com".to_string()],
        )));
        let router = build_router(state, &http_config());

        let request = http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .body(axum::body::Body::from(
                r#"{"jsonrpc":"2.0","method":"ping","id":1}"#,
            ))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
