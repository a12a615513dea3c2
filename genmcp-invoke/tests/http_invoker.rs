//! End-to-end HTTP invoker scenarios against a mock upstream

use genmcp_invoke::{
    HttpInvocationConfig, HttpInvoker, InvocationContext, InvokeError, Invoker, PrimitiveKind,
    PrimitiveSpec,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn build_invoker(raw: Value, primitive: &PrimitiveSpec<'_>) -> HttpInvoker {
    let config = HttpInvocationConfig::parse(&raw, primitive).unwrap();
    HttpInvoker::create(config, primitive).unwrap()
}

#[tokio::test]
async fn get_with_path_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/7"))
        .and(query_param("q", "hi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("user seven"))
        .mount(&server)
        .await;

    let schema = json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer"},
            "q": {"type": "string"}
        },
        "required": ["id"]
    });
    let primitive = PrimitiveSpec {
        kind: PrimitiveKind::Tool,
        name: "get-user",
        input_schema: Some(&schema),
        uri_template: None,
    };
    let invoker = build_invoker(
        json!({"url": format!("{}/users/{{id}}", server.uri()), "method": "GET"}),
        &primitive,
    );

    let ctx = InvocationContext::new(reqwest::Client::new());
    let result = invoker
        .call_tool(Some(&json!({"id": 7, "q": "hi"})), &ctx)
        .await
        .unwrap();

    assert!(!result.is_error);
    match &result.content[0] {
        genmcp_protocol::ContentItem::Text { text } => assert_eq!(text, "user seven"),
        other => panic!("unexpected content: {:?}", other),
    }
    assert!(result.structured_content.is_none());
}

#[tokio::test]
async fn post_with_body_root() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(header("content-type", "application/json; charset=UTF-8"))
        .and(body_json(json!({"a": 1, "b": 2})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"accepted":true}"#)
                .insert_header("content-type", "application/json"),
        )
        .mount(&server)
        .await;

    let schema = json!({
        "type": "object",
        "properties": {"payload": {"type": "object"}},
        "required": ["payload"]
    });
    let primitive = PrimitiveSpec {
        kind: PrimitiveKind::Tool,
        name: "submit",
        input_schema: Some(&schema),
        uri_template: None,
    };
    let invoker = build_invoker(
        json!({
            "url": format!("{}/submit", server.uri()),
            "method": "POST",
            "bodyRoot": "payload"
        }),
        &primitive,
    );

    let ctx = InvocationContext::new(reqwest::Client::new());
    let result = invoker
        .call_tool(Some(&json!({"payload": {"a": 1, "b": 2}})), &ctx)
        .await
        .unwrap();

    assert!(!result.is_error);
    assert_eq!(result.structured_content, Some(json!({"accepted": true})));
}

#[tokio::test]
async fn resource_template_binds_uri_and_maps_500() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast/London/2025-10-07"))
        .respond_with(ResponseTemplate::new(200).set_body_string("cloudy"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast/Nowhere/2025-10-07"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let schema = json!({
        "type": "object",
        "properties": {
            "city": {"type": "string"},
            "date": {"type": "string"}
        },
        "required": ["city", "date"]
    });
    let primitive = PrimitiveSpec {
        kind: PrimitiveKind::ResourceTemplate,
        name: "forecast",
        input_schema: Some(&schema),
        uri_template: Some("weather://forecast/{city}/{date}"),
    };
    let invoker = build_invoker(
        json!({
            "url": format!("{}/forecast/{{city}}/{{date}}", server.uri()),
            "method": "GET"
        }),
        &primitive,
    );

    let ctx = InvocationContext::new(reqwest::Client::new());

    let result = invoker
        .read_resource_template("weather://forecast/London/2025-10-07", &ctx)
        .await
        .unwrap();
    assert_eq!(result.contents[0].uri, "weather://forecast/London/2025-10-07");
    assert_eq!(result.contents[0].text, "cloudy");
    assert_eq!(result.contents[0].mime_type, "text/plain");

    let err = invoker
        .read_resource_template("weather://forecast/Nowhere/2025-10-07", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::UpstreamHttp { status: 500 }));

    let err = invoker
        .read_resource_template("weather://history/London/2025-10-07", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::TemplateMismatch(_)));
}

#[tokio::test]
async fn non_2xx_tool_result_is_tagged_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let schema = json!({"type": "object", "properties": {}});
    let primitive = PrimitiveSpec {
        kind: PrimitiveKind::Tool,
        name: "broken",
        input_schema: Some(&schema),
        uri_template: None,
    };
    let invoker = build_invoker(
        json!({"url": format!("{}/broken", server.uri()), "method": "GET"}),
        &primitive,
    );

    let ctx = InvocationContext::new(reqwest::Client::new());
    let result = invoker.call_tool(None, &ctx).await.unwrap();
    assert!(result.is_error);
    match &result.content[0] {
        genmcp_protocol::ContentItem::Text { text } => assert_eq!(text, "bad gateway"),
        other => panic!("unexpected content: {:?}", other),
    }
}

#[tokio::test]
async fn prompt_returns_assistant_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/prompt"))
        .and(query_param("topic", "rust"))
        .respond_with(ResponseTemplate::new(200).set_body_string("write about rust"))
        .mount(&server)
        .await;

    let schema = json!({
        "type": "object",
        "properties": {"topic": {"type": "string"}},
        "required": ["topic"]
    });
    let primitive = PrimitiveSpec {
        kind: PrimitiveKind::Prompt,
        name: "writer",
        input_schema: Some(&schema),
        uri_template: None,
    };
    let invoker = build_invoker(
        json!({"url": format!("{}/prompt", server.uri()), "method": "GET"}),
        &primitive,
    );

    let ctx = InvocationContext::new(reqwest::Client::new());
    let mut arguments = std::collections::HashMap::new();
    arguments.insert("topic".to_string(), "rust".to_string());

    let result = invoker.get_prompt(&arguments, &ctx).await.unwrap();
    assert_eq!(result.messages.len(), 1);
    assert_eq!(result.messages[0].role, genmcp_protocol::Role::Assistant);
}

#[tokio::test]
async fn header_templates_render_from_request_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/h"))
        .and(header("X-Forwarded-Token", "tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let schema = json!({"type": "object", "properties": {}});
    let primitive = PrimitiveSpec {
        kind: PrimitiveKind::Tool,
        name: "relay",
        input_schema: Some(&schema),
        uri_template: None,
    };
    let invoker = build_invoker(
        json!({
            "url": format!("{}/h", server.uri()),
            "method": "GET",
            "headers": {"X-Forwarded-Token": "{headers.X-Token}"}
        }),
        &primitive,
    );

    let ctx = InvocationContext::new(reqwest::Client::new())
        .with_headers([("X-Token".to_string(), "tok-123".to_string())]);
    let result = invoker.call_tool(None, &ctx).await.unwrap();
    assert!(!result.is_error);
}

#[tokio::test]
async fn validation_failures_surface_before_dispatch() {
    let schema = json!({
        "type": "object",
        "properties": {"id": {"type": "integer"}},
        "required": ["id"]
    });
    let primitive = PrimitiveSpec {
        kind: PrimitiveKind::Tool,
        name: "strict",
        input_schema: Some(&schema),
        uri_template: None,
    };
    // Upstream is never reached; the URL may be unroutable
    let invoker = build_invoker(
        json!({"url": "http://127.0.0.1:9/users/{id}", "method": "GET"}),
        &primitive,
    );

    let ctx = InvocationContext::new(reqwest::Client::new());

    let err = invoker.call_tool(Some(&json!({"id": "seven"})), &ctx).await.unwrap_err();
    assert!(matches!(err, InvokeError::RequestValidate(_)));
    assert_eq!(err.client_message(), "validation error");

    let err = invoker.call_tool(Some(&json!([1, 2])), &ctx).await.unwrap_err();
    assert!(matches!(err, InvokeError::RequestParse(_)));
}
