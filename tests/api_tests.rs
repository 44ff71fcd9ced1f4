use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode},
    Router,
};
use mockito::{Matcher, Server};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use web_page_summarizer::{
    api::routes::create_router,
    config::Config,
    throttle::RequestThrottle,
    AppState,
};

fn test_config(llm_url: &str) -> Config {
    let mut config = Config::new("test-key");
    config.openai_base_url = llm_url.to_string();
    config
}

fn app(config: Config) -> Router {
    create_router(AppState::new(config).unwrap())
}

fn post_json(uri: &str, body: Value, peer: [u8; 4]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .extension(ConnectInfo(SocketAddr::from((peer, 40000))))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Accepts connections and never answers them.
async fn silent_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

#[tokio::test]
async fn test_health() {
    let app = app(test_config("http://127.0.0.1:9"));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let app = app(test_config("http://127.0.0.1:9"));

    let (status, body) = send(&app, post_json("/api/analyze", json!({}), [10, 0, 0, 1])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, post_json("/api/analyze", json!({"url": ""}), [10, 0, 0, 1])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = app(test_config("http://127.0.0.1:9"));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/analyze")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unsupported_schemes_rejected_without_network() {
    let mut llm = Server::new_async().await;
    let never = llm.mock("POST", Matcher::Any).expect(0).create_async().await;
    let app = app(test_config(&llm.url()));

    for url in ["ftp://x", "javascript:x", "file:///etc/passwd", "example.com"] {
        let (status, body) = send(&app, post_json("/api/analyze", json!({"url": url}), [10, 0, 0, 2])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{url}");
        assert!(body.get("summary").is_none());
    }
    never.assert_async().await;
}

#[tokio::test]
async fn test_analyze_success() {
    let mut site = Server::new_async().await;
    site.mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(r#"<html><head><title>Hi</title><style>p{}</style></head><body>hello world<img src="/a.png"></body></html>"#)
        .create_async()
        .await;

    let mut llm = Server::new_async().await;
    llm.mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("hello world".to_string()))
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"content": "# Hi\n\n- **hello** world"}}]}).to_string())
        .create_async()
        .await;

    let app = app(test_config(&llm.url()));
    let (status, body) = send(&app, post_json("/api/analyze", json!({"url": site.url()}), [10, 0, 0, 3])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Hi");
    assert_eq!(body["originalContent"], "hello world");
    assert_eq!(body["summary"], "# Hi\n\n- **hello** world");
    let html = body["originalHtml"].as_str().unwrap();
    assert!(html.contains(r#"<img src="/a.png">"#));
    assert!(!html.contains("<style"));
}

#[tokio::test]
async fn test_fetch_timeout_is_request_timeout() {
    let addr = silent_server().await;
    let mut config = test_config("http://127.0.0.1:9");
    config.fetch_timeout = Duration::from_millis(200);
    let app = app(config);

    let (status, body) = send(
        &app,
        post_json("/api/analyze", json!({"url": format!("http://{}/", addr)}), [10, 0, 0, 4]),
    )
    .await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert!(body["error"].is_string());
    assert!(body.get("summary").is_none());
}

#[tokio::test]
async fn test_upstream_not_found() {
    let mut site = Server::new_async().await;
    site.mock("GET", "/missing").with_status(404).create_async().await;
    let app = app(test_config("http://127.0.0.1:9"));

    let (status, _) = send(
        &app,
        post_json("/api/analyze", json!({"url": format!("{}/missing", site.url())}), [10, 0, 0, 5]),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_llm_failure_is_generic_server_error() {
    let mut site = Server::new_async().await;
    site.mock("GET", "/").with_status(200).with_body("<body>text</body>").create_async().await;

    let mut llm = Server::new_async().await;
    llm.mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("internal provider trace id=abc123")
        .create_async()
        .await;

    let app = app(test_config(&llm.url()));
    let (status, body) = send(&app, post_json("/api/analyze", json!({"url": site.url()}), [10, 0, 0, 6])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["error"].as_str().unwrap().contains("abc123"));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_and_window_rollover() {
    let app = app(test_config("http://127.0.0.1:9"));
    let peer = [192, 168, 1, 10];

    for _ in 0..10 {
        let (status, _) = send(&app, post_json("/api/analyze", json!({}), peer)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = send(&app, post_json("/api/analyze", json!({}), peer)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, post_json("/api/analyze", json!({}), [192, 168, 1, 11])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    tokio::time::advance(Duration::from_secs(60)).await;

    let (status, _) = send(&app, post_json("/api/analyze", json!({}), peer)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_is_not_throttled() {
    let mut config = test_config("http://127.0.0.1:9");
    config.rate_limit_requests = 1;
    let app = app(config);

    for _ in 0..3 {
        let request = Request::builder()
            .uri("/health")
            .extension(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 1))))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
    }
}

struct DenyAll;

impl RequestThrottle for DenyAll {
    fn admit(&self, _key: &str) -> bool {
        false
    }
}

#[tokio::test]
async fn test_injected_throttle_is_used() {
    let state = AppState::new(test_config("http://127.0.0.1:9"))
        .unwrap()
        .with_throttle(Arc::new(DenyAll));
    let app = create_router(state);

    let (status, _) = send(&app, post_json("/api/analyze", json!({"url": "https://example.com"}), [10, 0, 0, 8])).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_readable_view_prefers_open_graph_image() {
    let app = app(test_config("http://127.0.0.1:9"));
    let html = r#"<html><head><title>Story</title>
        <meta property="og:image" content="https://cdn.example.com/cover.jpg"></head>
        <body><article><p>This article body is long enough, with commas, to be scored as prose.</p>
        <p>Second paragraph of the article body, also long enough to count.</p></article></body></html>"#;

    let (status, body) = send(
        &app,
        post_json("/api/readable", json!({"html": html, "url": "https://example.com/story"}), [10, 0, 0, 9]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mainImage"], "https://cdn.example.com/cover.jpg");
    assert_eq!(body["title"], "Story");
    assert!(body["content"].as_str().unwrap().contains("Second paragraph"));
}

#[tokio::test]
async fn test_readable_view_of_analyze_output_degrades_gracefully() {
    let mut site = Server::new_async().await;
    site.mock("GET", "/")
        .with_status(200)
        .with_body("<html><head><title>Bare</title></head><body><span>x</span></body></html>")
        .create_async()
        .await;

    let mut llm = Server::new_async().await;
    llm.mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"content": "summary"}}]}).to_string())
        .create_async()
        .await;

    let app = app(test_config(&llm.url()));
    let (_, analyzed) = send(&app, post_json("/api/analyze", json!({"url": site.url()}), [10, 0, 0, 10])).await;

    let (status, view) = send(
        &app,
        post_json(
            "/api/readable",
            json!({"html": analyzed["originalHtml"], "url": site.url()}),
            [10, 0, 0, 10],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["title"], "Bare");
    assert_eq!(view["content"], "");
    assert!(view["mainImage"].is_null());
}

fn article_html(title: &str, padding: usize) -> String {
    format!(
        r#"<html><head><title>{title}</title></head><body><!--{}--><article>
        <p>This article body is long enough, with commas, to be scored as prose.</p>
        <p>Second paragraph of the article body, also long enough to count.</p>
        </article></body></html>"#,
        "x".repeat(padding)
    )
}

#[tokio::test]
async fn test_readable_accepts_markup_beyond_default_body_limit() {
    let app = app(test_config("http://127.0.0.1:9"));
    let html = article_html("Big", 3 * 1024 * 1024);

    let (status, body) = send(
        &app,
        post_json("/api/readable", json!({"html": html, "url": "https://example.com/big"}), [10, 0, 0, 11]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Big");
    assert!(body["content"].as_str().unwrap().contains("Second paragraph"));
}

#[tokio::test]
async fn test_readable_body_over_cap_is_payload_too_large() {
    let mut config = test_config("http://127.0.0.1:9");
    config.max_response_bytes = 1024;
    let app = app(config);

    let (status, body) = send(
        &app,
        post_json("/api/readable", json!({"html": article_html("Big", 256 * 1024)}), [10, 0, 0, 12]),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_responses_are_gzip_compressed_on_request() {
    let app = app(test_config("http://127.0.0.1:9"));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/readable")
        .header("content-type", "application/json")
        .header("accept-encoding", "gzip")
        .body(Body::from(json!({"html": article_html("Zipped", 4096)}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-encoding"], "gzip");
}

#[tokio::test]
async fn test_non_string_user_prompt_is_ignored() {
    let mut site = Server::new_async().await;
    site.mock("GET", "/")
        .with_status(200)
        .with_body("<html><head><title>Hi</title></head><body>hello world</body></html>")
        .create_async()
        .await;

    let mut llm = Server::new_async().await;
    let completion = llm
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("hello world".to_string()))
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"content": "summary"}}]}).to_string())
        .create_async()
        .await;

    let app = app(test_config(&llm.url()));
    let (status, body) = send(
        &app,
        post_json("/api/analyze", json!({"url": site.url(), "userPrompt": 42}), [10, 0, 0, 13]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "summary");
    completion.assert_async().await;
}
