//! End-to-end tests for the challenge routes, driving the full
//! route/middleware stack through `tower::ServiceExt::oneshot`.

use acmeproxy::access_log::AccessLogSink;
use acmeproxy::api::router;
use acmeproxy::credentials::{CredentialStore, Credentials, DynCredentialStore};
use acmeproxy::provider::{DnsProvider, DynProvider, InMemoryProvider};
use acmeproxy::{Config, Shared};
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io;
use tokio::sync::Mutex;
use tower::ServiceExt;

/// A challenge-only backend counting how often it is invoked.
#[derive(Default)]
struct ChallengeOnly {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl DnsProvider for ChallengeOnly {
    fn name(&self) -> &'static str {
        "challenge-only"
    }

    async fn present(&self, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cleanup(&self, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct StaticCredentials;

impl CredentialStore for StaticCredentials {
    fn validate(&self, credentials: &Credentials) -> Option<String> {
        (credentials.username == "lego" && credentials.password == "hunter2")
            .then(|| credentials.username.clone())
    }
}

#[derive(Default)]
struct MemorySink {
    lines: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl AccessLogSink for MemorySink {
    async fn write_line(&self, line: &str) -> io::Result<()> {
        self.lines.lock().await.push(line.to_string());
        Ok(())
    }
}

fn config(allowed_domains: &[&str], allowed_ips: &[&str]) -> Shared {
    Arc::new(Config {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        provider: "memory".to_string(),
        provider_state_path: None,
        allowed_domains: allowed_domains.iter().map(ToString::to_string).collect(),
        allowed_ips: allowed_ips.iter().map(|ip| ip.parse().unwrap()).collect(),
        htpasswd_file: None,
        access_log_file: None,
        api_timeout: std::time::Duration::from_secs(5),
    })
}

fn app(config: Shared, provider: DynProvider) -> Router {
    router(config, provider, None, None)
}

fn post(path: &str, body: &str) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    req
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

const RAW_PAYLOAD: &str = r#"{"domain":"example.com","token":"tok1","keyauth":"ka1"}"#;

#[tokio::test]
async fn raw_present_echoes_payload() {
    let app = app(
        config(&["example.com"], &[]),
        Arc::new(ChallengeOnly::default()),
    );
    let response = app.oneshot(post("/present", RAW_PAYLOAD)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(
        body_string(response).await,
        r#"{"domain":"example.com","token":"tok1","keyauth":"ka1"}"#
    );
}

#[tokio::test]
async fn domain_outside_allow_list_is_forbidden() {
    let provider = Arc::new(ChallengeOnly::default());
    let app = app(config(&["other.com"], &[]), provider.clone());
    let response = app.oneshot(post("/present", RAW_PAYLOAD)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_string(response).await.contains("not in allowed-domains"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn subdomain_of_allowed_entry_is_authorized() {
    let app = app(
        config(&["example.com"], &[]),
        Arc::new(ChallengeOnly::default()),
    );
    let response = app
        .oneshot(post(
            "/cleanup",
            r#"{"domain":"foo.example.com","token":"tok1","keyauth":"ka1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn default_mode_against_challenge_only_backend_is_unsupported() {
    let app = app(
        config(&["example.com"], &[]),
        Arc::new(ChallengeOnly::default()),
    );
    let response = app
        .oneshot(post(
            "/present",
            r#"{"fqdn":"_acme-challenge.example.com.","value":"v1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response).await.contains("does not support"));
}

#[tokio::test]
async fn default_mode_against_record_capable_backend_succeeds() {
    let provider = Arc::new(InMemoryProvider::default());
    let app = app(config(&["example.com"], &[]), provider.clone());
    let response = app
        .oneshot(post(
            "/present",
            r#"{"fqdn":"_acme-challenge.example.com.","value":"v1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_string(response).await,
        r#"{"fqdn":"_acme-challenge.example.com.","value":"v1"}"#
    );
    assert_eq!(
        provider.get_txt("_acme-challenge.example.com.").await.len(),
        1
    );
}

#[tokio::test]
async fn wrong_method_is_rejected() {
    let app = app(
        config(&["example.com"], &[]),
        Arc::new(ChallengeOnly::default()),
    );
    let mut req = Request::builder()
        .method("GET")
        .uri("/present")
        .body(Body::empty())
        .unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn malformed_and_ambiguous_payloads_are_bad_requests() {
    let config = config(&["example.com"], &[]);
    let provider: DynProvider = Arc::new(ChallengeOnly::default());

    let app_ = app(config.clone(), provider.clone());
    let response = app_.oneshot(post("/present", "{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Parses, but satisfies neither field group.
    let app_ = app(config, provider);
    let response = app_
        .oneshot(post("/present", r#"{"domain":"example.com"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response).await, "wrong JSON content");
}

#[tokio::test]
async fn payload_without_content_type_header_is_accepted() {
    let app = app(
        config(&["example.com"], &[]),
        Arc::new(ChallengeOnly::default()),
    );
    let mut req = Request::builder()
        .method("POST")
        .uri("/present")
        .body(Body::from(RAW_PAYLOAD))
        .unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn single_label_domain_is_an_invalid_format() {
    let app = app(
        config(&["example.com"], &[]),
        Arc::new(ChallengeOnly::default()),
    );
    let response = app
        .oneshot(post(
            "/present",
            r#"{"domain":"localhost","token":"tok1","keyauth":"ka1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("invalid domain format"));
}

#[tokio::test]
async fn health_is_open_and_other_paths_are_forbidden() {
    let config = config(&["example.com"], &["192.0.2.0/24"]);
    let store: DynCredentialStore = Arc::new(StaticCredentials);
    let provider: DynProvider = Arc::new(ChallengeOnly::default());

    let app = router(config.clone(), provider.clone(), Some(store.clone()), None);
    let mut req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");

    let app = router(config, provider, Some(store), None);
    let response = app.oneshot(post("/register", "{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_credentials_never_reach_the_dispatcher() {
    let provider = Arc::new(ChallengeOnly::default());
    // IP allow-list admits the caller; authentication must still win.
    let app = router(
        config(&["example.com"], &["127.0.0.0/8"]),
        provider.clone(),
        Some(Arc::new(StaticCredentials) as DynCredentialStore),
        None,
    );

    let response = app.oneshot(post("/present", RAW_PAYLOAD)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn valid_credentials_pass_the_chain() {
    let provider = Arc::new(ChallengeOnly::default());
    let app = router(
        config(&["example.com"], &["127.0.0.0/8"]),
        provider.clone(),
        Some(Arc::new(StaticCredentials) as DynCredentialStore),
        None,
    );

    let mut req = post("/present", RAW_PAYLOAD);
    // base64("lego:hunter2")
    req.headers_mut().insert(
        header::AUTHORIZATION,
        "Basic bGVnbzpodW50ZXIy".parse().unwrap(),
    );
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ip_filter_rejects_unlisted_callers() {
    let provider = Arc::new(ChallengeOnly::default());
    let app = app(config(&["example.com"], &["192.0.2.0/24"]), provider.clone());

    let response = app.oneshot(post("/present", RAW_PAYLOAD)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_string(response).await.contains("not in allowed-ips"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ip_filter_honors_forwarded_address() {
    let provider = Arc::new(ChallengeOnly::default());
    let app = app(config(&["example.com"], &["192.0.2.0/24"]), provider.clone());

    let mut req = post("/present", RAW_PAYLOAD);
    req.headers_mut()
        .insert("x-forwarded-for", "192.0.2.33".parse().unwrap());
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn access_log_records_actual_status_and_length() {
    let sink = Arc::new(MemorySink::default());
    let app = router(
        config(&["example.com"], &[]),
        Arc::new(ChallengeOnly::default()),
        None,
        Some(sink.clone()),
    );

    let response = app
        .oneshot(post("/present?cert=web", RAW_PAYLOAD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;

    let lines = sink.lines.lock().await;
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line.contains("\"POST /present?cert=web HTTP/1.1\""), "line: {line}");
    assert!(line.contains(&format!(" 200 {} ", body.len())), "line: {line}");
    assert!(line.contains("127.0.0.1"), "line: {line}");
}
