#![allow(dead_code)]

//! Shared helpers for HTTP-level tests.
//!
//! `UpstreamStub` is a scripted Chat Completions server bound to an ephemeral port; it
//! records every request it receives. `spawn_app` runs the real router against it.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use rewrite_proxy::config::AppConfig;
use rewrite_proxy::retry::RetryPolicy;
use rewrite_proxy::server::build_app;
use rewrite_proxy::tone::ToneTemplates;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// One scripted upstream reply.
#[derive(Clone, Debug)]
pub enum StubReply {
    Json(StatusCode, serde_json::Value),
    Status(StatusCode),
    Raw {
        status: StatusCode,
        content_type: &'static str,
        body: String,
    },
}

impl StubReply {
    /// 200 with a single choice carrying `content`.
    pub fn content(content: &str) -> Self {
        StubReply::Json(
            StatusCode::OK,
            serde_json::json!({
                "id": "chatcmpl-stub",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": content},
                    "finish_reason": "stop"
                }]
            }),
        )
    }

    pub fn status(code: u16) -> Self {
        StubReply::Status(StatusCode::from_u16(code).expect("valid status"))
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

struct StubState {
    replies: Mutex<VecDeque<StubReply>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct UpstreamStub {
    base_url: String,
    state: Arc<StubState>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl UpstreamStub {
    pub async fn start(replies: Vec<StubReply>) -> Self {
        let state = Arc::new(StubState {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/v1/chat/completions", post(completions_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream stub");
        let addr = listener.local_addr().expect("stub local addr");
        let (tx, rx) = oneshot::channel::<()>();

        let server = axum::serve(listener, router.into_make_service());
        tokio::spawn(async move {
            tokio::select! {
                res = server => {
                    if let Err(err) = res {
                        eprintln!("Upstream stub error: {err:?}");
                    }
                }
                _ = rx => {}
            }
        });

        UpstreamStub {
            base_url: format!("http://{}/v1", addr),
            state,
            shutdown: Some(tx),
        }
    }

    /// Base URL to use as `OPENAI_BASE_URL`.
    pub fn url(&self) -> String {
        self.base_url.clone()
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("lock stub requests").clone()
    }
}

impl Drop for UpstreamStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn completions_handler(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.calls.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut guard) = state.requests.lock() {
        guard.push(RecordedRequest {
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
            body,
        });
    }

    let next = state.replies.lock().ok().and_then(|mut q| q.pop_front());
    match next {
        Some(StubReply::Json(status, body)) => (status, Json(body)).into_response(),
        Some(StubReply::Status(status)) => status.into_response(),
        Some(StubReply::Raw {
            status,
            content_type,
            body,
        }) => (status, [(header::CONTENT_TYPE, content_type)], body).into_response(),
        // Unscripted calls get a terminal status so over-calling shows up in assertions.
        None => StatusCode::IM_A_TEAPOT.into_response(),
    }
}

/// Running application bound to an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub addr: SocketAddr,
    join: JoinHandle<()>,
    client: reqwest::Client,
}

impl TestServer {
    pub async fn post_json<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
    }

    pub async fn post_raw(
        &self,
        path: &str,
        body: &'static str,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
    }

    pub async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .send()
            .await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// Configuration pointing at `upstream_url` with a short retry delay.
pub fn test_config(upstream_url: &str) -> AppConfig {
    AppConfig {
        api_key: Some("sk-test-upstream".to_string()),
        base_url: upstream_url.to_string(),
        retry: RetryPolicy::new(3, Duration::from_millis(20)),
        login_password: Some("open-sesame".to_string()),
        ..AppConfig::default()
    }
}

pub async fn spawn_app(config: AppConfig) -> TestServer {
    let app = build_app(&config, ToneTemplates::default());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let base_url = format!("http://{}", addr);
    let server = axum::serve(listener, app.into_make_service());

    let join = tokio::spawn(async move {
        if let Err(e) = server.await {
            eprintln!("Test server error: {e:?}");
        }
    });

    TestServer {
        base_url,
        addr,
        join,
        client: reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed building reqwest client"),
    }
}

/// Spawn an upstream stub and the app wired to it.
pub async fn spawn_with_upstream(replies: Vec<StubReply>) -> (TestServer, UpstreamStub) {
    let upstream = UpstreamStub::start(replies).await;
    let app = spawn_app(test_config(&upstream.url())).await;
    (app, upstream)
}
