//! Local HTTP stubs shared by the integration tests.
//!
//! Each stub binds `127.0.0.1:0`, so tests never collide on ports, and is
//! serving by the time the spawn helper returns.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn spawn(listener: tokio::net::TcpListener, app: Router) {
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

// ─── LLM stub ───────────────────────────────────────────────────────

/// A request the LLM stub received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Replays scripted `(status, body)` replies in order and records requests.
/// Once the script runs out every call gets a 500.
#[derive(Clone)]
pub struct LlmStub {
    pub base: String,
    script: Arc<Mutex<VecDeque<(u16, String)>>>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl LlmStub {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn llm_reply(State(stub): State<LlmStub>, uri: Uri, headers: HeaderMap, body: String) -> Response {
    stub.calls.fetch_add(1, Ordering::SeqCst);
    stub.requests.lock().unwrap().push(Recorded {
        uri: uri.to_string(),
        headers,
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    let (status, body) = stub
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((500, "script exhausted".to_string()));

    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

pub async fn spawn_llm_stub(script: Vec<(u16, String)>) -> LlmStub {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let stub = LlmStub {
        base: format!("http://{}", listener.local_addr().unwrap()),
        script: Arc::new(Mutex::new(script.into())),
        calls: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new().fallback(llm_reply).with_state(stub.clone());
    spawn(listener, app);
    stub
}

pub fn chat_completion(text: &str) -> String {
    json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] }).to_string()
}

// ─── GitHub stub ────────────────────────────────────────────────────

/// Serves `GET /repos/{owner}/{name}/issues` from an in-memory map,
/// paginated with `Link` headers. Unknown repositories get a 404.
#[derive(Clone)]
pub struct GitHubStub {
    pub base: String,
    repos: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    requests: Arc<AtomicUsize>,
    failing_page: Arc<Mutex<Option<usize>>>,
}

impl GitHubStub {
    /// Replace the open items of `repo`.
    pub fn set_items(&self, repo: &str, items: Vec<Value>) {
        self.repos.lock().unwrap().insert(repo.to_string(), items);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Answer 502 for `page` (1-based) from now on, or stop with `None`.
    pub fn fail_page(&self, page: Option<usize>) {
        *self.failing_page.lock().unwrap() = page;
    }
}

async fn github_issues(
    State(stub): State<GitHubStub>,
    Path((owner, name)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    stub.requests.fetch_add(1, Ordering::SeqCst);
    let repo = format!("{}/{}", owner, name);

    let Some(items) = stub.repos.lock().unwrap().get(&repo).cloned() else {
        return (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "message": "Not Found" })),
        )
            .into_response();
    };

    let per_page: usize = params
        .get("per_page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(30);
    let page: usize = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);

    if *stub.failing_page.lock().unwrap() == Some(page) {
        return (StatusCode::BAD_GATEWAY, "upstream hiccup").into_response();
    }

    let start = (page - 1) * per_page;
    let page_items: Vec<Value> = items.iter().skip(start).take(per_page).cloned().collect();

    let mut headers = HeaderMap::new();
    if start + per_page < items.len() {
        let next = format!(
            "<{}/repos/{}/issues?state=open&per_page={}&page={}>; rel=\"next\"",
            stub.base,
            repo,
            per_page,
            page + 1
        );
        headers.insert(header::LINK, next.parse().unwrap());
    }

    (headers, axum::Json(Value::Array(page_items))).into_response()
}

pub async fn spawn_github_stub() -> GitHubStub {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let stub = GitHubStub {
        base: format!("http://{}", listener.local_addr().unwrap()),
        repos: Arc::new(Mutex::new(HashMap::new())),
        requests: Arc::new(AtomicUsize::new(0)),
        failing_page: Arc::new(Mutex::new(None)),
    };

    let app = Router::new()
        .route("/repos/{owner}/{name}/issues", get(github_issues))
        .with_state(stub.clone());
    spawn(listener, app);
    stub
}

/// A GitHub issue item as the REST API returns it.
pub fn gh_issue(id: i64, title: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "number": id,
        "title": title,
        "body": format!("Body of {}", title),
        "html_url": format!("https://github.com/o/r/issues/{}", id),
        "created_at": created_at,
        "state": "open",
    })
}

/// A pull request item, which the issues endpoint also returns.
pub fn gh_pull(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "number": id,
        "title": title,
        "body": null,
        "html_url": format!("https://github.com/o/r/pull/{}", id),
        "created_at": "2024-01-01T00:00:00Z",
        "state": "open",
        "pull_request": { "url": format!("https://api.github.com/repos/o/r/pulls/{}", id) },
    })
}
