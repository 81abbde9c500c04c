#![allow(unused_imports, dead_code)]

//! In-process diary backend for integration tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use diarist_core::api::HttpDiaryApi;
use diarist_core::config::ApiConfig;

pub const USER_ID: &str = "u1";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub cookie: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoredDiary {
    pub id: String,
    pub title: String,
    pub content: String,
    pub mood: String,
    pub date: String,
}

impl StoredDiary {
    fn row(&self) -> Value {
        json!({
            "diary_id": self.id,
            "date": self.date,
            "title": self.title,
            "preview": self.content.chars().take(80).collect::<String>(),
            "mood": self.mood,
        })
    }

    fn detail(&self) -> Value {
        json!({
            "diary_id": self.id,
            "date": self.date,
            "title": self.title,
            "content": self.content,
            "mood": self.mood,
        })
    }
}

#[derive(Default)]
pub struct MockState {
    pub requests: Mutex<Vec<Recorded>>,
    /// Answer every request with 401.
    pub expired: AtomicBool,
    /// Store the diary on completion instead of previewing it.
    pub persist_on_complete: AtomicBool,
    pub diaries: Mutex<BTreeMap<String, StoredDiary>>,
    pub next_id: AtomicUsize,
    pub last_complete_body: Mutex<Option<Value>>,
    pub last_save_body: Mutex<Option<Value>>,
    pub last_upload_content_type: Mutex<Option<String>>,
}

impl MockState {
    pub fn paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    pub fn insert_diary(&self, title: &str, content: &str, date: &str) -> String {
        let id = format!("d{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.diaries.lock().unwrap().insert(
            id.clone(),
            StoredDiary {
                id: id.clone(),
                title: title.into(),
                content: content.into(),
                mood: "neutral".into(),
                date: date.into(),
            },
        );
        id
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let router = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            user_id: Some(USER_ID.into()),
            session_cookie: Some("session=abc123".into()),
            timeout_secs: Some(10),
            ..Default::default()
        }
    }

    pub fn api(&self) -> HttpDiaryApi {
        HttpDiaryApi::new(&self.api_config()).unwrap()
    }

    pub fn expire_session(&self) {
        self.state.expired.store(true, Ordering::SeqCst);
    }
}

type Shared = Arc<MockState>;

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/conversations", post(start_conversation))
        .route("/api/conversations/{id}/audio", post(upload_turn))
        .route("/api/conversations/{id}/messages", post(upload_turn))
        .route("/api/conversations/{id}/complete", post(complete))
        .route("/api/conversations/{id}/save", post(save))
        .route("/api/users/{uid}/diaries", get(list_diaries))
        .route("/api/users/{uid}/diaries/calendar", get(calendar))
        .route("/api/users/{uid}/diaries/search", get(search))
        .route(
            "/api/diaries/{id}",
            get(get_diary).put(update_diary).delete(delete_diary),
        )
        .route("/api/transcribe", post(transcribe))
        .layer(middleware::from_fn_with_state(state.clone(), record_and_guard))
        .with_state(state)
}

async fn record_and_guard(State(state): State<Shared>, req: Request, next: Next) -> Response {
    state.requests.lock().unwrap().push(Recorded {
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        query: req.uri().query().map(str::to_string),
        cookie: req
            .headers()
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });
    if state.expired.load(Ordering::SeqCst) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "login required" })))
            .into_response();
    }
    next.run(req).await
}

fn not_found(what: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": format!("{what} not found") }))).into_response()
}

async fn start_conversation(Json(body): Json<Value>) -> Response {
    match body.get("user_id").and_then(Value::as_str) {
        Some(u) if !u.is_empty() => Json(json!({
            "conversation_id": "c1",
            "first_message": "How was your day?",
        }))
        .into_response(),
        _ => (StatusCode::BAD_REQUEST, Json(json!({ "error": "user_id required" }))).into_response(),
    }
}

fn is_audio_upload(headers: &HeaderMap, body: &[u8]) -> bool {
    let multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));
    let needle = b"name=\"audio\"";
    multipart && body.windows(needle.len()).any(|w| w == needle)
}

async fn upload_turn(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if id != "c1" {
        return not_found("Conversation");
    }
    *state.last_upload_content_type.lock().unwrap() = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if !is_audio_upload(&headers, &body) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "audio required" }))).into_response();
    }
    Json(json!({ "user_message": "Good", "ai_response": "Glad to hear!" })).into_response()
}

async fn complete(
    State(state): State<Shared>,
    Path(id): Path<String>,
    body: Option<Json<Value>>,
) -> Response {
    if id != "c1" {
        return not_found("Conversation");
    }
    *state.last_complete_body.lock().unwrap() = body.map(|Json(v)| v);

    if state.persist_on_complete.load(Ordering::SeqCst) {
        let id = state.insert_diary("Diary for 2025-03-04", "Today you talked about: Good", "2025-03-04");
        return Json(json!({
            "diary_id": id,
            "date": "2025-03-04",
            "title": "Diary for 2025-03-04",
            "content": "Today you talked about: Good",
        }))
        .into_response();
    }
    Json(json!({
        "title": "A good day",
        "content": "Today was good.",
        "mood": "positive",
        "mood_score": 0.8,
        "summary": "A good day overall",
        "suggested_date": "2025-03-04",
    }))
    .into_response()
}

async fn save(State(state): State<Shared>, Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    if id != "c1" {
        return not_found("Conversation");
    }
    let field = |k: &str| body.get(k).and_then(Value::as_str).unwrap_or_default().to_string();
    let diary_id = state.insert_diary(&field("title"), &field("content"), &field("entry_date"));
    if let Some(d) = state.diaries.lock().unwrap().get_mut(&diary_id) {
        d.mood = field("mood");
    }
    *state.last_save_body.lock().unwrap() = Some(body);
    Json(json!({ "diary_id": diary_id })).into_response()
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

async fn list_diaries(State(state): State<Shared>, Query(q): Query<PageQuery>) -> Response {
    let page = q.page.unwrap_or(1).max(1);
    let limit = q.limit.unwrap_or(10).max(1);
    let diaries = state.diaries.lock().unwrap();
    let mut rows: Vec<&StoredDiary> = diaries.values().collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    let total = rows.len();
    let page_rows: Vec<Value> = rows
        .iter()
        .skip((page - 1) * limit)
        .take(limit)
        .map(|d| d.row())
        .collect();
    Json(json!({
        "diaries": page_rows,
        "total": total,
        "page": page,
        "pages": total.div_ceil(limit),
    }))
    .into_response()
}

#[derive(Deserialize)]
struct MonthQuery {
    year: i32,
    month: u32,
}

async fn calendar(State(state): State<Shared>, Query(q): Query<MonthQuery>) -> Response {
    let prefix = format!("{:04}-{:02}-", q.year, q.month);
    let mut by_date: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for d in state.diaries.lock().unwrap().values() {
        if d.date.starts_with(&prefix) {
            by_date.entry(d.date.clone()).or_default().push(d.row());
        }
    }
    Json(json!({ "year": q.year, "month": q.month, "diaries_by_date": by_date })).into_response()
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn search(State(state): State<Shared>, Query(q): Query<SearchQuery>) -> Response {
    let needle = q.q.unwrap_or_default().to_lowercase();
    let rows: Vec<Value> = state
        .diaries
        .lock()
        .unwrap()
        .values()
        .filter(|d| {
            !needle.is_empty()
                && (d.title.to_lowercase().contains(&needle)
                    || d.content.to_lowercase().contains(&needle))
        })
        .map(|d| d.row())
        .collect();
    Json(json!({ "diaries": rows })).into_response()
}

async fn get_diary(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    match state.diaries.lock().unwrap().get(&id) {
        Some(d) => Json(d.detail()).into_response(),
        None => not_found("Diary"),
    }
}

async fn update_diary(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut diaries = state.diaries.lock().unwrap();
    let Some(d) = diaries.get_mut(&id) else {
        return not_found("Diary");
    };
    if let Some(v) = body.get("title").and_then(Value::as_str) {
        d.title = v.into();
    }
    if let Some(v) = body.get("content").and_then(Value::as_str) {
        d.content = v.into();
    }
    if let Some(v) = body.get("mood").and_then(Value::as_str) {
        d.mood = v.into();
    }
    if let Some(v) = body.get("entry_date").and_then(Value::as_str) {
        d.date = v.into();
    }
    Json(d.detail()).into_response()
}

async fn delete_diary(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    match state.diaries.lock().unwrap().remove(&id) {
        // Alternate between the two acknowledgement shapes the client accepts.
        Some(_) if id.ends_with('1') => StatusCode::NO_CONTENT.into_response(),
        Some(_) => Json(json!({ "deleted": true })).into_response(),
        None => not_found("Diary"),
    }
}

async fn transcribe(headers: HeaderMap, body: Bytes) -> Response {
    if !is_audio_upload(&headers, &body) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "audio required" }))).into_response();
    }
    Json(json!({ "text": "dictated words" })).into_response()
}
