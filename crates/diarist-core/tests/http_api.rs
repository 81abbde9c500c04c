//! `HttpDiaryApi` against an in-process mock backend.
//!
//! Run: `cargo test -p diarist-core --test http_api`

mod common;

use std::sync::atomic::Ordering;

use common::{MockBackend, USER_ID};
use diarist_core::api::{CompletionRequest, DiaryApi, HttpDiaryApi};
use diarist_core::capture::AudioBlob;
use diarist_core::config::ApiConfig;
use diarist_core::error::DiaristError;
use diarist_core::model::*;

fn blob() -> AudioBlob {
    AudioBlob::new(b"RIFF....WAVEfmt ".to_vec(), "audio/wav", "recording.wav")
}

fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_conversation_endpoints() {
    let backend = MockBackend::start().await;
    let api = backend.api();

    let started = api.start_conversation(USER_ID).await.unwrap();
    assert_eq!(started.conversation_id.as_str(), "c1");
    assert_eq!(started.first_message.as_deref(), Some("How was your day?"));

    let reply = api.submit_turn(&started.conversation_id, &blob()).await.unwrap();
    assert_eq!(reply.user_message.as_deref(), Some("Good"));
    assert_eq!(reply.ai_response.as_deref(), Some("Glad to hear!"));

    let completion = api
        .complete(&started.conversation_id, &CompletionRequest::default())
        .await
        .unwrap();
    let Completion::Preview(generated) = completion else {
        panic!("expected a preview, got {completion:?}");
    };
    assert_eq!(generated.title, "A good day");
    assert_eq!(generated.mood, Mood::Positive);
    assert_eq!(generated.suggested_date, Some(date(2025, 3, 4)));

    let draft = DiaryDraft::from_generated(generated, date(2025, 3, 5));
    let diary_id = api.save_draft(&started.conversation_id, &draft).await.unwrap();
    assert!(!diary_id.is_empty());

    let saved = backend.state.last_save_body.lock().unwrap().clone().unwrap();
    assert_eq!(saved["title"], "A good day");
    assert_eq!(saved["mood"], "positive");
    assert_eq!(saved["entry_date"], "2025-03-04");

    assert_eq!(
        backend.state.paths(),
        vec![
            "POST /api/conversations",
            "POST /api/conversations/c1/audio",
            "POST /api/conversations/c1/complete",
            "POST /api/conversations/c1/save",
        ]
    );
}

#[tokio::test]
async fn test_turn_upload_is_multipart_audio() {
    let backend = MockBackend::start().await;
    let api = backend.api();
    let id = ConversationId::parse("c1").unwrap();
    api.submit_turn(&id, &blob()).await.unwrap();

    let ct = backend
        .state
        .last_upload_content_type
        .lock()
        .unwrap()
        .clone()
        .unwrap();
    assert!(ct.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn test_turn_endpoint_is_configurable() {
    let backend = MockBackend::start().await;
    let config = ApiConfig {
        turn_endpoint: "messages".into(),
        ..backend.api_config()
    };
    let api = HttpDiaryApi::new(&config).unwrap();
    let id = ConversationId::parse("c1").unwrap();
    api.submit_turn(&id, &blob()).await.unwrap();
    assert_eq!(
        backend.state.paths(),
        vec!["POST /api/conversations/c1/messages"]
    );
}

#[tokio::test]
async fn test_completion_sends_preferences() {
    let backend = MockBackend::start().await;
    let api = backend.api();
    let id = ConversationId::parse("c1").unwrap();
    let request = CompletionRequest::new(Preferences {
        style: Some("poetic".into()),
        ..Default::default()
    })
    .with_instructions("Make it shorter");
    api.complete(&id, &request).await.unwrap();

    let body = backend.state.last_complete_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["preferences"]["style"], "poetic");
    assert_eq!(body["instructions"], "Make it shorter");
}

#[tokio::test]
async fn test_persisted_completion() {
    let backend = MockBackend::start().await;
    backend.state.persist_on_complete.store(true, Ordering::SeqCst);
    let api = backend.api();
    let id = ConversationId::parse("c1").unwrap();

    match api.complete(&id, &CompletionRequest::default()).await.unwrap() {
        Completion::Persisted(diary) => {
            assert_eq!(diary.title, "Diary for 2025-03-04");
            assert_eq!(diary.entry_date, Some(date(2025, 3, 4)));
        }
        other => panic!("expected persisted diary, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_pagination_and_calendar() {
    let backend = MockBackend::start().await;
    for day in 1..=12 {
        backend
            .state
            .insert_diary(&format!("Day {day}"), "content", &format!("2025-01-{day:02}"));
    }
    backend.state.insert_diary("February", "content", "2025-02-01");
    let api = backend.api();

    let page = api.list_diaries(USER_ID, 2, 5).await.unwrap();
    assert_eq!(page.total, 13);
    assert_eq!(page.pages, 3);
    assert_eq!(page.page, 2);
    assert_eq!(page.diaries.len(), 5);
    assert!(page.has_next() && page.has_prev());

    let month = api.calendar(USER_ID, 2025, 1).await.unwrap();
    assert_eq!(month.total(), 12);
    assert!(month.diaries_by_date.contains_key(&date(2025, 1, 12)));

    let requests = backend.state.requests.lock().unwrap().clone();
    assert_eq!(requests[0].query.as_deref(), Some("page=2&limit=5"));
    assert_eq!(requests[1].query.as_deref(), Some("year=2025&month=1"));
}

#[tokio::test]
async fn test_search_encodes_query_and_skips_blank() {
    let backend = MockBackend::start().await;
    backend.state.insert_diary("Beach day", "Sand & sun", "2025-01-01");
    backend.state.insert_diary("Office", "Meetings", "2025-01-02");
    let api = backend.api();

    assert!(api.search(USER_ID, "  ").await.unwrap().is_empty());
    assert!(backend.state.paths().is_empty());

    let rows = api.search(USER_ID, "sand & sun").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Beach day");
}

#[tokio::test]
async fn test_diary_crud() {
    let backend = MockBackend::start().await;
    let id = backend.state.insert_diary("Old title", "Old content", "2025-01-01");
    let api = backend.api();

    let entry = api.get_diary(&id).await.unwrap();
    assert_eq!(entry.title, "Old title");
    assert_eq!(entry.entry_date, Some(date(2025, 1, 1)));

    let updated = api
        .update_diary(&id, &UpdateDiaryInput::content("Updated content"))
        .await
        .unwrap();
    assert_eq!(updated.content, "Updated content");
    assert_eq!(updated.title, "Old title");

    api.delete_diary(&id).await.unwrap();
    let err = api.get_diary(&id).await.unwrap_err();
    assert!(matches!(err, DiaristError::Api { status: 404, ref message } if message == "Diary not found"));
}

#[tokio::test]
async fn test_delete_accepts_json_ack() {
    let backend = MockBackend::start().await;
    backend.state.insert_diary("one", "x", "2025-01-01");
    let second = backend.state.insert_diary("two", "y", "2025-01-02");
    let api = backend.api();
    api.delete_diary(&second).await.unwrap();
}

#[tokio::test]
async fn test_transcribe() {
    let backend = MockBackend::start().await;
    let text = backend.api().transcribe(&blob()).await.unwrap();
    assert_eq!(text, "dictated words");
}

#[tokio::test]
async fn test_unauthorized_on_every_endpoint() {
    let backend = MockBackend::start().await;
    backend.expire_session();
    let api = backend.api();
    let id = ConversationId::parse("c1").unwrap();
    let login = format!("{}/login", backend.base_url);

    let results = vec![
        api.start_conversation(USER_ID).await.err(),
        api.submit_turn(&id, &blob()).await.err(),
        api.complete(&id, &CompletionRequest::default()).await.err(),
        api.list_diaries(USER_ID, 1, 10).await.err(),
        api.calendar(USER_ID, 2025, 1).await.err(),
        api.search(USER_ID, "x").await.err(),
        api.get_diary("d1").await.err(),
        api.update_diary("d1", &UpdateDiaryInput::content("x")).await.err(),
        api.delete_diary("d1").await.err(),
        api.transcribe(&blob()).await.err(),
    ];
    for err in results {
        match err {
            Some(DiaristError::SessionExpired { login_url }) => assert_eq!(login_url, login),
            other => panic!("expected SessionExpired, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_session_cookie_sent() {
    let backend = MockBackend::start().await;
    backend.api().list_diaries(USER_ID, 1, 10).await.unwrap();
    let requests = backend.state.requests.lock().unwrap().clone();
    assert_eq!(requests[0].cookie.as_deref(), Some("session=abc123"));
}

#[tokio::test]
async fn test_server_error_message_is_surfaced() {
    let backend = MockBackend::start().await;
    let id = ConversationId::parse("zzz").unwrap();
    let err = backend
        .api()
        .submit_turn(&id, &blob())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "API error 404: Conversation not found");
}

#[tokio::test]
async fn test_connection_refused_is_http_error() {
    let config = ApiConfig {
        base_url: "http://127.0.0.1:9".into(),
        connect_timeout_secs: Some(2),
        ..Default::default()
    };
    let api = HttpDiaryApi::new(&config).unwrap();
    let err = api.get_diary("d1").await.unwrap_err();
    assert!(matches!(err, DiaristError::Http(_)));
    assert!(err.is_network());
}
