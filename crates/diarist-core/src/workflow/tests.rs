use chrono::NaiveDate;

use super::*;
use crate::capture::ScriptedAudioSource;
use crate::testing::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn session() -> DiarySession {
    DiarySession::new(Some("u1".into()), Preferences::default()).with_today(date(2025, 3, 4))
}

/// Session with an open conversation `c1`.
async fn started_session(api: &FakeApi) -> DiarySession {
    api.script(|s| s.starts.push_back(Ok(started("c1", Some("How was your day?")))));
    let mut session = session();
    session.start(api).await.unwrap();
    session
}

/// Session previewing a draft titled "A good day".
async fn previewing_session(api: &FakeApi) -> DiarySession {
    let mut session = started_session(api).await;
    api.script(|s| s.completions.push_back(Ok(preview("A good day", None))));
    session.complete(api).await.unwrap();
    session
}

#[tokio::test]
async fn test_full_conversation_round() {
    let api = FakeApi::new();
    let mut session = started_session(&api).await;
    assert_eq!(session.state(), WorkflowState::Started);
    assert_eq!(session.transcript().messages(), &[Message::ai("How was your day?")]);

    api.script(|s| s.turns.push_back(Ok(reply("Good", "Glad to hear!"))));
    session.submit_audio(&api, &blob()).await.unwrap();
    assert_eq!(session.transcript().len(), 3);
    assert_eq!(session.transcript().messages()[1], Message::user("Good"));
    assert_eq!(session.transcript().messages()[2], Message::ai("Glad to hear!"));

    api.script(|s| s.completions.push_back(Ok(preview("A good day", None))));
    assert_eq!(session.complete(&api).await.unwrap(), CompleteOutcome::Draft);
    assert_eq!(session.state(), WorkflowState::Previewing);
    let draft = session.draft().unwrap();
    assert_eq!(draft.title, "A good day");
    assert_eq!(draft.mood, Mood::Positive);
    assert_eq!(draft.entry_date, date(2025, 3, 4));

    api.script(|s| s.saves.push_back(Ok("d1".into())));
    assert_eq!(session.save(&api).await.unwrap(), "d1");
    assert_eq!(session.state(), WorkflowState::Saved);
    assert!(session.conversation_id().is_none());
    assert!(session.draft().is_none());
    assert_eq!(session.last_saved(), Some("d1"));

    assert_eq!(
        api.calls(),
        vec!["start:u1", "turn:c1", "complete:c1", "save:c1"]
    );
}

#[tokio::test]
async fn test_start_without_user_makes_no_request() {
    let api = FakeApi::new();
    let mut session = DiarySession::new(None, Preferences::default());
    assert!(session.start(&api).await.is_err());
    assert_eq!(session.status(), STATUS_NO_USER);
    assert_eq!(session.state(), WorkflowState::Idle);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_start_failure_leaves_no_conversation() {
    let api = FakeApi::with(|s| s.starts.push_back(Err(server_error())));
    let mut session = session();
    assert!(session.start(&api).await.is_err());
    assert_eq!(session.status(), STATUS_START_FAILED);
    assert!(session.conversation_id().is_none());
    assert_eq!(session.state(), WorkflowState::Idle);

    let source = ScriptedAudioSource::new(vec![blob()]);
    assert!(session.start_recording(&source).await.is_err());
}

#[tokio::test]
async fn test_start_replaces_active_conversation() {
    let api = FakeApi::new();
    let mut session = started_session(&api).await;
    api.script(|s| s.starts.push_back(Ok(started("c2", None))));
    session.start(&api).await.unwrap();
    assert_eq!(session.conversation_id().unwrap().as_str(), "c2");
    assert!(session.transcript().is_empty());
}

#[tokio::test]
async fn test_turns_append_in_response_order() {
    let api = FakeApi::new();
    let mut session = started_session(&api).await;
    api.script(|s| {
        s.turns.push_back(Ok(reply("one", "ack one")));
        s.turns.push_back(Ok(TurnReply {
            user_message: None,
            ai_response: Some("still there?".into()),
        }));
        s.turns.push_back(Ok(reply("two", "ack two")));
    });
    for _ in 0..3 {
        session.submit_audio(&api, &blob()).await.unwrap();
    }
    let texts: Vec<_> = session
        .transcript()
        .messages()
        .iter()
        .map(|m| m.text.as_str())
        .collect();
    assert_eq!(
        texts,
        vec!["How was your day?", "one", "ack one", "still there?", "two", "ack two"]
    );
}

#[tokio::test]
async fn test_upload_failure_keeps_started() {
    let api = FakeApi::new();
    let mut session = started_session(&api).await;
    api.script(|s| s.turns.push_back(Err(server_error())));
    assert!(session.submit_audio(&api, &blob()).await.is_err());
    assert_eq!(session.status(), STATUS_SEND_FAILED);
    assert_eq!(session.state(), WorkflowState::Started);
    assert_eq!(session.transcript().len(), 1);
}

#[tokio::test]
async fn test_recording_roundtrip_through_source() {
    let api = FakeApi::new();
    let mut session = started_session(&api).await;
    let source = ScriptedAudioSource::new(vec![blob()]);

    session.start_recording(&source).await.unwrap();
    assert_eq!(session.state(), WorkflowState::Recording);
    assert!(session.is_recording());
    assert!(session.complete(&api).await.is_err());

    api.script(|s| s.turns.push_back(Ok(reply("Good", "Glad to hear!"))));
    let appended = session.stop_recording(&api).await.unwrap();
    assert_eq!(appended.len(), 2);
    assert_eq!(session.state(), WorkflowState::Started);
    assert!(!session.is_recording());
}

#[tokio::test]
async fn test_capture_errors_map_to_status() {
    let api = FakeApi::new();
    let mut session = started_session(&api).await;

    let denied = ScriptedAudioSource::denied();
    assert!(session.start_recording(&denied).await.is_err());
    assert_eq!(session.status(), STATUS_MIC_DENIED);
    assert_eq!(session.state(), WorkflowState::Started);

    let empty = ScriptedAudioSource::new(Vec::new());
    assert!(session.start_recording(&empty).await.is_err());
    assert_eq!(session.status(), STATUS_UNSUPPORTED);
}

#[tokio::test]
async fn test_complete_failure_returns_to_started() {
    let api = FakeApi::new();
    let mut session = started_session(&api).await;
    api.script(|s| s.completions.push_back(Err(server_error())));
    assert!(session.complete(&api).await.is_err());
    assert_eq!(session.state(), WorkflowState::Started);
    assert!(session.draft().is_none());
}

#[tokio::test]
async fn test_persisted_completion_saves_immediately() {
    let api = FakeApi::new();
    let mut session = started_session(&api).await;
    api.script(|s| {
        s.completions.push_back(Ok(Completion::Persisted(PersistedDiary {
            id: "d7".into(),
            title: "Diary for 2025-03-04".into(),
            content: "Today you talked about: Good".into(),
            entry_date: Some(date(2025, 3, 4)),
            mood: None,
        })))
    });
    let outcome = session.complete(&api).await.unwrap();
    assert!(matches!(outcome, CompleteOutcome::Saved(ref d) if d.id == "d7"));
    assert_eq!(session.state(), WorkflowState::Saved);
    assert!(session.conversation_id().is_none());
    assert_eq!(session.last_saved(), Some("d7"));
}

#[tokio::test]
async fn test_regenerate_preserves_edited_date() {
    let api = FakeApi::new();
    let mut session = previewing_session(&api).await;
    session.set_entry_date(date(2025, 2, 28)).unwrap();

    api.script(|s| {
        s.completions
            .push_back(Ok(preview("A better day", Some(date(2025, 3, 4)))))
    });
    session
        .regenerate(&api, Some("Make it shorter"))
        .await
        .unwrap();

    let draft = session.draft().unwrap();
    assert_eq!(draft.title, "A better day");
    assert_eq!(draft.entry_date, date(2025, 2, 28));
    assert_eq!(
        session.preferences().custom_instructions.as_deref(),
        Some("Make it shorter")
    );

    let sent = api.state.lock().unwrap().last_completion.clone().unwrap();
    assert_eq!(sent.instructions.as_deref(), Some("Make it shorter"));
}

#[tokio::test]
async fn test_save_rejects_blank_fields_without_request() {
    let api = FakeApi::new();
    let mut session = previewing_session(&api).await;
    session.set_title("   ").unwrap();

    let err = session.save(&api).await.unwrap_err();
    assert!(matches!(err, DiaristError::Validation(_)));
    assert_eq!(session.status(), STATUS_EMPTY_DRAFT);
    assert_eq!(session.state(), WorkflowState::Previewing);
    assert!(!api.calls().iter().any(|c| c.starts_with("save")));
}

#[tokio::test]
async fn test_save_sends_edited_draft() {
    let api = FakeApi::new();
    let mut session = previewing_session(&api).await;
    session.set_content("Edited.").unwrap();
    session.set_mood(Mood::Negative).unwrap();
    api.script(|s| s.saves.push_back(Ok("d2".into())));
    session.save(&api).await.unwrap();

    let sent = api.state.lock().unwrap().last_saved_draft.clone().unwrap();
    assert_eq!(sent.content, "Edited.");
    assert_eq!(sent.mood, Mood::Negative);
}

#[tokio::test]
async fn test_save_failure_keeps_draft() {
    let api = FakeApi::new();
    let mut session = previewing_session(&api).await;
    api.script(|s| s.saves.push_back(Err(server_error())));
    assert!(session.save(&api).await.is_err());
    assert_eq!(session.state(), WorkflowState::Previewing);
    assert!(session.draft().is_some());
    assert!(session.conversation_id().is_some());
}

#[tokio::test]
async fn test_discard_requires_confirmation() {
    let api = FakeApi::new();
    let mut session = previewing_session(&api).await;

    assert!(!session.discard(false).unwrap());
    assert_eq!(session.state(), WorkflowState::Previewing);
    assert!(session.draft().is_some());

    assert!(session.discard(true).unwrap());
    assert_eq!(session.state(), WorkflowState::Discarded);
    assert!(session.draft().is_none());
    assert!(session.conversation_id().is_none());
}

#[tokio::test]
async fn test_session_expired_redirects_without_mutation() {
    let api = FakeApi::new();
    let mut session = started_session(&api).await;
    api.script(|s| s.turns.push_back(Err(expired())));

    let status_before = session.status().to_string();
    let err = session.submit_audio(&api, &blob()).await.unwrap_err();
    assert!(err.is_auth_expired());
    assert_eq!(session.redirect(), Some("http://localhost:5000/login"));
    assert_eq!(session.status(), status_before);
    assert_eq!(session.transcript().len(), 1);
    assert!(session.conversation_id().is_some());

    let calls_before = api.calls().len();
    assert!(session.complete(&api).await.unwrap_err().is_auth_expired());
    assert_eq!(api.calls().len(), calls_before);
}

#[tokio::test]
async fn test_session_expired_on_complete_keeps_status() {
    let api = FakeApi::new();
    let mut session = started_session(&api).await;
    api.script(|s| s.completions.push_back(Err(expired())));

    let status_before = session.status().to_string();
    assert!(session.complete(&api).await.unwrap_err().is_auth_expired());
    assert_eq!(session.status(), status_before);
    assert_eq!(session.state(), WorkflowState::Started);
    assert!(session.draft().is_none());
    assert!(session.redirect().is_some());
}

#[tokio::test]
async fn test_session_expired_on_regenerate_keeps_preferences() {
    let api = FakeApi::new();
    let mut session = previewing_session(&api).await;
    api.script(|s| s.completions.push_back(Err(expired())));

    let status_before = session.status().to_string();
    let preferences_before = session.preferences().clone();
    let title_before = session.draft().unwrap().title.clone();
    let err = session
        .regenerate(&api, Some("shorter please"))
        .await
        .unwrap_err();
    assert!(err.is_auth_expired());
    assert_eq!(session.status(), status_before);
    assert_eq!(session.preferences(), &preferences_before);
    assert_eq!(session.state(), WorkflowState::Previewing);
    assert_eq!(session.draft().unwrap().title, title_before);
}

#[tokio::test]
async fn test_session_expired_on_save_keeps_draft() {
    let api = FakeApi::new();
    let mut session = previewing_session(&api).await;
    api.script(|s| s.saves.push_back(Err(expired())));

    let status_before = session.status().to_string();
    assert!(session.save(&api).await.unwrap_err().is_auth_expired());
    assert_eq!(session.status(), status_before);
    assert_eq!(session.state(), WorkflowState::Previewing);
    assert!(session.draft().is_some());
    assert!(session.conversation_id().is_some());
    assert!(session.last_saved().is_none());
}

#[tokio::test]
async fn test_save_accepts_long_title() {
    let api = FakeApi::new();
    let mut session = previewing_session(&api).await;
    api.script(|s| s.saves.push_back(Ok("d-long".into())));

    session.set_title("a".repeat(201)).unwrap();
    assert_eq!(session.save(&api).await.unwrap(), "d-long");
    assert_eq!(session.state(), WorkflowState::Saved);
}

#[tokio::test]
async fn test_dictation_appends_to_fields() {
    let api = FakeApi::new();
    let mut session = previewing_session(&api).await;
    api.script(|s| {
        s.transcripts.push_back(Ok("and then we ate".into()));
        s.transcripts.push_back(Ok("more upbeat".into()));
    });

    session.dictate(&api, DraftField::Content, &blob()).await.unwrap();
    assert_eq!(
        session.draft().unwrap().content,
        "A good day, in detail. and then we ate"
    );

    session
        .dictate(&api, DraftField::CustomInstructions, &blob())
        .await
        .unwrap();
    assert_eq!(
        session.preferences().custom_instructions.as_deref(),
        Some("more upbeat")
    );
}

#[tokio::test]
async fn test_draft_edits_outside_preview_are_refused() {
    let api = FakeApi::new();
    let mut session = started_session(&api).await;
    assert!(matches!(
        session.set_title("x"),
        Err(DiaristError::InvalidState(_))
    ));
    assert!(session.discard(true).is_err());
}

#[tokio::test]
async fn test_preferences_reset_after_save() {
    let defaults = Preferences {
        theme: Some("travel".into()),
        ..Default::default()
    };
    let api = FakeApi::new();
    api.script(|s| {
        s.starts.push_back(Ok(started("c1", None)));
        s.completions.push_back(Ok(preview("T", None)));
        s.completions.push_back(Ok(preview("T2", None)));
        s.saves.push_back(Ok("d1".into()));
    });
    let mut session = DiarySession::new(Some("u1".into()), defaults.clone());
    session.start(&api).await.unwrap();
    session.complete(&api).await.unwrap();
    session.regenerate(&api, Some("shorter")).await.unwrap();
    assert_ne!(session.preferences(), &defaults);

    session.save(&api).await.unwrap();
    assert_eq!(session.preferences(), &defaults);
}
