pub mod app;
pub mod event;
mod views;
mod widgets;

use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self as ct_event, Event};
use diarist_core::api::{DiaryApi, HttpDiaryApi};
use diarist_core::capture::{create_source, ActiveCapture, AudioSource, Capture};
use diarist_core::collection::DiaryCollection;
use diarist_core::config::DiaristConfig;
use diarist_core::error::DiaristError;
use diarist_core::view::project;
use diarist_core::workflow::{CompleteOutcome, DiarySession};
use ratatui::layout::{Constraint, Layout};
use ratatui::{DefaultTerminal, Frame};
use tokio::sync::mpsc;

use self::app::{App, InputMode, Screen};
use self::event::{AsyncAction, AsyncResult, DraftEdits};
use self::widgets::tab_bar::TabBar;

/// Entry point for the interactive TUI mode.
pub async fn run_tui(config: &DiaristConfig) -> Result<()> {
    let api = HttpDiaryApi::new(&config.api).context("failed to create API client")?;
    let capture = create_source(&config.capture).context("failed to create audio capture")?;

    let backend_info = api.base_url().to_string();
    let capture_info = capture.describe();

    let worker = Worker {
        session: DiarySession::from_config(config),
        collection: DiaryCollection::new(config.resolve_user_id(), config.diary.page_size),
        api,
        capture,
        dictation: None,
    };

    // Channels for async communication
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<AsyncAction>();
    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<AsyncResult>();

    tokio::spawn(async move {
        worker_loop(worker, &mut action_rx, &result_tx).await;
    });

    // Initialize terminal
    let mut terminal = ratatui::init();
    let mut app = App::new(chrono::Local::now().date_naive());

    let result = run_loop(
        &mut terminal,
        &mut app,
        &action_tx,
        &mut result_rx,
        &backend_info,
        &capture_info,
    );

    // Restore terminal
    ratatui::restore();

    result
}

fn run_loop(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    action_tx: &mpsc::UnboundedSender<AsyncAction>,
    result_rx: &mut mpsc::UnboundedReceiver<AsyncResult>,
    backend_info: &str,
    capture_info: &str,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app, backend_info, capture_info))?;

        // Poll for async results (non-blocking)
        while let Ok(result) = result_rx.try_recv() {
            app.handle_result(result);
        }

        // A save moved us to the list: load it
        if let Some(action) = app.take_refresh() {
            let _ = action_tx.send(action);
        }

        // Poll for keyboard events (50ms timeout for responsive UI)
        if ct_event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = ct_event::read()? {
                if let Some(action) = app.handle_key(key) {
                    let _ = action_tx.send(action);
                }
            }
        }

        app.tick_error();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn render(frame: &mut Frame, app: &App, backend_info: &str, capture_info: &str) {
    let [tabs, body] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(frame.area());

    frame.render_widget(
        TabBar {
            current: app.nav.current(),
            loading: app.loading,
        },
        tabs,
    );

    match app.screen {
        Screen::Conversation => {
            views::conversation::render(frame, app, body, backend_info, capture_info)
        }
        Screen::List => views::list::render(frame, app, body),
        Screen::Calendar => views::calendar::render(frame, app, body),
        Screen::Detail => views::detail::render(frame, app, body),
        Screen::Edit => views::edit::render(frame, app, body),
    }

    match app.input_mode {
        InputMode::ConfirmDiscard => render_confirm(frame, "Discard this draft? (y/n)"),
        InputMode::ConfirmDelete => render_confirm(frame, "Delete this diary? (y/n)"),
        _ => {}
    }

    if let Some(ref url) = app.redirect {
        render_redirect(frame, url);
    } else if let Some(ref msg) = app.error_message {
        render_error_toast(frame, msg);
    }
}

fn render_confirm(frame: &mut Frame, prompt: &str) {
    use ratatui::{
        layout::Flex,
        style::{Color, Modifier, Style},
        widgets::{Block, Borders, Clear, Paragraph},
    };

    let [area] = Layout::horizontal([Constraint::Length(prompt.len() as u16 + 6)])
        .flex(Flex::Center)
        .areas(frame.area());
    let [area] = Layout::vertical([Constraint::Length(3)])
        .flex(Flex::Center)
        .areas(area);

    frame.render_widget(Clear, area);
    let popup = Paragraph::new(format!("  {prompt}"))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Confirm "),
        );
    frame.render_widget(popup, area);
}

/// Full-width banner once the backend rejected the session.
fn render_redirect(frame: &mut Frame, login_url: &str) {
    use ratatui::{
        layout::Flex,
        style::{Color, Modifier, Style},
        text::{Line, Span},
        widgets::{Block, Borders, Clear, Paragraph, Wrap},
    };

    let [area] = Layout::horizontal([Constraint::Percentage(70)])
        .flex(Flex::Center)
        .areas(frame.area());
    let [area] = Layout::vertical([Constraint::Length(6)])
        .flex(Flex::Center)
        .areas(area);

    frame.render_widget(Clear, area);
    let lines = vec![
        Line::from(Span::styled(
            " Your session has expired. Sign in again at:",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!(" {login_url}"),
            Style::default().fg(Color::Cyan),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " Press q to quit.",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let banner = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Signed out "),
    );
    frame.render_widget(banner, area);
}

fn render_error_toast(frame: &mut Frame, msg: &str) {
    use ratatui::{
        layout::Flex,
        style::{Color, Style},
        widgets::{Block, Borders, Clear, Paragraph},
    };

    let area = frame.area();
    let [toast_area] = Layout::horizontal([Constraint::Percentage(60)])
        .flex(Flex::Center)
        .areas(area);
    let [toast_area] = Layout::vertical([Constraint::Length(3)])
        .flex(Flex::End)
        .areas(toast_area);

    frame.render_widget(Clear, toast_area);
    let toast = Paragraph::new(format!(" ✗ {msg}"))
        .style(Style::default().fg(Color::White).bg(Color::Red))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Error "),
        );
    frame.render_widget(toast, toast_area);
}

/// Everything the worker task owns. The session is only touched here, so
/// workflow steps never overlap.
struct Worker<A: DiaryApi> {
    api: A,
    session: DiarySession,
    collection: DiaryCollection,
    capture: Capture,
    dictation: Option<ActiveCapture>,
}

/// Async worker loop: runs actions one at a time against the backend.
async fn worker_loop<A: DiaryApi>(
    mut worker: Worker<A>,
    action_rx: &mut mpsc::UnboundedReceiver<AsyncAction>,
    result_tx: &mpsc::UnboundedSender<AsyncResult>,
) {
    while let Some(action) = action_rx.recv().await {
        for result in worker.handle(action).await {
            if result_tx.send(result).is_err() {
                return; // UI closed
            }
        }
    }
}

fn failure(err: DiaristError) -> AsyncResult {
    match err {
        DiaristError::SessionExpired { login_url } => AsyncResult::SessionExpired { login_url },
        other => AsyncResult::Error(other.to_string()),
    }
}

impl<A: DiaryApi> Worker<A> {
    async fn handle(&mut self, action: AsyncAction) -> Vec<AsyncResult> {
        match action {
            AsyncAction::StartConversation => {
                let r = self.session.start(&self.api).await;
                self.conversation(r)
            }
            AsyncAction::StartRecording => {
                let r = self.session.start_recording(&self.capture).await;
                self.conversation(r)
            }
            AsyncAction::StopRecording => {
                let r = self.session.stop_recording(&self.api).await.map(|_| ());
                self.conversation(r)
            }
            AsyncAction::Complete => {
                let r = self.session.complete(&self.api).await;
                self.outcome(r)
            }
            AsyncAction::Regenerate {
                edits,
                instructions,
            } => {
                if let Err(e) = self.apply_edits(edits) {
                    return self.conversation(Err(e));
                }
                let r = self
                    .session
                    .regenerate(&self.api, instructions.as_deref())
                    .await;
                self.outcome(r)
            }
            AsyncAction::SaveDraft { edits } => {
                if let Err(e) = self.apply_edits(edits) {
                    return self.conversation(Err(e));
                }
                match self.session.save(&self.api).await {
                    Ok(diary_id) => vec![AsyncResult::DraftSaved {
                        diary_id,
                        view: Box::new(project(&self.session)),
                    }],
                    Err(e) => self.conversation(Err(e)),
                }
            }
            AsyncAction::Discard => {
                let r = self.session.discard(true).map(|_| ());
                self.conversation(r)
            }
            AsyncAction::StartDictation => match self.capture.start().await {
                Ok(active) => {
                    self.dictation = Some(active);
                    Vec::new()
                }
                Err(e) => vec![AsyncResult::Error(format!("Failed to start dictation: {e}"))],
            },
            AsyncAction::StopDictation { field } => {
                let Some(active) = self.dictation.take() else {
                    return vec![AsyncResult::Error("Not dictating.".into())];
                };
                let blob = match active.stop().await {
                    Ok(blob) => blob,
                    Err(e) => return vec![AsyncResult::Error(format!("Dictation failed: {e}"))],
                };
                match self.session.dictate(&self.api, field, &blob).await {
                    Ok(text) => vec![AsyncResult::Dictated { field, text }],
                    Err(e) => vec![failure(e)],
                }
            }
            AsyncAction::LoadPage { page } => {
                match self.collection.load_page(&self.api, page).await {
                    Ok(page) => vec![AsyncResult::Page(page.clone())],
                    Err(e) => vec![failure(e)],
                }
            }
            AsyncAction::LoadCalendar { year, month } => {
                match self.collection.load_calendar(&self.api, year, month).await {
                    Ok(month) => vec![AsyncResult::Calendar(month.clone())],
                    Err(e) => vec![failure(e)],
                }
            }
            AsyncAction::Search { query } => {
                match self.collection.search(&self.api, &query).await {
                    Ok(rows) => vec![AsyncResult::SearchResults {
                        rows: rows.to_vec(),
                        query,
                    }],
                    Err(e) => vec![failure(e)],
                }
            }
            AsyncAction::LoadDetail { id } => match self.collection.open(&self.api, &id).await {
                Ok(entry) => vec![AsyncResult::Detail(Box::new(entry.clone()))],
                Err(e) => vec![failure(e)],
            },
            AsyncAction::UpdateDiary { id, input } => {
                match self.collection.update(&self.api, &id, &input).await {
                    Ok(entry) => vec![AsyncResult::DiaryUpdated(Box::new(entry.clone()))],
                    Err(e) => vec![failure(e)],
                }
            }
            AsyncAction::DeleteDiary { id } => {
                match self.collection.delete(&self.api, &id, true).await {
                    Ok(_) => vec![AsyncResult::DiaryDeleted { id }],
                    Err(e) => vec![failure(e)],
                }
            }
        }
    }

    /// Fresh view of the session, plus the error if the step failed.
    fn conversation(&self, result: diarist_core::error::Result<()>) -> Vec<AsyncResult> {
        let mut results = vec![AsyncResult::Conversation(Box::new(project(&self.session)))];
        if let Err(e) = result {
            results.push(failure(e));
        }
        results
    }

    fn outcome(&self, result: diarist_core::error::Result<CompleteOutcome>) -> Vec<AsyncResult> {
        match result {
            Ok(CompleteOutcome::Saved(diary)) => vec![AsyncResult::DraftSaved {
                diary_id: diary.id,
                view: Box::new(project(&self.session)),
            }],
            Ok(CompleteOutcome::Draft) => self.conversation(Ok(())),
            Err(e) => self.conversation(Err(e)),
        }
    }

    /// Copy form edits into the session draft, touching only changed fields.
    fn apply_edits(&mut self, edits: Option<DraftEdits>) -> diarist_core::error::Result<()> {
        let Some(edits) = edits else {
            return Ok(());
        };
        let Some(draft) = self.session.draft().cloned() else {
            return Ok(());
        };
        if edits.title != draft.title {
            self.session.set_title(edits.title)?;
        }
        if edits.content != draft.content {
            self.session.set_content(edits.content)?;
        }
        if edits.mood != draft.mood {
            self.session.set_mood(edits.mood)?;
        }
        if edits.entry_date != draft.entry_date {
            self.session.set_entry_date(edits.entry_date)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use diarist_core::capture::{AudioBlob, ScriptedAudioSource};
    use diarist_core::config::ApiConfig;
    use diarist_core::model::Preferences;
    use diarist_core::view::ConversationView;
    use diarist_core::workflow::{DraftField, WorkflowState};
    use serde_json::json;

    fn blob() -> AudioBlob {
        AudioBlob::new(b"RIFF....WAVE".to_vec(), "audio/wav", "turn.wav")
    }

    fn router() -> Router {
        Router::new()
            .route(
                "/api/conversations",
                post(|| async {
                    Json(json!({ "conversation_id": "c1", "first_message": "How was your day?" }))
                }),
            )
            .route(
                "/api/conversations/{id}/audio",
                post(|| async { Json(json!({ "user_message": "Fine", "ai_response": "Tell me more" })) }),
            )
            .route(
                "/api/conversations/{id}/complete",
                post(|| async {
                    Json(json!({
                        "title": "A fine day",
                        "content": "It was fine.",
                        "mood": "neutral",
                        "suggested_date": "2025-04-01",
                    }))
                }),
            )
            .route(
                "/api/conversations/{id}/save",
                post(|| async { Json(json!({ "diary_id": "d9" })) }),
            )
            .route(
                "/api/transcribe",
                post(|| async { Json(json!({ "text": "by the sea" })) }),
            )
    }

    async fn worker(router: Router, blobs: Vec<AudioBlob>) -> Worker<HttpDiaryApi> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let api = HttpDiaryApi::new(&ApiConfig {
            base_url: format!("http://{addr}"),
            timeout_secs: Some(10),
            ..Default::default()
        })
        .unwrap();
        Worker {
            api,
            session: DiarySession::new(Some("u1".into()), Preferences::default()),
            collection: DiaryCollection::new(Some("u1".into()), 10),
            capture: Capture::Scripted(ScriptedAudioSource::new(blobs)),
            dictation: None,
        }
    }

    fn view_of(results: &[AsyncResult]) -> &ConversationView {
        match results.first() {
            Some(AsyncResult::Conversation(view)) => view,
            other => panic!("expected conversation view, got {other:?}"),
        }
    }

    /// Drive a worker to a draft preview.
    async fn previewing(w: &mut Worker<HttpDiaryApi>) {
        w.handle(AsyncAction::StartConversation).await;
        w.handle(AsyncAction::StartRecording).await;
        w.handle(AsyncAction::StopRecording).await;
        let results = w.handle(AsyncAction::Complete).await;
        assert_eq!(view_of(&results).state, WorkflowState::Previewing);
    }

    #[tokio::test]
    async fn test_start_reports_view() {
        let mut w = worker(router(), Vec::new()).await;
        let results = w.handle(AsyncAction::StartConversation).await;
        assert_eq!(results.len(), 1);
        let view = view_of(&results);
        assert_eq!(view.state, WorkflowState::Started);
        assert_eq!(view.transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_becomes_redirect() {
        let router = Router::new().route(
            "/api/conversations",
            post(|| async { StatusCode::UNAUTHORIZED }),
        );
        let mut w = worker(router, Vec::new()).await;
        let results = w.handle(AsyncAction::StartConversation).await;
        assert_eq!(results.len(), 2);
        assert!(view_of(&results).redirect.is_some());
        assert!(matches!(
            results[1],
            AsyncResult::SessionExpired { ref login_url } if login_url.ends_with("/login")
        ));
    }

    #[tokio::test]
    async fn test_invalid_step_reports_error() {
        let mut w = worker(router(), Vec::new()).await;
        let results = w.handle(AsyncAction::Complete).await;
        assert_eq!(view_of(&results).state, WorkflowState::Idle);
        assert!(matches!(results[1], AsyncResult::Error(_)));
    }

    #[tokio::test]
    async fn test_save_applies_edits() {
        let mut w = worker(router(), vec![blob()]).await;
        previewing(&mut w).await;

        let draft = w.session.draft().cloned().unwrap();
        let edits = DraftEdits {
            title: "A calm day".into(),
            ..DraftEdits::from(&draft)
        };
        let results = w
            .handle(AsyncAction::SaveDraft { edits: Some(edits) })
            .await;
        match &results[..] {
            [AsyncResult::DraftSaved { diary_id, view }] => {
                assert_eq!(diary_id, "d9");
                assert_eq!(view.state, WorkflowState::Saved);
            }
            other => panic!("expected saved, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_title_edit_blocks_save() {
        let mut w = worker(router(), vec![blob()]).await;
        previewing(&mut w).await;

        let draft = w.session.draft().cloned().unwrap();
        let edits = DraftEdits {
            title: "  ".into(),
            ..DraftEdits::from(&draft)
        };
        let results = w
            .handle(AsyncAction::SaveDraft { edits: Some(edits) })
            .await;
        assert_eq!(view_of(&results).state, WorkflowState::Previewing);
        assert!(matches!(results[1], AsyncResult::Error(_)));
    }

    #[tokio::test]
    async fn test_dictation_into_title() {
        let mut w = worker(router(), vec![blob(), blob()]).await;
        previewing(&mut w).await;

        assert!(w.handle(AsyncAction::StartDictation).await.is_empty());
        let results = w
            .handle(AsyncAction::StopDictation {
                field: DraftField::Title,
            })
            .await;
        assert!(matches!(
            results[0],
            AsyncResult::Dictated { field: DraftField::Title, ref text } if text == "by the sea"
        ));
        assert_eq!(w.session.draft().unwrap().title, "A fine day by the sea");
    }

    #[tokio::test]
    async fn test_stop_dictation_without_start() {
        let mut w = worker(router(), Vec::new()).await;
        let results = w
            .handle(AsyncAction::StopDictation {
                field: DraftField::Content,
            })
            .await;
        assert!(matches!(results[0], AsyncResult::Error(ref m) if m == "Not dictating."));
    }
}
