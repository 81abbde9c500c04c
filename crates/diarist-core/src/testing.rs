//! In-memory `DiaryApi` for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::api::{CompletionRequest, DiaryApi};
use crate::capture::AudioBlob;
use crate::error::{DiaristError, Result};
use crate::model::*;

#[derive(Default)]
pub(crate) struct FakeState {
    pub starts: VecDeque<Result<ConversationStarted>>,
    pub turns: VecDeque<Result<TurnReply>>,
    pub completions: VecDeque<Result<Completion>>,
    pub saves: VecDeque<Result<String>>,
    pub transcripts: VecDeque<Result<String>>,
    pub pages: VecDeque<Result<DiaryPage>>,
    pub calendars: VecDeque<Result<CalendarMonth>>,
    pub searches: VecDeque<Result<Vec<DiarySummary>>>,
    pub entries: VecDeque<Result<DiaryEntry>>,
    pub deletes: VecDeque<Result<()>>,
    /// Every call, in order, as `name` or `name:arg`.
    pub calls: Vec<String>,
    pub last_completion: Option<CompletionRequest>,
    pub last_saved_draft: Option<DiaryDraft>,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub state: Mutex<FakeState>,
}

fn next<T>(queue: &mut VecDeque<Result<T>>, name: &str) -> Result<T> {
    queue.pop_front().unwrap_or_else(|| {
        Err(DiaristError::Api {
            status: 500,
            message: format!("no scripted {name} response"),
        })
    })
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(f: impl FnOnce(&mut FakeState)) -> Self {
        let api = Self::new();
        f(&mut api.state.lock().unwrap());
        api
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn script(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    fn record(&self, call: String) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

pub(crate) fn expired() -> DiaristError {
    DiaristError::SessionExpired {
        login_url: "http://localhost:5000/login".into(),
    }
}

pub(crate) fn server_error() -> DiaristError {
    DiaristError::Api {
        status: 500,
        message: "boom".into(),
    }
}

pub(crate) fn started(id: &str, first: Option<&str>) -> ConversationStarted {
    ConversationStarted {
        conversation_id: ConversationId::parse(id).unwrap(),
        first_message: first.map(str::to_string),
    }
}

pub(crate) fn reply(user: &str, ai: &str) -> TurnReply {
    TurnReply {
        user_message: Some(user.to_string()),
        ai_response: Some(ai.to_string()),
    }
}

pub(crate) fn preview(title: &str, suggested: Option<NaiveDate>) -> Completion {
    Completion::Preview(GeneratedDiary {
        title: title.to_string(),
        content: format!("{title}, in detail."),
        mood: Mood::Positive,
        mood_score: Some(0.9),
        summary: None,
        suggested_date: suggested,
    })
}

pub(crate) fn row(id: &str, date: Option<NaiveDate>) -> DiarySummary {
    DiarySummary {
        id: id.to_string(),
        title: format!("Diary {id}"),
        entry_date: date,
        preview: String::new(),
        mood: None,
    }
}

pub(crate) fn entry(id: &str, content: &str) -> DiaryEntry {
    DiaryEntry {
        id: id.to_string(),
        title: format!("Diary {id}"),
        content: content.to_string(),
        mood: None,
        entry_date: None,
        created_at: None,
    }
}

pub(crate) fn blob() -> AudioBlob {
    AudioBlob::new(b"RIFF....WAVE".to_vec(), "audio/wav", "recording.wav")
}

impl DiaryApi for FakeApi {
    async fn start_conversation(&self, user_id: &str) -> Result<ConversationStarted> {
        let mut s = self.record(format!("start:{user_id}"));
        next(&mut s.starts, "start")
    }

    async fn submit_turn(&self, id: &ConversationId, _audio: &AudioBlob) -> Result<TurnReply> {
        let mut s = self.record(format!("turn:{id}"));
        next(&mut s.turns, "turn")
    }

    async fn complete(&self, id: &ConversationId, request: &CompletionRequest) -> Result<Completion> {
        let mut s = self.record(format!("complete:{id}"));
        s.last_completion = Some(request.clone());
        next(&mut s.completions, "complete")
    }

    async fn save_draft(&self, id: &ConversationId, draft: &DiaryDraft) -> Result<String> {
        let mut s = self.record(format!("save:{id}"));
        s.last_saved_draft = Some(draft.clone());
        next(&mut s.saves, "save")
    }

    async fn list_diaries(&self, _user_id: &str, page: usize, limit: usize) -> Result<DiaryPage> {
        let mut s = self.record(format!("list:{page}:{limit}"));
        next(&mut s.pages, "list")
    }

    async fn calendar(&self, _user_id: &str, year: i32, month: u32) -> Result<CalendarMonth> {
        let mut s = self.record(format!("calendar:{year}-{month}"));
        next(&mut s.calendars, "calendar")
    }

    async fn search(&self, _user_id: &str, query: &str) -> Result<Vec<DiarySummary>> {
        let mut s = self.record(format!("search:{query}"));
        next(&mut s.searches, "search")
    }

    async fn get_diary(&self, id: &str) -> Result<DiaryEntry> {
        let mut s = self.record(format!("get:{id}"));
        next(&mut s.entries, "get")
    }

    async fn update_diary(&self, id: &str, _input: &UpdateDiaryInput) -> Result<DiaryEntry> {
        let mut s = self.record(format!("update:{id}"));
        next(&mut s.entries, "update")
    }

    async fn delete_diary(&self, id: &str) -> Result<()> {
        let mut s = self.record(format!("delete:{id}"));
        next(&mut s.deletes, "delete")
    }

    async fn transcribe(&self, _audio: &AudioBlob) -> Result<String> {
        let mut s = self.record("transcribe".to_string());
        next(&mut s.transcripts, "transcribe")
    }
}
