use chrono::NaiveDate;
use diarist_core::model::*;
use diarist_core::view::ConversationView;
use diarist_core::workflow::DraftField;

/// Draft fields as the edit form holds them, applied before save or regenerate.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftEdits {
    pub title: String,
    pub content: String,
    pub mood: Mood,
    pub entry_date: NaiveDate,
}

impl From<&DiaryDraft> for DraftEdits {
    fn from(draft: &DiaryDraft) -> Self {
        Self {
            title: draft.title.clone(),
            content: draft.content.clone(),
            mood: draft.mood,
            entry_date: draft.entry_date,
        }
    }
}

/// Actions the UI sends to the async worker task.
#[derive(Debug)]
pub enum AsyncAction {
    StartConversation,
    /// Open the capture device for one turn.
    StartRecording,
    /// Close the capture and upload the turn.
    StopRecording,
    Complete,
    Regenerate {
        edits: Option<DraftEdits>,
        instructions: Option<String>,
    },
    SaveDraft {
        edits: Option<DraftEdits>,
    },
    Discard,
    /// Record audio for a draft field.
    StartDictation,
    StopDictation {
        field: DraftField,
    },
    LoadPage {
        page: usize,
    },
    LoadCalendar {
        year: i32,
        month: u32,
    },
    Search {
        query: String,
    },
    LoadDetail {
        id: String,
    },
    UpdateDiary {
        id: String,
        input: UpdateDiaryInput,
    },
    DeleteDiary {
        id: String,
    },
}

/// Results the async worker sends back to the UI.
#[derive(Debug)]
pub enum AsyncResult {
    /// Fresh projection of the conversation after any workflow step.
    Conversation(Box<ConversationView>),
    /// The diary was stored, either by save or by the server on completion.
    DraftSaved {
        diary_id: String,
        view: Box<ConversationView>,
    },
    Page(DiaryPage),
    Calendar(CalendarMonth),
    SearchResults {
        query: String,
        rows: Vec<DiarySummary>,
    },
    Detail(Box<DiaryEntry>),
    DiaryUpdated(Box<DiaryEntry>),
    DiaryDeleted {
        id: String,
    },
    Dictated {
        field: DraftField,
        text: String,
    },
    /// The backend answered 401. Terminal for this run.
    SessionExpired {
        login_url: String,
    },
    Error(String),
}
