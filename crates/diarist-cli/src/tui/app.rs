use chrono::{Datelike, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use diarist_core::collection::shift_month;
use diarist_core::model::*;
use diarist_core::nav::{Navigator, Refresh, Section};
use diarist_core::view::{ConversationView, Controls};
use diarist_core::workflow::{DraftField, WorkflowState};

use super::event::{AsyncAction, AsyncResult, DraftEdits};

/// Which screen is currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Conversation,
    List,
    Calendar,
    Detail,
    Edit,
}

impl Screen {
    fn for_section(section: Section) -> Self {
        match section {
            Section::Conversation => Self::Conversation,
            Section::Diaries => Self::List,
            Section::Calendar => Self::Calendar,
        }
    }
}

/// Input mode within the current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    /// Typing extra instructions before regenerating.
    Instructions,
    ConfirmDiscard,
    ConfirmDelete,
}

/// What the edit form writes back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Draft,
    Diary(String),
}

/// Edit form fields in Tab order.
pub const EDIT_FIELDS: &[&str] = &["Title", "Content", "Mood", "Date"];
pub const FIELD_TITLE: usize = 0;
pub const FIELD_CONTENT: usize = 1;
pub const FIELD_MOOD: usize = 2;
pub const FIELD_DATE: usize = 3;

/// One line of editable text. `cursor` is a byte offset on a char boundary.
#[derive(Debug, Clone, Default)]
pub struct InputLine {
    pub text: String,
    pub cursor: usize,
}

impl InputLine {
    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Apply an editing key. Returns `false` for keys it does not handle.
    pub fn handle(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) => {
                self.text.insert(self.cursor, c);
                self.cursor += c.len_utf8();
            }
            KeyCode::Backspace => {
                if let Some((i, _)) = self.text[..self.cursor].char_indices().next_back() {
                    self.text.remove(i);
                    self.cursor = i;
                }
            }
            KeyCode::Left => {
                if let Some((i, _)) = self.text[..self.cursor].char_indices().next_back() {
                    self.cursor = i;
                }
            }
            KeyCode::Right => {
                if let Some(c) = self.text[self.cursor..].chars().next() {
                    self.cursor += c.len_utf8();
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.text.len(),
            _ => return false,
        }
        true
    }
}

/// Draft or diary fields being edited.
#[derive(Debug, Clone)]
pub struct EditForm {
    pub target: EditTarget,
    pub title: String,
    pub content: String,
    pub mood: Mood,
    pub mood_touched: bool,
    pub date: String,
    pub field: usize,
}

impl EditForm {
    fn from_draft(draft: &DiaryDraft) -> Self {
        Self {
            target: EditTarget::Draft,
            title: draft.title.clone(),
            content: draft.content.clone(),
            mood: draft.mood,
            mood_touched: false,
            date: draft.entry_date.format("%Y-%m-%d").to_string(),
            field: FIELD_TITLE,
        }
    }

    fn from_entry(entry: &DiaryEntry) -> Self {
        Self {
            target: EditTarget::Diary(entry.id.clone()),
            title: entry.title.clone(),
            content: entry.content.clone(),
            mood: entry.mood.unwrap_or_default(),
            mood_touched: false,
            date: entry
                .entry_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            field: FIELD_TITLE,
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.field {
            FIELD_TITLE => Some(&mut self.title),
            FIELD_CONTENT => Some(&mut self.content),
            FIELD_DATE => Some(&mut self.date),
            _ => None,
        }
    }

    /// Blank means "leave the date alone".
    pub fn parse_date(&self) -> Result<Option<NaiveDate>, String> {
        let raw = self.date.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("Invalid date \"{raw}\", use YYYY-MM-DD."))
    }

    fn dictation_field(&self) -> Option<DraftField> {
        match self.field {
            FIELD_TITLE => Some(DraftField::Title),
            FIELD_CONTENT => Some(DraftField::Content),
            _ => None,
        }
    }

    /// Fields that differ from the stored entry.
    fn changes(&self, entry: Option<&DiaryEntry>, date: Option<NaiveDate>) -> UpdateDiaryInput {
        let mut input = UpdateDiaryInput::default();
        let (title, content, mood, entry_date) = entry
            .map(|e| (e.title.as_str(), e.content.as_str(), e.mood, e.entry_date))
            .unwrap_or(("", "", None, None));
        if self.title != title {
            input.title = Some(self.title.clone());
        }
        if self.content != content {
            input.content = Some(self.content.clone());
        }
        if self.mood_touched && Some(self.mood) != mood {
            input.mood = Some(self.mood);
        }
        if date.is_some() && date != entry_date {
            input.entry_date = date;
        }
        input
    }
}

/// Central application state.
pub struct App {
    pub nav: Navigator,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub should_quit: bool,
    pub loading: bool,
    pub needs_refresh: Refresh,

    // -- Conversation state --
    pub conversation: ConversationView,
    pub instructions: InputLine,
    pub dictating: Option<DraftField>,
    pub last_saved: Option<String>,

    // -- List state --
    pub page: Option<DiaryPage>,
    pub selected: usize,
    pub search: InputLine,
    pub active_query: Option<String>,
    pub search_results: Vec<DiarySummary>,

    // -- Calendar state --
    pub calendar_month: (i32, u32),
    pub calendar: Option<CalendarMonth>,
    pub calendar_selected: usize,

    // -- Detail state --
    pub detail: Option<DiaryEntry>,
    pub detail_scroll: u16,
    pub detail_return: Screen,

    pub edit: Option<EditForm>,

    /// Login URL after a 401. Once set, only quitting is possible.
    pub redirect: Option<String>,

    // -- Error toast --
    pub error_message: Option<String>,
    pub error_timer: u8, // ticks remaining
}

fn idle_view() -> ConversationView {
    ConversationView {
        state: WorkflowState::Idle,
        status: "Press s to start a conversation.".to_string(),
        controls: Controls::for_state(WorkflowState::Idle),
        transcript: Vec::new(),
        draft: None,
        redirect: None,
    }
}

/// Append dictated text, separated by a space from what is already there.
fn append_text(target: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !target.is_empty() && !target.ends_with(char::is_whitespace) {
        target.push(' ');
    }
    target.push_str(text);
}

impl App {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            nav: Navigator::new(),
            screen: Screen::Conversation,
            input_mode: InputMode::Normal,
            should_quit: false,
            loading: false,
            needs_refresh: Refresh::None,

            conversation: idle_view(),
            instructions: InputLine::default(),
            dictating: None,
            last_saved: None,

            page: None,
            selected: 0,
            search: InputLine::default(),
            active_query: None,
            search_results: Vec::new(),

            calendar_month: (today.year(), today.month()),
            calendar: None,
            calendar_selected: 0,

            detail: None,
            detail_scroll: 0,
            detail_return: Screen::List,

            edit: None,
            redirect: None,

            error_message: None,
            error_timer: 0,
        }
    }

    /// Process an async result from the worker.
    pub fn handle_result(&mut self, result: AsyncResult) {
        match result {
            AsyncResult::Conversation(view) => self.apply_view(*view),
            AsyncResult::DraftSaved { diary_id, view } => {
                self.apply_view(*view);
                self.last_saved = Some(diary_id);
                self.edit = None;
                self.input_mode = InputMode::Normal;
                self.needs_refresh = self.nav.after_save();
                self.screen = Screen::for_section(self.nav.current());
            }
            AsyncResult::Page(page) => {
                self.selected = self.selected.min(page.diaries.len().saturating_sub(1));
                self.page = Some(page);
                self.loading = false;
            }
            AsyncResult::Calendar(month) => {
                self.calendar_month = (month.year, month.month);
                self.calendar = Some(month);
                self.calendar_selected = 0;
                self.loading = false;
            }
            AsyncResult::SearchResults { query, rows } => {
                self.active_query = Some(query);
                self.search_results = rows;
                self.selected = 0;
                self.loading = false;
            }
            AsyncResult::Detail(entry) => {
                self.detail = Some(*entry);
                self.detail_scroll = 0;
                self.screen = Screen::Detail;
                self.loading = false;
            }
            AsyncResult::DiaryUpdated(entry) => {
                let summary = DiarySummary::from(entry.as_ref());
                self.for_each_row(|row| {
                    if row.id == summary.id {
                        *row = summary.clone();
                    }
                });
                self.detail = Some(*entry);
                self.edit = None;
                self.screen = Screen::Detail;
                self.loading = false;
            }
            AsyncResult::DiaryDeleted { id } => {
                self.remove_rows(&id);
                self.detail = None;
                self.detail_scroll = 0;
                self.screen = self.detail_return;
                self.input_mode = InputMode::Normal;
                self.loading = false;
            }
            AsyncResult::Dictated { field, text } => {
                self.dictating = None;
                self.loading = false;
                if let Some(ref mut form) = self.edit {
                    match field {
                        DraftField::Title => append_text(&mut form.title, &text),
                        DraftField::Content => append_text(&mut form.content, &text),
                        DraftField::CustomInstructions => {}
                    }
                }
            }
            AsyncResult::SessionExpired { login_url } => {
                self.redirect = Some(login_url);
                self.conversation.controls = Controls::none();
                self.input_mode = InputMode::Normal;
                self.dictating = None;
                self.loading = false;
            }
            AsyncResult::Error(msg) => {
                self.show_error(msg);
                self.dictating = None;
                self.loading = false;
            }
        }
    }

    fn apply_view(&mut self, view: ConversationView) {
        if let Some(ref url) = view.redirect {
            self.redirect = Some(url.clone());
        }
        self.conversation = view;
        self.loading = false;
    }

    /// Handle a key event. Returns an optional async action to dispatch.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        // Ctrl+C always quits
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return None;
        }

        if self.redirect.is_some() {
            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                self.should_quit = true;
            }
            return None;
        }

        match (self.screen, self.input_mode) {
            (_, InputMode::Search) => self.handle_search(key),
            (_, InputMode::Instructions) => self.handle_instructions(key),
            (_, InputMode::ConfirmDiscard) => self.handle_confirm_discard(key),
            (_, InputMode::ConfirmDelete) => self.handle_confirm_delete(key),
            (Screen::Edit, _) => self.handle_edit(key),
            (Screen::Conversation, _) => self.handle_conversation(key),
            (Screen::List, _) => self.handle_list(key),
            (Screen::Calendar, _) => self.handle_calendar(key),
            (Screen::Detail, _) => self.handle_detail(key),
        }
    }

    /// Keys shared by the section screens: quit and tab switching.
    fn handle_global(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        let refresh = match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return None;
            }
            KeyCode::Tab => self.nav.next(),
            KeyCode::BackTab => self.nav.prev(),
            KeyCode::Char('1') => self.nav.switch(Section::Conversation),
            KeyCode::Char('2') => self.nav.switch(Section::Diaries),
            KeyCode::Char('3') => self.nav.switch(Section::Calendar),
            _ => return None,
        };
        self.screen = Screen::for_section(self.nav.current());
        self.refresh_action(refresh)
    }

    /// Action that reloads the data a section shows.
    pub fn refresh_action(&mut self, refresh: Refresh) -> Option<AsyncAction> {
        match refresh {
            Refresh::None => None,
            Refresh::DiaryList => {
                self.loading = true;
                self.active_query = None;
                self.search_results.clear();
                self.selected = 0;
                Some(AsyncAction::LoadPage { page: 1 })
            }
            Refresh::CalendarMonth => {
                self.loading = true;
                let (year, month) = self.calendar_month;
                Some(AsyncAction::LoadCalendar { year, month })
            }
        }
    }

    /// Pending reload requested by a result, if any.
    pub fn take_refresh(&mut self) -> Option<AsyncAction> {
        let refresh = std::mem::replace(&mut self.needs_refresh, Refresh::None);
        self.refresh_action(refresh)
    }

    fn handle_conversation(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        let controls = self.conversation.controls;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('s') if ctrl => {
                if !controls.can_save {
                    return None;
                }
                self.loading = true;
                Some(AsyncAction::SaveDraft {
                    edits: self.conversation.draft.as_ref().map(DraftEdits::from),
                })
            }
            KeyCode::Char('s') if controls.can_start => {
                self.loading = true;
                Some(AsyncAction::StartConversation)
            }
            KeyCode::Char('r') | KeyCode::Char(' ') => {
                if controls.can_record {
                    Some(AsyncAction::StartRecording)
                } else if controls.can_stop {
                    self.loading = true;
                    Some(AsyncAction::StopRecording)
                } else {
                    None
                }
            }
            KeyCode::Char('c') if controls.can_complete => {
                self.loading = true;
                Some(AsyncAction::Complete)
            }
            KeyCode::Char('e') if controls.can_save => {
                if let Some(ref draft) = self.conversation.draft {
                    self.edit = Some(EditForm::from_draft(draft));
                    self.screen = Screen::Edit;
                }
                None
            }
            KeyCode::Char('g') if controls.can_regenerate => {
                self.instructions.clear();
                self.input_mode = InputMode::Instructions;
                None
            }
            KeyCode::Char('d') if controls.can_discard => {
                self.input_mode = InputMode::ConfirmDiscard;
                None
            }
            _ => self.handle_global(key),
        }
    }

    fn handle_instructions(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                None
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                let text = self.instructions.text.trim();
                let instructions = (!text.is_empty()).then(|| text.to_string());
                self.loading = true;
                Some(AsyncAction::Regenerate {
                    edits: self.conversation.draft.as_ref().map(DraftEdits::from),
                    instructions,
                })
            }
            code => {
                self.instructions.handle(code);
                None
            }
        }
    }

    fn handle_confirm_discard(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        self.input_mode = InputMode::Normal;
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(AsyncAction::Discard),
            _ => None,
        }
    }

    fn handle_confirm_delete(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        self.input_mode = InputMode::Normal;
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let id = self.detail.as_ref()?.id.clone();
                self.loading = true;
                Some(AsyncAction::DeleteDiary { id })
            }
            _ => None,
        }
    }

    fn handle_list(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.move_selection(1);
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.move_selection(-1);
                None
            }
            KeyCode::Char('g') => {
                self.selected = 0;
                None
            }
            KeyCode::Char('G') => {
                self.selected = self.visible_rows().len().saturating_sub(1);
                None
            }
            KeyCode::Enter => {
                let id = self.visible_rows().get(self.selected)?.id.clone();
                self.open_detail(id, Screen::List)
            }
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Search;
                self.search.clear();
                None
            }
            KeyCode::Char('n') | KeyCode::Right if self.active_query.is_none() => {
                let page = self.page.as_ref().filter(|p| p.has_next())?.page + 1;
                self.loading = true;
                self.selected = 0;
                Some(AsyncAction::LoadPage { page })
            }
            KeyCode::Char('p') | KeyCode::Left if self.active_query.is_none() => {
                let page = self.page.as_ref().filter(|p| p.has_prev())?.page - 1;
                self.loading = true;
                self.selected = 0;
                Some(AsyncAction::LoadPage { page })
            }
            KeyCode::Char('r') => {
                self.loading = true;
                let page = self.page.as_ref().map_or(1, |p| p.page);
                Some(AsyncAction::LoadPage { page })
            }
            KeyCode::Esc => {
                // Clear search results, back to the page
                if self.active_query.is_some() {
                    self.active_query = None;
                    self.search_results.clear();
                    self.selected = 0;
                }
                None
            }
            _ => self.handle_global(key),
        }
    }

    fn handle_search(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                None
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                let query = self.search.text.trim().to_string();
                if query.is_empty() {
                    self.active_query = None;
                    self.search_results.clear();
                    self.selected = 0;
                    None
                } else {
                    self.loading = true;
                    Some(AsyncAction::Search { query })
                }
            }
            code => {
                self.search.handle(code);
                None
            }
        }
    }

    fn handle_calendar(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => self.shift_calendar(-1),
            KeyCode::Char('l') | KeyCode::Right => self.shift_calendar(1),
            KeyCode::Char('j') | KeyCode::Down => {
                let last = self.calendar_rows().len().saturating_sub(1);
                self.calendar_selected = (self.calendar_selected + 1).min(last);
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.calendar_selected = self.calendar_selected.saturating_sub(1);
                None
            }
            KeyCode::Enter => {
                let id = self.calendar_rows().get(self.calendar_selected)?.id.clone();
                self.open_detail(id, Screen::Calendar)
            }
            KeyCode::Char('r') => self.refresh_action(Refresh::CalendarMonth),
            _ => self.handle_global(key),
        }
    }

    fn shift_calendar(&mut self, delta: i32) -> Option<AsyncAction> {
        let (year, month) = shift_month(self.calendar_month.0, self.calendar_month.1, delta);
        self.calendar_month = (year, month);
        self.loading = true;
        Some(AsyncAction::LoadCalendar { year, month })
    }

    fn handle_detail(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        match key.code {
            KeyCode::Esc | KeyCode::Backspace => {
                self.screen = self.detail_return;
                self.detail = None;
                self.detail_scroll = 0;
                None
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.detail_scroll = self.detail_scroll.saturating_add(1);
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.detail_scroll = self.detail_scroll.saturating_sub(1);
                None
            }
            KeyCode::PageDown => {
                self.detail_scroll = self.detail_scroll.saturating_add(20);
                None
            }
            KeyCode::PageUp => {
                self.detail_scroll = self.detail_scroll.saturating_sub(20);
                None
            }
            KeyCode::Char('e') => {
                if let Some(ref entry) = self.detail {
                    self.edit = Some(EditForm::from_entry(entry));
                    self.screen = Screen::Edit;
                }
                None
            }
            KeyCode::Char('D') if self.detail.is_some() => {
                self.input_mode = InputMode::ConfirmDelete;
                None
            }
            _ => self.handle_global(key),
        }
    }

    fn handle_edit(&mut self, key: KeyEvent) -> Option<AsyncAction> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.close_edit();
                return None;
            }
            KeyCode::Char('s') if ctrl => return self.submit_edit(),
            KeyCode::Char('r') if ctrl => return self.toggle_dictation(),
            _ => {}
        }

        let form = self.edit.as_mut()?;
        match key.code {
            KeyCode::Tab => form.field = (form.field + 1) % EDIT_FIELDS.len(),
            KeyCode::BackTab => {
                form.field = (form.field + EDIT_FIELDS.len() - 1) % EDIT_FIELDS.len();
            }
            KeyCode::Down | KeyCode::Enter if form.field == FIELD_MOOD => {
                form.mood = form.mood.cycle();
                form.mood_touched = true;
            }
            KeyCode::Up if form.field == FIELD_MOOD => {
                form.mood = form.mood.cycle().cycle();
                form.mood_touched = true;
            }
            KeyCode::Enter if form.field == FIELD_CONTENT => form.content.push('\n'),
            KeyCode::Char(c) if form.field == FIELD_DATE => {
                if c.is_ascii_digit() || c == '-' {
                    form.date.push(c);
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = form.text_mut() {
                    text.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(text) = form.text_mut() {
                    text.pop();
                }
            }
            _ => {}
        }
        None
    }

    /// Leave the form. Draft edits are kept locally until save or regenerate.
    fn close_edit(&mut self) {
        let Some(form) = self.edit.take() else {
            self.screen = Screen::Conversation;
            return;
        };
        match form.target {
            EditTarget::Draft => {
                let date = form.parse_date().ok().flatten();
                if let Some(ref mut draft) = self.conversation.draft {
                    draft.title = form.title;
                    draft.content = form.content;
                    draft.mood = form.mood;
                    if let Some(date) = date.filter(|d| *d != draft.entry_date) {
                        draft.set_entry_date(date);
                    }
                }
                self.screen = Screen::Conversation;
            }
            EditTarget::Diary(_) => self.screen = Screen::Detail,
        }
    }

    fn submit_edit(&mut self) -> Option<AsyncAction> {
        let form = self.edit.as_ref()?;
        let date = match form.parse_date() {
            Ok(date) => date,
            Err(msg) => {
                self.show_error(msg);
                return None;
            }
        };
        match form.target {
            EditTarget::Draft => {
                let draft = self.conversation.draft.as_ref()?;
                let edits = DraftEdits {
                    title: form.title.clone(),
                    content: form.content.clone(),
                    mood: form.mood,
                    entry_date: date.unwrap_or(draft.entry_date),
                };
                self.loading = true;
                Some(AsyncAction::SaveDraft { edits: Some(edits) })
            }
            EditTarget::Diary(ref id) => {
                let id = id.clone();
                let input = form.changes(self.detail.as_ref(), date);
                if input.is_empty() {
                    self.show_error("Nothing to update.");
                    return None;
                }
                self.loading = true;
                Some(AsyncAction::UpdateDiary { id, input })
            }
        }
    }

    fn toggle_dictation(&mut self) -> Option<AsyncAction> {
        if let Some(field) = self.dictating.take() {
            self.loading = true;
            return Some(AsyncAction::StopDictation { field });
        }
        let form = self.edit.as_ref()?;
        if form.target != EditTarget::Draft {
            self.show_error("Dictation works while reviewing a draft.");
            return None;
        }
        let field = form.dictation_field()?;
        self.dictating = Some(field);
        Some(AsyncAction::StartDictation)
    }

    fn open_detail(&mut self, id: String, from: Screen) -> Option<AsyncAction> {
        self.detail_return = from;
        self.loading = true;
        Some(AsyncAction::LoadDetail { id })
    }

    fn move_selection(&mut self, delta: i32) {
        let len = self.visible_rows().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let current = self.selected as i32;
        let new = (current + delta).clamp(0, len as i32 - 1);
        self.selected = new as usize;
    }

    /// Rows the list shows: search results, or the page grouped by date.
    pub fn visible_rows(&self) -> Vec<DiarySummary> {
        if self.active_query.is_some() {
            return self.search_results.clone();
        }
        self.page
            .as_ref()
            .map(|p| {
                group_by_date(&p.diaries)
                    .into_iter()
                    .flat_map(|(_, rows)| rows)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Calendar entries in date order.
    pub fn calendar_rows(&self) -> Vec<DiarySummary> {
        self.calendar
            .as_ref()
            .map(|c| c.diaries_by_date.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    fn for_each_row(&mut self, mut f: impl FnMut(&mut DiarySummary)) {
        if let Some(ref mut page) = self.page {
            page.diaries.iter_mut().for_each(&mut f);
        }
        self.search_results.iter_mut().for_each(&mut f);
        if let Some(ref mut cal) = self.calendar {
            cal.diaries_by_date
                .values_mut()
                .flat_map(|rows| rows.iter_mut())
                .for_each(&mut f);
        }
    }

    fn remove_rows(&mut self, id: &str) {
        if let Some(ref mut page) = self.page {
            let before = page.diaries.len();
            page.diaries.retain(|d| d.id != id);
            page.total = page.total.saturating_sub(before - page.diaries.len());
        }
        self.search_results.retain(|d| d.id != id);
        if let Some(ref mut cal) = self.calendar {
            for rows in cal.diaries_by_date.values_mut() {
                rows.retain(|d| d.id != id);
            }
            cal.diaries_by_date.retain(|_, rows| !rows.is_empty());
        }
        self.selected = self.selected.min(self.visible_rows().len().saturating_sub(1));
        self.calendar_selected = self
            .calendar_selected
            .min(self.calendar_rows().len().saturating_sub(1));
    }

    pub fn show_error(&mut self, msg: impl Into<String>) {
        self.error_message = Some(msg.into());
        self.error_timer = 100; // ~5s at 50ms tick
    }

    /// Tick the error timer down.
    pub fn tick_error(&mut self) {
        if self.error_timer > 0 {
            self.error_timer -= 1;
            if self.error_timer == 0 {
                self.error_message = None;
            }
        }
    }
}
