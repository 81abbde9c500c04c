//! Request and response bodies as they appear on the wire.
//!
//! Every endpoint gets its own struct. Responses are converted into domain
//! types through `TryFrom`, which is where missing or malformed fields are
//! rejected.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DiaristError, Result};
use crate::model::*;

// -- Requests --

#[derive(Debug, Serialize)]
pub(crate) struct StartConversationRequest<'a> {
    pub user_id: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompleteRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<&'a Preferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveDraftRequest<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub mood: Mood,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood_score: Option<f32>,
    pub entry_date: String,
}

impl<'a> From<&'a DiaryDraft> for SaveDraftRequest<'a> {
    fn from(draft: &'a DiaryDraft) -> Self {
        Self {
            title: draft.title.trim(),
            content: draft.content.trim(),
            mood: draft.mood,
            mood_score: draft.mood_score,
            entry_date: draft.entry_date.format(DATE_FORMAT).to_string(),
        }
    }
}

// -- Responses --

#[derive(Debug, Deserialize)]
pub(crate) struct StartConversationResponse {
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub first_message: Option<String>,
}

impl TryFrom<StartConversationResponse> for ConversationStarted {
    type Error = DiaristError;

    fn try_from(r: StartConversationResponse) -> Result<Self> {
        let raw = r.conversation_id.ok_or_else(|| {
            DiaristError::InvalidResponse("start response has no conversation_id".into())
        })?;
        Ok(Self {
            conversation_id: ConversationId::parse(raw)?,
            first_message: non_blank(r.first_message),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TurnResponse {
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub ai_response: Option<String>,
}

impl From<TurnResponse> for TurnReply {
    fn from(r: TurnResponse) -> Self {
        Self {
            user_message: non_blank(r.user_message),
            ai_response: non_blank(r.ai_response),
        }
    }
}

/// Completion body. The server either previews a generated diary or reports
/// the one it already stored, recognizable by `diary_id`.
#[derive(Debug, Deserialize)]
pub(crate) struct CompleteResponse {
    #[serde(default)]
    pub diary_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub mood_score: Option<f32>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub suggested_date: Option<String>,
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl TryFrom<CompleteResponse> for Completion {
    type Error = DiaristError;

    fn try_from(r: CompleteResponse) -> Result<Self> {
        let title = r.title.ok_or_else(|| missing("complete", "title"))?;
        let content = r.content.ok_or_else(|| missing("complete", "content"))?;

        if let Some(id) = non_blank(r.diary_id).or_else(|| non_blank(r.id)) {
            return Ok(Completion::Persisted(PersistedDiary {
                id,
                title,
                content,
                entry_date: parse_date(either(&r.entry_date, &r.date))?,
                mood: r.mood.as_deref().and_then(parse_mood),
            }));
        }

        Ok(Completion::Preview(GeneratedDiary {
            title,
            content,
            mood: r.mood.as_deref().and_then(parse_mood).unwrap_or_default(),
            mood_score: r.mood_score,
            summary: non_blank(r.summary),
            suggested_date: parse_date(
                r.suggested_date
                    .as_deref()
                    .or(either(&r.entry_date, &r.date)),
            )?,
        }))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveDraftResponse {
    #[serde(default)]
    pub diary_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl TryFrom<SaveDraftResponse> for String {
    type Error = DiaristError;

    fn try_from(r: SaveDraftResponse) -> Result<Self> {
        non_blank(r.diary_id)
            .or_else(|| non_blank(r.id))
            .ok_or_else(|| missing("save", "diary_id"))
    }
}

/// Row shape shared by list, search and calendar responses.
#[derive(Debug, Deserialize)]
pub(crate) struct DiaryRow {
    #[serde(default)]
    pub diary_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
}

impl TryFrom<DiaryRow> for DiarySummary {
    type Error = DiaristError;

    fn try_from(r: DiaryRow) -> Result<Self> {
        let id = non_blank(r.diary_id)
            .or_else(|| non_blank(r.id))
            .ok_or_else(|| missing("diary row", "diary_id"))?;
        let preview = match (r.preview, r.content) {
            (Some(p), _) => p,
            (None, Some(c)) => preview_of(&c),
            (None, None) => String::new(),
        };
        Ok(Self {
            id,
            title: r.title.unwrap_or_default(),
            entry_date: parse_date(either(&r.entry_date, &r.date))?,
            preview,
            mood: r.mood.as_deref().and_then(parse_mood),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiaryListResponse {
    #[serde(default)]
    pub diaries: Vec<DiaryRow>,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub pages: Option<usize>,
}

impl DiaryListResponse {
    /// Convert, filling pagination the server left out from the request.
    pub fn into_page(self, requested_page: usize, limit: usize) -> Result<DiaryPage> {
        let diaries = convert_rows(self.diaries)?;
        let total = self.total.unwrap_or(diaries.len());
        let pages = self
            .pages
            .unwrap_or_else(|| total.div_ceil(limit.max(1)));
        Ok(DiaryPage {
            diaries,
            total,
            page: self.page.unwrap_or(requested_page),
            pages,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub diaries: Vec<DiaryRow>,
}

impl TryFrom<SearchResponse> for Vec<DiarySummary> {
    type Error = DiaristError;

    fn try_from(r: SearchResponse) -> Result<Self> {
        convert_rows(r.diaries)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarResponse {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub diaries_by_date: BTreeMap<String, Vec<DiaryRow>>,
}

impl CalendarResponse {
    pub fn into_month(self, year: i32, month: u32) -> Result<CalendarMonth> {
        let mut diaries_by_date = BTreeMap::new();
        for (raw_date, rows) in self.diaries_by_date {
            let date = parse_date(Some(&raw_date))?.ok_or_else(|| {
                DiaristError::InvalidResponse("calendar key is not a date".into())
            })?;
            let mut rows = convert_rows(rows)?;
            for row in &mut rows {
                row.entry_date.get_or_insert(date);
            }
            diaries_by_date.insert(date, rows);
        }
        // The echoed month is only trusted when it names a real calendar month.
        let (year, month) = match (self.year, self.month) {
            (Some(y), Some(m)) if NaiveDate::from_ymd_opt(y, m, 1).is_some() => (y, m),
            _ => (year, month),
        };
        Ok(CalendarMonth {
            year,
            month,
            diaries_by_date,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiaryDetailResponse {
    #[serde(default)]
    pub diary_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl TryFrom<DiaryDetailResponse> for DiaryEntry {
    type Error = DiaristError;

    fn try_from(r: DiaryDetailResponse) -> Result<Self> {
        Ok(Self {
            id: non_blank(r.diary_id)
                .or_else(|| non_blank(r.id))
                .ok_or_else(|| missing("diary", "diary_id"))?,
            title: r.title.unwrap_or_default(),
            content: r.content.unwrap_or_default(),
            mood: r.mood.as_deref().and_then(parse_mood),
            entry_date: parse_date(either(&r.entry_date, &r.date))?,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DeleteResponse {
    #[serde(default)]
    pub deleted: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranscribeResponse {
    pub text: Option<String>,
}

impl TryFrom<TranscribeResponse> for String {
    type Error = DiaristError;

    fn try_from(r: TranscribeResponse) -> Result<Self> {
        r.text.ok_or_else(|| missing("transcribe", "text"))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}

// -- Helpers --

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

fn missing(endpoint: &str, field: &str) -> DiaristError {
    DiaristError::InvalidResponse(format!("{endpoint} response is missing '{field}'"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn convert_rows(rows: Vec<DiaryRow>) -> Result<Vec<DiarySummary>> {
    rows.into_iter().map(DiarySummary::try_from).collect()
}

/// Unknown moods are dropped rather than failing the whole response.
fn parse_mood(raw: &str) -> Option<Mood> {
    match raw.parse() {
        Ok(mood) => Some(mood),
        Err(e) => {
            tracing::debug!("ignoring mood: {e}");
            None
        }
    }
}

/// Accepts `YYYY-MM-DD` or a timestamp starting with one. Blank means absent.
/// `entry_date` wins when a body carries both spellings.
fn either<'a>(preferred: &'a Option<String>, fallback: &'a Option<String>) -> Option<&'a str> {
    preferred.as_deref().or(fallback.as_deref())
}

pub(crate) fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, DATE_FORMAT)
        .map(Some)
        .map_err(|e| DiaristError::InvalidResponse(format!("bad date '{raw}': {e}")))
}
