use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DiaristError, Result};

/// Coarse sentiment attached to a diary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Positive,
    #[default]
    Neutral,
    Negative,
}

pub const ALL_MOODS: &[Mood] = &[Mood::Positive, Mood::Neutral, Mood::Negative];

impl Mood {
    /// Next mood in the cycle used by the draft editor.
    pub fn cycle(self) -> Self {
        match self {
            Self::Positive => Self::Neutral,
            Self::Neutral => Self::Negative,
            Self::Negative => Self::Positive,
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Neutral => write!(f, "neutral"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            _ => Err(format!("unknown mood: {s}")),
        }
    }
}

/// AI-generated diary awaiting user edits. Never persisted until saved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiaryDraft {
    pub title: String,
    pub content: String,
    pub mood: Mood,
    pub mood_score: Option<f32>,
    pub summary: Option<String>,
    pub suggested_date: Option<NaiveDate>,
    /// Date that will be saved. Starts at the suggestion.
    pub entry_date: NaiveDate,
    /// Set once the user picks a date; regeneration keeps it.
    pub date_edited: bool,
}

/// Generated fields carried by a completion or regeneration.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDiary {
    pub title: String,
    pub content: String,
    pub mood: Mood,
    pub mood_score: Option<f32>,
    pub summary: Option<String>,
    pub suggested_date: Option<NaiveDate>,
}

impl DiaryDraft {
    /// Build a draft from generated fields; `today` fills a missing suggestion.
    pub fn from_generated(generated: GeneratedDiary, today: NaiveDate) -> Self {
        let entry_date = generated.suggested_date.unwrap_or(today);
        Self {
            title: generated.title,
            content: generated.content,
            mood: generated.mood,
            mood_score: generated.mood_score,
            summary: generated.summary,
            suggested_date: generated.suggested_date,
            entry_date,
            date_edited: false,
        }
    }

    /// Overwrite the generated fields, keeping a user-edited date.
    pub fn apply_regenerated(&mut self, generated: GeneratedDiary, today: NaiveDate) {
        self.title = generated.title;
        self.content = generated.content;
        self.mood = generated.mood;
        self.mood_score = generated.mood_score;
        self.summary = generated.summary;
        self.suggested_date = generated.suggested_date;
        if !self.date_edited {
            self.entry_date = generated.suggested_date.unwrap_or(today);
        }
    }

    pub fn set_entry_date(&mut self, date: NaiveDate) {
        self.entry_date = date;
        self.date_edited = true;
    }

    /// Client-side check before save: title and content must not be blank.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_content(&self.content)?;
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(DiaristError::Validation("title cannot be empty".into()));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(DiaristError::Validation("content cannot be empty".into()));
    }
    Ok(())
}

/// Diary the server stored while completing the conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedDiary {
    pub id: String,
    pub title: String,
    pub content: String,
    pub entry_date: Option<NaiveDate>,
    pub mood: Option<Mood>,
}

/// Outcome of a completion call. The server either previews a draft or has
/// already persisted the diary.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Preview(GeneratedDiary),
    Persisted(PersistedDiary),
}

/// A stored diary entry. Server-owned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiaryEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub mood: Option<Mood>,
    pub entry_date: Option<NaiveDate>,
    pub created_at: Option<String>,
}

/// Row of a list, search or calendar result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiarySummary {
    pub id: String,
    pub title: String,
    pub entry_date: Option<NaiveDate>,
    pub preview: String,
    pub mood: Option<Mood>,
}

impl From<&DiaryEntry> for DiarySummary {
    fn from(entry: &DiaryEntry) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            entry_date: entry.entry_date,
            preview: preview_of(&entry.content),
            mood: entry.mood,
        }
    }
}

pub const PREVIEW_CHARS: usize = 80;

/// First `PREVIEW_CHARS` characters of `content`.
pub fn preview_of(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiaryPage {
    pub diaries: Vec<DiarySummary>,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

impl DiaryPage {
    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub diaries_by_date: BTreeMap<NaiveDate, Vec<DiarySummary>>,
}

impl CalendarMonth {
    /// Number of diaries written in the month.
    pub fn total(&self) -> usize {
        self.diaries_by_date.values().map(Vec::len).sum()
    }
}

/// Partial update of a stored diary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateDiaryInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_date: Option<NaiveDate>,
}

impl UpdateDiaryInput {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.mood.is_none()
            && self.entry_date.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(DiaristError::Validation("nothing to update".into()));
        }
        if let Some(ref title) = self.title {
            validate_title(title)?;
        }
        if let Some(ref content) = self.content {
            validate_content(content)?;
        }
        Ok(())
    }

    /// Apply the changed fields to a local copy of the entry.
    pub fn apply_to(&self, entry: &mut DiaryEntry) {
        if let Some(ref title) = self.title {
            entry.title = title.clone();
        }
        if let Some(ref content) = self.content {
            entry.content = content.clone();
        }
        if let Some(mood) = self.mood {
            entry.mood = Some(mood);
        }
        if let Some(date) = self.entry_date {
            entry.entry_date = Some(date);
        }
    }
}

/// Group rows by date, newest first. Undated rows come last under `None`.
pub fn group_by_date(rows: &[DiarySummary]) -> Vec<(Option<NaiveDate>, Vec<DiarySummary>)> {
    let mut dated: BTreeMap<NaiveDate, Vec<DiarySummary>> = BTreeMap::new();
    let mut undated = Vec::new();
    for row in rows {
        match row.entry_date {
            Some(date) => dated.entry(date).or_default().push(row.clone()),
            None => undated.push(row.clone()),
        }
    }
    let mut groups: Vec<_> = dated
        .into_iter()
        .rev()
        .map(|(date, rows)| (Some(date), rows))
        .collect();
    if !undated.is_empty() {
        groups.push((None, undated));
    }
    groups
}
