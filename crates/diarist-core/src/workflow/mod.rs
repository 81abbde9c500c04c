//! The conversation-to-diary workflow.
//!
//! A [`DiarySession`] walks one user through start, a loop of recorded turns,
//! completion into a draft, edits or regeneration, and finally save or
//! discard. Every operation borrows the session mutably, so two operations
//! can never overlap; a call made in the wrong state fails with
//! [`DiaristError::InvalidState`] and changes nothing.

use chrono::NaiveDate;
use serde::Serialize;

use crate::api::{CompletionRequest, DiaryApi};
use crate::capture::{ActiveCapture, AudioBlob, AudioSource, CaptureError};
use crate::config::DiaristConfig;
use crate::error::{DiaristError, Result};
use crate::model::*;

#[cfg(test)]
mod tests;

pub const STATUS_NO_USER: &str = "No user id in session.";
pub const STATUS_START_FAILED: &str = "Failed to start conversation.";
pub const STATUS_UNSUPPORTED: &str = "This device does not support audio capture.";
pub const STATUS_MIC_DENIED: &str = "Unable to access microphone.";
pub const STATUS_SEND_FAILED: &str = "Failed to send audio.";
pub const STATUS_COMPLETE_FAILED: &str = "Failed to generate diary.";
pub const STATUS_SAVE_FAILED: &str = "Failed to save diary.";
pub const STATUS_EMPTY_DRAFT: &str = "Title and content cannot be empty.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Idle,
    /// Conversation open, between turns.
    Started,
    Recording,
    Uploading,
    Completing,
    Previewing,
    Saved,
    Discarded,
}

impl WorkflowState {
    /// A request or capture is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Recording | Self::Uploading | Self::Completing)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Started => "started",
            Self::Recording => "recording",
            Self::Uploading => "uploading",
            Self::Completing => "completing",
            Self::Previewing => "previewing",
            Self::Saved => "saved",
            Self::Discarded => "discarded",
        };
        f.write_str(s)
    }
}

/// Free-text field that accepts dictation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Title,
    Content,
    CustomInstructions,
}

/// Result of a completion or regeneration.
#[derive(Debug, Clone, PartialEq)]
pub enum CompleteOutcome {
    /// A draft is ready for review.
    Draft,
    /// The server stored the diary itself; the session is already saved.
    Saved(PersistedDiary),
}

/// One user's diary conversation.
#[derive(Debug)]
pub struct DiarySession {
    user_id: Option<String>,
    conversation_id: Option<ConversationId>,
    transcript: Transcript,
    draft: Option<DiaryDraft>,
    preferences: Preferences,
    default_preferences: Preferences,
    capture: Option<ActiveCapture>,
    state: WorkflowState,
    status: String,
    redirect: Option<String>,
    last_saved: Option<String>,
    today: Option<NaiveDate>,
}

impl DiarySession {
    pub fn new(user_id: Option<String>, default_preferences: Preferences) -> Self {
        Self {
            user_id: user_id.filter(|u| !u.trim().is_empty()),
            conversation_id: None,
            transcript: Transcript::new(),
            draft: None,
            preferences: default_preferences.clone(),
            default_preferences,
            capture: None,
            state: WorkflowState::Idle,
            status: String::new(),
            redirect: None,
            last_saved: None,
            today: None,
        }
    }

    pub fn from_config(config: &DiaristConfig) -> Self {
        Self::new(config.resolve_user_id(), config.preferences.to_preferences())
    }

    /// Pin the date used when the server suggests none.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    // -- Accessors --

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation_id.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn draft(&self) -> Option<&DiaryDraft> {
        self.draft.as_ref()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Login URL to send the user to after a 401.
    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    /// Id of the most recently saved diary.
    pub fn last_saved(&self) -> Option<&str> {
        self.last_saved.as_deref()
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_some()
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    // -- Guards --

    fn ensure_live(&self) -> Result<()> {
        match self.redirect {
            Some(ref login_url) => Err(DiaristError::SessionExpired {
                login_url: login_url.clone(),
            }),
            None => Ok(()),
        }
    }

    fn ensure_state(&self, expected: &[WorkflowState], op: &str) -> Result<()> {
        if expected.contains(&self.state) {
            Ok(())
        } else {
            Err(DiaristError::InvalidState(format!(
                "cannot {op} while {}",
                self.state
            )))
        }
    }

    fn require_conversation(&mut self, status: &str) -> Result<ConversationId> {
        match self.conversation_id {
            Some(ref id) => Ok(id.clone()),
            None => {
                self.status = status.to_string();
                Err(DiaristError::InvalidState("no active conversation".into()))
            }
        }
    }

    /// Record a failed request. A 401 only sets the redirect and puts back
    /// the status shown before the request; anything else reports `status`.
    /// Either way the state falls back to `fallback`.
    fn fail(
        &mut self,
        err: DiaristError,
        status: &str,
        fallback: WorkflowState,
        prior_status: String,
    ) -> DiaristError {
        self.state = fallback;
        if let DiaristError::SessionExpired { ref login_url } = err {
            tracing::warn!(login_url = %login_url, "session expired, redirecting");
            self.redirect = Some(login_url.clone());
            self.status = prior_status;
        } else {
            tracing::warn!("{status} {err}");
            self.status = status.to_string();
        }
        err
    }

    /// Forget the conversation after save or discard.
    fn finish(&mut self, state: WorkflowState) {
        self.conversation_id = None;
        self.draft = None;
        self.preferences = self.default_preferences.clone();
        self.state = state;
    }

    // -- Conversation --

    /// Open a new conversation, replacing any conversation in progress.
    pub async fn start<A: DiaryApi>(&mut self, api: &A) -> Result<()> {
        self.ensure_live()?;
        self.ensure_state(
            &[
                WorkflowState::Idle,
                WorkflowState::Started,
                WorkflowState::Saved,
                WorkflowState::Discarded,
            ],
            "start a conversation",
        )?;
        let Some(user_id) = self.user_id.clone() else {
            self.status = STATUS_NO_USER.to_string();
            return Err(DiaristError::Validation("no user id in session".into()));
        };

        let previous = self.state;
        let prior_status = std::mem::replace(&mut self.status, "Starting conversation...".into());
        match api.start_conversation(&user_id).await {
            Ok(started) => {
                self.transcript.clear();
                self.draft = None;
                self.preferences = self.default_preferences.clone();
                if let Some(text) = started.first_message {
                    self.transcript.push(Message::ai(text));
                }
                tracing::info!(conversation = %started.conversation_id, "conversation open");
                self.conversation_id = Some(started.conversation_id);
                self.state = WorkflowState::Started;
                self.status = "Conversation started. Press record to speak.".to_string();
                Ok(())
            }
            Err(e) if e.is_auth_expired() => {
                Err(self.fail(e, STATUS_START_FAILED, previous, prior_status))
            }
            Err(e) => {
                self.conversation_id = None;
                Err(self.fail(e, STATUS_START_FAILED, WorkflowState::Idle, prior_status))
            }
        }
    }

    /// Acquire the capture device and start buffering one turn.
    pub async fn start_recording<S: AudioSource>(&mut self, source: &S) -> Result<()> {
        self.ensure_live()?;
        self.require_conversation("Start a conversation first.")?;
        self.ensure_state(&[WorkflowState::Started], "record")?;

        match source.start().await {
            Ok(capture) => {
                self.capture = Some(capture);
                self.state = WorkflowState::Recording;
                self.status = "Recording...".to_string();
                Ok(())
            }
            Err(e) => {
                self.status = match e {
                    CaptureError::Unsupported(_) => STATUS_UNSUPPORTED,
                    _ => STATUS_MIC_DENIED,
                }
                .to_string();
                tracing::warn!("capture failed to start: {e}");
                Err(e.into())
            }
        }
    }

    /// Stop the capture and upload the recorded turn. Returns the messages
    /// appended to the transcript.
    pub async fn stop_recording<A: DiaryApi>(&mut self, api: &A) -> Result<Vec<Message>> {
        self.ensure_live()?;
        self.ensure_state(&[WorkflowState::Recording], "stop recording")?;
        let Some(capture) = self.capture.take() else {
            return Err(DiaristError::InvalidState("no capture in progress".into()));
        };

        let prior_status = std::mem::replace(&mut self.status, "Processing audio...".into());
        let blob = match capture.stop().await {
            Ok(blob) => blob,
            Err(e) => {
                self.state = WorkflowState::Started;
                self.status = match e {
                    CaptureError::Empty => "No audio was captured.",
                    _ => STATUS_SEND_FAILED,
                }
                .to_string();
                return Err(e.into());
            }
        };
        self.state = WorkflowState::Started;
        self.upload(api, &blob, prior_status).await
    }

    /// Upload an already recorded turn.
    pub async fn submit_audio<A: DiaryApi>(
        &mut self,
        api: &A,
        blob: &AudioBlob,
    ) -> Result<Vec<Message>> {
        self.ensure_live()?;
        self.ensure_state(&[WorkflowState::Started], "send audio")?;
        if blob.is_empty() {
            return Err(CaptureError::Empty.into());
        }
        let prior_status = self.status.clone();
        self.upload(api, blob, prior_status).await
    }

    async fn upload<A: DiaryApi>(
        &mut self,
        api: &A,
        blob: &AudioBlob,
        prior_status: String,
    ) -> Result<Vec<Message>> {
        let id = self.require_conversation("Conversation ended. Start a new one.")?;
        self.state = WorkflowState::Uploading;
        match api.submit_turn(&id, blob).await {
            Ok(reply) => {
                let messages = reply.into_messages();
                for m in &messages {
                    self.transcript.push(m.clone());
                }
                self.state = WorkflowState::Started;
                self.status = "Message sent.".to_string();
                Ok(messages)
            }
            Err(e) => Err(self.fail(e, STATUS_SEND_FAILED, WorkflowState::Started, prior_status)),
        }
    }

    /// Ask the server to turn the conversation into a diary.
    pub async fn complete<A: DiaryApi>(&mut self, api: &A) -> Result<CompleteOutcome> {
        self.ensure_live()?;
        let id = self.require_conversation("No active conversation.")?;
        self.ensure_state(&[WorkflowState::Started], "complete")?;

        self.state = WorkflowState::Completing;
        let prior_status = std::mem::replace(&mut self.status, "Generating diary...".into());
        let request = CompletionRequest::new(self.preferences.clone());
        match api.complete(&id, &request).await {
            Ok(Completion::Preview(generated)) => {
                self.draft = Some(DiaryDraft::from_generated(generated, self.today()));
                self.state = WorkflowState::Previewing;
                self.status = "Diary generated. Review and save.".to_string();
                Ok(CompleteOutcome::Draft)
            }
            Ok(Completion::Persisted(diary)) => Ok(self.persisted(diary)),
            Err(e) => Err(self.fail(
                e,
                STATUS_COMPLETE_FAILED,
                WorkflowState::Started,
                prior_status,
            )),
        }
    }

    fn persisted(&mut self, diary: PersistedDiary) -> CompleteOutcome {
        tracing::info!(diary = %diary.id, "diary stored on completion");
        self.last_saved = Some(diary.id.clone());
        self.finish(WorkflowState::Saved);
        self.status = "Diary saved.".to_string();
        CompleteOutcome::Saved(diary)
    }

    // -- Draft --

    /// Generate the draft again, merging `instructions` into the preferences
    /// once the server answers. A date the user already picked survives.
    pub async fn regenerate<A: DiaryApi>(
        &mut self,
        api: &A,
        instructions: Option<&str>,
    ) -> Result<CompleteOutcome> {
        self.ensure_live()?;
        self.ensure_state(&[WorkflowState::Previewing], "regenerate")?;
        let id = self.require_conversation("No active conversation.")?;

        let mut preferences = self.preferences.clone();
        if let Some(extra) = instructions {
            preferences.merge_instructions(extra);
        }
        let mut request = CompletionRequest::new(preferences.clone());
        if let Some(extra) = instructions {
            request = request.with_instructions(extra);
        }

        self.state = WorkflowState::Completing;
        let prior_status = std::mem::replace(&mut self.status, "Regenerating diary...".into());
        match api.complete(&id, &request).await {
            Ok(Completion::Preview(generated)) => {
                self.preferences = preferences;
                let today = self.today();
                match self.draft {
                    Some(ref mut draft) => draft.apply_regenerated(generated, today),
                    None => self.draft = Some(DiaryDraft::from_generated(generated, today)),
                }
                self.state = WorkflowState::Previewing;
                self.status = "Diary regenerated.".to_string();
                Ok(CompleteOutcome::Draft)
            }
            Ok(Completion::Persisted(diary)) => Ok(self.persisted(diary)),
            Err(e) => Err(self.fail(
                e,
                STATUS_COMPLETE_FAILED,
                WorkflowState::Previewing,
                prior_status,
            )),
        }
    }

    fn draft_mut(&mut self) -> Result<&mut DiaryDraft> {
        self.ensure_live()?;
        self.ensure_state(&[WorkflowState::Previewing], "edit the draft")?;
        self.draft
            .as_mut()
            .ok_or_else(|| DiaristError::InvalidState("no draft to edit".into()))
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        self.draft_mut()?.title = title.into();
        Ok(())
    }

    pub fn set_content(&mut self, content: impl Into<String>) -> Result<()> {
        self.draft_mut()?.content = content.into();
        Ok(())
    }

    pub fn set_mood(&mut self, mood: Mood) -> Result<()> {
        self.draft_mut()?.mood = mood;
        Ok(())
    }

    pub fn set_entry_date(&mut self, date: NaiveDate) -> Result<()> {
        self.draft_mut()?.set_entry_date(date);
        Ok(())
    }

    /// Replace the generation preferences for the rest of this conversation.
    pub fn set_preferences(&mut self, preferences: Preferences) -> Result<()> {
        self.ensure_live()?;
        self.preferences = preferences;
        Ok(())
    }

    /// Persist the draft. Returns the saved diary id.
    pub async fn save<A: DiaryApi>(&mut self, api: &A) -> Result<String> {
        self.ensure_live()?;
        self.ensure_state(&[WorkflowState::Previewing], "save")?;
        let id = self.require_conversation("No active conversation.")?;
        let draft = self
            .draft
            .clone()
            .ok_or_else(|| DiaristError::InvalidState("no draft to save".into()))?;
        if let Err(e) = draft.validate() {
            self.status = STATUS_EMPTY_DRAFT.to_string();
            return Err(e);
        }

        let prior_status = std::mem::replace(&mut self.status, "Saving diary...".into());
        match api.save_draft(&id, &draft).await {
            Ok(diary_id) => {
                self.last_saved = Some(diary_id.clone());
                self.finish(WorkflowState::Saved);
                self.status = "Diary saved.".to_string();
                Ok(diary_id)
            }
            Err(e) => Err(self.fail(
                e,
                STATUS_SAVE_FAILED,
                WorkflowState::Previewing,
                prior_status,
            )),
        }
    }

    /// Drop the draft without saving. Without confirmation nothing happens
    /// and `false` is returned.
    pub fn discard(&mut self, confirmed: bool) -> Result<bool> {
        self.ensure_live()?;
        self.ensure_state(&[WorkflowState::Previewing], "discard")?;
        if !confirmed {
            return Ok(false);
        }
        self.finish(WorkflowState::Discarded);
        self.status = "Draft discarded.".to_string();
        tracing::info!("draft discarded");
        Ok(true)
    }

    /// Transcribe `blob` and append the text to `field`.
    pub async fn dictate<A: DiaryApi>(
        &mut self,
        api: &A,
        field: DraftField,
        blob: &AudioBlob,
    ) -> Result<String> {
        self.ensure_live()?;
        if matches!(field, DraftField::Title | DraftField::Content) {
            self.draft_mut()?;
        } else if self.state.is_busy() {
            return Err(DiaristError::InvalidState(format!(
                "cannot dictate while {}",
                self.state
            )));
        }

        let state = self.state;
        let text = match api.transcribe(blob).await {
            Ok(text) => text,
            Err(e) => {
                let prior_status = self.status.clone();
                return Err(self.fail(e, "Failed to transcribe audio.", state, prior_status));
            }
        };

        match field {
            DraftField::Title => append_text(&mut self.draft_mut()?.title, &text),
            DraftField::Content => append_text(&mut self.draft_mut()?.content, &text),
            DraftField::CustomInstructions => self.preferences.append_instructions(&text),
        }
        Ok(text)
    }
}

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
