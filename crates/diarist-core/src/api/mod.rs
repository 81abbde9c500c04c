mod http;
pub(crate) mod wire;

pub use http::HttpDiaryApi;

use crate::capture::AudioBlob;
use crate::error::Result;
use crate::model::*;

/// Body of a completion or regeneration call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub preferences: Preferences,
    pub instructions: Option<String>,
}

impl CompletionRequest {
    pub fn new(preferences: Preferences) -> Self {
        Self {
            preferences,
            instructions: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        let instructions = instructions.into();
        if !instructions.trim().is_empty() {
            self.instructions = Some(instructions);
        }
        self
    }
}

/// The diary backend, one method per endpoint.
///
/// Every method is a single request with no retry. A `401` from any endpoint
/// surfaces as [`crate::error::DiaristError::SessionExpired`].
pub trait DiaryApi: Send + Sync {
    fn start_conversation(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<ConversationStarted>> + Send;

    fn submit_turn(
        &self,
        conversation_id: &ConversationId,
        audio: &AudioBlob,
    ) -> impl std::future::Future<Output = Result<TurnReply>> + Send;

    fn complete(
        &self,
        conversation_id: &ConversationId,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<Completion>> + Send;

    /// Persist an edited draft. Returns the stored diary id.
    fn save_draft(
        &self,
        conversation_id: &ConversationId,
        draft: &DiaryDraft,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    fn list_diaries(
        &self,
        user_id: &str,
        page: usize,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<DiaryPage>> + Send;

    fn calendar(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
    ) -> impl std::future::Future<Output = Result<CalendarMonth>> + Send;

    fn search(
        &self,
        user_id: &str,
        query: &str,
    ) -> impl std::future::Future<Output = Result<Vec<DiarySummary>>> + Send;

    fn get_diary(&self, id: &str) -> impl std::future::Future<Output = Result<DiaryEntry>> + Send;

    fn update_diary(
        &self,
        id: &str,
        input: &UpdateDiaryInput,
    ) -> impl std::future::Future<Output = Result<DiaryEntry>> + Send;

    fn delete_diary(&self, id: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Speech-to-text for free-text fields.
    fn transcribe(&self, audio: &AudioBlob)
        -> impl std::future::Future<Output = Result<String>> + Send;
}
