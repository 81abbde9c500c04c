use std::time::Duration;

use reqwest::{header, multipart, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::capture::AudioBlob;
use crate::config::ApiConfig;
use crate::error::{DiaristError, Result};
use crate::model::*;

use super::wire::*;
use super::{CompletionRequest, DiaryApi};

/// Longest slice of a response body quoted in an error.
const BODY_PREVIEW_CHARS: usize = 300;

/// REST client for the diary backend.
///
/// Sends one request per call. No timeout is applied unless configured.
pub struct HttpDiaryApi {
    base_url: Url,
    login_url: String,
    session_cookie: Option<String>,
    turn_endpoint: String,
    http: reqwest::Client,
}

impl HttpDiaryApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| DiaristError::Config(format!("invalid base_url '{}': {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(DiaristError::Config(format!(
                "base_url '{}' cannot carry paths",
                config.base_url
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            base_url,
            login_url: config.login_url(),
            session_cookie: config.session_cookie.clone(),
            turn_endpoint: config.turn_endpoint.clone(),
            http: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Build `{base}/api/{segments..}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| DiaristError::Config("base_url cannot carry paths".into()))?;
            path.pop_if_empty().push("api").extend(segments);
        }
        Ok(url)
    }

    fn with_session(&self, req: RequestBuilder) -> RequestBuilder {
        match self.session_cookie {
            Some(ref cookie) => req.header(header::COOKIE, cookie),
            None => req,
        }
    }

    /// Send and return the body of a 2xx response.
    async fn send(&self, endpoint: &str, req: RequestBuilder) -> Result<String> {
        let resp = self.with_session(req).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        tracing::debug!(endpoint, status = status.as_u16(), bytes = body.len(), "api response");

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(endpoint, "session expired");
            return Err(DiaristError::SessionExpired {
                login_url: self.login_url.clone(),
            });
        }
        if !status.is_success() {
            return Err(DiaristError::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        Ok(body)
    }

    async fn send_json<R: DeserializeOwned>(&self, endpoint: &str, req: RequestBuilder) -> Result<R> {
        let body = self.send(endpoint, req).await?;
        decode(endpoint, &body)
    }
}

fn decode<R: DeserializeOwned>(endpoint: &str, body: &str) -> Result<R> {
    serde_json::from_str(body).map_err(|e| {
        DiaristError::InvalidResponse(format!(
            "failed to decode {endpoint} response: {e}\nBody: {}",
            preview(body)
        ))
    })
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

/// Prefer the server's `{error}` field, else the raw body, else the reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody { error: Some(msg) }) = serde_json::from_str::<ErrorBody>(body) {
        return msg;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        preview(trimmed)
    }
}

fn audio_form(audio: &AudioBlob) -> Result<multipart::Form> {
    let part = multipart::Part::bytes(audio.bytes.clone())
        .file_name(audio.file_name.clone())
        .mime_str(&audio.mime)?;
    Ok(multipart::Form::new().part("audio", part))
}

impl DiaryApi for HttpDiaryApi {
    async fn start_conversation(&self, user_id: &str) -> Result<ConversationStarted> {
        let url = self.url(&["conversations"])?;
        let req = self
            .http
            .post(url)
            .json(&StartConversationRequest { user_id });
        let resp: StartConversationResponse = self.send_json("start", req).await?;
        let started = ConversationStarted::try_from(resp)?;
        tracing::info!(conversation = %started.conversation_id, "conversation started");
        Ok(started)
    }

    async fn submit_turn(
        &self,
        conversation_id: &ConversationId,
        audio: &AudioBlob,
    ) -> Result<TurnReply> {
        let url = self.url(&["conversations", conversation_id.as_str(), &self.turn_endpoint])?;
        tracing::debug!(conversation = %conversation_id, bytes = audio.len(), "uploading turn");
        let req = self.http.post(url).multipart(audio_form(audio)?);
        let resp: TurnResponse = self.send_json("turn", req).await?;
        Ok(resp.into())
    }

    async fn complete(
        &self,
        conversation_id: &ConversationId,
        request: &CompletionRequest,
    ) -> Result<Completion> {
        let url = self.url(&["conversations", conversation_id.as_str(), "complete"])?;
        let body = CompleteRequest {
            preferences: (!request.preferences.is_empty()).then_some(&request.preferences),
            instructions: request.instructions.as_deref(),
        };
        let req = self.http.post(url).json(&body);
        let resp: CompleteResponse = self.send_json("complete", req).await?;
        Completion::try_from(resp)
    }

    async fn save_draft(&self, conversation_id: &ConversationId, draft: &DiaryDraft) -> Result<String> {
        let url = self.url(&["conversations", conversation_id.as_str(), "save"])?;
        let req = self.http.post(url).json(&SaveDraftRequest::from(draft));
        let resp: SaveDraftResponse = self.send_json("save", req).await?;
        let id = String::try_from(resp)?;
        tracing::info!(diary = %id, "diary saved");
        Ok(id)
    }

    async fn list_diaries(&self, user_id: &str, page: usize, limit: usize) -> Result<DiaryPage> {
        let mut url = self.url(&["users", user_id, "diaries"])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        let resp: DiaryListResponse = self.send_json("list", self.http.get(url)).await?;
        resp.into_page(page, limit)
    }

    async fn calendar(&self, user_id: &str, year: i32, month: u32) -> Result<CalendarMonth> {
        let mut url = self.url(&["users", user_id, "diaries", "calendar"])?;
        url.query_pairs_mut()
            .append_pair("year", &year.to_string())
            .append_pair("month", &month.to_string());
        let resp: CalendarResponse = self.send_json("calendar", self.http.get(url)).await?;
        resp.into_month(year, month)
    }

    async fn search(&self, user_id: &str, query: &str) -> Result<Vec<DiarySummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let mut url = self.url(&["users", user_id, "diaries", "search"])?;
        url.query_pairs_mut().append_pair("q", query);
        let resp: SearchResponse = self.send_json("search", self.http.get(url)).await?;
        Vec::try_from(resp)
    }

    async fn get_diary(&self, id: &str) -> Result<DiaryEntry> {
        let url = self.url(&["diaries", id])?;
        let resp: DiaryDetailResponse = self.send_json("get", self.http.get(url)).await?;
        DiaryEntry::try_from(resp)
    }

    async fn update_diary(&self, id: &str, input: &UpdateDiaryInput) -> Result<DiaryEntry> {
        let url = self.url(&["diaries", id])?;
        let resp: DiaryDetailResponse = self.send_json("update", self.http.put(url).json(input)).await?;
        DiaryEntry::try_from(resp)
    }

    async fn delete_diary(&self, id: &str) -> Result<()> {
        let url = self.url(&["diaries", id])?;
        let body = self.send("delete", self.http.delete(url)).await?;
        if body.trim().is_empty() {
            return Ok(());
        }
        let ack: DeleteResponse = decode("delete", &body)?;
        match ack.deleted {
            Some(false) => Err(DiaristError::InvalidResponse(format!(
                "server did not delete diary {id}"
            ))),
            _ => Ok(()),
        }
    }

    async fn transcribe(&self, audio: &AudioBlob) -> Result<String> {
        let url = self.url(&["transcribe"])?;
        let req = self.http.post(url).multipart(audio_form(audio)?);
        let resp: TranscribeResponse = self.send_json("transcribe", req).await?;
        String::try_from(resp)
    }
}
