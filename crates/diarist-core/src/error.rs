use thiserror::Error;

use crate::capture::CaptureError;

#[derive(Debug, Error)]
pub enum DiaristError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The backend answered 401. Not recoverable locally; the client must
    /// re-authenticate at `login_url`.
    #[error("Session expired, sign in again at {login_url}")]
    SessionExpired { login_url: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiaristError {
    /// Returns `true` for the 401 signal that must trigger a redirect.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Returns `true` when the failure happened on the wire (connection,
    /// non-2xx status, unreadable body) rather than in the client.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Api { .. } | Self::InvalidResponse(_)
        )
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::SessionExpired { .. } => Some(401),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiaristError>;
