//! Pure projection of a [`DiarySession`] into what a front end draws.

use serde::Serialize;

use crate::model::{DiaryDraft, Message};
use crate::workflow::{DiarySession, WorkflowState};

/// Which conversation controls are enabled. Derived from the state alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub can_start: bool,
    pub can_record: bool,
    pub can_stop: bool,
    pub can_complete: bool,
    pub can_save: bool,
    pub can_regenerate: bool,
    pub can_discard: bool,
}

impl Controls {
    pub fn for_state(state: WorkflowState) -> Self {
        use WorkflowState::*;
        let previewing = state == Previewing;
        Self {
            can_start: matches!(state, Idle | Started | Saved | Discarded),
            can_record: state == Started,
            can_stop: state == Recording,
            can_complete: state == Started,
            can_save: previewing,
            can_regenerate: previewing,
            can_discard: previewing,
        }
    }

    /// Everything disabled, used once the session has expired.
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationView {
    pub state: WorkflowState,
    pub status: String,
    pub controls: Controls,
    pub transcript: Vec<Message>,
    pub draft: Option<DiaryDraft>,
    pub redirect: Option<String>,
}

pub fn project(session: &DiarySession) -> ConversationView {
    let redirect = session.redirect().map(str::to_string);
    let controls = if redirect.is_some() {
        Controls::none()
    } else {
        Controls::for_state(session.state())
    };
    ConversationView {
        state: session.state(),
        status: session.status().to_string(),
        controls,
        transcript: session.transcript().messages().to_vec(),
        draft: session.draft().cloned(),
        redirect,
    }
}
