use serde::{Deserialize, Serialize};

/// Generation preferences for one conversation attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

impl Preferences {
    pub fn is_empty(&self) -> bool {
        self.theme.is_none() && self.style.is_none() && self.custom_instructions.is_none()
    }

    /// Merge regeneration instructions into the custom instructions.
    /// Blank input leaves the preferences unchanged.
    pub fn merge_instructions(&mut self, instructions: &str) {
        let extra = instructions.trim();
        if extra.is_empty() {
            return;
        }
        self.custom_instructions = Some(match self.custom_instructions.take() {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{}\n{extra}", existing.trim_end())
            }
            _ => extra.to_string(),
        });
    }

    /// Append dictated text to the custom instructions.
    pub fn append_instructions(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.custom_instructions = Some(match self.custom_instructions.take() {
            Some(existing) if !existing.is_empty() => format!("{existing} {text}"),
            _ => text.to_string(),
        });
    }
}
