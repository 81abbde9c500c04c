use crate::error::{DiaristError, Result};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::Preferences;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaristConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub diary: DiaryConfig,
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend origin, e.g. `http://localhost:5000`. Endpoints live under `/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Where a 401 sends the user.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Raw `Cookie` header value carrying the backend session.
    #[serde(default)]
    pub session_cookie: Option<String>,
    /// Path segment for turn uploads: `audio` or `messages`.
    #[serde(default = "default_turn_endpoint")]
    pub turn_endpoint: String,
    /// Whole-request timeout. Unset means requests may hang indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: None,
            login_path: default_login_path(),
            session_cookie: None,
            turn_endpoint: default_turn_endpoint(),
            timeout_secs: None,
            connect_timeout_secs: None,
        }
    }
}

impl ApiConfig {
    /// Absolute login URL used for 401 redirects.
    pub fn login_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.login_path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// `command`, `file`, or `none`.
    #[serde(default = "default_capture_source")]
    pub source: String,
    /// Recorder argv; the program must write audio to stdout.
    #[serde(default = "default_capture_command")]
    pub command: Vec<String>,
    /// Audio files replayed in order when `source = "file"`.
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default = "default_capture_mime")]
    pub mime: String,
    #[serde(default = "default_capture_file_name")]
    pub file_name: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: default_capture_source(),
            command: default_capture_command(),
            files: Vec::new(),
            mime: default_capture_mime(),
            file_name: default_capture_file_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for DiaryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

/// Starting preferences applied at every new conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesConfig {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub custom_instructions: Option<String>,
}

impl PreferencesConfig {
    pub fn to_preferences(&self) -> Preferences {
        Preferences {
            theme: self.theme.clone(),
            style: self.style.clone(),
            custom_instructions: self.custom_instructions.clone(),
        }
    }
}

/// Valid capture source names.
pub const VALID_CAPTURE_SOURCES: &[&str] = &["command", "file", "none"];

/// Valid turn upload path segments.
pub const VALID_TURN_ENDPOINTS: &[&str] = &["audio", "messages"];

pub const MAX_PAGE_SIZE: usize = 100;

// -- Defaults --

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_login_path() -> String {
    "/login".to_string()
}
fn default_turn_endpoint() -> String {
    "audio".to_string()
}
fn default_capture_source() -> String {
    "command".to_string()
}
fn default_capture_command() -> Vec<String> {
    ["arecord", "-q", "-f", "cd", "-t", "wav", "-"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_capture_mime() -> String {
    "audio/wav".to_string()
}
fn default_capture_file_name() -> String {
    "recording.wav".to_string()
}
fn default_page_size() -> usize {
    10
}

impl DiaristConfig {
    /// Load configuration with three-layer TOML merge:
    /// 1. ~/.config/diarist/config.toml (global)
    /// 2. .diarist/config.toml (project)
    /// 3. .diarist/config.local.toml (local, gitignored)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let project_config = dir.join(".diarist").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            let local_config = dir.join(".diarist").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| DiaristError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| DiaristError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Load with defaults only (no files).
    pub fn default_config() -> Self {
        Self {
            api: ApiConfig::default(),
            capture: CaptureConfig::default(),
            diary: DiaryConfig::default(),
            preferences: PreferencesConfig::default(),
        }
    }

    /// Validate config values, fixing what can be fixed and logging warnings.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            warnings.push(format!(
                "api.base_url '{}' has no http(s) scheme, prefixing http://",
                self.api.base_url
            ));
            self.api.base_url = format!("http://{}", self.api.base_url);
        }
        let trimmed = self.api.base_url.trim_end_matches('/').to_string();
        self.api.base_url = trimmed;

        if !VALID_TURN_ENDPOINTS.contains(&self.api.turn_endpoint.as_str()) {
            warnings.push(format!(
                "unknown api.turn_endpoint '{}', valid: {}; using 'audio'",
                self.api.turn_endpoint,
                VALID_TURN_ENDPOINTS.join(", ")
            ));
            self.api.turn_endpoint = default_turn_endpoint();
        }

        if let Some(ref id) = self.api.user_id {
            if id.trim().is_empty() {
                warnings.push("api.user_id is blank, ignoring".to_string());
                self.api.user_id = None;
            }
        }

        if self.api.timeout_secs == Some(0) {
            warnings.push("api.timeout_secs = 0, disabling the timeout".to_string());
            self.api.timeout_secs = None;
        }

        if !VALID_CAPTURE_SOURCES.contains(&self.capture.source.as_str()) {
            warnings.push(format!(
                "unknown capture source '{}', valid: {}",
                self.capture.source,
                VALID_CAPTURE_SOURCES.join(", ")
            ));
        }

        if self.capture.source == "command" && self.capture.command.is_empty() {
            warnings.push("capture.command is empty, restoring the default recorder".to_string());
            self.capture.command = default_capture_command();
        }

        if self.capture.source == "file" && self.capture.files.is_empty() {
            warnings.push("capture.source = \"file\" but capture.files is empty".to_string());
        }

        if self.diary.page_size == 0 {
            warnings.push("diary.page_size = 0, setting to 1".to_string());
            self.diary.page_size = 1;
        }
        if self.diary.page_size > MAX_PAGE_SIZE {
            warnings.push(format!(
                "diary.page_size = {} exceeds {MAX_PAGE_SIZE}, clamping",
                self.diary.page_size
            ));
            self.diary.page_size = MAX_PAGE_SIZE;
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }

    /// Resolve the user id for API calls: config first, then `$DIARIST_USER_ID`.
    pub fn resolve_user_id(&self) -> Option<String> {
        if let Some(ref id) = self.api.user_id {
            return Some(id.clone());
        }
        std::env::var("DIARIST_USER_ID")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Starter project config written by `diarist init`.
    pub fn starter_toml(base_url: &str, user_id: Option<&str>) -> Result<String> {
        let mut cfg = Self::default_config();
        cfg.api.base_url = base_url.to_string();
        cfg.api.user_id = user_id.map(str::to_string);
        toml::to_string_pretty(&cfg)
            .map_err(|e| DiaristError::Config(format!("failed to serialize config: {e}")))
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("diarist").join("config.toml"))
}
