use std::path::{Path, PathBuf};
use std::time::Duration;

use console_api::url::DEFAULT_BASE_URL;
use console_api::ConsoleApiConfig;
use serde::Deserialize;

pub const CONFIG_PATH_ENV_VAR: &str = "AICONSOLE_CONFIG_PATH";

/// Client settings file.
///
/// ```json
/// {
///   "base_url": "http://localhost:8000",
///   "timeout_sec": 30,
///   "always_execute_code": false,
///   "history_dir": "/path/to/project/.aic/history"
/// }
/// ```
///
/// Every field is optional. `timeout_sec` bounds connection setup only and
/// must be > 0 when present. Unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub timeout_sec: Option<u64>,
    #[serde(default)]
    pub always_execute_code: bool,
    #[serde(default)]
    pub history_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: None,
            timeout_sec: None,
            always_execute_code: false,
            history_dir: None,
        }
    }
}

impl ClientSettings {
    /// Reads the file named by `AICONSOLE_CONFIG_PATH`, or returns defaults
    /// when the variable is unset or blank.
    pub fn from_env() -> Result<Self, String> {
        let path = std::env::var(CONFIG_PATH_ENV_VAR)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        match path {
            Some(path) => Self::from_path(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            format!("Failed to read settings file {}: {error}", path.display())
        })?;
        Self::parse(&raw)
            .map_err(|error| format!("Invalid settings file {}: {error}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let settings: Self = serde_json::from_str(raw).map_err(|error| error.to_string())?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url must not be empty".to_string());
        }
        if self.timeout_sec == Some(0) {
            return Err("timeout_sec must be > 0".to_string());
        }
        if self
            .access_token
            .as_deref()
            .is_some_and(|token| token.trim().is_empty())
        {
            return Err("access_token must not be blank".to_string());
        }
        Ok(())
    }

    pub fn api_config(&self) -> ConsoleApiConfig {
        let mut config = ConsoleApiConfig::new(self.base_url.trim());
        if let Some(token) = &self.access_token {
            config = config.with_access_token(token.trim());
        }
        if let Some(timeout_sec) = self.timeout_sec {
            config = config.with_connect_timeout(Duration::from_secs(timeout_sec));
        }
        config
    }

    /// Directory for stored chats, defaulting to the project history folder.
    pub fn history_root(&self, project_dir: &Path) -> PathBuf {
        self.history_dir
            .clone()
            .unwrap_or_else(|| chat_history::history_root(project_dir))
    }
}
