use std::sync::Arc;

use console_api::ConsoleApiClient;

use crate::backend::ChatBackend;
use crate::settings::ClientSettings;

mod http;
mod scripted;

pub use scripted::{BackendCall, ScriptStep, ScriptedBackend};

pub const DEFAULT_BACKEND_ID: &str = "http";
pub const SCRIPTED_BACKEND_ID: &str = "scripted";
pub const BACKEND_ENV_VAR: &str = "AICONSOLE_BACKEND";

pub fn backend_from_env(settings: &ClientSettings) -> Result<Arc<dyn ChatBackend>, String> {
    let backend_id = std::env::var(BACKEND_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    backend_for_id(backend_id.as_deref().unwrap_or(DEFAULT_BACKEND_ID), settings)
}

pub fn backend_for_id(
    backend_id: &str,
    settings: &ClientSettings,
) -> Result<Arc<dyn ChatBackend>, String> {
    match backend_id {
        DEFAULT_BACKEND_ID => {
            let client = ConsoleApiClient::new(settings.api_config())
                .map_err(|error| format!("Failed to build HTTP client: {error}"))?;
            Ok(Arc::new(client))
        }
        SCRIPTED_BACKEND_ID => Ok(Arc::new(ScriptedBackend::demo())),
        unknown => Err(format!(
            "Unsupported backend '{unknown}'. Available backends: {DEFAULT_BACKEND_ID}, {SCRIPTED_BACKEND_ID}"
        )),
    }
}
