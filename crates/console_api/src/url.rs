use reqwest::Url;

use crate::error::ConsoleApiError;

/// Default backend address of a locally started AIConsole server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Normalize a base URL: fall back to the default, drop trailing slashes and
/// a trailing `/api` segment so endpoint paths can be appended uniformly.
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    trimmed
        .strip_suffix("/api")
        .unwrap_or(trimmed)
        .to_string()
}

/// `POST {base}/api/chats/{chat_id}/run_code`
pub fn run_code_url(base_url: &str, chat_id: &str) -> Result<Url, ConsoleApiError> {
    if chat_id.trim().is_empty() {
        return Err(ConsoleApiError::InvalidBaseUrl(
            "chat id must not be empty".to_owned(),
        ));
    }
    endpoint_url(base_url, &["api", "chats", chat_id, "run_code"])
}

/// `POST {base}/api/execute`
pub fn execute_url(base_url: &str) -> Result<Url, ConsoleApiError> {
    endpoint_url(base_url, &["api", "execute"])
}

fn endpoint_url(base_url: &str, segments: &[&str]) -> Result<Url, ConsoleApiError> {
    let normalized = normalize_base_url(base_url);
    let mut url = Url::parse(&normalized)
        .map_err(|error| ConsoleApiError::InvalidBaseUrl(format!("{normalized}: {error}")))?;

    url.path_segments_mut()
        .map_err(|()| ConsoleApiError::InvalidBaseUrl(format!("{normalized}: cannot be a base")))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}
