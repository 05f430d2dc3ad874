use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug)]
pub enum ConsoleApiError {
    InvalidBaseUrl(String),
    InvalidHeader(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    RetryExhausted {
        status: Option<StatusCode>,
        last_error: Option<String>,
    },
    Cancelled,
    Unknown(String),
}

impl ConsoleApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Error body shapes returned by the backend: FastAPI `detail` (string or
/// validation list) and the settings-style `error` string.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl ErrorPayload {
    fn message(&self) -> Option<String> {
        self.detail
            .as_ref()
            .and_then(detail_message)
            .or_else(|| self.error.as_ref().and_then(detail_message))
    }
}

fn detail_message(value: &Value) -> Option<String> {
    match value {
        Value::String(message) => non_empty_string(message).map(ToOwned::to_owned),
        Value::Array(items) => {
            let messages = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .filter_map(non_empty_string)
                .collect::<Vec<_>>();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .and_then(non_empty_string)
            .map(ToOwned::to_owned),
        _ => None,
    }
}

impl fmt::Display for ConsoleApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => write!(f, "invalid base URL: {value}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::RetryExhausted { status, last_error } => {
                let status = status
                    .map(|status| status.as_u16().to_string())
                    .unwrap_or_else(|| "n/a".to_owned());
                write!(f, "retry exhausted after max attempts (status: {status}, last_error: {last_error:?})")
            }
            Self::Cancelled => write!(f, "request was cancelled"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ConsoleApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ConsoleApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload.message() {
            return message;
        }
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use reqwest::StatusCode;

    use super::{parse_error_message, ConsoleApiError};

    #[test]
    fn detail_string_is_preferred() {
        assert_eq!(
            parse_error_message(StatusCode::NOT_FOUND, r#"{"detail":"Chat not found"}"#),
            "Chat not found"
        );
    }

    #[test]
    fn validation_detail_list_is_joined() {
        let body = r#"{"detail":[{"msg":"field required"},{"msg":"value is not a valid list"}]}"#;
        assert_eq!(
            parse_error_message(StatusCode::UNPROCESSABLE_ENTITY, body),
            "field required; value is not a valid list"
        );
    }

    #[test]
    fn error_field_is_used_when_detail_missing() {
        assert_eq!(
            parse_error_message(StatusCode::NOT_ACCEPTABLE, r#"{"error":"bad settings"}"#),
            "bad settings"
        );
    }

    #[test]
    fn empty_body_falls_back_to_reason_phrase() {
        assert_eq!(
            parse_error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
            "Service Unavailable"
        );
        assert_eq!(
            parse_error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
    }

    #[test]
    fn only_transport_errors_carry_a_source() {
        let status = ConsoleApiError::Status(StatusCode::NOT_FOUND, "Chat not found".to_owned());
        assert_eq!(status.to_string(), "HTTP 404 Not Found Chat not found");
        assert!(status.source().is_none());

        let exhausted = ConsoleApiError::RetryExhausted {
            status: Some(StatusCode::SERVICE_UNAVAILABLE),
            last_error: None,
        };
        assert!(exhausted.to_string().contains("status: 503"));
        assert!(exhausted.source().is_none());
        assert!(ConsoleApiError::Cancelled.is_cancelled());
    }
}
