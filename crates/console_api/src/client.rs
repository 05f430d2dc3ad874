use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Serialize;

use crate::cancel::{await_or_cancel, CancelHandle};
use crate::config::ConsoleApiConfig;
use crate::error::{parse_error_message, ConsoleApiError};
use crate::headers::build_headers;
use crate::payload::{ExecuteRequest, RunCodeRequest};
use crate::retry::{is_transient, RetryPolicy};
use crate::url::{execute_url, normalize_base_url, run_code_url};

/// Raw response body chunks in arrival order.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ConsoleApiError>>;

#[derive(Debug)]
pub struct ConsoleApiClient {
    http: Client,
    config: ConsoleApiConfig,
}

impl ConsoleApiClient {
    pub fn new(config: ConsoleApiConfig) -> Result<Self, ConsoleApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build().map_err(ConsoleApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ConsoleApiConfig {
        &self.config
    }

    pub fn base_url(&self) -> String {
        normalize_base_url(&self.config.base_url)
    }

    pub fn build_headers(&self, user_agent: Option<&str>) -> Result<HeaderMap, ConsoleApiError> {
        let headers = build_headers(&self.config, user_agent)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ConsoleApiError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ConsoleApiError::InvalidHeader(format!("invalid value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    /// Opens the "execute code" stream.
    ///
    /// Code execution is not idempotent, so this call is never retried.
    pub async fn run_code(
        &self,
        request: &RunCodeRequest,
        cancellation: Option<&CancelHandle>,
    ) -> Result<ByteStream, ConsoleApiError> {
        let url = run_code_url(&self.config.base_url, &request.chat_id)?;
        tracing::debug!(
            chat_id = %request.chat_id,
            language = %request.language,
            "opening run_code stream"
        );
        let response = self
            .send_with_retry(url, request, RetryPolicy::NEVER, cancellation)
            .await?;
        Ok(into_byte_stream(response))
    }

    /// Opens the "generate turn" stream for the conversation in `request`.
    pub async fn execute(
        &self,
        request: &ExecuteRequest,
        cancellation: Option<&CancelHandle>,
    ) -> Result<ByteStream, ConsoleApiError> {
        let url = execute_url(&self.config.base_url)?;
        tracing::debug!(
            chat_id = %request.chat.id,
            agent_id = %request.agent_id,
            "opening execute stream"
        );
        let response = self
            .send_with_retry(url, request, self.config.retry, cancellation)
            .await?;
        Ok(into_byte_stream(response))
    }

    async fn send_with_retry<T>(
        &self,
        url: Url,
        body: &T,
        policy: RetryPolicy,
        cancellation: Option<&CancelHandle>,
    ) -> Result<Response, ConsoleApiError>
    where
        T: Serialize + ?Sized,
    {
        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=policy.max_retries {
            let response = self
                .http
                .post(url.clone())
                .headers(headers.clone())
                .json(body)
                .send();
            let response = await_or_cancel(response, cancellation)
                .await?
                .map_err(ConsoleApiError::from);

            match response {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }

                    let status = response.status();
                    last_status = Some(status);
                    let body = await_or_cancel(response.text(), cancellation)
                        .await?
                        .unwrap_or_default();
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if policy.allows_retry_after(attempt) && is_transient(status, &body) {
                        tracing::debug!(%status, attempt, "retrying request");
                        let delay = policy.delay_after(attempt);
                        await_or_cancel(tokio::time::sleep(delay), cancellation).await?;
                        continue;
                    }

                    return Err(ConsoleApiError::Status(status, message));
                }
                Err(error) => {
                    if policy.max_retries == 0 {
                        return Err(error);
                    }
                    last_error = Some(error.to_string());
                    if policy.allows_retry_after(attempt) {
                        tracing::debug!(attempt, error = %error, "retrying request");
                        let delay = policy.delay_after(attempt);
                        await_or_cancel(tokio::time::sleep(delay), cancellation).await?;
                        continue;
                    }
                }
            }
        }

        Err(ConsoleApiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }
}

fn into_byte_stream(response: Response) -> ByteStream {
    response
        .bytes_stream()
        .map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(ConsoleApiError::from)
        })
        .boxed()
}
