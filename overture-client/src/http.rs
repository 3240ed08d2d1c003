//! reqwest-backed transport for the streamed responses endpoint.
//!
//! Maps HTTP status codes and structured error bodies onto [`FetchFailure`]
//! kinds; everything unrecognized is passed through raw for the classifier
//! to surface as `Failed`.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::failure::FetchFailure;
use crate::transport::{Transport, TransportResponse};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Transport speaking HTTP to a streamed responses endpoint.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTransport {
    /// Create a transport posting to `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    /// Authenticate with a bearer token.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Use a preconfigured client (timeouts, proxies, pools).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        body: serde_json::Value,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, FetchFailure> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "text/event-stream")
            .header(REQUEST_ID_HEADER, request_id)
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(FetchFailure::Aborted),
            response = request.send() => response.map_err(map_request_error)?,
        };

        let status = response.status();
        let server_request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, retry_after, &text));
        }

        let stream = response.bytes_stream().map_err(|error| {
            tracing::debug!(%error, "response stream failed");
            FetchFailure::NetworkError {
                reason: error.to_string(),
            }
        });

        let mut out = TransportResponse::new(Box::pin(stream));
        out.server_request_id = server_request_id;
        Ok(out)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    code: Option<String>,
    message: Option<String>,
    auth_url: Option<String>,
    learn_more: Option<String>,
    retry_after: Option<u64>,
}

impl ErrorDetail {
    fn code(&self) -> &str {
        self.code.as_deref().unwrap_or("")
    }

    fn message_or(&self, fallback: &str) -> String {
        self.message.clone().unwrap_or_else(|| fallback.to_string())
    }
}

fn parse_error_body(text: &str) -> ErrorDetail {
    serde_json::from_str::<ErrorBody>(text)
        .map(|body| body.error)
        .unwrap_or_default()
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn map_request_error(error: reqwest::Error) -> FetchFailure {
    if error.is_timeout() || error.is_connect() {
        FetchFailure::NetworkError {
            reason: error.to_string(),
        }
    } else {
        FetchFailure::Other(error.to_string())
    }
}

/// Map one non-success status plus its error body to a failure kind.
fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    text: &str,
) -> FetchFailure {
    let detail = parse_error_body(text);

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            if detail.code() == "insufficient_quota" {
                FetchFailure::QuotaExceeded {
                    reason: detail.message_or("usage quota exhausted"),
                }
            } else {
                FetchFailure::RateLimited {
                    retry_after: retry_after
                        .or_else(|| detail.retry_after.map(Duration::from_secs)),
                }
            }
        }
        StatusCode::BAD_REQUEST => match detail.code() {
            "previous_response_not_found" | "invalid_previous_response" => {
                FetchFailure::InvalidStatefulMarker
            }
            "content_filter" | "content_policy_violation" => FetchFailure::PromptFiltered {
                reason: detail.message_or("prompt rejected by content policy"),
            },
            _ => FetchFailure::BadRequest {
                reason: detail.message_or("bad request"),
            },
        },
        StatusCode::UNAUTHORIZED => match detail.auth_url {
            Some(auth_url) => FetchFailure::AgentUnauthorized { auth_url },
            None => FetchFailure::BadRequest {
                reason: detail.message_or("unauthorized"),
            },
        },
        StatusCode::FORBIDDEN => match detail.code() {
            "off_topic" => FetchFailure::OffTopic,
            "content_filter" => FetchFailure::PromptFiltered {
                reason: detail.message_or("prompt rejected by content policy"),
            },
            _ => FetchFailure::BadRequest {
                reason: detail.message_or("forbidden"),
            },
        },
        StatusCode::NOT_FOUND => FetchFailure::NotFound {
            reason: detail.message_or("model or endpoint not found"),
        },
        StatusCode::LOCKED => FetchFailure::ExtensionBlocked {
            retry_after: retry_after
                .or_else(|| detail.retry_after.map(Duration::from_secs))
                .unwrap_or(Duration::from_secs(300)),
            learn_more: detail.learn_more.unwrap_or_default(),
        },
        StatusCode::FAILED_DEPENDENCY => FetchFailure::AgentFailedDependency {
            reason: detail.message_or("agent dependency failed"),
        },
        status => FetchFailure::Other(format!(
            "http {status}: {}",
            detail.message_or(text.trim())
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_vs_quota() {
        let failure = classify_status(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(3)), "{}");
        assert_eq!(
            failure,
            FetchFailure::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
        );

        let failure = classify_status(
            StatusCode::TOO_MANY_REQUESTS,
            None,
            r#"{"error":{"code":"insufficient_quota","message":"out of credits"}}"#,
        );
        assert_eq!(
            failure,
            FetchFailure::QuotaExceeded {
                reason: "out of credits".into()
            }
        );
    }

    #[test]
    fn test_stale_marker_code() {
        let failure = classify_status(
            StatusCode::BAD_REQUEST,
            None,
            r#"{"error":{"code":"previous_response_not_found","message":"gone"}}"#,
        );
        assert_eq!(failure, FetchFailure::InvalidStatefulMarker);
    }

    #[test]
    fn test_unauthorized_with_auth_url() {
        let failure = classify_status(
            StatusCode::UNAUTHORIZED,
            None,
            r#"{"error":{"auth_url":"https://example.test/auth"}}"#,
        );
        assert_eq!(
            failure,
            FetchFailure::AgentUnauthorized {
                auth_url: "https://example.test/auth".into()
            }
        );
    }

    #[test]
    fn test_locked_defaults_retry_after() {
        let failure = classify_status(StatusCode::LOCKED, None, "{}");
        let FetchFailure::ExtensionBlocked { retry_after, .. } = failure else {
            panic!("expected ExtensionBlocked");
        };
        assert_eq!(retry_after, Duration::from_secs(300));
    }

    #[test]
    fn test_unrecognized_status_preserves_body() {
        let failure = classify_status(StatusCode::BAD_GATEWAY, None, "upstream toppled");
        let FetchFailure::Other(reason) = failure else {
            panic!("expected Other");
        };
        assert!(reason.contains("upstream toppled"));
    }

    #[test]
    fn test_unparseable_error_body_falls_back() {
        let failure = classify_status(StatusCode::BAD_REQUEST, None, "<html>nope</html>");
        assert_eq!(
            failure,
            FetchFailure::BadRequest {
                reason: "bad request".into()
            }
        );
    }
}
