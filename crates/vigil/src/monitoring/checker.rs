use std::error::Error as StdError;
use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use tracing::debug;

use super::types::ProbeOutcome;

/// Default connect and read timeout of a probe.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes a single bounded request against a target URL.
///
/// Implementations must never fail past this boundary; every failure is
/// encoded in the returned [`ProbeOutcome`].
#[async_trait::async_trait]
pub trait ProbeClient: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// GET-based HTTP/HTTPS probe.
pub struct HttpProbeClient {
    client: reqwest::Client,
}

impl HttpProbeClient {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub fn with_default_timeouts() -> Result<Self> {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_TIMEOUT)
    }
}

#[async_trait::async_trait]
impl ProbeClient for HttpProbeClient {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url, "probe failed before a response arrived: {}", e);
                return ProbeOutcome::unreachable(describe_error(&e));
            }
        };

        let status = response.status();
        // The body of an error status is still read, it becomes the snippet.
        let status_error = error_status_message(status, url);

        match response.bytes().await {
            Ok(body) => ProbeOutcome {
                status_code: status.as_u16(),
                body_snippet: String::from_utf8_lossy(&body).into_owned(),
                error_message: status_error,
            },
            Err(e) => ProbeOutcome {
                status_code: status.as_u16(),
                body_snippet: String::new(),
                error_message: Some(status_error.unwrap_or_else(|| describe_error(&e))),
            },
        }
    }
}

/// Error statuses count as transport failures, except the "not found" family
/// which is success-shaped and only judged by the status-code rule.
fn error_status_message(status: StatusCode, url: &str) -> Option<String> {
    let not_found = status == StatusCode::NOT_FOUND || status == StatusCode::GONE;
    if status.is_client_error() || status.is_server_error() {
        if not_found {
            return None;
        }
        return Some(format!("Server returned HTTP response code: {} for URL: {}", status.as_u16(), url));
    }
    None
}

/// Flatten an error and its sources into one readable line.
fn describe_error(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
