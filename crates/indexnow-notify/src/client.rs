use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::NotifierConfig;
use crate::error::Result;
use crate::keyfile::KeyFileManager;
use crate::model::NotificationRequest;

// ── Outcome ──────────────────────────────────────────────────────────────────

/// Why a submission never got a status code back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// No API key configured. Nothing was sent.
    NotConfigured,
    /// The key file could not be created or verified. Nothing was sent.
    KeyFileUnavailable,
    /// DNS, connect, TLS, timeout or an unusable target URL.
    Request(String),
}

impl TransportFailure {
    /// Failures detected before any network traffic.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NotConfigured | Self::KeyFileUnavailable)
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => f.write_str("not configured"),
            Self::KeyFileUnavailable => f.write_str("key file unavailable"),
            Self::Request(msg) => f.write_str(msg),
        }
    }
}

/// Classified result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexNowOutcome {
    Success,
    Accepted,
    BadRequest,
    Forbidden,
    Unprocessable,
    RateLimited,
    UnknownStatus(u16),
    TransportError(TransportFailure),
}

impl IndexNowOutcome {
    pub fn from_status(code: u16) -> Self {
        match code {
            200 => Self::Success,
            202 => Self::Accepted,
            400 => Self::BadRequest,
            403 => Self::Forbidden,
            422 => Self::Unprocessable,
            429 => Self::RateLimited,
            other => Self::UnknownStatus(other),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::Accepted)
    }
}

// ── Wire format ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload<'a> {
    pub host: &'a str,
    pub key: &'a str,
    pub key_location: String,
    pub url_list: Vec<&'a str>,
}

/// `<scheme>://<host>[:port]/<key>.txt`, the port only when non-default.
pub fn key_location(url: &Url, api_key: &str) -> Option<String> {
    let host = url.host_str()?;
    let origin = match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    };
    Some(format!("{origin}/{api_key}.txt"))
}

// ── IndexNowClient ───────────────────────────────────────────────────────────

/// Outcome plus the response body of a rejected submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub outcome: IndexNowOutcome,
    /// Response body for statuses other than 200 and 202.
    pub body: Option<String>,
}

impl Submission {
    fn local(failure: TransportFailure) -> Self {
        Self {
            outcome: IndexNowOutcome::TransportError(failure),
            body: None,
        }
    }
}

/// Submits single URLs. One attempt per request; nothing is retried.
///
/// Everything configurable (key, key file root, endpoint, timeout) is read
/// from the config handed to each call.
#[derive(Debug, Clone)]
pub struct IndexNowClient {
    client: reqwest::Client,
}

impl IndexNowClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("indexnow-notify/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub async fn submit(
        &self,
        request: &NotificationRequest,
        config: &NotifierConfig,
    ) -> IndexNowOutcome {
        self.submit_detailed(request, config).await.outcome
    }

    /// Like [`submit`](Self::submit), keeping the response body of rejections.
    pub async fn submit_detailed(
        &self,
        request: &NotificationRequest,
        config: &NotifierConfig,
    ) -> Submission {
        let api_key = config.api_key.as_str();
        if api_key.is_empty() {
            debug!("IndexNow API key is not configured");
            return Submission::local(TransportFailure::NotConfigured);
        }

        if !KeyFileManager::new(config.site_root.clone()).ensure_key_file(api_key) {
            debug!("could not create or verify key file");
            return Submission::local(TransportFailure::KeyFileUnavailable);
        }

        let target = match Url::parse(&request.url) {
            Ok(u) => u,
            Err(e) => {
                return Submission::local(TransportFailure::Request(format!(
                    "invalid url {}: {e}",
                    request.url
                )))
            }
        };
        let (Some(host), Some(location)) = (target.host_str(), key_location(&target, api_key))
        else {
            return Submission::local(TransportFailure::Request(format!(
                "url {} has no host",
                request.url
            )));
        };

        let payload = SubmitPayload {
            host,
            key: api_key,
            key_location: location,
            url_list: vec![request.url.as_str()],
        };
        let body = match serde_json::to_string(&payload) {
            Ok(b) => b,
            Err(e) => return Submission::local(TransportFailure::Request(e.to_string())),
        };

        let endpoint = config.endpoint_url();
        let result = self
            .client
            .post(&endpoint)
            .timeout(config.timeout)
            .header("Content-Type", "application/json; charset=utf-8")
            .body(body)
            .send()
            .await;

        let response = match result {
            Ok(resp) => resp,
            Err(e) => {
                warn!(endpoint = %endpoint, url = %request.url, error = %e, "IndexNow submission failed");
                return Submission::local(TransportFailure::Request(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let outcome = IndexNowOutcome::from_status(status);
        if outcome.is_success() {
            debug!(url = %request.url, status, removal = request.is_removal, "IndexNow notified");
            return Submission {
                outcome,
                body: None,
            };
        }

        let body = response.text().await.unwrap_or_default();
        debug!(url = %request.url, status, body = %body, "IndexNow rejected submission");
        Submission {
            outcome,
            body: Some(body),
        }
    }
}
