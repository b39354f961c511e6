use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use url::Url;
use watch_core::Fingerprint;
use watch_logging::{watch_debug, watch_info};

use crate::store::with_trailing_slash;

pub const DEFAULT_SUBJECT: &str = "Website Change Alert";
pub const DEFAULT_TOPIC: &str = "page-watch";

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("invalid publish endpoint {endpoint}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },
    #[error("publish transport error: {0}")]
    Transport(String),
    #[error("publish rejected with http status {0}")]
    Rejected(u16),
}

/// Pub/sub style delivery of one message to a topic.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), PublishError>;
    fn describe(&self) -> String;
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, PublishError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| PublishError::Transport(err.to_string()))
}

fn parse_endpoint(endpoint: &str) -> Result<Url, PublishError> {
    Url::parse(endpoint).map_err(|err| PublishError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    })
}

async fn send(request: reqwest::RequestBuilder) -> Result<(), PublishError> {
    let response = request
        .send()
        .await
        .map_err(|err| PublishError::Transport(err.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(PublishError::Rejected(status.as_u16()));
    }
    Ok(())
}

// ── ntfy ──

/// Posts to `{base}/{topic}` with the subject as the `Title` header.
#[derive(Debug, Clone)]
pub struct NtfyPublisher {
    base: Url,
    client: reqwest::Client,
}

impl NtfyPublisher {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, PublishError> {
        Ok(Self {
            base: with_trailing_slash(parse_endpoint(base)?),
            client: build_client(timeout)?,
        })
    }
}

/// The topic always becomes exactly one percent-encoded path segment.
fn topic_url(base: &Url, topic: &str) -> Result<Url, PublishError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| PublishError::InvalidEndpoint {
            endpoint: base.to_string(),
            message: "endpoint cannot carry a topic path".to_string(),
        })?
        .pop_if_empty()
        .push(topic);
    Ok(url)
}

#[async_trait::async_trait]
impl Publisher for NtfyPublisher {
    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), PublishError> {
        let url = topic_url(&self.base, topic)?;
        send(
            self.client
                .post(url)
                .header("Title", subject)
                .body(body.to_string()),
        )
        .await
    }

    fn describe(&self) -> String {
        format!("ntfy({})", self.base)
    }
}

// ── Webhook (generic JSON POST) ──

#[derive(Debug, Clone)]
pub struct WebhookPublisher {
    url: Url,
    client: reqwest::Client,
}

impl WebhookPublisher {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, PublishError> {
        Ok(Self {
            url: parse_endpoint(url)?,
            client: build_client(timeout)?,
        })
    }
}

fn webhook_payload(topic: &str, subject: &str, body: &str) -> serde_json::Value {
    serde_json::json!({
        "topic": topic,
        "subject": subject,
        "message": body,
    })
}

#[async_trait::async_trait]
impl Publisher for WebhookPublisher {
    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), PublishError> {
        let payload = webhook_payload(topic, subject, body);
        send(
            self.client
                .post(self.url.clone())
                .header(CONTENT_TYPE, "application/json")
                .body(payload.to_string()),
        )
        .await
    }

    fn describe(&self) -> String {
        format!("webhook({})", self.url)
    }
}

// ── Log ──

/// Writes alerts to the log only. Useful for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

#[async_trait::async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), PublishError> {
        watch_info!("[{topic}] {subject}: {body}");
        Ok(())
    }

    fn describe(&self) -> String {
        "log".to_string()
    }
}

// ── Notifier ──

/// Sends human readable alerts through a publisher to one topic.
#[derive(Clone)]
pub struct Notifier {
    publisher: Arc<dyn Publisher>,
    topic: String,
    subject: String,
}

impl Notifier {
    pub fn new(publisher: Arc<dyn Publisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            subject: DEFAULT_SUBJECT.to_string(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub async fn notify(&self, message: &str) -> Result<(), PublishError> {
        self.publisher
            .publish(&self.topic, &self.subject, message)
            .await?;
        watch_debug!(
            "Notification sent via {} to topic {}",
            self.publisher.describe(),
            self.topic
        );
        Ok(())
    }
}

/// Alert text for a detected change. The first line always names the URL.
pub fn alert_message(
    url: &str,
    previous: Option<&Fingerprint>,
    current: &Fingerprint,
    checked_at: &str,
) -> String {
    let previous = previous.map_or_else(|| "none (first check)".to_string(), |fp| fp.to_string());
    format!(
        "Change detected on {url}\nChecked at: {checked_at}\nPrevious fingerprint: {previous}\nCurrent fingerprint: {current}"
    )
}
