use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::detector::ChangeDetector;
use crate::fetch::{FetchSettings, ReqwestFetcher};
use crate::notify::{
    LogPublisher, Notifier, NtfyPublisher, PublishError, Publisher, WebhookPublisher,
    DEFAULT_SUBJECT, DEFAULT_TOPIC,
};
use crate::state::{FingerprintStore, DEFAULT_STATE_KEY};
use crate::store::{StoreError, StoreLocation};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {field} {value:?}: {message}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        message: String,
    },
    #[error("store location must not be empty")]
    EmptyStoreLocation,
    #[error("state key must not be empty")]
    EmptyStateKey,
    #[error("topic must not be empty")]
    EmptyTopic,
    #[error("channel {0} needs a notify url")]
    MissingNotifyUrl(ChannelKind),
    #[error("unknown channel {0:?} (expected log, ntfy or webhook)")]
    UnknownChannel(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Where alerts are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelKind {
    #[default]
    Log,
    Ntfy,
    Webhook,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Log => write!(f, "log"),
            ChannelKind::Ntfy => write!(f, "ntfy"),
            ChannelKind::Webhook => write!(f, "webhook"),
        }
    }
}

impl FromStr for ChannelKind {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(ChannelKind::Log),
            "ntfy" => Ok(ChannelKind::Ntfy),
            "webhook" => Ok(ChannelKind::Webhook),
            _ => Err(ConfigError::UnknownChannel(raw.to_string())),
        }
    }
}

/// Everything one deployment needs: what to watch, where the baseline lives
/// and where alerts go.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub monitored_url: String,
    pub store_location: String,
    pub state_key: String,
    pub channel: ChannelKind,
    pub notify_url: Option<String>,
    pub topic: String,
    pub subject: String,
    pub fetch: FetchSettings,
    /// Timeout for object store and publish requests.
    pub io_timeout: Duration,
}

impl WatchConfig {
    pub fn new(monitored_url: impl Into<String>, store_location: impl Into<String>) -> Self {
        Self {
            monitored_url: monitored_url.into(),
            store_location: store_location.into(),
            state_key: DEFAULT_STATE_KEY.to_string(),
            channel: ChannelKind::default(),
            notify_url: None,
            topic: DEFAULT_TOPIC.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            fetch: FetchSettings::default(),
            io_timeout: Duration::from_secs(10),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.monitored_url).map_err(|err| ConfigError::InvalidUrl {
            field: "monitored url",
            value: self.monitored_url.clone(),
            message: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                field: "monitored url",
                value: self.monitored_url.clone(),
                message: "scheme must be http or https".to_string(),
            });
        }
        let location = StoreLocation::parse(&self.store_location)?;
        if self.state_key.trim().is_empty() {
            return Err(ConfigError::EmptyStateKey);
        }
        location.check_key(self.state_key.trim())?;
        if self.topic.trim().is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        if self.channel != ChannelKind::Log && self.notify_endpoint().is_none() {
            return Err(ConfigError::MissingNotifyUrl(self.channel));
        }
        Ok(())
    }

    fn notify_endpoint(&self) -> Option<&str> {
        self.notify_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    fn build_publisher(&self) -> Result<Arc<dyn Publisher>, ConfigError> {
        let endpoint = || {
            self.notify_endpoint()
                .ok_or(ConfigError::MissingNotifyUrl(self.channel))
        };
        let publisher: Arc<dyn Publisher> = match self.channel {
            ChannelKind::Log => Arc::new(LogPublisher),
            ChannelKind::Ntfy => Arc::new(NtfyPublisher::new(endpoint()?, self.io_timeout)?),
            ChannelKind::Webhook => Arc::new(WebhookPublisher::new(endpoint()?, self.io_timeout)?),
        };
        Ok(publisher)
    }

    /// Validate and wire the real collaborators into a detector.
    pub fn build_detector(&self) -> Result<ChangeDetector, ConfigError> {
        self.validate()?;
        let store = StoreLocation::parse(&self.store_location)?.open(self.io_timeout)?;
        let state = FingerprintStore::new(store, self.state_key.trim());
        let notifier =
            Notifier::new(self.build_publisher()?, self.topic.trim()).with_subject(&self.subject);
        let source = Arc::new(ReqwestFetcher::new(self.fetch.clone()));
        Ok(ChangeDetector::new(
            self.monitored_url.clone(),
            source,
            state,
            notifier,
        ))
    }
}
