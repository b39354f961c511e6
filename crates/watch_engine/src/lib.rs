//! Page watch engine: collaborator adapters and effect execution.
mod config;
mod detector;
mod fetch;
mod handler;
mod notify;
mod state;
mod store;
mod types;

pub use config::{ChannelKind, ConfigError, WatchConfig};
pub use detector::{ChangeDetector, Clock, DetectorError};
pub use fetch::{ContentSource, FetchSettings, ReqwestFetcher};
pub use handler::{handle_invocation, response_for, InvocationResponse};
pub use notify::{
    alert_message, LogPublisher, Notifier, NtfyPublisher, PublishError, Publisher,
    WebhookPublisher, DEFAULT_SUBJECT, DEFAULT_TOPIC,
};
pub use state::{FingerprintStore, DEFAULT_STATE_KEY};
pub use store::{
    FsObjectStore, HttpObjectStore, ObjectStore, StoreError, StoreLocation, DEFAULT_MAX_OBJECT_BYTES,
};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
