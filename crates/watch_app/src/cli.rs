use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use watch_engine::{
    ChannelKind, FetchSettings, WatchConfig, DEFAULT_STATE_KEY, DEFAULT_SUBJECT, DEFAULT_TOPIC,
};
use watch_logging::LogDestination;

#[derive(Parser, Debug)]
#[command(
    name = "page_watch",
    about = "Check one web page for content changes and alert when it changes"
)]
pub struct Cli {
    /// Resource to check.
    #[arg(long, env = "PAGE_WATCH_URL")]
    pub url: String,

    /// Directory or http(s) base URL where the last fingerprint is kept.
    #[arg(long, env = "PAGE_WATCH_STORE")]
    pub store_location: String,

    /// Object key of the fingerprint inside the store.
    #[arg(long, env = "PAGE_WATCH_STATE_KEY", default_value = DEFAULT_STATE_KEY)]
    pub state_key: String,

    /// Alert channel: log, ntfy or webhook.
    #[arg(long, env = "PAGE_WATCH_CHANNEL", default_value = "log")]
    pub channel: ChannelKind,

    /// Publish endpoint for ntfy (server base URL) or webhook (full URL).
    #[arg(long, env = "PAGE_WATCH_NOTIFY_URL")]
    pub notify_url: Option<String>,

    #[arg(long, env = "PAGE_WATCH_TOPIC", default_value = DEFAULT_TOPIC)]
    pub topic: String,

    #[arg(long, env = "PAGE_WATCH_SUBJECT", default_value = DEFAULT_SUBJECT)]
    pub subject: String,

    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Largest accepted response body in bytes.
    #[arg(long, default_value_t = 5 * 1024 * 1024)]
    pub max_bytes: u64,

    #[arg(long, default_value_t = 5)]
    pub redirect_limit: usize,

    /// Timeout for store and publish requests.
    #[arg(long, default_value_t = 10)]
    pub io_timeout_secs: u64,

    /// Opaque JSON trigger event handed to the handler.
    #[arg(long, env = "PAGE_WATCH_EVENT", default_value = "{}")]
    pub event: String,

    /// Also write logs to this file.
    #[arg(long, env = "PAGE_WATCH_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[arg(long, env = "PAGE_WATCH_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn to_config(&self) -> WatchConfig {
        let mut config = WatchConfig::new(self.url.clone(), self.store_location.clone());
        config.state_key = self.state_key.clone();
        config.channel = self.channel;
        config.notify_url = self.notify_url.clone();
        config.topic = self.topic.clone();
        config.subject = self.subject.clone();
        config.fetch = FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            redirect_limit: self.redirect_limit,
            max_bytes: self.max_bytes,
            ..FetchSettings::default()
        };
        config.io_timeout = Duration::from_secs(self.io_timeout_secs);
        config
    }
}
