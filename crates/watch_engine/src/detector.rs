use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use watch_core::{update, CheckReport, CheckResult, CheckState, Effect, Msg, Phase};
use watch_logging::{watch_debug, watch_error, watch_info, watch_warn};

use crate::fetch::ContentSource;
use crate::notify::{alert_message, Notifier};
use crate::state::FingerprintStore;

/// Produces the timestamp written into alerts. Defaults to RFC 3339 UTC.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectorError {
    #[error("check stalled in phase {phase:?} with no pending work")]
    Stalled { phase: Phase },
}

/// Runs one check at a time against injected collaborators.
///
/// Effects are executed strictly in the order the state machine emits them;
/// each collaborator call completes before the next message is applied.
pub struct ChangeDetector {
    url: String,
    source: Arc<dyn ContentSource>,
    state: FingerprintStore,
    notifier: Notifier,
    clock: Clock,
}

impl ChangeDetector {
    pub fn new(
        url: impl Into<String>,
        source: Arc<dyn ContentSource>,
        state: FingerprintStore,
        notifier: Notifier,
    ) -> Self {
        Self {
            url: url.into(),
            source,
            state,
            notifier,
            clock: Arc::new(|| Utc::now().to_rfc3339()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn run(&self) -> Result<CheckReport, DetectorError> {
        let (mut state, effects) = update(CheckState::new(self.url.clone()), Msg::Started);
        let mut pending: VecDeque<Effect> = effects.into();
        watch_debug!("Check of {} entered {:?}", self.url, state.phase());

        while let Some(effect) = pending.pop_front() {
            let msg = self.execute(effect).await;
            let before = state.phase();
            let (next, effects) = update(state, msg);
            state = next;
            if state.phase() != before {
                watch_debug!("Check of {} moved {:?} -> {:?}", self.url, before, state.phase());
            }
            pending.extend(effects);
        }

        let report = state.report().ok_or(DetectorError::Stalled {
            phase: state.phase(),
        })?;
        log_outcome(&report);
        Ok(report)
    }

    async fn execute(&self, effect: Effect) -> Msg {
        match effect {
            Effect::Fetch { url } => match self.source.fetch(&url).await {
                Ok(output) => Msg::ContentFetched {
                    bytes: output.bytes,
                },
                Err(err) => {
                    watch_warn!("Error fetching {}: {}", url, err);
                    Msg::FetchFailed {
                        reason: err.to_string(),
                    }
                }
            },
            Effect::ReadBaseline => match self.state.read_last_fingerprint().await {
                Ok(previous) => Msg::BaselineLoaded(previous),
                Err(err) => {
                    watch_error!("Error reading fingerprint {}: {}", self.state.key(), err);
                    Msg::BaselineUnavailable {
                        reason: err.to_string(),
                    }
                }
            },
            Effect::Notify {
                url,
                previous,
                current,
            } => {
                let checked_at = (self.clock)();
                let message = alert_message(&url, previous.as_ref(), &current, &checked_at);
                match self.notifier.notify(&message).await {
                    Ok(()) => Msg::NotifyDelivered,
                    Err(err) => {
                        watch_error!("Error sending change notification for {}: {}", url, err);
                        Msg::NotifyFailed {
                            reason: err.to_string(),
                        }
                    }
                }
            }
            Effect::Persist { fingerprint } => {
                match self.state.write_fingerprint(&fingerprint).await {
                    Ok(()) => Msg::PersistCompleted,
                    Err(err) => {
                        watch_error!("Error writing fingerprint {}: {}", self.state.key(), err);
                        Msg::PersistFailed {
                            reason: err.to_string(),
                        }
                    }
                }
            }
        }
    }
}

fn log_outcome(report: &CheckReport) {
    match report.result {
        CheckResult::NoChange => watch_info!("No changes detected on {}", report.url),
        CheckResult::ChangeDetected => {
            let current = report.current.as_ref().map_or("?", |fp| fp.short());
            watch_info!(
                "Change detected on {} (fingerprint {}, notified: {}, persisted: {})",
                report.url,
                current,
                report.notified(),
                report.persisted()
            );
        }
        CheckResult::FetchFailed | CheckResult::StoreReadFailed => watch_warn!(
            "Check of {} ended with {:?}: {}",
            report.url,
            report.result,
            report.failure.as_deref().unwrap_or("unknown")
        ),
    }
}
