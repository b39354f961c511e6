use crate::Fingerprint;

/// Outcome of one invocation. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    NoChange,
    ChangeDetected,
    FetchFailed,
    StoreReadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Created but not yet triggered.
    #[default]
    Ready,
    Fetching,
    Digesting,
    ReadingState,
    Comparing,
    Idle,
    Notifying,
    Persisting,
    Done(CheckResult),
}

impl Phase {
    pub fn is_done(&self) -> bool {
        matches!(self, Phase::Done(_))
    }
}

/// Everything learned during one check, available once the machine is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub result: CheckResult,
    pub url: String,
    pub current: Option<Fingerprint>,
    pub previous: Option<Fingerprint>,
    /// Why the check aborted early (fetch or baseline read).
    pub failure: Option<String>,
    pub notify_error: Option<String>,
    pub persist_error: Option<String>,
}

impl CheckReport {
    pub fn notified(&self) -> bool {
        self.result == CheckResult::ChangeDetected && self.notify_error.is_none()
    }

    pub fn persisted(&self) -> bool {
        self.notified() && self.persist_error.is_none()
    }

    pub fn is_first_check(&self) -> bool {
        self.current.is_some() && self.previous.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckState {
    url: String,
    phase: Phase,
    trail: Vec<Phase>,
    current: Option<Fingerprint>,
    previous: Option<Fingerprint>,
    failure: Option<String>,
    notify_error: Option<String>,
    persist_error: Option<String>,
}

impl CheckState {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            phase: Phase::Ready,
            trail: vec![Phase::Ready],
            current: None,
            previous: None,
            failure: None,
            notify_error: None,
            persist_error: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every phase visited so far, in order.
    pub fn trail(&self) -> &[Phase] {
        &self.trail
    }

    pub fn current(&self) -> Option<&Fingerprint> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&Fingerprint> {
        self.previous.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.phase.is_done()
    }

    pub fn report(&self) -> Option<CheckReport> {
        let Phase::Done(result) = self.phase else {
            return None;
        };
        Some(CheckReport {
            result,
            url: self.url.clone(),
            current: self.current.clone(),
            previous: self.previous.clone(),
            failure: self.failure.clone(),
            notify_error: self.notify_error.clone(),
            persist_error: self.persist_error.clone(),
        })
    }

    pub(crate) fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.trail.push(phase);
    }

    pub(crate) fn finish(&mut self, result: CheckResult) {
        self.enter(Phase::Done(result));
    }

    pub(crate) fn abort(&mut self, result: CheckResult, reason: String) {
        self.failure = Some(reason);
        self.finish(result);
    }

    pub(crate) fn set_current(&mut self, fingerprint: Fingerprint) {
        self.current = Some(fingerprint);
    }

    pub(crate) fn set_previous(&mut self, fingerprint: Option<Fingerprint>) {
        self.previous = fingerprint;
    }

    pub(crate) fn set_notify_error(&mut self, reason: String) {
        self.notify_error = Some(reason);
    }

    pub(crate) fn set_persist_error(&mut self, reason: String) {
        self.persist_error = Some(reason);
    }
}
