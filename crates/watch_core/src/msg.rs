use crate::Fingerprint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// External trigger asked for one check.
    Started,
    /// Content source returned a successful body.
    ContentFetched { bytes: Vec<u8> },
    /// Content source failed (transport error or non-success status).
    FetchFailed { reason: String },
    /// State store answered; `None` means no baseline has been recorded yet.
    BaselineLoaded(Option<Fingerprint>),
    /// State store could not be read. Distinct from an absent baseline.
    BaselineUnavailable { reason: String },
    NotifyDelivered,
    NotifyFailed { reason: String },
    PersistCompleted,
    PersistFailed { reason: String },
}
