use crate::Fingerprint;

/// Work the state machine asks its driver to perform against a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch {
        url: String,
    },
    ReadBaseline,
    Notify {
        url: String,
        previous: Option<Fingerprint>,
        current: Fingerprint,
    },
    Persist {
        fingerprint: Fingerprint,
    },
}
