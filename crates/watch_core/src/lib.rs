//! Page watch core: content fingerprints and the pure change-detection state machine.
mod effect;
mod fingerprint;
mod msg;
mod state;
mod update;

pub use effect::Effect;
pub use fingerprint::{digest, Fingerprint, FingerprintError};
pub use msg::Msg;
pub use state::{CheckReport, CheckResult, CheckState, Phase};
pub use update::update;
