use crate::{digest, CheckResult, CheckState, Effect, Msg, Phase};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that the current phase does not expect leave the state untouched.
/// A new fingerprint is only ever handed out for persisting after the
/// notification for it was delivered.
pub fn update(mut state: CheckState, msg: Msg) -> (CheckState, Vec<Effect>) {
    let effects = match msg {
        Msg::Started => {
            if state.phase() != Phase::Ready {
                return (state, Vec::new());
            }
            state.enter(Phase::Fetching);
            vec![Effect::Fetch {
                url: state.url().to_string(),
            }]
        }
        Msg::ContentFetched { bytes } => {
            if state.phase() != Phase::Fetching {
                return (state, Vec::new());
            }
            state.enter(Phase::Digesting);
            state.set_current(digest(&bytes));
            state.enter(Phase::ReadingState);
            vec![Effect::ReadBaseline]
        }
        Msg::FetchFailed { reason } => {
            if state.phase() == Phase::Fetching {
                state.abort(CheckResult::FetchFailed, reason);
            }
            Vec::new()
        }
        Msg::BaselineLoaded(previous) => {
            if state.phase() != Phase::ReadingState {
                return (state, Vec::new());
            }
            state.set_previous(previous);
            compare(&mut state)
        }
        Msg::BaselineUnavailable { reason } => {
            if state.phase() == Phase::ReadingState {
                state.abort(CheckResult::StoreReadFailed, reason);
            }
            Vec::new()
        }
        Msg::NotifyDelivered => match (state.phase(), state.current().cloned()) {
            (Phase::Notifying, Some(fingerprint)) => {
                state.enter(Phase::Persisting);
                vec![Effect::Persist { fingerprint }]
            }
            _ => Vec::new(),
        },
        Msg::NotifyFailed { reason } => {
            if state.phase() == Phase::Notifying {
                // Leave the baseline alone so the next check alerts again.
                state.set_notify_error(reason);
                state.finish(CheckResult::ChangeDetected);
            }
            Vec::new()
        }
        Msg::PersistCompleted => {
            if state.phase() == Phase::Persisting {
                state.finish(CheckResult::ChangeDetected);
            }
            Vec::new()
        }
        Msg::PersistFailed { reason } => {
            if state.phase() == Phase::Persisting {
                state.set_persist_error(reason);
                state.finish(CheckResult::ChangeDetected);
            }
            Vec::new()
        }
    };

    (state, effects)
}

fn compare(state: &mut CheckState) -> Vec<Effect> {
    let Some(current) = state.current().cloned() else {
        return Vec::new();
    };
    state.enter(Phase::Comparing);
    // An absent baseline never equals the current fingerprint.
    if state.previous() == Some(&current) {
        state.enter(Phase::Idle);
        state.finish(CheckResult::NoChange);
        return Vec::new();
    }
    state.enter(Phase::Notifying);
    vec![Effect::Notify {
        url: state.url().to_string(),
        previous: state.previous().cloned(),
        current,
    }]
}
