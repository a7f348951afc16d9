use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::{debug, warn};
use time::OffsetDateTime;

use crate::domain::{
    error::ToggleError,
    outcome::AggregateResult,
    settings::RevertPolicy,
    toggle::{Notice, ToggleBatch, ToggleKey, ToggleResolution, ToggleState},
};

/// Optimistic view of relay states. Holds at most one pending toggle per key.
pub struct ToggleController {
    states: Mutex<HashMap<ToggleKey, ToggleState>>,
    policy: RevertPolicy,
}

impl ToggleController {
    pub fn new(policy: RevertPolicy) -> Self {
        ToggleController {
            states: Mutex::new(HashMap::new()),
            policy,
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<ToggleKey, ToggleState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self, key: &ToggleKey) -> ToggleState {
        self.states().get(key).copied().unwrap_or_default()
    }

    /// Records the device reported value, ignored while a toggle is in flight.
    pub fn seed(&self, key: ToggleKey, value: bool) {
        let mut states = self.states();
        let state = states.entry(key).or_default();
        if !state.is_pending() {
            *state = ToggleState::Idle(value);
        }
    }

    pub fn knows(&self, key: &ToggleKey) -> bool {
        self.states().contains_key(key)
    }

    /// Like [`Self::seed`] but leaves keys that already have a state untouched.
    pub fn seed_unknown(&self, key: ToggleKey, value: bool) {
        self.states().entry(key).or_insert(ToggleState::Idle(value));
    }

    /// Moves every key to pending, or none of them if one is already pending.
    pub fn begin(&self, keys: Vec<ToggleKey>, proposed: bool) -> Result<ToggleBatch, ToggleError> {
        let mut states = self.states();
        if let Some(busy) = keys.iter().find(|key| states.get(*key).is_some_and(ToggleState::is_pending)) {
            return Err(ToggleError::AlreadyPending {
                device_id: busy.device_id.clone(),
                relay_index: busy.relay_index,
            });
        }
        let started_at = OffsetDateTime::now_utc();
        for key in &keys {
            let state = states.entry(key.clone()).or_default();
            *state = ToggleState::Pending {
                proposed,
                previous: state.visible_value(),
                started_at,
            };
        }
        debug!("{} toggle(s) pending to {}", keys.len(), proposed);
        Ok(ToggleBatch { keys, proposed })
    }

    /// Settles the batch if every device acknowledged, otherwise reverts per policy.
    pub fn resolve(&self, batch: ToggleBatch, aggregate: &AggregateResult) -> ToggleResolution {
        let mut states = self.states();
        let mut settled = Vec::new();
        let mut reverted = Vec::new();
        for key in batch.keys {
            let Some(ToggleState::Pending { proposed, previous, .. }) = states.get(&key).copied() else {
                warn!("Toggle {} is no longer pending", key);
                continue;
            };
            let revert = match self.policy {
                RevertPolicy::WholeBatch => !aggregate.all_acknowledged,
                RevertPolicy::FailedOnly => aggregate.failed_device_ids.contains(&key.device_id),
            };
            if revert {
                states.insert(key.clone(), ToggleState::Idle(previous));
                reverted.push(key);
            } else {
                states.insert(key.clone(), ToggleState::Settled(proposed));
                settled.push(key);
            }
        }
        ToggleResolution {
            settled,
            reverted,
            notice: Notice::from_aggregate(aggregate),
        }
    }

    /// Reverts a batch that could not be sent at all.
    pub fn abandon(&self, batch: ToggleBatch) {
        let mut states = self.states();
        for key in batch.keys {
            if let Some(ToggleState::Pending { previous, .. }) = states.get(&key).copied() {
                states.insert(key, ToggleState::Idle(previous));
            }
        }
    }
}
