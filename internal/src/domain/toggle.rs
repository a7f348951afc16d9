use std::fmt;

use serde_json::Value;
use time::OffsetDateTime;

use crate::domain::{command::RELAY_COUNT, error::ToggleError, outcome::AggregateResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToggleKey {
    pub device_id: String,
    pub relay_index: u8,
}

impl ToggleKey {
    pub fn new(device_id: impl Into<String>, relay_index: u8) -> Result<Self, ToggleError> {
        if !(1..=RELAY_COUNT).contains(&relay_index) {
            return Err(ToggleError::InvalidRelayIndex(relay_index));
        }
        Ok(ToggleKey {
            device_id: device_id.into(),
            relay_index,
        })
    }
}

impl fmt::Display for ToggleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/relay{}", self.device_id, self.relay_index)
    }
}

/// View state of one relay as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Idle(bool),
    Pending {
        proposed: bool,
        previous: bool,
        started_at: OffsetDateTime,
    },
    Settled(bool),
}

impl ToggleState {
    /// Value currently rendered, the proposed one while pending.
    pub fn visible_value(&self) -> bool {
        match self {
            ToggleState::Idle(value) | ToggleState::Settled(value) => *value,
            ToggleState::Pending { proposed, .. } => *proposed,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ToggleState::Pending { .. })
    }
}

/// Reads one relay out of a device `relays` snapshot, either keyed by index (`{"2": true}`)
/// or positional (`[false, true, false, false]`). Numbers count as on when non zero.
pub fn relay_value(snapshot: &Value, relay_index: u8) -> Option<bool> {
    let raw = match snapshot {
        Value::Object(relays) => relays
            .get(&relay_index.to_string())
            .or_else(|| relays.get(&format!("relay{relay_index}"))),
        Value::Array(relays) => relays.get(usize::from(relay_index).checked_sub(1)?),
        _ => None,
    }?;
    match raw {
        Value::Bool(on) => Some(*on),
        Value::Number(n) => n.as_u64().map(|n| n != 0),
        _ => None,
    }
}

impl Default for ToggleState {
    fn default() -> Self {
        ToggleState::Idle(false)
    }
}

/// Keys moved to pending together by one user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleBatch {
    pub keys: Vec<ToggleKey>,
    pub proposed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Warning(String),
    Error(String),
}

impl Notice {
    pub fn from_aggregate(aggregate: &AggregateResult) -> Self {
        if !aggregate.all_acknowledged {
            let failed: Vec<&str> = aggregate.failed_device_ids.iter().map(String::as_str).collect();
            Notice::Error(format!("No acknowledgement from {}", failed.join(", ")))
        } else if !aggregate.all_completed {
            Notice::Warning("Sent, but device hasn't confirmed completion".into())
        } else {
            Notice::Success("Command completed".into())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleResolution {
    pub settled: Vec<ToggleKey>,
    pub reverted: Vec<ToggleKey>,
    pub notice: Notice,
}
