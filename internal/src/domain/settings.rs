use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Names of the per device fields used as the command channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChannelLayout {
    pub command_field: String,
    pub ack_field: String,
    pub ack_value: Value,
    pub completion_field: String,
    pub completion_value: Value,
}

impl Default for ChannelLayout {
    fn default() -> Self {
        ChannelLayout {
            command_field: "command".into(),
            ack_field: "acknowledged".into(),
            ack_value: Value::Bool(true),
            completion_field: "completed".into(),
            completion_value: Value::Bool(true),
        }
    }
}

impl ChannelLayout {
    /// Values written before a new command so a stale flag can't match.
    pub fn reset_value(&self, target: &Value) -> Value {
        match target {
            Value::Bool(flag) => Value::Bool(!flag),
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertPolicy {
    /// Any unacknowledged device reverts every key of the batch.
    #[default]
    WholeBatch,
    /// Only keys of unacknowledged devices are reverted.
    FailedOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlSettings {
    pub ack_timeout: Duration,
    pub completion_timeout: Duration,
    pub fetch_result: bool,
    pub revert_policy: RevertPolicy,
    pub layout: ChannelLayout,
}

impl Default for ControlSettings {
    fn default() -> Self {
        ControlSettings {
            ack_timeout: Duration::from_secs(10),
            completion_timeout: Duration::from_secs(30),
            fetch_result: true,
            revert_policy: RevertPolicy::default(),
            layout: ChannelLayout::default(),
        }
    }
}
