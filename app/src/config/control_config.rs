use std::time::Duration;

use internal::domain::settings::{ChannelLayout, ControlSettings, RevertPolicy};
use serde::Deserialize;

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ControlConfig {
    pub ack_timeout_secs: u64,
    pub completion_timeout_secs: u64,
    pub fetch_result: bool,
    pub revert_policy: RevertPolicy,
    pub layout: ChannelLayout,
    /// Devices targeted by "all" requests.
    pub fleet: Vec<String>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        let settings = ControlSettings::default();
        ControlConfig {
            ack_timeout_secs: settings.ack_timeout.as_secs(),
            completion_timeout_secs: settings.completion_timeout.as_secs(),
            fetch_result: settings.fetch_result,
            revert_policy: settings.revert_policy,
            layout: settings.layout,
            fleet: Vec::new(),
        }
    }
}

impl ControlConfig {
    pub fn settings(&self) -> ControlSettings {
        ControlSettings {
            ack_timeout: Duration::from_secs(self.ack_timeout_secs),
            completion_timeout: Duration::from_secs(self.completion_timeout_secs),
            fetch_result: self.fetch_result,
            revert_policy: self.revert_policy,
            layout: self.layout.clone(),
        }
    }
}
