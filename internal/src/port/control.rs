use crate::domain::{
    command::{Action, CommandParameters, Issuer, Subsystem},
    error::ControlError,
    outcome::{AggregateResult, DeviceOutcome},
    request::Targets,
    toggle::{ToggleResolution, ToggleState},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ToggleReport {
    pub aggregate: AggregateResult,
    pub resolution: ToggleResolution,
}

pub trait ControlDriverPort {
    fn send_action(
        &self, issuer: Issuer, device_id: &str, subsystem: Subsystem, action: Action, parameters: CommandParameters,
    ) -> impl Future<Output = Result<DeviceOutcome, ControlError>> + Send;

    fn send_action_to_many(
        &self, issuer: Issuer, targets: Targets, subsystem: Subsystem, action: Action, parameters: CommandParameters,
    ) -> impl Future<Output = Result<AggregateResult, ControlError>> + Send;

    fn toggle_relay(
        &self, issuer: Issuer, targets: Targets, relay_index: u8, on: bool,
    ) -> impl Future<Output = Result<ToggleReport, ControlError>> + Send;

    fn toggle_state(&self, device_id: &str, relay_index: u8) -> Result<ToggleState, ControlError>;
}
