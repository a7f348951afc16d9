use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("Unable to write {path} for device {device_id}: {reason}")]
    Write {
        device_id: String,
        path: String,
        reason: String,
    },
    #[error("Unable to subscribe to {path} for device {device_id}: {reason}")]
    Subscribe {
        device_id: String,
        path: String,
        reason: String,
    },
    #[error("Unable to read {path} for device {device_id}: {reason}")]
    Read {
        device_id: String,
        path: String,
        reason: String,
    },
    #[error("Unable to encode value for {0}: {1}")]
    Encoding(String, String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Device id can't be empty")]
    EmptyDeviceId,
    #[error("Device id {0} contains a reserved character")]
    InvalidDeviceId(String),
    #[error("Action {action} is not supported by subsystem {subsystem}")]
    UnsupportedAction { subsystem: String, action: String },
    #[error("Invalid parameter {0}: {1}")]
    InvalidParameter(String, String),
    #[error("Unknown {0}: {1}")]
    Unknown(&'static str, String),
}

/// Per device failure attached to a [`crate::domain::outcome::DeviceOutcome`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OutcomeError {
    #[error("Dispatch failed: {0}")]
    DispatchFailed(ChannelError),
    #[error("Device did not acknowledge the command within {0:?}")]
    NotAcknowledged(std::time::Duration),
    #[error("Unable to watch device fields: {0}")]
    WaitFailed(ChannelError),
    #[error("Unable to fetch result: {0}")]
    ResultFetchFailed(ChannelError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToggleError {
    #[error("Relay {relay_index} of device {device_id} already has a pending toggle")]
    AlreadyPending { device_id: String, relay_index: u8 },
    #[error("Relay index must be between 1 and 4, got {0}")]
    InvalidRelayIndex(u8),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("No target device")]
    NoTarget,
    #[error(transparent)]
    InvalidCommand(#[from] CommandError),
    #[error(transparent)]
    Rejected(#[from] ToggleError),
}
