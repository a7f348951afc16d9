use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::error::CommandError;

pub const RELAY_PARAMETER: &str = "relay";
pub const RELAY_COUNT: u8 = 4;

pub type CommandParameters = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Subsystem {
    Relay,
    Motor,
    NpkSensor,
    Gps,
}

impl Subsystem {
    pub fn name(&self) -> &'static str {
        match self {
            Subsystem::Relay => "relay",
            Subsystem::Motor => "motor",
            Subsystem::NpkSensor => "npk-sensor",
            Subsystem::Gps => "gps",
        }
    }

    /// Field the device publishes its latest snapshot to for this subsystem.
    pub fn result_field(&self) -> &'static str {
        match self {
            Subsystem::Relay => "relays",
            Subsystem::Motor => "motor",
            Subsystem::NpkSensor => "npk",
            Subsystem::Gps => "location",
        }
    }

    pub fn supports(&self, action: Action) -> bool {
        matches!(
            (self, action),
            (Subsystem::Relay, Action::On | Action::Off | Action::Toggle)
                | (Subsystem::Motor, Action::Start | Action::Stop)
                | (Subsystem::NpkSensor, Action::Scan)
                | (Subsystem::Gps, Action::GetLocation)
        )
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Subsystem {
    type Err = CommandError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_lowercase().as_str() {
            "relay" => Ok(Subsystem::Relay),
            "motor" => Ok(Subsystem::Motor),
            "npk-sensor" | "npk" => Ok(Subsystem::NpkSensor),
            "gps" => Ok(Subsystem::Gps),
            _ => Err(CommandError::Unknown("subsystem", raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    On,
    Off,
    Toggle,
    Start,
    Stop,
    Scan,
    GetLocation,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::On => "on",
            Action::Off => "off",
            Action::Toggle => "toggle",
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Scan => "scan",
            Action::GetLocation => "get-location",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = CommandError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_lowercase().as_str() {
            "on" => Ok(Action::On),
            "off" => Ok(Action::Off),
            "toggle" => Ok(Action::Toggle),
            "start" => Ok(Action::Start),
            "stop" => Ok(Action::Stop),
            "scan" => Ok(Action::Scan),
            "get-location" | "location" => Ok(Action::GetLocation),
            _ => Err(CommandError::Unknown("action", raw.to_string())),
        }
    }
}

/// The user on whose behalf a command is issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issuer {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Issuer {
    pub fn new(user_id: impl Into<String>) -> Self {
        Issuer {
            user_id: user_id.into(),
            display_name: None,
        }
    }
}

/// One instruction to one device. A new command is built for every attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    id: Uuid,
    device_id: String,
    subsystem: Subsystem,
    action: Action,
    parameters: CommandParameters,
    issued_by: Issuer,
    #[serde(with = "time::serde::rfc3339")]
    issued_at: OffsetDateTime,
}

impl Command {
    pub fn new(
        device_id: impl Into<String>, subsystem: Subsystem, action: Action, parameters: CommandParameters,
        issued_by: Issuer,
    ) -> Result<Self, CommandError> {
        let device_id = device_id.into();
        check_device_id(&device_id)?;
        validate(subsystem, action, &parameters)?;
        Ok(Command {
            id: Uuid::new_v4(),
            device_id,
            subsystem,
            action,
            parameters,
            issued_by,
            issued_at: OffsetDateTime::now_utc(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn device_id(&self) -> &str {
        &self.device_id
    }
    pub fn subsystem(&self) -> Subsystem {
        self.subsystem
    }
    pub fn action(&self) -> Action {
        self.action
    }
    pub fn parameters(&self) -> &CommandParameters {
        &self.parameters
    }
    pub fn issued_by(&self) -> &Issuer {
        &self.issued_by
    }
    pub fn issued_at(&self) -> OffsetDateTime {
        self.issued_at
    }

    /// Label used in audit entries, e.g. `relay:on`.
    pub fn label(&self) -> String {
        format!("{}:{}", self.subsystem, self.action)
    }
}

/// Everything a command needs except its target device.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandTemplate {
    pub subsystem: Subsystem,
    pub action: Action,
    pub parameters: CommandParameters,
    pub issued_by: Issuer,
}

impl CommandTemplate {
    pub fn new(
        subsystem: Subsystem, action: Action, parameters: CommandParameters, issued_by: Issuer,
    ) -> Result<Self, CommandError> {
        validate(subsystem, action, &parameters)?;
        Ok(CommandTemplate {
            subsystem,
            action,
            parameters,
            issued_by,
        })
    }

    pub fn relay(relay_index: u8, on: bool, issued_by: Issuer) -> Result<Self, CommandError> {
        let parameters = CommandParameters::from([(RELAY_PARAMETER.to_string(), Value::from(relay_index))]);
        let action = if on { Action::On } else { Action::Off };
        Self::new(Subsystem::Relay, action, parameters, issued_by)
    }

    pub fn instantiate(&self, device_id: impl Into<String>) -> Result<Command, CommandError> {
        Command::new(
            device_id,
            self.subsystem,
            self.action,
            self.parameters.clone(),
            self.issued_by.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReceipt {
    pub command_id: Uuid,
    pub device_id: String,
    pub written_at: OffsetDateTime,
}

/// Device ids become key segments in the store, so separators and wildcards are refused.
pub fn check_device_id(device_id: &str) -> Result<(), CommandError> {
    if device_id.trim().is_empty() {
        return Err(CommandError::EmptyDeviceId);
    }
    if device_id.chars().any(|c| matches!(c, '.' | '*' | '>') || c.is_whitespace()) {
        return Err(CommandError::InvalidDeviceId(device_id.to_string()));
    }
    Ok(())
}

fn validate(subsystem: Subsystem, action: Action, parameters: &CommandParameters) -> Result<(), CommandError> {
    if !subsystem.supports(action) {
        return Err(CommandError::UnsupportedAction {
            subsystem: subsystem.to_string(),
            action: action.to_string(),
        });
    }
    if subsystem == Subsystem::Relay {
        let relay = parameters
            .get(RELAY_PARAMETER)
            .ok_or(CommandError::InvalidParameter(
                RELAY_PARAMETER.into(),
                "missing".into(),
            ))?;
        match relay.as_u64() {
            Some(index) if (1..=u64::from(RELAY_COUNT)).contains(&index) => {}
            _ => {
                return Err(CommandError::InvalidParameter(
                    RELAY_PARAMETER.into(),
                    format!("{relay} is not between 1 and {RELAY_COUNT}"),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn should_reject_action_outside_of_subsystem() {
        let err = Command::new(
            "pump-1",
            Subsystem::Gps,
            Action::On,
            CommandParameters::new(),
            Issuer::new("farmer"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CommandError::UnsupportedAction {
                subsystem: "gps".into(),
                action: "on".into()
            }
        );
    }

    #[test]
    fn should_require_relay_index_in_range() {
        let issuer = Issuer::new("farmer");
        assert!(CommandTemplate::relay(0, true, issuer.clone()).is_err());
        assert!(CommandTemplate::relay(5, true, issuer.clone()).is_err());
        assert!(CommandTemplate::relay(4, false, issuer.clone()).is_ok());
        let err = CommandTemplate::new(Subsystem::Relay, Action::On, CommandParameters::new(), issuer).unwrap_err();
        assert_eq!(err, CommandError::InvalidParameter("relay".into(), "missing".into()));
    }

    #[test]
    fn should_reject_empty_device_id() {
        let template = CommandTemplate::relay(1, true, Issuer::new("farmer")).unwrap();
        assert_eq!(template.instantiate("  ").unwrap_err(), CommandError::EmptyDeviceId);
    }

    #[test]
    fn should_reject_device_id_that_would_escape_its_keys() {
        let template = CommandTemplate::relay(1, true, Issuer::new("farmer")).unwrap();
        for device_id in ["dev-1.acknowledged", "dev-*", "dev->", "pump house"] {
            assert_eq!(
                template.instantiate(device_id).unwrap_err(),
                CommandError::InvalidDeviceId(device_id.to_string())
            );
        }
        assert!(template.instantiate("paddy-north_01").is_ok());
    }

    #[test]
    fn should_build_distinct_commands_from_template() {
        let template = CommandTemplate::relay(2, true, Issuer::new("farmer")).unwrap();
        let first = template.instantiate("dev-1").unwrap();
        let second = template.instantiate("dev-2").unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(first.parameters(), second.parameters());
        assert_eq!(second.device_id(), "dev-2");
        assert_eq!(first.label(), "relay:on");
    }

    #[test]
    fn should_serialize_command_record() {
        let command = CommandTemplate::new(
            Subsystem::NpkSensor,
            Action::Scan,
            CommandParameters::new(),
            Issuer::new("farmer"),
        )
        .unwrap()
        .instantiate("npk-7")
        .unwrap();
        let record = serde_json::to_value(&command).unwrap();
        assert_eq!(record["subsystem"], json!("npk-sensor"));
        assert_eq!(record["action"], json!("scan"));
        assert_eq!(record["deviceId"], json!("npk-7"));
        assert_eq!(record["issuedBy"]["userId"], json!("farmer"));
        assert!(record["issuedAt"].is_string());
    }

    #[test]
    fn should_parse_names() {
        assert_eq!("NPK".parse::<Subsystem>().unwrap(), Subsystem::NpkSensor);
        assert_eq!("get-location".parse::<Action>().unwrap(), Action::GetLocation);
        assert_eq!(
            "fan".parse::<Subsystem>().unwrap_err(),
            CommandError::Unknown("subsystem", "fan".into())
        );
    }
}
