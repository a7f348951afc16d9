use std::collections::BTreeSet;

use anyhow::{Context, Result, anyhow};
use internal::domain::{
    command::{Action, CommandParameters, Issuer, Subsystem},
    request::{ControlRequest, RequestKind, Targets},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

const ALL_DEVICES: &str = "all";

#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339", default = "OffsetDateTime::now_utc")]
    pub sent_at: OffsetDateTime,
    #[serde(rename = "type")]
    pub event_type: String,
    pub issuer: Issuer,
    pub data: EventData,
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct EventData {
    pub devices: Option<DeviceSelection>,
    pub subsystem: Option<String>,
    pub action: Option<String>,
    #[serde(default)]
    pub params: CommandParameters,
    pub relay: Option<u8>,
    pub on: Option<bool>,
}

/// Either `"all"`, a single device id or a list of ids.
#[derive(Deserialize, Serialize, Debug)]
#[serde(untagged)]
pub enum DeviceSelection {
    Single(String),
    List(Vec<String>),
}

impl TryFrom<&[u8]> for Event {
    type Error = anyhow::Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let utf8_str = std::str::from_utf8(value).map_err(|e| anyhow!("UTF-8 conversion error: {}", e))?;

        serde_json::from_str(utf8_str).map_err(|e| anyhow!("JSON deserialization error: {}, {}", e, utf8_str))
    }
}

impl TryFrom<Event> for ControlRequest {
    type Error = anyhow::Error;

    fn try_from(event: Event) -> Result<Self, Self::Error> {
        let kind = Event::kind(&event.event_type, event.data)?;
        Ok(ControlRequest {
            id: event.id,
            sent_at: event.sent_at,
            issuer: event.issuer,
            kind,
        })
    }
}

impl Event {
    fn kind(raw_type: &str, data: EventData) -> Result<RequestKind> {
        match raw_type.to_lowercase().as_str() {
            "action" => {
                let Some(DeviceSelection::Single(device_id)) = data.devices else {
                    return Err(anyhow!("An action targets exactly one device"));
                };
                let (subsystem, action) = Self::operation(&data.subsystem, &data.action)?;
                Ok(RequestKind::Action {
                    device_id,
                    subsystem,
                    action,
                    parameters: data.params,
                })
            }
            "batch" => {
                let (subsystem, action) = Self::operation(&data.subsystem, &data.action)?;
                Ok(RequestKind::Batch {
                    targets: Self::targets(data.devices)?,
                    subsystem,
                    action,
                    parameters: data.params,
                })
            }
            "state" => {
                let Some(DeviceSelection::Single(device_id)) = data.devices else {
                    return Err(anyhow!("A state request targets exactly one device"));
                };
                Ok(RequestKind::State {
                    device_id,
                    relay_index: data.relay.context("Missing relay index")?,
                })
            }
            "toggle" => Ok(RequestKind::Toggle {
                targets: Self::targets(data.devices)?,
                relay_index: data.relay.context("Missing relay index")?,
                on: data.on.context("Missing relay value")?,
            }),
            _ => Err(anyhow!("Unknown request type: {}", raw_type)),
        }
    }

    fn operation(subsystem: &Option<String>, action: &Option<String>) -> Result<(Subsystem, Action)> {
        let subsystem = subsystem.as_deref().context("Missing subsystem")?.parse::<Subsystem>()?;
        let action = action.as_deref().context("Missing action")?.parse::<Action>()?;
        Ok((subsystem, action))
    }

    fn targets(devices: Option<DeviceSelection>) -> Result<Targets> {
        match devices.context("Missing devices")? {
            DeviceSelection::Single(raw) if raw.eq_ignore_ascii_case(ALL_DEVICES) => Ok(Targets::All),
            DeviceSelection::Single(device_id) => Ok(Targets::One(device_id)),
            DeviceSelection::List(device_ids) => Ok(Targets::Many(device_ids.into_iter().collect::<BTreeSet<_>>())),
        }
    }
}
