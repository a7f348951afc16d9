use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::domain::{command::Command, outcome::DeviceOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub device_id: Option<String>,
    pub action: String,
    pub details: Value,
    pub timestamp: OffsetDateTime,
}

impl AuditEntry {
    pub fn for_outcome(command: &Command, outcome: &DeviceOutcome) -> Self {
        AuditEntry {
            device_id: Some(command.device_id().to_string()),
            action: command.label(),
            details: json!({
                "commandId": command.id().to_string(),
                "issuedBy": command.issued_by().user_id,
                "parameters": command.parameters(),
                "acknowledged": outcome.is_acknowledged(),
                "completed": outcome.is_completed(),
                "error": outcome.error().map(|e| e.to_string()),
            }),
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}
