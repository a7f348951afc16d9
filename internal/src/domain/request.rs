use std::collections::BTreeSet;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::command::{Action, CommandParameters, Issuer, Subsystem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    One(String),
    Many(BTreeSet<String>),
    All,
}

/// A user initiated request coming from a dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlRequest {
    pub id: Uuid,
    pub sent_at: OffsetDateTime,
    pub issuer: Issuer,
    pub kind: RequestKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    Action {
        device_id: String,
        subsystem: Subsystem,
        action: Action,
        parameters: CommandParameters,
    },
    Batch {
        targets: Targets,
        subsystem: Subsystem,
        action: Action,
        parameters: CommandParameters,
    },
    Toggle {
        targets: Targets,
        relay_index: u8,
        on: bool,
    },
    /// Reads the optimistic view of one relay.
    State {
        device_id: String,
        relay_index: u8,
    },
}
