use internal::{
    domain::{
        outcome::{AggregateResult, DeviceOutcome, OutcomeStatus},
        toggle::{Notice, ToggleKey, ToggleState},
    },
    port::control::ToggleReport,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Answer sent back on the reply subject of a request.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: Option<Uuid>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ReplyResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn success(id: Uuid, result: ReplyResult) -> Self {
        Reply {
            id: Some(id),
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<Uuid>, error: impl ToString) -> Self {
        Reply {
            id,
            ok: false,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum ReplyResult {
    Outcome(OutcomeReply),
    Aggregate(AggregateReply),
    Toggle(ToggleReply),
    State(StateReply),
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeReply {
    pub device_id: String,
    pub status: &'static str,
    pub acknowledged: bool,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&DeviceOutcome> for OutcomeReply {
    fn from(outcome: &DeviceOutcome) -> Self {
        let status = match outcome.status() {
            OutcomeStatus::Completed => "completed",
            OutcomeStatus::AcknowledgedIncomplete => "acknowledged",
            OutcomeStatus::NotAcknowledged => "not_acknowledged",
            OutcomeStatus::DispatchFailed => "dispatch_failed",
        };
        OutcomeReply {
            device_id: outcome.device_id().to_string(),
            status,
            acknowledged: outcome.is_acknowledged(),
            completed: outcome.is_completed(),
            result: outcome.result_payload().cloned(),
            error: outcome.error().map(ToString::to_string),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReply {
    pub all_acknowledged: bool,
    pub all_completed: bool,
    pub failed_device_ids: Vec<String>,
    pub partial_device_ids: Vec<String>,
    pub outcomes: Vec<OutcomeReply>,
}

impl From<&AggregateResult> for AggregateReply {
    fn from(aggregate: &AggregateResult) -> Self {
        AggregateReply {
            all_acknowledged: aggregate.all_acknowledged,
            all_completed: aggregate.all_completed,
            failed_device_ids: aggregate.failed_device_ids.iter().cloned().collect(),
            partial_device_ids: aggregate.partial_device_ids.iter().cloned().collect(),
            outcomes: aggregate.outcomes.iter().map(OutcomeReply::from).collect(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ToggleReply {
    #[serde(flatten)]
    pub aggregate: AggregateReply,
    pub settled: Vec<String>,
    pub reverted: Vec<String>,
    pub notice: NoticeReply,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct NoticeReply {
    pub level: &'static str,
    pub message: String,
}

impl From<&Notice> for NoticeReply {
    fn from(notice: &Notice) -> Self {
        let (level, message) = match notice {
            Notice::Success(message) => ("success", message),
            Notice::Warning(message) => ("warning", message),
            Notice::Error(message) => ("error", message),
        };
        NoticeReply {
            level,
            message: message.clone(),
        }
    }
}

impl From<&ToggleReport> for ToggleReply {
    fn from(report: &ToggleReport) -> Self {
        let keys = |keys: &[ToggleKey]| keys.iter().map(ToString::to_string).collect();
        ToggleReply {
            aggregate: AggregateReply::from(&report.aggregate),
            settled: keys(&report.resolution.settled),
            reverted: keys(&report.resolution.reverted),
            notice: NoticeReply::from(&report.resolution.notice),
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateReply {
    pub device_id: String,
    pub relay: u8,
    pub state: &'static str,
    pub value: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<bool>,
}

impl StateReply {
    pub fn new(device_id: String, relay: u8, state: ToggleState) -> Self {
        let (name, previous) = match state {
            ToggleState::Idle(_) => ("idle", None),
            ToggleState::Pending { previous, .. } => ("pending", Some(previous)),
            ToggleState::Settled(_) => ("settled", None),
        };
        StateReply {
            device_id,
            relay,
            state: name,
            value: state.visible_value(),
            previous,
        }
    }
}
