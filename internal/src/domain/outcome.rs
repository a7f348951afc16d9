use std::collections::BTreeSet;

use serde_json::Value;
use tokio::time::Instant;

use crate::domain::error::OutcomeError;

/// One outstanding wait on a device field.
#[derive(Debug, Clone, PartialEq)]
pub struct AckWaitToken {
    pub device_id: String,
    pub watched_field: String,
    pub target_value: Value,
    pub deadline: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AckOutcome {
    pub matched: bool,
    pub value: Option<Value>,
}

impl AckOutcome {
    pub fn matched(value: Value) -> Self {
        AckOutcome {
            matched: true,
            value: Some(value),
        }
    }
    pub fn timed_out() -> Self {
        AckOutcome {
            matched: false,
            value: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Completed,
    AcknowledgedIncomplete,
    NotAcknowledged,
    DispatchFailed,
}

/// Result of one orchestrated action on one device.
///
/// `completed` implies `acknowledged`: the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceOutcome {
    device_id: String,
    acknowledged: bool,
    completed: bool,
    result_payload: Option<Value>,
    error: Option<OutcomeError>,
}

impl DeviceOutcome {
    pub fn dispatch_failed(device_id: impl Into<String>, error: OutcomeError) -> Self {
        DeviceOutcome {
            device_id: device_id.into(),
            acknowledged: false,
            completed: false,
            result_payload: None,
            error: Some(error),
        }
    }

    pub fn not_acknowledged(device_id: impl Into<String>, error: OutcomeError) -> Self {
        DeviceOutcome {
            device_id: device_id.into(),
            acknowledged: false,
            completed: false,
            result_payload: None,
            error: Some(error),
        }
    }

    pub fn acknowledged(device_id: impl Into<String>, completed: bool) -> Self {
        DeviceOutcome {
            device_id: device_id.into(),
            acknowledged: true,
            completed,
            result_payload: None,
            error: None,
        }
    }

    pub fn with_result(mut self, payload: Option<Value>) -> Self {
        self.result_payload = payload;
        self
    }

    /// Attaches a best-effort failure; flags stay as they are.
    pub fn with_error(mut self, error: OutcomeError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }
    pub fn is_completed(&self) -> bool {
        self.completed
    }
    pub fn result_payload(&self) -> Option<&Value> {
        self.result_payload.as_ref()
    }
    pub fn error(&self) -> Option<&OutcomeError> {
        self.error.as_ref()
    }

    pub fn status(&self) -> OutcomeStatus {
        match (self.acknowledged, self.completed, &self.error) {
            (true, true, _) => OutcomeStatus::Completed,
            (true, false, _) => OutcomeStatus::AcknowledgedIncomplete,
            (false, _, Some(OutcomeError::DispatchFailed(_))) => OutcomeStatus::DispatchFailed,
            (false, _, _) => OutcomeStatus::NotAcknowledged,
        }
    }
}

/// Reduction of a set of [`DeviceOutcome`]s, independent of their order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub all_acknowledged: bool,
    pub all_completed: bool,
    pub failed_device_ids: BTreeSet<String>,
    pub partial_device_ids: BTreeSet<String>,
    pub outcomes: Vec<DeviceOutcome>,
}

impl AggregateResult {
    pub fn from_outcomes(mut outcomes: Vec<DeviceOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        let failed_device_ids = outcomes
            .iter()
            .filter(|o| !o.acknowledged)
            .map(|o| o.device_id.clone())
            .collect();
        let partial_device_ids = outcomes
            .iter()
            .filter(|o| o.acknowledged && !o.completed)
            .map(|o| o.device_id.clone())
            .collect();
        AggregateResult {
            all_acknowledged: outcomes.iter().all(|o| o.acknowledged),
            all_completed: outcomes.iter().all(|o| o.completed),
            failed_device_ids,
            partial_device_ids,
            outcomes,
        }
    }

    pub fn outcome_for(&self, device_id: &str) -> Option<&DeviceOutcome> {
        self.outcomes.iter().find(|o| o.device_id == device_id)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    fn sample() -> Vec<DeviceOutcome> {
        vec![
            DeviceOutcome::acknowledged("dev-1", true),
            DeviceOutcome::not_acknowledged("dev-2", OutcomeError::NotAcknowledged(Duration::from_secs(10))),
            DeviceOutcome::acknowledged("dev-3", false),
            DeviceOutcome::acknowledged("dev-4", true),
        ]
    }

    #[test]
    fn should_reduce_outcomes() {
        let aggregate = AggregateResult::from_outcomes(sample());
        assert!(!aggregate.all_acknowledged);
        assert!(!aggregate.all_completed);
        assert_eq!(aggregate.failed_device_ids, BTreeSet::from(["dev-2".to_string()]));
        assert_eq!(aggregate.partial_device_ids, BTreeSet::from(["dev-3".to_string()]));
    }

    #[test]
    fn should_reduce_identically_for_any_order() {
        let expected = AggregateResult::from_outcomes(sample());
        let mut outcomes = sample();
        for shift in 0..outcomes.len() {
            outcomes.rotate_left(1);
            let mut reversed = outcomes.clone();
            reversed.reverse();
            for candidate in [outcomes.clone(), reversed] {
                let aggregate = AggregateResult::from_outcomes(candidate);
                assert_eq!(aggregate, expected, "rotation {shift}");
            }
        }
    }

    #[test]
    fn should_treat_empty_set_as_success() {
        let aggregate = AggregateResult::from_outcomes(vec![]);
        assert!(aggregate.all_acknowledged);
        assert!(aggregate.all_completed);
        assert!(aggregate.failed_device_ids.is_empty());
    }

    #[test]
    fn should_keep_flags_when_result_fetch_fails() {
        let outcome = DeviceOutcome::acknowledged("dev-1", true).with_error(OutcomeError::ResultFetchFailed(
            crate::domain::error::ChannelError::Read {
                device_id: "dev-1".into(),
                path: "relays".into(),
                reason: "offline".into(),
            },
        ));
        assert_eq!(outcome.status(), OutcomeStatus::Completed);
        assert!(outcome.error().is_some());
    }
}
