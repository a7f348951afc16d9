use std::sync::Arc;

use log::{error, info, warn};

use crate::{
    domain::{
        audit::AuditEntry,
        command::Command,
        error::OutcomeError,
        outcome::DeviceOutcome,
        settings::ControlSettings,
    },
    port::{audit::AuditDrivenPort, channel::ChannelDrivenPort},
    service::{ack_waiter::AckWaiter, command_dispatcher::CommandDispatcher},
};

/// Runs one command against one device: dispatch, wait for receipt, wait for completion,
/// optionally read the result snapshot. Timeouts end up in the outcome, never as errors.
pub struct ActionOrchestrator<C: ChannelDrivenPort, A: AuditDrivenPort> {
    channel: Arc<C>,
    audit: Arc<A>,
    dispatcher: CommandDispatcher<C>,
    waiter: AckWaiter<C>,
    settings: ControlSettings,
}

impl<C: ChannelDrivenPort, A: AuditDrivenPort> ActionOrchestrator<C, A> {
    pub fn new(channel: Arc<C>, audit: Arc<A>, settings: ControlSettings) -> Self {
        ActionOrchestrator {
            dispatcher: CommandDispatcher::new(channel.clone(), settings.layout.clone()),
            waiter: AckWaiter::new(channel.clone()),
            channel,
            audit,
            settings,
        }
    }

    pub async fn perform(&self, command: Command, fetch_result: bool) -> DeviceOutcome {
        let outcome = self.run(&command, fetch_result).await;
        self.audit.record(AuditEntry::for_outcome(&command, &outcome));
        outcome
    }

    async fn run(&self, command: &Command, fetch_result: bool) -> DeviceOutcome {
        let device_id = command.device_id();
        let layout = &self.settings.layout;

        if let Err(e) = self.dispatcher.dispatch(command).await {
            error!("Unable to dispatch {} to {}: {}", command.label(), device_id, e);
            return DeviceOutcome::dispatch_failed(device_id, OutcomeError::DispatchFailed(e));
        }

        match self
            .waiter
            .wait(device_id, &layout.ack_field, &layout.ack_value, self.settings.ack_timeout)
            .await
        {
            Ok(ack) if ack.matched => {}
            Ok(_) => {
                warn!("Device {} did not acknowledge command {}", device_id, command.id());
                return DeviceOutcome::not_acknowledged(
                    device_id,
                    OutcomeError::NotAcknowledged(self.settings.ack_timeout),
                );
            }
            Err(e) => {
                error!("Unable to watch acknowledgement of {}: {}", device_id, e);
                return DeviceOutcome::not_acknowledged(device_id, OutcomeError::WaitFailed(e));
            }
        }

        let mut outcome = match self
            .waiter
            .wait(
                device_id,
                &layout.completion_field,
                &layout.completion_value,
                self.settings.completion_timeout,
            )
            .await
        {
            Ok(completion) => {
                if !completion.matched {
                    warn!("Device {} acknowledged {} but did not complete it", device_id, command.id());
                }
                DeviceOutcome::acknowledged(device_id, completion.matched)
            }
            Err(e) => {
                warn!("Unable to watch completion of {}: {}", device_id, e);
                DeviceOutcome::acknowledged(device_id, false).with_error(OutcomeError::WaitFailed(e))
            }
        };

        if fetch_result {
            match self
                .channel
                .read_once(device_id, command.subsystem().result_field())
                .await
            {
                Ok(payload) => outcome = outcome.with_result(payload),
                Err(e) => {
                    warn!("Unable to fetch result of {} from {}: {}", command.label(), device_id, e);
                    outcome = outcome.with_error(OutcomeError::ResultFetchFailed(e));
                }
            }
        }
        info!("{} on {} ended as {:?}", command.label(), device_id, outcome.status());
        outcome
    }
}
