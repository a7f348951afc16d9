use std::{collections::BTreeSet, sync::Arc};

use futures::future::join_all;
use log::{info, warn};

use crate::{
    domain::{
        command::{Command, CommandTemplate},
        error::CommandError,
        outcome::AggregateResult,
    },
    port::{audit::AuditDrivenPort, channel::ChannelDrivenPort},
    service::action_orchestrator::ActionOrchestrator,
};

pub struct FanOutCoordinator<C: ChannelDrivenPort, A: AuditDrivenPort> {
    orchestrator: Arc<ActionOrchestrator<C, A>>,
}

impl<C: ChannelDrivenPort, A: AuditDrivenPort> FanOutCoordinator<C, A> {
    pub fn new(orchestrator: Arc<ActionOrchestrator<C, A>>) -> Self {
        FanOutCoordinator { orchestrator }
    }

    /// Runs the template on every device concurrently and joins once all of them settled.
    /// Only an invalid command fails the whole run, before anything is dispatched.
    pub async fn run_many(
        &self, device_ids: &BTreeSet<String>, template: &CommandTemplate, fetch_result: bool,
    ) -> Result<AggregateResult, CommandError> {
        let commands = device_ids
            .iter()
            .map(|device_id| template.instantiate(device_id.as_str()))
            .collect::<Result<Vec<Command>, CommandError>>()?;
        info!(
            "Sending {}:{} to {} device(s)",
            template.subsystem,
            template.action,
            commands.len()
        );

        let outcomes = join_all(
            commands
                .into_iter()
                .map(|command| self.orchestrator.perform(command, fetch_result)),
        )
        .await;

        let aggregate = AggregateResult::from_outcomes(outcomes);
        if !aggregate.all_acknowledged {
            warn!("No acknowledgement from {:?}", aggregate.failed_device_ids);
        }
        if !aggregate.partial_device_ids.is_empty() {
            warn!("Completion not confirmed by {:?}", aggregate.partial_device_ids);
        }
        Ok(aggregate)
    }
}
