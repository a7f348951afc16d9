use std::{collections::BTreeSet, sync::Arc};

use futures::future::join_all;
use log::{debug, info, warn};

use crate::{
    domain::{
        command::{Action, Command, CommandParameters, CommandTemplate, Issuer, Subsystem, check_device_id},
        error::ControlError,
        outcome::{AggregateResult, DeviceOutcome},
        request::Targets,
        settings::ControlSettings,
        toggle::{ToggleKey, ToggleState, relay_value},
    },
    port::{
        audit::AuditDrivenPort,
        channel::ChannelDrivenPort,
        control::{ControlDriverPort, ToggleReport},
    },
    service::{
        action_orchestrator::ActionOrchestrator, fan_out_coordinator::FanOutCoordinator,
        toggle_controller::ToggleController,
    },
};

pub struct ControlService<C: ChannelDrivenPort, A: AuditDrivenPort> {
    channel: Arc<C>,
    orchestrator: Arc<ActionOrchestrator<C, A>>,
    coordinator: FanOutCoordinator<C, A>,
    toggles: ToggleController,
    fleet: BTreeSet<String>,
    fetch_result: bool,
}

impl<C: ChannelDrivenPort, A: AuditDrivenPort> ControlDriverPort for ControlService<C, A> {
    async fn send_action(
        &self, issuer: Issuer, device_id: &str, subsystem: Subsystem, action: Action, parameters: CommandParameters,
    ) -> Result<DeviceOutcome, ControlError> {
        let command = Command::new(device_id, subsystem, action, parameters, issuer)?;
        Ok(self.orchestrator.perform(command, self.fetch_result).await)
    }

    async fn send_action_to_many(
        &self, issuer: Issuer, targets: Targets, subsystem: Subsystem, action: Action, parameters: CommandParameters,
    ) -> Result<AggregateResult, ControlError> {
        let device_ids = self.resolve(targets)?;
        let template = CommandTemplate::new(subsystem, action, parameters, issuer)?;
        Ok(self
            .coordinator
            .run_many(&device_ids, &template, self.fetch_result)
            .await?)
    }

    async fn toggle_relay(
        &self, issuer: Issuer, targets: Targets, relay_index: u8, on: bool,
    ) -> Result<ToggleReport, ControlError> {
        let device_ids = self.resolve(targets)?;
        device_ids.iter().try_for_each(|device_id| check_device_id(device_id))?;
        let template = CommandTemplate::relay(relay_index, on, issuer)?;
        let keys = device_ids
            .iter()
            .map(|device_id| ToggleKey::new(device_id.as_str(), relay_index))
            .collect::<Result<Vec<_>, _>>()?;
        self.learn_relay_values(&keys).await;
        let batch = self.toggles.begin(keys, on).inspect_err(|e| warn!("{e}"))?;

        match self.coordinator.run_many(&device_ids, &template, self.fetch_result).await {
            Ok(aggregate) => {
                let resolution = self.toggles.resolve(batch, &aggregate);
                info!(
                    "Relay {} toggle: {} settled, {} reverted",
                    relay_index,
                    resolution.settled.len(),
                    resolution.reverted.len()
                );
                Ok(ToggleReport { aggregate, resolution })
            }
            Err(e) => {
                self.toggles.abandon(batch);
                Err(e.into())
            }
        }
    }

    fn toggle_state(&self, device_id: &str, relay_index: u8) -> Result<ToggleState, ControlError> {
        Ok(self.toggles.state(&ToggleKey::new(device_id, relay_index)?))
    }
}

impl<C: ChannelDrivenPort, A: AuditDrivenPort> ControlService<C, A> {
    pub fn new(
        channel: Arc<C>, audit: Arc<A>, settings: ControlSettings, fleet: impl IntoIterator<Item = String>,
    ) -> Self {
        let orchestrator = Arc::new(ActionOrchestrator::new(channel.clone(), audit, settings.clone()));
        ControlService {
            channel,
            coordinator: FanOutCoordinator::new(orchestrator.clone()),
            orchestrator,
            toggles: ToggleController::new(settings.revert_policy),
            fleet: fleet.into_iter().collect(),
            fetch_result: settings.fetch_result,
        }
    }

    /// Records a relay value reported by a device, e.g. after a status read.
    pub fn seed_relay(&self, device_id: &str, relay_index: u8, on: bool) -> Result<(), ControlError> {
        self.toggles.seed(ToggleKey::new(device_id, relay_index)?, on);
        Ok(())
    }

    /// Seeds keys never seen before from the device relay snapshot.
    async fn learn_relay_values(&self, keys: &[ToggleKey]) {
        let snapshots = join_all(keys.iter().filter(|key| !self.toggles.knows(key)).map(|key| async move {
            let snapshot = self
                .channel
                .read_once(&key.device_id, Subsystem::Relay.result_field())
                .await;
            (key, snapshot)
        }))
        .await;
        for (key, snapshot) in snapshots {
            match snapshot.map(|snapshot| snapshot.and_then(|snapshot| relay_value(&snapshot, key.relay_index))) {
                Ok(Some(on)) => self.toggles.seed_unknown(key.clone(), on),
                Ok(None) => debug!("No known value for {key}"),
                Err(e) => warn!("Unable to read relay snapshot of {}: {}", key.device_id, e),
            }
        }
    }

    fn resolve(&self, targets: Targets) -> Result<BTreeSet<String>, ControlError> {
        let device_ids = match targets {
            Targets::One(device_id) => BTreeSet::from([device_id]),
            Targets::Many(device_ids) => device_ids,
            Targets::All => self.fleet.clone(),
        };
        if device_ids.is_empty() {
            return Err(ControlError::NoTarget);
        }
        Ok(device_ids)
    }
}
