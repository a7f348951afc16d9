use std::sync::Arc;

use log::info;
use time::OffsetDateTime;

use crate::{
    domain::{
        command::{Command, DispatchReceipt},
        error::ChannelError,
        settings::ChannelLayout,
    },
    port::channel::ChannelDrivenPort,
};

pub struct CommandDispatcher<C: ChannelDrivenPort> {
    channel: Arc<C>,
    layout: ChannelLayout,
}

impl<C: ChannelDrivenPort> CommandDispatcher<C> {
    pub fn new(channel: Arc<C>, layout: ChannelLayout) -> Self {
        CommandDispatcher { channel, layout }
    }

    /// Clears the device's acknowledgement and completion fields, then writes the command to its
    /// pending command slot. Returns once the store confirmed the writes.
    pub async fn dispatch(&self, command: &Command) -> Result<DispatchReceipt, ChannelError> {
        let device_id = command.device_id();
        let record = serde_json::to_value(command)
            .map_err(|e| ChannelError::Encoding(self.layout.command_field.clone(), e.to_string()))?;
        self.channel
            .write(
                device_id,
                &self.layout.ack_field,
                self.layout.reset_value(&self.layout.ack_value),
            )
            .await?;
        self.channel
            .write(
                device_id,
                &self.layout.completion_field,
                self.layout.reset_value(&self.layout.completion_value),
            )
            .await?;
        self.channel.write(device_id, &self.layout.command_field, record).await?;
        info!("Command {} ({}) written for device {}", command.id(), command.label(), device_id);
        Ok(DispatchReceipt {
            command_id: command.id(),
            device_id: device_id.to_string(),
            written_at: OffsetDateTime::now_utc(),
        })
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use serde_json::json;

    use crate::{
        domain::{
            command::{CommandTemplate, Issuer},
            error::ChannelError,
            settings::ChannelLayout,
        },
        testing::FakeChannel,
    };

    use super::CommandDispatcher;

    #[tokio::test]
    async fn should_write_command_and_reset_flags() {
        let channel = FakeChannel::new();
        channel.publish("dev-1", "acknowledged", json!(true));
        channel.publish("dev-1", "completed", json!(true));
        let dispatcher = CommandDispatcher::new(Arc::new(channel.clone()), ChannelLayout::default());
        let command = CommandTemplate::relay(3, true, Issuer::new("farmer"))
            .unwrap()
            .instantiate("dev-1")
            .unwrap();

        let receipt = dispatcher.dispatch(&command).await.unwrap();

        assert_eq!(receipt.command_id, command.id());
        assert_eq!(receipt.device_id, "dev-1");
        assert_eq!(channel.value("dev-1", "acknowledged"), Some(json!(false)));
        assert_eq!(channel.value("dev-1", "completed"), Some(json!(false)));
        let written = channel.value("dev-1", "command").unwrap();
        assert_eq!(written["id"], json!(command.id().to_string()));
        assert_eq!(written["parameters"]["relay"], json!(3));
        assert_eq!(channel.commands_written(), 1);
    }

    #[tokio::test]
    async fn should_fail_when_store_rejects_write() {
        let channel = FakeChannel::new().failing_writes_for("dev-1");
        let dispatcher = CommandDispatcher::new(Arc::new(channel.clone()), ChannelLayout::default());
        let command = CommandTemplate::relay(1, false, Issuer::new("farmer"))
            .unwrap()
            .instantiate("dev-1")
            .unwrap();

        let err = dispatcher.dispatch(&command).await.unwrap_err();

        assert!(matches!(err, ChannelError::Write { device_id, .. } if device_id == "dev-1"));
        assert_eq!(channel.commands_written(), 0);
    }
}
