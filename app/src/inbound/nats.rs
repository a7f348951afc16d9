use anyhow::{Result, anyhow};
use async_nats::{Client, Message, Subscriber};
use internal::{
    domain::request::{ControlRequest, RequestKind},
    port::control::ControlDriverPort,
};
use log::{debug, error, info};

use super::model::{
    event::Event,
    reply::{AggregateReply, OutcomeReply, Reply, ReplyResult, StateReply, ToggleReply},
};
use crate::config::nats_config::InboundConfig;

/// Listens for dashboard requests and answers them on their reply subject.
pub struct NatsRequestListener {
    inbound_config: InboundConfig,
}

impl NatsRequestListener {
    pub fn new(inbound_config: InboundConfig) -> Self {
        NatsRequestListener { inbound_config }
    }

    pub async fn subscribe(&self, client: &Client) -> Result<Subscriber> {
        let subject = self.inbound_config.request_subject.clone();
        let subscriber = match &self.inbound_config.queue_group {
            Some(group) => client.queue_subscribe(subject.clone(), group.clone()).await,
            None => client.subscribe(subject.clone()).await,
        }
        .map_err(|e| anyhow!("Unable to subscribe to {}: {}", subject, e))?;
        info!("Listening for requests on {subject}");
        Ok(subscriber)
    }
}

/// Handles one inbound message end to end, a reply is always published when the sender asked for one.
pub async fn handle<S: ControlDriverPort>(client: &Client, service: &S, message: Message) -> Result<()> {
    let reply = match Event::try_from(&message.payload[..]).and_then(ControlRequest::try_from) {
        Ok(request) => execute(service, request).await,
        Err(e) => {
            error!("{e}");
            Reply::failure(None, e)
        }
    };
    let Some(reply_subject) = message.reply else {
        debug!("Request on {} expects no reply", message.subject);
        return Ok(());
    };
    client
        .publish(reply_subject, serde_json::to_vec(&reply)?.into())
        .await
        .map_err(|e| anyhow!("Unable to publish reply: {}", e))
}

pub async fn execute<S: ControlDriverPort>(service: &S, request: ControlRequest) -> Reply {
    let id = request.id;
    debug!("Executing request {} from {}", id, request.issuer.user_id);
    let result = match request.kind {
        RequestKind::Action {
            device_id,
            subsystem,
            action,
            parameters,
        } => service
            .send_action(request.issuer, &device_id, subsystem, action, parameters)
            .await
            .map(|outcome| ReplyResult::Outcome(OutcomeReply::from(&outcome))),
        RequestKind::Batch {
            targets,
            subsystem,
            action,
            parameters,
        } => service
            .send_action_to_many(request.issuer, targets, subsystem, action, parameters)
            .await
            .map(|aggregate| ReplyResult::Aggregate(AggregateReply::from(&aggregate))),
        RequestKind::Toggle {
            targets,
            relay_index,
            on,
        } => service
            .toggle_relay(request.issuer, targets, relay_index, on)
            .await
            .map(|report| ReplyResult::Toggle(ToggleReply::from(&report))),
        RequestKind::State {
            device_id,
            relay_index,
        } => service
            .toggle_state(&device_id, relay_index)
            .map(|state| ReplyResult::State(StateReply::new(device_id, relay_index, state))),
    };
    match result {
        Ok(result) => Reply::success(id, result),
        Err(e) => {
            error!("Request {id} rejected: {e}");
            Reply::failure(Some(id), e)
        }
    }
}
