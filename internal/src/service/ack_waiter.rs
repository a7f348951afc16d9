use std::{sync::Arc, time::Duration};

use log::{debug, warn};
use serde_json::Value;
use tokio::{sync::mpsc::UnboundedReceiver, time::Instant};

use crate::{
    domain::{
        error::ChannelError,
        outcome::{AckOutcome, AckWaitToken},
    },
    port::channel::{ChannelDrivenPort, FieldSubscription},
};

/// Releases the subscription when dropped, whichever way the wait ends.
struct Listening<'a, C: ChannelDrivenPort> {
    channel: &'a C,
    subscription: FieldSubscription,
}

impl<C: ChannelDrivenPort> Drop for Listening<'_, C> {
    fn drop(&mut self) {
        self.channel.unsubscribe(self.subscription.id);
    }
}

pub struct AckWaiter<C: ChannelDrivenPort> {
    channel: Arc<C>,
}

impl<C: ChannelDrivenPort> AckWaiter<C> {
    pub fn new(channel: Arc<C>) -> Self {
        AckWaiter { channel }
    }

    /// Resolves on the first value of `field` equal to `target`, or unmatched once `timeout` elapses.
    pub async fn wait(
        &self, device_id: &str, field: &str, target: &Value, timeout: Duration,
    ) -> Result<AckOutcome, ChannelError> {
        let token = AckWaitToken {
            device_id: device_id.to_string(),
            watched_field: field.to_string(),
            target_value: target.clone(),
            deadline: Instant::now() + timeout,
        };
        let mut listening = Listening {
            channel: self.channel.as_ref(),
            subscription: self.channel.subscribe(device_id, field).await?,
        };
        let outcome = match tokio::time::timeout_at(
            token.deadline,
            Self::first_match(&mut listening.subscription.changes, &token.target_value),
        )
        .await
        {
            Ok(Some(value)) => AckOutcome::matched(value),
            Ok(None) => {
                warn!(
                    "Feed of {} closed for device {} before reaching {}",
                    token.watched_field, token.device_id, token.target_value
                );
                AckOutcome::timed_out()
            }
            Err(_) => AckOutcome::timed_out(),
        };
        debug!(
            "Wait on {}/{} for {} resolved, matched: {}",
            token.device_id, token.watched_field, token.target_value, outcome.matched
        );
        Ok(outcome)
    }

    async fn first_match(changes: &mut UnboundedReceiver<Value>, target: &Value) -> Option<Value> {
        while let Some(value) = changes.recv().await {
            if value == *target {
                return Some(value);
            }
        }
        None
    }
}
