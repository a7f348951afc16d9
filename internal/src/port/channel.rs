use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::domain::error::ChannelError;

pub type SubscriptionId = u64;

/// Live feed of one device field: the current value first, then every change in order.
#[derive(Debug)]
pub struct FieldSubscription {
    pub id: SubscriptionId,
    pub changes: UnboundedReceiver<Value>,
}

/// Shared realtime store used as the transport between the controller and device firmware.
pub trait ChannelDrivenPort: Send + Sync {
    fn write(&self, device_id: &str, path: &str, value: Value) -> impl Future<Output = Result<(), ChannelError>> + Send;

    fn subscribe(
        &self, device_id: &str, path: &str,
    ) -> impl Future<Output = Result<FieldSubscription, ChannelError>> + Send;

    /// Releases the listener behind `subscription`. Unknown ids are ignored.
    fn unsubscribe(&self, subscription: SubscriptionId);

    fn read_once(&self, device_id: &str, path: &str)
    -> impl Future<Output = Result<Option<Value>, ChannelError>> + Send;
}
