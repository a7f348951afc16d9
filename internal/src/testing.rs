use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::{
    domain::{audit::AuditEntry, command::Subsystem, error::ChannelError, settings::ChannelLayout},
    port::{
        audit::AuditDrivenPort,
        channel::{ChannelDrivenPort, FieldSubscription, SubscriptionId},
    },
};

type FieldKey = (String, String);

/// How a simulated device reacts once it sees a command, offsets are from the command write.
#[derive(Debug, Clone, Default)]
pub struct DeviceScript {
    pub ack_after: Option<Duration>,
    pub complete_after: Option<Duration>,
    pub result: Option<Value>,
}

impl DeviceScript {
    pub fn responsive(ack_after_secs: u64, complete_after_secs: u64) -> Self {
        DeviceScript {
            ack_after: Some(Duration::from_secs(ack_after_secs)),
            complete_after: Some(Duration::from_secs(complete_after_secs)),
            result: None,
        }
    }
    pub fn ack_only(ack_after_secs: u64) -> Self {
        DeviceScript {
            ack_after: Some(Duration::from_secs(ack_after_secs)),
            ..Default::default()
        }
    }
    pub fn silent() -> Self {
        DeviceScript::default()
    }
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
}

#[derive(Default)]
struct State {
    fields: HashMap<FieldKey, Value>,
    listeners: HashMap<SubscriptionId, (FieldKey, UnboundedSender<Value>)>,
    scripts: HashMap<String, DeviceScript>,
    failing_writes: HashSet<String>,
    failing_reads: HashSet<String>,
    failing_subscribes: HashSet<FieldKey>,
    writes: Vec<(String, String, Value)>,
    released: Vec<SubscriptionId>,
    next_id: SubscriptionId,
}

/// In-memory realtime store with scripted devices.
#[derive(Clone, Default)]
pub struct FakeChannel {
    state: Arc<Mutex<State>>,
    layout: ChannelLayout,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(self, device_id: &str, script: DeviceScript) -> Self {
        self.state.lock().unwrap().scripts.insert(device_id.to_string(), script);
        self
    }

    pub fn failing_writes_for(self, device_id: &str) -> Self {
        self.state.lock().unwrap().failing_writes.insert(device_id.to_string());
        self
    }

    pub fn failing_reads_for(self, device_id: &str) -> Self {
        self.state.lock().unwrap().failing_reads.insert(device_id.to_string());
        self
    }

    pub fn failing_subscribes_for(self, device_id: &str, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_subscribes
            .insert((device_id.to_string(), path.to_string()));
        self
    }

    /// Drops the senders of every open feed on the field, as a broken watcher would.
    pub fn close_feeds(&self, device_id: &str, path: &str) {
        let key = (device_id.to_string(), path.to_string());
        self.state.lock().unwrap().listeners.retain(|_, (k, _)| *k != key);
    }

    /// Device side write: stores the value and notifies listeners.
    pub fn publish(&self, device_id: &str, path: &str, value: Value) {
        let mut state = self.state.lock().unwrap();
        let key = (device_id.to_string(), path.to_string());
        state.fields.insert(key.clone(), value.clone());
        state.listeners.values().filter(|(k, _)| *k == key).for_each(|(_, tx)| {
            let _ = tx.send(value.clone());
        });
    }

    pub fn value(&self, device_id: &str, path: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state.fields.get(&(device_id.to_string(), path.to_string())).cloned()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.state.lock().unwrap().listeners.len()
    }

    pub fn opened_subscriptions(&self) -> SubscriptionId {
        self.state.lock().unwrap().next_id
    }

    pub fn released(&self) -> Vec<SubscriptionId> {
        self.state.lock().unwrap().released.clone()
    }

    pub fn commands_written(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .writes
            .iter()
            .filter(|(_, path, _)| *path == self.layout.command_field)
            .count()
    }

    fn run_script(&self, device_id: &str, command: &Value) {
        let result_field = command["subsystem"]
            .as_str()
            .and_then(|raw| raw.parse::<Subsystem>().ok())
            .map(|subsystem| subsystem.result_field());
        let Some(script) = self.state.lock().unwrap().scripts.get(device_id).cloned() else {
            return;
        };
        let channel = self.clone();
        let device_id = device_id.to_string();
        tokio::spawn(async move {
            let layout = channel.layout.clone();
            let Some(ack_after) = script.ack_after else {
                return;
            };
            tokio::time::sleep(ack_after).await;
            channel.publish(&device_id, &layout.ack_field, layout.ack_value.clone());
            if let (Some(result), Some(field)) = (script.result.clone(), result_field) {
                channel.publish(&device_id, field, result);
            }
            if let Some(complete_after) = script.complete_after {
                tokio::time::sleep(complete_after.saturating_sub(ack_after)).await;
                channel.publish(&device_id, &layout.completion_field, layout.completion_value.clone());
            }
        });
    }
}

impl ChannelDrivenPort for FakeChannel {
    async fn write(&self, device_id: &str, path: &str, value: Value) -> Result<(), ChannelError> {
        if self.state.lock().unwrap().failing_writes.contains(device_id) {
            return Err(ChannelError::Write {
                device_id: device_id.into(),
                path: path.into(),
                reason: "store unreachable".into(),
            });
        }
        self.state
            .lock()
            .unwrap()
            .writes
            .push((device_id.to_string(), path.to_string(), value.clone()));
        self.publish(device_id, path, value.clone());
        if path == self.layout.command_field {
            self.run_script(device_id, &value);
        }
        Ok(())
    }

    async fn subscribe(&self, device_id: &str, path: &str) -> Result<FieldSubscription, ChannelError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().unwrap();
        let key = (device_id.to_string(), path.to_string());
        if state.failing_subscribes.contains(&key) {
            return Err(ChannelError::Subscribe {
                device_id: device_id.into(),
                path: path.into(),
                reason: "watch refused".into(),
            });
        }
        if let Some(current) = state.fields.get(&key) {
            let _ = tx.send(current.clone());
        }
        state.next_id += 1;
        let id = state.next_id;
        state.listeners.insert(id, (key, tx));
        Ok(FieldSubscription { id, changes: rx })
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        let mut state = self.state.lock().unwrap();
        state.listeners.remove(&subscription);
        state.released.push(subscription);
    }

    async fn read_once(&self, device_id: &str, path: &str) -> Result<Option<Value>, ChannelError> {
        if self.state.lock().unwrap().failing_reads.contains(device_id) {
            return Err(ChannelError::Read {
                device_id: device_id.into(),
                path: path.into(),
                reason: "permission denied".into(),
            });
        }
        Ok(self.value(device_id, path))
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAudit {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl AuditDrivenPort for RecordingAudit {
    fn record(&self, entry: AuditEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}
