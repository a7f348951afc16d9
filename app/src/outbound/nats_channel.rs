use std::{
    collections::HashMap,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::anyhow;
use async_nats::jetstream::{self, kv};
use futures::StreamExt;
use internal::{
    domain::error::ChannelError,
    port::channel::{ChannelDrivenPort, FieldSubscription, SubscriptionId},
};
use log::{debug, warn};
use serde_json::Value;
use tokio::{sync::mpsc, task::AbortHandle};

use crate::config::nats_config::ChannelConfig;

/// Device fields stored in a JetStream key/value bucket under `<device>.<field>`.
pub struct NatsChannel {
    store: kv::Store,
    watchers: Mutex<HashMap<SubscriptionId, AbortHandle>>,
    next_id: AtomicU64,
}

impl NatsChannel {
    pub async fn open(context: &jetstream::Context, config: &ChannelConfig) -> anyhow::Result<Self> {
        let store = if config.create_bucket {
            context
                .create_key_value(kv::Config {
                    bucket: config.bucket.clone(),
                    history: 5,
                    ..Default::default()
                })
                .await
                .map_err(|e| anyhow!("Failed to create bucket {}: {}", config.bucket, e))?
        } else {
            context
                .get_key_value(config.bucket.clone())
                .await
                .map_err(|e| anyhow!("Failed to open bucket {}: {}", config.bucket, e))?
        };
        Ok(NatsChannel {
            store,
            watchers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        })
    }

    fn key(device_id: &str, path: &str) -> String {
        format!("{}.{}", device_id, path)
    }
}

/// Firmware may publish bare strings, anything that isn't JSON is kept as text.
fn decode(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

impl ChannelDrivenPort for NatsChannel {
    async fn write(&self, device_id: &str, path: &str, value: Value) -> Result<(), ChannelError> {
        let key = Self::key(device_id, path);
        let payload = serde_json::to_vec(&value).map_err(|e| ChannelError::Encoding(key.clone(), e.to_string()))?;
        self.store
            .put(key.as_str(), payload.into())
            .await
            .map(|revision| debug!("{key} written at revision {revision}"))
            .map_err(|e| ChannelError::Write {
                device_id: device_id.to_string(),
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    async fn subscribe(&self, device_id: &str, path: &str) -> Result<FieldSubscription, ChannelError> {
        let key = Self::key(device_id, path);
        let mut watch = self
            .store
            .watch_with_history(key.as_str())
            .await
            .map_err(|e| ChannelError::Subscribe {
                device_id: device_id.to_string(),
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            while let Some(entry) = watch.next().await {
                match entry {
                    Ok(entry) => {
                        let value = match entry.operation {
                            kv::Operation::Put => decode(&entry.value),
                            _ => Value::Null,
                        };
                        if tx.send(value).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Watcher on {key} failed: {e}");
                        break;
                    }
                }
            }
        });
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, task.abort_handle());
        Ok(FieldSubscription { id, changes: rx })
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        let watcher = self
            .watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&subscription);
        if let Some(watcher) = watcher {
            watcher.abort();
            debug!("Watcher {subscription} released");
        }
    }

    async fn read_once(&self, device_id: &str, path: &str) -> Result<Option<Value>, ChannelError> {
        self.store
            .get(Self::key(device_id, path))
            .await
            .map(|entry| entry.map(|bytes| decode(&bytes)))
            .map_err(|e| ChannelError::Read {
                device_id: device_id.to_string(),
                path: path.to_string(),
                reason: e.to_string(),
            })
    }
}
