//! Snapshot sources and the subscription handle.
//!
//! A source delivers the whole `sensor_readings` node to its listeners every
//! time it changes. Listeners stay registered for as long as the returned
//! [`Subscription`] lives.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use log::{debug, error, info};
use reqwest::header::ACCEPT;
use serde_json::Value;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Snapshot(Value),
    ConnectionLost(String),
}

pub type Listener = Box<dyn FnMut(FeedEvent) + Send + 'static>;

pub trait SnapshotSource {
    fn subscribe(&self, listener: Listener) -> Subscription;
}

/// Keeps a listener registered. Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

// `None` once unsubscribed
type Slot = Arc<Mutex<Option<Listener>>>;

fn deliver(slot: &Slot, event: FeedEvent) {
    if let Ok(mut listener) = slot.lock() {
        if let Some(listener) = listener.as_mut() {
            listener(event);
        }
    }
}

#[derive(Default)]
struct MemoryInner {
    snapshot: Option<Value>,
    next_id: u64,
    listeners: BTreeMap<u64, Slot>,
}

/// In-process snapshot store.
///
/// Listeners run synchronously on the publishing thread. A listener must not
/// drop its own subscription from inside the callback.
#[derive(Clone, Default)]
pub struct MemoryFeed {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored snapshot and notifies every subscriber.
    pub fn publish(&self, snapshot: Value) {
        let slots = match self.inner.lock() {
            Ok(mut inner) => {
                inner.snapshot = Some(snapshot.clone());
                inner.listeners.values().cloned().collect::<Vec<_>>()
            }
            Err(_) => return,
        };
        debug!("Publishing snapshot to {} listener(s)", slots.len());

        for slot in &slots {
            deliver(slot, FeedEvent::Snapshot(snapshot.clone()));
        }
    }

    /// Reports a connection failure to every subscriber.
    #[cfg(test)]
    pub fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let slots = match self.inner.lock() {
            Ok(inner) => inner.listeners.values().cloned().collect::<Vec<_>>(),
            Err(_) => return,
        };

        for slot in &slots {
            deliver(slot, FeedEvent::ConnectionLost(reason.clone()));
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.listeners.len())
    }
}

impl SnapshotSource for MemoryFeed {
    /// The current snapshot, if any, is delivered before this returns.
    fn subscribe(&self, listener: Listener) -> Subscription {
        let slot: Slot = Arc::new(Mutex::new(Some(listener)));

        // hold the slot until the initial snapshot is delivered so that a
        // concurrent publish cannot overtake it
        let mut guard = slot.lock().ok();
        let (id, current) = match self.inner.lock() {
            Ok(mut inner) => {
                let id = inner.next_id;
                inner.next_id += 1;
                inner.listeners.insert(id, slot.clone());
                (Some(id), inner.snapshot.clone())
            }
            Err(_) => (None, None),
        };
        if let (Some(listener), Some(snapshot)) = (guard.as_mut().and_then(|g| g.as_mut()), current) {
            listener(FeedEvent::Snapshot(snapshot));
        }
        drop(guard);

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let (Some(inner), Some(id)) = (inner.upgrade(), id) {
                if let Ok(mut inner) = inner.lock() {
                    inner.listeners.remove(&id);
                }
            }
            // waits for an in-flight delivery to finish
            if let Ok(mut listener) = slot.lock() {
                *listener = None;
            }
        })
    }
}

/// Polls a JSON endpoint, e.g. the REST url of a realtime database node.
///
/// A request that takes longer than `timeout` counts as a connection failure.
#[derive(Clone)]
pub struct PollingFeed {
    client: reqwest::Client,
    url: String,
    interval: Duration,
}

impl PollingFeed {
    pub fn new(url: impl Into<String>, interval: Duration, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            interval,
        })
    }

    async fn fetch(client: &reqwest::Client, url: &str) -> reqwest::Result<Value> {
        client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }
}

impl SnapshotSource for PollingFeed {
    /// Must be called from within a tokio runtime.
    fn subscribe(&self, mut listener: Listener) -> Subscription {
        let client = self.client.clone();
        let url = self.url.clone();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut last: Option<Value> = None;
            let mut failing = false;
            loop {
                ticker.tick().await;
                match Self::fetch(&client, &url).await {
                    Ok(value) => {
                        if failing {
                            info!("Sensor feed reachable again");
                            failing = false;
                        }
                        if last.as_ref() != Some(&value) {
                            last = Some(value.clone());
                            listener(FeedEvent::Snapshot(value));
                        }
                    }
                    Err(e) => {
                        if !failing {
                            error!("Polling {url} failed: {e}");
                            failing = true;
                            // redeliver on recovery
                            last = None;
                            listener(FeedEvent::ConnectionLost(e.to_string()));
                        }
                    }
                }
            }
        });

        Subscription::new(move || task.abort())
    }
}
