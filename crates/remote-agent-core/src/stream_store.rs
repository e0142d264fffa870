//! Latest-payload store for active streams.
//!
//! Every successful stream tick overwrites the entry for
//! `{client_id}_{stream}`. Readers outside the dispatch path (a local viewer,
//! diagnostics) can poll the latest payload or follow live updates.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// A single store update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamUpdate {
    pub key: String,
    pub payload: Bytes,
}

/// Keyed store of the most recent payload per stream.
pub struct StreamStore {
    latest: RwLock<HashMap<String, Bytes>>,
    sender: broadcast::Sender<StreamUpdate>,
}

impl Default for StreamStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            latest: RwLock::new(HashMap::new()),
            sender,
        }
    }

    /// Store key for a client's stream.
    #[must_use]
    pub fn key(client_id: &str, stream: &str) -> String {
        format!("{client_id}_{stream}")
    }

    /// Replace the payload stored under `key`.
    pub fn set(&self, key: impl Into<String>, payload: Bytes) {
        let key = key.into();
        self.latest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), payload.clone());
        let _ = self.sender.send(StreamUpdate { key, payload }); // live listeners
    }

    /// Latest payload stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Keys with a stored payload, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Receiver for live updates.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StreamUpdate> {
        self.sender.subscribe()
    }

    /// Stream that yields the current payloads first, then live updates.
    ///
    /// Slow readers skip updates they lagged behind on.
    #[must_use]
    pub fn snapshot_plus_updates(&self) -> futures::stream::BoxStream<'static, StreamUpdate> {
        let rx = self.subscribe();
        let mut snapshot: Vec<StreamUpdate> = self
            .latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, payload)| StreamUpdate {
                key: key.clone(),
                payload: payload.clone(),
            })
            .collect();
        snapshot.sort_by(|a, b| a.key.cmp(&b.key));

        let live = BroadcastStream::new(rx).filter_map(|res| async move { res.ok() });
        futures::stream::iter(snapshot).chain(live).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_payload_wins() {
        let store = StreamStore::new();
        let key = StreamStore::key("agent-1", "webcam");
        assert_eq!(key, "agent-1_webcam");
        assert!(store.get(&key).is_none());

        store.set(key.clone(), Bytes::from_static(b"one"));
        store.set(key.clone(), Bytes::from_static(b"two"));
        assert_eq!(store.get(&key).unwrap(), Bytes::from_static(b"two"));
        assert_eq!(store.keys(), vec![key]);
    }

    #[tokio::test]
    async fn test_snapshot_then_live() {
        let store = StreamStore::new();
        store.set("a_screen", Bytes::from_static(b"old"));

        let mut updates = store.snapshot_plus_updates();
        store.set("a_webcam", Bytes::from_static(b"new"));

        let first = updates.next().await.unwrap();
        assert_eq!(first.key, "a_screen");
        let second = updates.next().await.unwrap();
        assert_eq!(second.key, "a_webcam");
        assert_eq!(second.payload, Bytes::from_static(b"new"));
    }
}
