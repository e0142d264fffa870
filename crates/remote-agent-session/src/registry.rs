//! Registry of named, cancellable stream tasks.
//!
//! At most one task runs per stream name. Each task ticks on a fixed
//! interval, asks its producer for a payload and sends it through the shared
//! outbound queue. A producer error skips the tick; a send error ends the
//! task, which then removes its own entry.
//!
//! A stream keeps its name until its task has ended, so a stop that gives up
//! waiting for a slow tick still blocks a restart under the same name.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use remote_agent_core::{CapabilityError, Frame, StreamStore};
use remote_agent_transport::Outbound;
use thiserror::Error;
use tokio::{
    sync::Mutex,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

/// How long `stop` waits for an in-flight tick to finish.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// Produces one payload per stream tick.
#[async_trait]
pub trait StreamProducer: Send + Sync {
    async fn produce(&self) -> Result<Bytes, CapabilityError>;
}

/// Stream registry error.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Stream already active: {0}")]
    AlreadyActive(String),
}

/// Result of stopping a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotFound,
}

struct StreamHandle {
    id: u64,
    cancel: CancellationToken,
    /// Cancelled when the task exits, however it exits.
    finished: CancellationToken,
}

impl StreamHandle {
    fn is_live(&self) -> bool {
        !self.finished.is_cancelled()
    }
}

type Entries = Arc<Mutex<HashMap<String, StreamHandle>>>;

#[derive(Clone)]
struct Emitter {
    client_id: Arc<str>,
    outbound: Outbound,
    store: Arc<StreamStore>,
}

/// Registry of active stream tasks.
pub struct StreamRegistry {
    emitter: Emitter,
    entries: Entries,
    next_id: AtomicU64,
    stop_grace: Duration,
}

impl StreamRegistry {
    /// Create an empty registry whose streams emit through `outbound`.
    #[must_use]
    pub fn new(client_id: impl Into<String>, outbound: Outbound, store: Arc<StreamStore>) -> Self {
        let client_id: String = client_id.into();
        Self {
            emitter: Emitter {
                client_id: Arc::from(client_id),
                outbound,
                store,
            },
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    /// Override how long `stop` waits for an in-flight tick.
    #[must_use]
    pub const fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Start a stream task under `name`.
    ///
    /// The first tick fires one `interval` after the start.
    ///
    /// # Errors
    /// Returns [`StreamError::AlreadyActive`] if a live task owns `name`.
    pub async fn start(
        &self,
        name: &str,
        interval: Duration,
        producer: Arc<dyn StreamProducer>,
    ) -> Result<(), StreamError> {
        let mut entries = self.entries.lock().await;
        if entries.get(name).is_some_and(StreamHandle::is_live) {
            return Err(StreamError::AlreadyActive(name.to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        tokio::spawn(run_stream(StreamTask {
            name: name.to_string(),
            id,
            interval,
            producer,
            cancel: cancel.clone(),
            finished: finished.clone(),
            emitter: self.emitter.clone(),
            entries: Arc::clone(&self.entries),
        }));
        entries.insert(
            name.to_string(),
            StreamHandle {
                id,
                cancel,
                finished,
            },
        );

        tracing::info!(stream = name, ?interval, "Stream started");
        Ok(())
    }

    /// Cancel the stream under `name` and wait for its task to end.
    ///
    /// Stopping an absent stream, or one that is already stopping, is a
    /// no-op. An in-flight tick is allowed to finish before this returns, so
    /// no frame of the stream is sent afterwards. If the tick outlasts the
    /// stop grace period this returns anyway; the entry then stays until the
    /// task ends and `start` keeps rejecting the name.
    pub async fn stop(&self, name: &str) -> StopOutcome {
        let (cancel, finished) = {
            let entries = self.entries.lock().await;
            match entries.get(name) {
                Some(handle) if handle.is_live() && !handle.cancel.is_cancelled() => {
                    (handle.cancel.clone(), handle.finished.clone())
                }
                _ => return StopOutcome::NotFound,
            }
        };
        cancel.cancel();
        if tokio::time::timeout(self.stop_grace, finished.cancelled())
            .await
            .is_err()
        {
            tracing::warn!(
                stream = name,
                grace = ?self.stop_grace,
                "In-flight tick still running after stop"
            );
        }
        tracing::info!(stream = name, "Stream stopped");
        StopOutcome::Stopped
    }

    /// Stop every active stream.
    pub async fn stop_all(&self) {
        for name in self.active_names().await {
            self.stop(&name).await;
        }
    }

    /// Whether a live task runs under `name`, including one still stopping.
    pub async fn is_active(&self, name: &str) -> bool {
        self.entries
            .lock()
            .await
            .get(name)
            .is_some_and(StreamHandle::is_live)
    }

    /// Names of live streams, sorted.
    pub async fn active_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .lock()
            .await
            .iter()
            .filter(|(_, handle)| handle.is_live())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

struct StreamTask {
    name: String,
    id: u64,
    interval: Duration,
    producer: Arc<dyn StreamProducer>,
    cancel: CancellationToken,
    finished: CancellationToken,
    emitter: Emitter,
    entries: Entries,
}

async fn run_stream(task: StreamTask) {
    let StreamTask {
        name,
        id,
        interval,
        producer,
        cancel,
        finished,
        emitter,
        entries,
    } = task;
    let _finished = finished.drop_guard();
    let key = StreamStore::key(&emitter.client_id, &name);
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut emitted: u64 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let payload = match producer.produce().await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(stream = %name, error = %e, "Stream capture error");
                continue;
            }
        };

        let frame = Frame::response(&*emitter.client_id, payload.clone());
        if let Err(e) = emitter.outbound.send(frame).await {
            tracing::warn!(stream = %name, error = %e, "Stream send error, stopping stream");
            break;
        }
        emitter.store.set(key.clone(), payload);

        emitted += 1;
        if emitted % 10 == 0 {
            tracing::debug!(stream = %name, emitted, "Stream progress");
        }
    }

    // Only remove our own entry: the name may already belong to a newer task.
    let mut entries = entries.lock().await;
    if entries.get(&name).is_some_and(|handle| handle.id == id) {
        entries.remove(&name);
    }
}
