//! In-memory connector.
//!
//! Useful for tests and for embedding the agent next to a controller in the
//! same process. Every accepted connection hands a [`ControllerEnd`] to the
//! receiver returned by [`MemoryConnector::new`].

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt, channel::mpsc as fmpsc};
use remote_agent_core::Frame;
use tokio::sync::mpsc;

use crate::{
    TransportError,
    connector::{Connection, Connector},
};

/// Connector backed by in-process channels.
pub struct MemoryConnector {
    refusals: AtomicUsize,
    attempts: AtomicUsize,
    accepted: mpsc::UnboundedSender<ControllerEnd>,
}

impl MemoryConnector {
    /// Create a connector and the queue of accepted controller ends.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ControllerEnd>) {
        let (accepted, rx) = mpsc::unbounded_channel();
        let connector = Self {
            refusals: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            accepted,
        };
        (connector, rx)
    }

    /// Refuse the next `count` connection attempts.
    pub fn refuse_next(&self, count: usize) {
        self.refusals.store(count, Ordering::SeqCst);
    }

    /// Connection attempts made so far, refused ones included.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Connect("connection refused".into()));
        }

        let (to_agent, inbound) = fmpsc::unbounded();
        let (outbound, from_agent) = fmpsc::unbounded();

        self.accepted
            .send(ControllerEnd {
                to_agent,
                from_agent,
            })
            .map_err(|_| TransportError::Connect("controller side dropped".into()))?;

        let sink = outbound.sink_map_err(|_| TransportError::Closed);
        Ok(Connection::new(Box::pin(sink), inbound.boxed()))
    }
}

/// Controller side of one in-memory connection.
///
/// Dropping it closes the connection in both directions.
pub struct ControllerEnd {
    to_agent: fmpsc::UnboundedSender<Result<Vec<u8>, TransportError>>,
    from_agent: fmpsc::UnboundedReceiver<Vec<u8>>,
}

impl ControllerEnd {
    /// Send a frame to the agent. Returns `false` if the agent side is gone.
    pub fn send(&self, frame: &Frame) -> bool {
        frame
            .encode()
            .is_ok_and(|raw| self.to_agent.unbounded_send(Ok(raw)).is_ok())
    }

    /// Send raw bytes to the agent.
    pub fn send_raw(&self, raw: impl Into<Vec<u8>>) -> bool {
        self.to_agent.unbounded_send(Ok(raw.into())).is_ok()
    }

    /// Make the agent's next read fail with `error`.
    pub fn fail(&self, error: TransportError) {
        let _ = self.to_agent.unbounded_send(Err(error));
    }

    /// Next raw message written by the agent.
    pub async fn recv_raw(&mut self) -> Option<Vec<u8>> {
        self.from_agent.next().await
    }

    /// Next frame written by the agent.
    pub async fn recv(&mut self) -> Option<Frame> {
        while let Some(raw) = self.recv_raw().await {
            if let Ok(frame) = Frame::decode(&raw) {
                return Some(frame);
            }
        }
        None
    }

    /// Next frame, or `None` if nothing arrives within `wait`.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Option<Frame> {
        tokio::time::timeout(wait, self.recv()).await.ok().flatten()
    }
}
