//! Connection manager and outbound writer.
//!
//! The manager owns the read half of the current connection. The write half
//! is handed to a single writer task that drains a bounded queue, so the
//! dispatcher and any number of stream tasks can send frames without ever
//! interleaving writes on the socket.
//!
//! Every connection gets a new generation number. A frame is bound to the
//! generation that was current when it was queued and is never written to a
//! later connection.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use remote_agent_core::{Frame, LivenessFlag, LivenessWatch, liveness_flag};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    TransportError,
    connector::{Connector, FrameSink, FrameSource},
};

struct OutboundRequest {
    frame: Frame,
    generation: u64,
    done: oneshot::Sender<Result<(), TransportError>>,
}

enum WriterControl {
    Attach { generation: u64, sink: FrameSink },
    Detach,
}

/// Handle for sending frames to the controller.
///
/// Cheap to clone; every clone feeds the same ordered queue.
#[derive(Clone)]
pub struct Outbound {
    queue: mpsc::Sender<OutboundRequest>,
    generation: Arc<AtomicU64>,
}

impl Outbound {
    /// Queue a frame and wait until it has been written.
    ///
    /// # Errors
    /// Returns error if there is no live connection or the write failed.
    pub async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        let (done, result) = oneshot::channel();
        let generation = self.generation.load(Ordering::Acquire);
        self.queue
            .send(OutboundRequest {
                frame,
                generation,
                done,
            })
            .await
            .map_err(|_| TransportError::WriterStopped)?;
        result.await.map_err(|_| TransportError::WriterStopped)?
    }
}

/// Owns the persistent connection and reconnects it.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    retry_interval: Duration,
    source: Option<FrameSource>,
    control: mpsc::UnboundedSender<WriterControl>,
    outbound: Outbound,
    generation: Arc<AtomicU64>,
    connected: LivenessFlag,
    writer: JoinHandle<()>,
}

impl ConnectionManager {
    /// Create a disconnected manager and start its writer task.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, retry_interval: Duration, outbound_capacity: usize) -> Self {
        let (control, control_rx) = mpsc::unbounded_channel();
        let (queue, queue_rx) = mpsc::channel(outbound_capacity.max(1));
        let (connected, _) = liveness_flag(false);
        let writer = tokio::spawn(run_writer(control_rx, queue_rx));
        let generation = Arc::new(AtomicU64::new(0));

        Self {
            connector,
            retry_interval,
            source: None,
            control,
            outbound: Outbound {
                queue,
                generation: Arc::clone(&generation),
            },
            generation,
            connected,
            writer,
        }
    }

    /// Sender feeding the outbound queue.
    #[must_use]
    pub fn outbound(&self) -> Outbound {
        self.outbound.clone()
    }

    /// Reader for the `connected` signal.
    #[must_use]
    pub fn connected(&self) -> LivenessWatch {
        self.connected.watch()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    /// Connect, retrying at the fixed interval until an attempt succeeds.
    ///
    /// There is no retry limit: the agent outlives controller outages.
    pub async fn connect(&mut self) {
        self.disconnect();
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            match self.connector.connect().await {
                Ok(connection) => {
                    let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                    let attach = WriterControl::Attach {
                        generation,
                        sink: connection.sink,
                    };
                    if self.control.send(attach).is_err() {
                        tracing::error!("Outbound writer is gone; frames cannot be sent");
                    }
                    self.source = Some(connection.source);
                    self.connected.set(true);
                    tracing::info!(attempt, generation, "Successfully connected");
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        error = %e,
                        retry_in = ?self.retry_interval,
                        "Error connecting to controller"
                    );
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }

    /// Wait for the next inbound message.
    ///
    /// A transport error or the end of the stream marks the manager
    /// disconnected; the caller must [`connect`](Self::connect) again.
    ///
    /// # Errors
    /// Returns error if the connection is lost or was never established.
    pub async fn read(&mut self) -> Result<Vec<u8>, TransportError> {
        let Some(source) = self.source.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        let error = match source.next().await {
            Some(Ok(message)) => return Ok(message),
            Some(Err(e)) => e,
            None => TransportError::Closed,
        };
        tracing::warn!(error = %error, "Error reading from connection");
        self.disconnect();
        Err(error)
    }

    fn disconnect(&mut self) {
        if self.source.take().is_some() {
            let _ = self.control.send(WriterControl::Detach);
        }
        self.connected.set(false);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.writer.abort();
    }
}

async fn run_writer(
    mut control: mpsc::UnboundedReceiver<WriterControl>,
    mut queue: mpsc::Receiver<OutboundRequest>,
) {
    let mut sink: Option<(u64, FrameSink)> = None;
    loop {
        tokio::select! {
            biased;
            ctl = control.recv() => match ctl {
                Some(WriterControl::Attach { generation, sink: next }) => sink = Some((generation, next)),
                Some(WriterControl::Detach) => sink = None,
                None => break,
            },
            request = queue.recv() => {
                let Some(OutboundRequest { frame, generation, done }) = request else { break };
                let result = write_frame(&mut sink, generation, &frame).await;
                let _ = done.send(result);
            }
        }
    }
    tracing::debug!("Outbound writer stopped");
}

async fn write_frame(
    sink: &mut Option<(u64, FrameSink)>,
    generation: u64,
    frame: &Frame,
) -> Result<(), TransportError> {
    let payload = frame.encode()?;
    let Some((current, active)) = sink.as_mut() else {
        return Err(TransportError::NotConnected);
    };
    if *current != generation {
        tracing::debug!(
            queued_for = generation,
            current = *current,
            "Dropping frame queued for an earlier connection"
        );
        return Err(TransportError::NotConnected);
    }
    if let Err(e) = active.send(payload).await {
        // A failed sink never recovers; wait for the next attach.
        *sink = None;
        return Err(e);
    }
    Ok(())
}
