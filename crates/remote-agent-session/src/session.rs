//! Agent session: one connection, one monitor, one dispatcher.

use std::sync::Arc;

use remote_agent_core::{
    AgentConfig, Capabilities, LivenessSnapshot, LivenessWatch, StreamStore,
};
use remote_agent_transport::{ConnectionManager, Connector, ReachabilityError, ReachabilityMonitor};
use tokio_util::sync::CancellationToken;

use crate::{dispatcher::CommandDispatcher, registry::StreamRegistry};

/// Session error.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Reachability monitor error: {0}")]
    Reachability(#[from] ReachabilityError),
}

/// Read-only view of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    reachable: LivenessWatch,
    connected: LivenessWatch,
    store: Arc<StreamStore>,
    streams: Arc<StreamRegistry>,
}

impl SessionHandle {
    /// Current liveness flags.
    #[must_use]
    pub fn liveness(&self) -> LivenessSnapshot {
        LivenessSnapshot {
            reachable: self.reachable.get(),
            connected: self.connected.get(),
        }
    }

    /// Latest payload per stream.
    #[must_use]
    pub fn store(&self) -> Arc<StreamStore> {
        Arc::clone(&self.store)
    }

    /// Names of the streams currently running.
    pub async fn active_streams(&self) -> Vec<String> {
        self.streams.active_names().await
    }
}

/// Owns every long-lived piece of the agent.
pub struct Session {
    connection: ConnectionManager,
    monitor: ReachabilityMonitor,
    dispatcher: CommandDispatcher,
    streams: Arc<StreamRegistry>,
    store: Arc<StreamStore>,
    reachable: LivenessWatch,
}

impl Session {
    /// Wire a session together. Nothing runs until [`run`](Self::run).
    ///
    /// # Errors
    /// Returns error if the probe endpoints cannot be derived from `config`.
    pub fn new(
        config: &AgentConfig,
        capabilities: Capabilities,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, SessionError> {
        let connection = ConnectionManager::new(
            connector,
            config.reconnect_interval,
            config.outbound_capacity,
        );
        let store = Arc::new(StreamStore::new());
        let streams = Arc::new(StreamRegistry::new(
            config.client_id.clone(),
            connection.outbound(),
            Arc::clone(&store),
        ));
        let (monitor, reachable) =
            ReachabilityMonitor::new(config, Arc::clone(&capabilities.device))?;
        let dispatcher =
            CommandDispatcher::new(config.client_id.clone(), capabilities, Arc::clone(&streams));

        Ok(Self {
            connection,
            monitor,
            dispatcher,
            streams,
            store,
            reachable,
        })
    }

    /// Use a preconfigured HTTP client for the reachability probe.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.monitor = self.monitor.with_client(http);
        self
    }

    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            reachable: self.reachable.clone(),
            connected: self.connection.connected(),
            store: Arc::clone(&self.store),
            streams: Arc::clone(&self.streams),
        }
    }

    /// Run until `shutdown` fires, then stop every stream.
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!("Session started");
        let monitor = self.monitor.spawn(shutdown.child_token());

        self.dispatcher.run(&mut self.connection, &shutdown).await;

        self.streams.stop_all().await;
        if let Err(e) = monitor.await {
            tracing::warn!(error = %e, "Reachability monitor task failed");
        }
        tracing::info!("Session stopped");
    }
}
