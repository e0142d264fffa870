//! WebSocket connector.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt, future};
use remote_agent_core::AgentConfig;
use tokio_tungstenite::tungstenite::{
    Message, client::IntoClientRequest, http::HeaderValue,
};
use url::Url;

use crate::{
    TransportError,
    connector::{Connection, Connector},
};

/// Header carrying the agent's client identifier on the upgrade request.
pub const CLIENT_HEADER: &str = "x-client";

/// Connects to the controller's `client` WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
    client_id: String,
}

impl WebSocketConnector {
    /// Create a connector for an explicit WebSocket URL.
    #[must_use]
    pub fn new(url: Url, client_id: impl Into<String>) -> Self {
        Self {
            url,
            client_id: client_id.into(),
        }
    }

    /// Create a connector from the agent configuration.
    ///
    /// # Errors
    /// Returns error if the server URL has no WebSocket counterpart.
    pub fn from_config(config: &AgentConfig) -> Result<Self, TransportError> {
        Ok(Self::new(config.websocket_url()?, config.client_id.clone()))
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let mut request = self.url.as_str().into_client_request()?;
        let client_id = HeaderValue::from_str(&self.client_id)
            .map_err(|e| TransportError::Connect(format!("invalid client id: {e}")))?;
        request.headers_mut().insert(CLIENT_HEADER, client_id);

        let (stream, _response) = tokio_tungstenite::connect_async(request).await?;
        tracing::debug!(url = %self.url, "WebSocket handshake complete");

        let (sink, source) = stream.split();

        let sink = sink
            .sink_map_err(TransportError::from)
            .with(|payload: Vec<u8>| future::ready(Ok::<_, TransportError>(Message::binary(payload))));

        // Control messages are answered by tungstenite; only data reaches the caller.
        let source = source.filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Binary(data)) => Some(Ok(data.to_vec())),
                Ok(Message::Text(text)) => Some(Ok(text.as_str().as_bytes().to_vec())),
                Ok(Message::Close(_)) => Some(Err(TransportError::Closed)),
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::from(e))),
            })
        });

        Ok(Connection::new(Box::pin(sink), source.boxed()))
    }
}
