//! Connector abstraction over the persistent duplex connection.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, stream::BoxStream};

use crate::TransportError;

/// Write half of a connection: one item is one message.
pub type FrameSink = Pin<Box<dyn Sink<Vec<u8>, Error = TransportError> + Send>>;

/// Read half of a connection. The stream ends when the peer closes.
pub type FrameSource = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// An open, message-framed duplex connection.
pub struct Connection {
    pub sink: FrameSink,
    pub source: FrameSource,
}

impl Connection {
    #[must_use]
    pub fn new(sink: FrameSink, source: FrameSource) -> Self {
        Self { sink, source }
    }
}

/// Opens connections to the controller.
///
/// Implement this trait to plug in another transport; the connection
/// manager only ever sees raw messages.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Make one connection attempt.
    async fn connect(&self) -> Result<Connection, TransportError>;
}
