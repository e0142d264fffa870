//! Transport layer between the agent and its controller.
//!
//! Provides:
//! - `Connector` - Pluggable duplex connection (WebSocket, in-memory)
//! - `ConnectionManager` - Reconnecting owner of the connection plus the
//!   ordered outbound writer
//! - `ReachabilityMonitor` - HTTP health probe and device report
//! - Stream viewer router (feature: viewer)

pub mod connection;
pub mod connector;
pub mod error;
pub mod memory;
pub mod reachability;

#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "viewer")]
pub mod viewer;

pub use connection::{ConnectionManager, Outbound};
pub use connector::{Connection, Connector};
pub use error::TransportError;
pub use memory::{ControllerEnd, MemoryConnector};
pub use reachability::{ReachabilityError, ReachabilityMonitor};

#[cfg(feature = "websocket")]
pub use websocket::WebSocketConnector;
