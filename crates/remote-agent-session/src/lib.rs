//! Session wiring for the remote agent.
//!
//! Provides:
//! - `CommandDispatcher` - Decode controller frames and call capabilities
//! - `StreamRegistry` - Named, cancellable periodic stream tasks
//! - `Session` - Owns the connection, monitor, dispatcher and streams

pub mod dispatcher;
pub mod registry;
pub mod session;

pub use dispatcher::CommandDispatcher;
pub use registry::{StopOutcome, StreamError, StreamProducer, StreamRegistry};
pub use session::{Session, SessionError, SessionHandle};
