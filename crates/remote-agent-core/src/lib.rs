//! Core building blocks for the remote agent.
//!
//! This crate provides:
//! - `Frame` - The wire unit exchanged with the controller
//! - `Command` - Closed set of commands with a shell fallback
//! - `Capabilities` - Injected capability interfaces
//! - `StreamStore` - Latest payload per active stream
//! - Liveness flags and agent configuration

pub mod capability;
pub mod command;
pub mod config;
pub mod liveness;
pub mod protocol;
pub mod stream_store;

pub use capability::{Capabilities, CapabilityError, DeviceSpecs, DirectoryEntry, DirectoryListing};
pub use command::{Command, PowerAction, Quality, StreamKind};
pub use config::{AgentConfig, ConfigError};
pub use liveness::{LivenessFlag, LivenessSnapshot, LivenessWatch, liveness_flag};
pub use protocol::{Frame, FrameError};
pub use stream_store::{StreamStore, StreamUpdate};
