//! The CENO client signaling daemon.
//!
//! Loads configuration, restores the persisted signaling key, and drives a
//! [`ChannelMaker`](ceno_signaling::ChannelMaker) over a local node connection
//! on a fixed tick until shut down.

pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod storage;

pub use config::ClientConfig;
pub use driver::{DriverSettings, ShutdownHandle, SignalingDriver};
pub use error::ClientError;
pub use storage::{Storage, StorageError};
