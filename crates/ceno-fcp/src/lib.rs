//! FCP 2.0 client implementing the signaling [`NodeInterface`].
//!
//! One TCP connection to the node's client port carries every request. A
//! background read task routes replies to the waiting request by their
//! `Identifier`, and hands late insert outcomes to the put callback.
//!
//! Signaling keys come from the node too: `GenerateSSK` for fresh pairs and a
//! key-only `ClientPut` (`GetCHKOnly`) to recover the request form of a
//! persisted insert URI.
//!
//! [`NodeInterface`]: ceno_signaling::NodeInterface

pub mod client;
pub mod codes;
pub mod config;
pub mod constants;
pub mod error;
pub mod message;

pub use client::FcpClient;
pub use config::FcpConfig;
pub use error::FcpError;
pub use message::FcpMessage;
