//! Signaling channel establishment for the CENO client.
//!
//! A [`ChannelMaker`] publishes the client's signaling key where the bridge can
//! find it (a keyword "dead drop" named by the bridge's puzzle) and then watches
//! for the bridge's acknowledgement record. All network access goes through the
//! [`NodeInterface`] trait so the state machine can be driven by any node
//! client, including scripted test doubles.

pub mod constants;
pub mod error;
pub mod fetch;
pub mod maker;
pub mod node;
pub mod probe;
pub mod puzzle;
pub mod status;

pub use error::{FetchError, InsertError, KeyGenError, PuzzleError, SealError, SynParseError};
pub use maker::ChannelMaker;
pub use node::{NodeInterface, PutCallback};
pub use puzzle::{PlaintextSealer, ReplySealer};
pub use status::{ChannelStatus, StatusHandle};
