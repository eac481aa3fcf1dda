//! Core types and wire formats for the CENO signaling client.
//!
//! This crate defines the network URI model, the base64 alphabet used inside
//! key URIs, the line-oriented field set codec, and the signaling key pair
//! (plus a local Ed25519 scheme for node doubles).

pub mod constants;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod fieldset;
pub mod signal_key;
pub mod uri;

pub use error::{FieldSetError, KeyError, UriError};
pub use fieldset::FieldSet;
pub use signal_key::{SignalingKeyPair, parse_insert_uri};
pub use uri::{FreenetUri, KeyType};
