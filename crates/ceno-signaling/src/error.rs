//! Signaling error types.
//!
//! These never escape [`crate::ChannelMaker::run`]: the channel maker collapses
//! every failure into a [`crate::ChannelStatus`]. They exist so node interface
//! implementations can classify failures and so each step can be tested alone.

use ceno_core::{FieldSetError, FreenetUri, KeyError, UriError};

/// Failure of a single fetch, classified by how the caller must react.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The content moved; retry at the new URI.
    #[error("permanent redirect to {0}")]
    Redirect(FreenetUri),

    /// The network has no data under this key (yet).
    #[error("data not found")]
    DataNotFound,

    /// Retrying the same request cannot succeed.
    #[error("fatal fetch failure: {0}")]
    Fatal(String),

    /// Anything else; the same request may succeed later.
    #[error("transient fetch failure: {0}")]
    Transient(String),
}

impl FetchError {
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Failure to submit an insert. The eventual insert outcome is reported to the
/// put callback instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InsertError {
    #[error("payload encoding failed: {0}")]
    Encoding(String),

    #[error("node unavailable: {0}")]
    NodeUnavailable(String),

    #[error("malformed insert URI: {0}")]
    MalformedUri(#[from] UriError),

    #[error("insert submission failed: {0}")]
    Submission(String),
}

/// Failure to obtain or restore a signaling key pair through the node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyGenError {
    #[error("key generation failed: {0}")]
    Failed(String),

    #[error("request URI derivation failed: {0}")]
    Derivation(String),

    #[error("node returned an unusable key pair: {0}")]
    InvalidKeys(#[from] KeyError),
}

/// The bridge's puzzle record did not yield a usable question.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PuzzleError {
    #[error("puzzle record is not a field set: {0}")]
    FieldSet(#[from] FieldSetError),

    #[error("puzzle record has no question field")]
    MissingQuestion,

    #[error("puzzle question is empty")]
    EmptyQuestion,
}

/// The acknowledgement record did not hold a decimal millisecond timestamp.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynParseError {
    #[error("acknowledgement is not valid UTF-8")]
    NotUtf8,

    #[error("acknowledgement is empty")]
    Empty,

    #[error("acknowledgement is not a timestamp: {0:?}")]
    NotNumeric(String),
}

/// The reply body could not be prepared for publication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SealError {
    #[error("reply encoding failed: {0}")]
    Encoding(#[from] FieldSetError),

    #[error("reply sealing failed: {0}")]
    Sealing(String),
}
