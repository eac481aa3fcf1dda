//! Puzzle rendezvous records.
//!
//! The bridge advertises a `question` under `USK@<bridge keys>/CENO-signaler/N`.
//! The client answers by inserting a reply field set under `KSK@<question>`:
//!
//! ```text
//! id=<random per-attempt integer>
//! insertURI=<client's private insert URI>
//! End
//! ```
//!
//! The reply carries the insert URI in clear text because that is what the
//! bridge reads today. A [`ReplySealer`] sits between the encoded reply and the
//! insert so a future encryption layer can be added once the bridge agrees on
//! the format.

use ceno_core::{FieldSet, FreenetUri, UriError};
use rand::Rng;

use crate::constants::{
    QUESTION_FIELD, REPLY_ID_BOUND, REPLY_ID_FIELD, REPLY_INSERT_URI_FIELD, SIGNALER_DOC_NAME,
};
use crate::error::{PuzzleError, SealError};

/// The puzzle advertisement URI under the bridge's key.
pub fn signaler_uri(bridge_key: &FreenetUri) -> Result<FreenetUri, UriError> {
    FreenetUri::versioned(SIGNALER_DOC_NAME, bridge_key)
}

/// Extract the question from a puzzle record.
pub fn parse_puzzle(payload: &[u8]) -> Result<String, PuzzleError> {
    let fields = FieldSet::parse_bytes(payload)?;
    let question = fields
        .get_str(QUESTION_FIELD)
        .ok_or(PuzzleError::MissingQuestion)?;
    if question.trim().is_empty() {
        return Err(PuzzleError::EmptyQuestion);
    }
    Ok(question.to_string())
}

/// The dead-drop URI for a question.
pub fn dead_drop_uri(question: &str) -> Result<FreenetUri, UriError> {
    FreenetUri::ksk(question)
}

/// Draw a reply id uniformly from `[0, REPLY_ID_BOUND)`.
pub fn random_reply_id() -> i32 {
    rand::thread_rng().gen_range(0..REPLY_ID_BOUND)
}

/// The client's answer to a puzzle.
#[derive(Clone, PartialEq, Eq)]
pub struct PuzzleReply {
    pub id: i32,
    pub insert_uri: String,
}

impl PuzzleReply {
    #[must_use]
    pub fn new(insert_uri: impl Into<String>) -> Self {
        Self {
            id: random_reply_id(),
            insert_uri: insert_uri.into(),
        }
    }

    pub fn to_field_set(&self) -> Result<FieldSet, SealError> {
        let mut fields = FieldSet::new();
        fields.put_i32(REPLY_ID_FIELD, self.id)?;
        fields.put_overwrite(REPLY_INSERT_URI_FIELD, self.insert_uri.as_str())?;
        Ok(fields)
    }

    /// Ordered field-set text, ready for sealing.
    pub fn encode(&self) -> Result<String, SealError> {
        Ok(self.to_field_set()?.to_ordered_string())
    }
}

impl std::fmt::Debug for PuzzleReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PuzzleReply")
            .field("id", &self.id)
            .field("insert_uri", &"[REDACTED]")
            .finish()
    }
}

/// Transforms an encoded reply into the body that is actually inserted.
pub trait ReplySealer: Send + Sync {
    fn seal(&self, encoded_reply: String) -> Result<String, SealError>;
}

/// Publishes the reply exactly as encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextSealer;

impl ReplySealer for PlaintextSealer {
    fn seal(&self, encoded_reply: String) -> Result<String, SealError> {
        Ok(encoded_reply)
    }
}
