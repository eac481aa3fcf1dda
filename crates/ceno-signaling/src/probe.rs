//! Liveness probe decisions.
//!
//! The bridge acknowledges a client by publishing a decimal Unix-millis
//! timestamp under `USK@<client request keys>/syn/N`. These functions are pure
//! so the freshness rules can be tested without a node or a clock.

use ceno_core::{FreenetUri, UriError};

use crate::constants::{STALENESS_HORIZON_MS, SYN_DOC_NAME};
use crate::error::SynParseError;

/// Result of one liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// No key has been published yet; nothing to look for.
    Skipped,
    /// A fresh acknowledgement was read.
    Established { acknowledged_at: i64 },
    /// An acknowledgement was read but it is past the staleness horizon.
    Stale { acknowledged_at: i64 },
    /// No acknowledgement could be fetched.
    Absent,
    /// The acknowledgement could not be decoded.
    Unparseable,
}

/// The acknowledgement record URI for a client's public request key.
pub fn syn_uri(request_uri: &FreenetUri) -> Result<FreenetUri, UriError> {
    FreenetUri::versioned(SYN_DOC_NAME, request_uri)
}

/// Decode an acknowledgement payload into Unix millis.
///
/// Surrounding whitespace is ignored; an empty or whitespace-only payload is
/// an error.
pub fn parse_syn_timestamp(payload: &[u8]) -> Result<i64, SynParseError> {
    let text = std::str::from_utf8(payload).map_err(|_| SynParseError::NotUtf8)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(SynParseError::Empty);
    }
    text.parse()
        .map_err(|_| SynParseError::NotNumeric(text.to_string()))
}

/// Whether an acknowledgement made at `acknowledged_at` is expired at `now`.
///
/// Exactly on the horizon still counts as fresh.
pub fn is_stale_at(now: i64, acknowledged_at: i64) -> bool {
    now.saturating_sub(acknowledged_at) > STALENESS_HORIZON_MS
}

/// Current wall-clock time in Unix millis.
pub fn system_now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
