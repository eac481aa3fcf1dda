//! Record names, field names and timing constants of the signaling handshake.

/// Versioned record under the client's public key where the bridge acknowledges it.
pub const SYN_DOC_NAME: &str = "syn";

/// Versioned record under the bridge's key advertising the current puzzle.
pub const SIGNALER_DOC_NAME: &str = "CENO-signaler";

/// Puzzle record field holding the dead-drop keyword.
pub const QUESTION_FIELD: &str = "question";

// Reply record fields
pub const REPLY_ID_FIELD: &str = "id";
pub const REPLY_INSERT_URI_FIELD: &str = "insertURI";

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Acknowledgements older than this trigger re-establishment (25 days).
pub const STALENESS_HORIZON_MS: i64 = 25 * MILLIS_PER_DAY;

/// Exclusive upper bound of the reply `id` field: 80% of `i32::MAX`.
pub const REPLY_ID_BOUND: i32 = (i32::MAX / 5) * 4;

// Put callback log lines
pub const PUBLISH_SUCCESS_MSG: &str =
    "Inserted private SSK key in the KSK@solution to the puzzle published by the bridge";
pub const PUBLISH_FAILURE_MSG: &str = "Failed to publish KSK@solution";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_is_25_days() {
        assert_eq!(STALENESS_HORIZON_MS, 2_160_000_000);
    }

    #[test]
    fn reply_bound_is_80_percent_of_i32_max() {
        let expected = (f64::from(i32::MAX) * 0.8) as i64;
        assert!((i64::from(REPLY_ID_BOUND) - expected).abs() <= 4);
        assert!(REPLY_ID_BOUND > 0);
    }
}
