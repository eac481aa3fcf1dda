//! Tracing subscriber setup for the client daemon.
//!
//! Log levels follow these conventions:
//! - ERROR: A channel maker reached a fatal status, the node is unreachable
//! - WARN: Recoverable fetch or insert failures, storage problems
//! - INFO: Channel established, key published, status changes
//! - DEBUG: Probe and fetch steps, redirects
//! - TRACE: FCP messages on the wire, status transitions

use tracing_subscriber::EnvFilter;

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Human-readable output. `RUST_LOG` overrides `default_level`.
pub fn init(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .init();
}

/// JSON output for log collectors.
pub fn init_json(default_level: &str) {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(default_level))
        .init();
}

/// Pick the format from `RUST_LOG_FORMAT` (`json` or anything else).
pub fn init_from_env(default_level: &str) {
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        init_json(default_level);
    } else {
        init(default_level);
    }
}

/// Test subscriber. Safe to call more than once.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("debug"))
        .with_test_writer()
        .try_init();
}
