//! Redirect-following fetch loop shared by the liveness probe and the puzzle fetch.
//!
//! Transient failures are retried without a count limit. The node interface's
//! own transport budget is what eventually turns a hopeless request into a
//! fatal or not-found answer. Each retry yields to the scheduler so a driver
//! that drops the task can cancel it between attempts.

use ceno_core::FreenetUri;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::node::NodeInterface;

/// How the loop reacts to a "data not found" answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// Stop and report [`FetchOutcome::NotFound`].
    GiveUp,
    /// Treat it like any other transient failure.
    Retry,
}

/// Terminal result of [`fetch_following_redirects`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found { uri: FreenetUri, payload: Vec<u8> },
    NotFound { uri: FreenetUri },
    Failed { uri: FreenetUri, reason: String },
}

/// Fetch `uri`, following permanent redirects, until a terminal answer.
///
/// The URI carried by the outcome is the last one fetched, i.e. the final
/// redirect target if any redirects were followed.
pub async fn fetch_following_redirects<N: NodeInterface>(
    node: &N,
    uri: FreenetUri,
    not_found: NotFoundPolicy,
) -> FetchOutcome {
    let mut uri = uri;
    loop {
        match node.fetch_uri(&uri).await {
            Ok(payload) => {
                debug!(%uri, bytes = payload.len(), "fetched");
                return FetchOutcome::Found { uri, payload };
            }
            Err(FetchError::Redirect(next)) => {
                debug!(from = %uri, to = %next, "following permanent redirect");
                uri = next;
            }
            Err(FetchError::DataNotFound) if not_found == NotFoundPolicy::GiveUp => {
                debug!(%uri, "data not found");
                return FetchOutcome::NotFound { uri };
            }
            Err(FetchError::Fatal(reason)) => {
                return FetchOutcome::Failed { uri, reason };
            }
            Err(err) => {
                warn!(%uri, error = %err, "fetch failed, retrying");
                tokio::task::yield_now().await;
            }
        }
    }
}
