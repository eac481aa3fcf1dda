//! The node interface consumed by the channel maker.

use std::future::Future;

use ceno_core::{FreenetUri, SignalingKeyPair};
use tracing::{info, warn};

use crate::error::{FetchError, InsertError, KeyGenError};

/// Client access to the content-addressed network.
///
/// Implementations are shared between tasks and must be internally
/// thread-safe. Fetch and insert budgets (timeouts, node-side retries) are the
/// implementation's business; the channel maker never imposes its own.
pub trait NodeInterface: Send + Sync {
    /// Produce a fresh signaling key pair in the network's key scheme.
    fn generate_key_pair(
        &self,
    ) -> impl Future<Output = Result<SignalingKeyPair, KeyGenError>> + Send;

    /// Derive the request URI belonging to a persisted insert URI.
    ///
    /// The derivation is the network's, so it has to come from the node that
    /// also resolves the request URI.
    fn request_uri_for(
        &self,
        insert_uri: &FreenetUri,
    ) -> impl Future<Output = Result<FreenetUri, KeyGenError>> + Send;

    /// Fetch the content stored under `uri`.
    fn fetch_uri(
        &self,
        uri: &FreenetUri,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;

    /// Submit `payload` for insertion as a single chunk under `uri`.
    ///
    /// Resolves once the node has accepted the insert, with the URI the data
    /// will be reachable at. The eventual outcome is reported to `callback`.
    fn insert_single_chunk(
        &self,
        uri: &FreenetUri,
        payload: String,
        callback: PutCallback,
    ) -> impl Future<Output = Result<FreenetUri, InsertError>> + Send;

    /// Build a callback that only logs the eventual insert outcome.
    fn void_put_callback(&self, success_msg: &str, failure_msg: &str) -> PutCallback {
        PutCallback::new(success_msg, failure_msg)
    }
}

/// Completion handler for an asynchronous insert.
///
/// Logging only: it holds no reference to channel state, so it may outlive the
/// task that submitted the insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutCallback {
    success_msg: String,
    failure_msg: String,
}

impl PutCallback {
    #[must_use]
    pub fn new(success_msg: impl Into<String>, failure_msg: impl Into<String>) -> Self {
        Self {
            success_msg: success_msg.into(),
            failure_msg: failure_msg.into(),
        }
    }

    pub fn on_success(&self, uri: &FreenetUri) {
        info!(%uri, "{}", self.success_msg);
    }

    pub fn on_failure(&self, error: &InsertError) {
        warn!(%error, "{}", self.failure_msg);
    }

    #[must_use]
    pub fn success_msg(&self) -> &str {
        &self.success_msg
    }

    #[must_use]
    pub fn failure_msg(&self) -> &str {
        &self.failure_msg
    }
}
