//! The channel maker state machine.
//!
//! ```text
//!                 fresh key            persisted key
//!   [new] ------> Starting      WaitingForSyn <------ [with_signal_key]
//!                     \            /
//!                      \     (probe: fresh syn) ---------------> Syn
//!                       \        /
//!                     establish_channel
//!                       |   |   |          \
//!    puzzle fetch fatal |   |   | publish   \ submitted
//!                       v   v   v  failed    v
//!   FailedToGetSignalSsk    |   FailedToPublishKsk   WaitingForSyn --(confirm probe)--> Syn
//!             FailedToSolvePuzzle
//!
//!   any probe with an undecodable payload -----> FailedToParseSyn
//!   malformed persisted key or bridge key -----> Fatal
//! ```
//!
//! One call to [`ChannelMaker::run`] is one cycle: probe, establish if needed,
//! and a single confirmation probe. The confirmation probe never re-enters
//! establishment, so a persistently stale acknowledgement costs one insert per
//! cycle instead of looping.

use std::sync::Arc;

use ceno_core::{FreenetUri, SignalingKeyPair, parse_insert_uri};
use tracing::{debug, error, info, warn};

use crate::constants::{PUBLISH_FAILURE_MSG, PUBLISH_SUCCESS_MSG};
use crate::error::{KeyGenError, SealError};
use crate::fetch::{FetchOutcome, NotFoundPolicy, fetch_following_redirects};
use crate::node::NodeInterface;
use crate::probe::{ProbeOutcome, is_stale_at, parse_syn_timestamp, syn_uri, system_now_millis};
use crate::puzzle::{
    PlaintextSealer, PuzzleReply, ReplySealer, dead_drop_uri, parse_puzzle, signaler_uri,
};
use crate::status::{ChannelStatus, StatusHandle};

/// Source of the current time in Unix millis.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Establishes and monitors the signaling channel to one bridge.
pub struct ChannelMaker<N> {
    node: Arc<N>,
    bridge_key: String,
    keys: Option<SignalingKeyPair>,
    status: StatusHandle,
    last_synced: i64,
    clock: Clock,
    sealer: Arc<dyn ReplySealer>,
}

impl<N: NodeInterface> ChannelMaker<N> {
    /// Create a channel maker with a signaling key freshly generated by the node.
    pub async fn new(node: Arc<N>, bridge_key: impl Into<String>) -> Self {
        let bridge_key = bridge_key.into();
        match node.generate_key_pair().await {
            Ok(keys) => Self::build(node, bridge_key, Some(keys), ChannelStatus::Starting),
            Err(e) => {
                error!(error = %e, "failed to generate signaling key pair");
                Self::build(node, bridge_key, None, ChannelStatus::Fatal)
            }
        }
    }

    /// Create a channel maker from a previously persisted insert URI.
    ///
    /// The request URI is derived by the node. A string that is not an SSK
    /// insert URI, or one the node cannot derive, leaves the maker
    /// [`ChannelStatus::Fatal`] without key material. Malformed strings are
    /// rejected before the node is consulted.
    pub async fn with_signal_key(
        node: Arc<N>,
        bridge_key: impl Into<String>,
        signal_key: &str,
    ) -> Self {
        let bridge_key = bridge_key.into();
        match restore_keys(&*node, signal_key).await {
            Ok(keys) => Self::build(node, bridge_key, Some(keys), ChannelStatus::WaitingForSyn),
            Err(e) => {
                error!(error = %e, "persisted signaling key is unusable");
                Self::build(node, bridge_key, None, ChannelStatus::Fatal)
            }
        }
    }

    /// Resume from a persisted key if there is one, otherwise start fresh.
    pub async fn resume(
        node: Arc<N>,
        bridge_key: impl Into<String>,
        signal_key: Option<&str>,
    ) -> Self {
        match signal_key {
            Some(key) => Self::with_signal_key(node, bridge_key, key).await,
            None => Self::new(node, bridge_key).await,
        }
    }

    fn build(
        node: Arc<N>,
        bridge_key: String,
        keys: Option<SignalingKeyPair>,
        status: ChannelStatus,
    ) -> Self {
        Self {
            node,
            bridge_key,
            keys,
            status: StatusHandle::new(status),
            last_synced: 0,
            clock: Arc::new(system_now_millis),
            sealer: Arc::new(PlaintextSealer),
        }
    }

    /// Replace the wall clock used for staleness decisions.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the transformation applied to the reply before insertion.
    #[must_use]
    pub fn with_sealer(mut self, sealer: impl ReplySealer + 'static) -> Self {
        self.sealer = Arc::new(sealer);
        self
    }

    // -- Observers --

    #[must_use]
    pub fn status(&self) -> ChannelStatus {
        self.status.get()
    }

    /// A cloneable view of the status for other tasks.
    #[must_use]
    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.status.is_fatal()
    }

    #[must_use]
    pub fn can_send(&self) -> bool {
        self.status.can_send()
    }

    /// The insert URI in ASCII form, for the caller to persist.
    ///
    /// `None` only when construction failed and the maker is fatal.
    #[must_use]
    pub fn signaling_key_string(&self) -> Option<String> {
        self.keys.as_ref().map(SignalingKeyPair::insert_string)
    }

    #[must_use]
    pub fn key_pair(&self) -> Option<&SignalingKeyPair> {
        self.keys.as_ref()
    }

    #[must_use]
    pub fn request_uri(&self) -> Option<&FreenetUri> {
        self.keys.as_ref().map(SignalingKeyPair::request_uri)
    }

    /// Unix millis of the last fresh acknowledgement, 0 if none was seen.
    #[must_use]
    pub fn last_synced(&self) -> i64 {
        self.last_synced
    }

    #[must_use]
    pub fn bridge_key(&self) -> &str {
        &self.bridge_key
    }

    // -- Cycle --

    /// Run one probe-then-establish cycle and return the resulting status.
    pub async fn run(&mut self) -> ChannelStatus {
        if self.is_fatal() {
            debug!(status = %self.status(), "channel maker is fatal, skipping cycle");
            return self.status();
        }

        match self.check_channel_established().await {
            ProbeOutcome::Established { .. } | ProbeOutcome::Unparseable => {
                return self.status();
            }
            ProbeOutcome::Stale { acknowledged_at } => {
                info!(acknowledged_at, "bridge acknowledgement expired, re-establishing");
            }
            ProbeOutcome::Skipped | ProbeOutcome::Absent => {}
        }
        if self.is_fatal() {
            return self.status();
        }
        if self.status() == ChannelStatus::Syn {
            self.status.transition(ChannelStatus::WaitingForSyn);
        }

        if self.establish_channel().await {
            match self.check_channel_established().await {
                ProbeOutcome::Established { .. } => {}
                ProbeOutcome::Stale { acknowledged_at } => {
                    debug!(acknowledged_at, "acknowledgement still stale, waiting for bridge");
                }
                outcome => debug!(?outcome, "bridge has not acknowledged yet"),
            }
        }
        self.status()
    }

    /// Look for a fresh acknowledgement from the bridge.
    async fn check_channel_established(&mut self) -> ProbeOutcome {
        if !self.status().may_have_syn() {
            return ProbeOutcome::Skipped;
        }
        let Some(request_uri) = self.request_uri() else {
            return ProbeOutcome::Skipped;
        };
        let uri = match syn_uri(request_uri) {
            Ok(uri) => uri,
            Err(e) => {
                error!(error = %e, "cannot build acknowledgement URI");
                self.status.transition(ChannelStatus::Fatal);
                return ProbeOutcome::Absent;
            }
        };

        debug!(%uri, "probing for bridge acknowledgement");
        let payload = match fetch_following_redirects(&*self.node, uri, NotFoundPolicy::GiveUp)
            .await
        {
            FetchOutcome::Found { payload, .. } => payload,
            FetchOutcome::NotFound { .. } => return ProbeOutcome::Absent,
            FetchOutcome::Failed { uri, reason } => {
                debug!(%uri, %reason, "acknowledgement fetch failed");
                return ProbeOutcome::Absent;
            }
        };

        let acknowledged_at = match parse_syn_timestamp(&payload) {
            Ok(ts) => ts,
            Err(e) => {
                error!(error = %e, "failed to parse bridge acknowledgement");
                self.status.transition(ChannelStatus::FailedToParseSyn);
                return ProbeOutcome::Unparseable;
            }
        };
        if is_stale_at((self.clock)(), acknowledged_at) {
            return ProbeOutcome::Stale { acknowledged_at };
        }

        self.last_synced = acknowledged_at;
        if self.status.transition(ChannelStatus::Syn) == ChannelStatus::Syn {
            info!(acknowledged_at, "signaling channel established");
        }
        ProbeOutcome::Established { acknowledged_at }
    }

    /// One round of the puzzle handshake. Returns whether the reply was submitted.
    async fn establish_channel(&mut self) -> bool {
        let signaler = match FreenetUri::parse(&self.bridge_key).and_then(|key| signaler_uri(&key))
        {
            Ok(uri) => uri,
            Err(e) => {
                error!(error = %e, "bridge key is not a usable URI");
                self.status.transition(ChannelStatus::Fatal);
                return false;
            }
        };

        debug!(uri = %signaler, "fetching bridge puzzle");
        let payload =
            match fetch_following_redirects(&*self.node, signaler, NotFoundPolicy::Retry).await {
                FetchOutcome::Found { payload, .. } => payload,
                FetchOutcome::Failed { uri, reason } => {
                    error!(%uri, %reason, "failed to fetch bridge puzzle");
                    self.status.transition(ChannelStatus::FailedToGetSignalSsk);
                    return false;
                }
                FetchOutcome::NotFound { uri } => {
                    error!(%uri, "bridge puzzle not found");
                    self.status.transition(ChannelStatus::FailedToGetSignalSsk);
                    return false;
                }
            };

        let question = match parse_puzzle(&payload) {
            Ok(question) => question,
            Err(e) => {
                error!(error = %e, "failed to solve bridge puzzle");
                self.status.transition(ChannelStatus::FailedToSolvePuzzle);
                return false;
            }
        };

        let body = match self.sealed_reply() {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "failed to encode puzzle reply");
                self.status.transition(ChannelStatus::FailedToPublishKsk);
                return false;
            }
        };
        let dead_drop = match dead_drop_uri(&question) {
            Ok(uri) => uri,
            Err(e) => {
                error!(error = %e, "puzzle answer is not a valid keyword URI");
                self.status.transition(ChannelStatus::FailedToPublishKsk);
                return false;
            }
        };

        let callback = self
            .node
            .void_put_callback(PUBLISH_SUCCESS_MSG, PUBLISH_FAILURE_MSG);
        match self
            .node
            .insert_single_chunk(&dead_drop, body, callback)
            .await
        {
            Ok(inserted) => {
                info!(uri = %inserted, "submitted signaling key to the bridge's dead drop");
                self.status.transition(ChannelStatus::WaitingForSyn);
                true
            }
            Err(e) => {
                warn!(uri = %dead_drop, error = %e, "insert submission rejected");
                self.status.transition(ChannelStatus::FailedToPublishKsk);
                false
            }
        }
    }

    fn sealed_reply(&self) -> Result<String, SealError> {
        let keys = self
            .keys
            .as_ref()
            .ok_or_else(|| SealError::Sealing("no signaling key".into()))?;
        let encoded = PuzzleReply::new(keys.insert_string()).encode()?;
        self.sealer.seal(encoded)
    }
}

async fn restore_keys<N: NodeInterface>(
    node: &N,
    signal_key: &str,
) -> Result<SignalingKeyPair, KeyGenError> {
    let insert_uri = parse_insert_uri(signal_key)?;
    let request_uri = node.request_uri_for(&insert_uri).await?;
    Ok(SignalingKeyPair::from_parts(insert_uri, request_uri)?)
}

impl<N> std::fmt::Debug for ChannelMaker<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelMaker")
            .field("bridge_key", &self.bridge_key)
            .field("keys", &self.keys)
            .field("status", &self.status.get())
            .field("last_synced", &self.last_synced)
            .finish_non_exhaustive()
    }
}
