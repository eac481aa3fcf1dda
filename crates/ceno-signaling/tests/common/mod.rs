//! Scripted node interface shared by the channel maker tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use ceno_core::signal_key::local_request_uri;
use ceno_core::{FreenetUri, SignalingKeyPair};
use ceno_signaling::constants::{SIGNALER_DOC_NAME, SYN_DOC_NAME};
use ceno_signaling::{FetchError, InsertError, KeyGenError, NodeInterface, PutCallback};

/// A fixed "now" for staleness decisions: 2027-01-15.
pub const NOW: i64 = 1_800_000_000_000;

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

type FetchResult = Result<Vec<u8>, FetchError>;

/// Answers consumed in order, then a fallback forever.
struct Script {
    queue: VecDeque<FetchResult>,
    fallback: FetchResult,
}

impl Script {
    fn new(fallback: FetchResult) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback,
        }
    }

    fn next(&mut self) -> FetchResult {
        self.queue.pop_front().unwrap_or_else(|| self.fallback.clone())
    }
}

/// A recorded insert submission.
#[derive(Debug, Clone)]
pub struct Insert {
    pub uri: FreenetUri,
    pub payload: String,
    pub callback: PutCallback,
}

/// Node interface double routing fetches by document name.
///
/// Keys follow the local Ed25519 scheme, so a key generated by one mock can be
/// restored through any other.
///
/// Fetches of `syn` records default to "data not found"; fetches of the puzzle
/// record default to a fatal error so a forgotten script cannot spin forever.
pub struct MockNode {
    syn: Mutex<Script>,
    puzzle: Mutex<Script>,
    insert_result: Mutex<Option<InsertError>>,
    keygen_fails: bool,
    derivation_fails: bool,
    fetched: Mutex<Vec<FreenetUri>>,
    inserts: Mutex<Vec<Insert>>,
    keygen_calls: AtomicUsize,
    derive_calls: AtomicUsize,
}

impl MockNode {
    pub fn new() -> Self {
        Self {
            syn: Mutex::new(Script::new(Err(FetchError::DataNotFound))),
            puzzle: Mutex::new(Script::new(Err(FetchError::Fatal(
                "no scripted puzzle".into(),
            )))),
            insert_result: Mutex::new(None),
            keygen_fails: false,
            derivation_fails: false,
            fetched: Mutex::new(Vec::new()),
            inserts: Mutex::new(Vec::new()),
            keygen_calls: AtomicUsize::new(0),
            derive_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_keygen() -> Self {
        Self {
            keygen_fails: true,
            ..Self::new()
        }
    }

    pub fn failing_derivation() -> Self {
        Self {
            derivation_fails: true,
            ..Self::new()
        }
    }

    // -- Scripting --

    pub fn push_syn(&self, response: FetchResult) -> &Self {
        self.syn.lock().unwrap().queue.push_back(response);
        self
    }

    pub fn syn_always(&self, response: FetchResult) -> &Self {
        self.syn.lock().unwrap().fallback = response;
        self
    }

    pub fn push_puzzle(&self, response: FetchResult) -> &Self {
        self.puzzle.lock().unwrap().queue.push_back(response);
        self
    }

    pub fn puzzle_always(&self, response: FetchResult) -> &Self {
        self.puzzle.lock().unwrap().fallback = response;
        self
    }

    pub fn fail_inserts(&self, error: InsertError) -> &Self {
        *self.insert_result.lock().unwrap() = Some(error);
        self
    }

    // -- Observations --

    pub fn fetched(&self) -> Vec<FreenetUri> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn fetched_doc(&self, doc_name: &str) -> Vec<FreenetUri> {
        self.fetched()
            .into_iter()
            .filter(|uri| uri.doc_name() == Some(doc_name))
            .collect()
    }

    pub fn inserts(&self) -> Vec<Insert> {
        self.inserts.lock().unwrap().clone()
    }

    pub fn keygen_calls(&self) -> usize {
        self.keygen_calls.load(Ordering::SeqCst)
    }

    pub fn derive_calls(&self) -> usize {
        self.derive_calls.load(Ordering::SeqCst)
    }

    /// Total number of calls that reached the node, key generation aside.
    pub fn network_calls(&self) -> usize {
        self.fetched.lock().unwrap().len()
            + self.inserts.lock().unwrap().len()
            + self.derive_calls()
    }
}

impl NodeInterface for MockNode {
    async fn generate_key_pair(&self) -> Result<SignalingKeyPair, KeyGenError> {
        self.keygen_calls.fetch_add(1, Ordering::SeqCst);
        if self.keygen_fails {
            return Err(KeyGenError::Failed("entropy source unavailable".into()));
        }
        Ok(SignalingKeyPair::generate_local())
    }

    async fn request_uri_for(&self, insert_uri: &FreenetUri) -> Result<FreenetUri, KeyGenError> {
        self.derive_calls.fetch_add(1, Ordering::SeqCst);
        if self.derivation_fails {
            return Err(KeyGenError::Derivation("node went away".into()));
        }
        Ok(local_request_uri(insert_uri)?)
    }

    async fn fetch_uri(&self, uri: &FreenetUri) -> Result<Vec<u8>, FetchError> {
        self.fetched.lock().unwrap().push(uri.clone());
        match uri.doc_name() {
            Some(SYN_DOC_NAME) => self.syn.lock().unwrap().next(),
            Some(SIGNALER_DOC_NAME) => self.puzzle.lock().unwrap().next(),
            _ => Err(FetchError::Fatal(format!("unexpected fetch of {uri}"))),
        }
    }

    async fn insert_single_chunk(
        &self,
        uri: &FreenetUri,
        payload: String,
        callback: PutCallback,
    ) -> Result<FreenetUri, InsertError> {
        self.inserts.lock().unwrap().push(Insert {
            uri: uri.clone(),
            payload,
            callback,
        });
        match self.insert_result.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(uri.clone()),
        }
    }
}

/// A bridge key in request form, as a client would be configured with.
pub fn bridge_key() -> String {
    SignalingKeyPair::generate_local().request_uri().to_ascii_string()
}

pub fn puzzle(question: &str) -> Result<Vec<u8>, FetchError> {
    Ok(format!("question={question}\nEnd\n").into_bytes())
}

pub fn ack(timestamp: i64) -> Result<Vec<u8>, FetchError> {
    Ok(timestamp.to_string().into_bytes())
}

/// Install a test-writer subscriber so `tracing` output shows on failure.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("ceno_signaling=debug")
        .with_test_writer()
        .try_init();
}
