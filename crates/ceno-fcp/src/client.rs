//! FCP connection with a demultiplexing read task.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ceno_core::{FreenetUri, SignalingKeyPair};
use ceno_signaling::{FetchError, InsertError, KeyGenError, NodeInterface, PutCallback};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::codes::{
    classify_derived_uri, classify_get_reply, classify_keypair_reply, classify_put_reply,
    describe,
};
use crate::config::FcpConfig;
use crate::constants::{
    ALL_DATA, CLIENT_GET, CLIENT_HELLO, CLIENT_PUT, DISCONNECT, EXPECTED_VERSION,
    FIELD_IDENTIFIER, FIELD_URI, GENERATE_SSK, GET_FAILED, KEY_DERIVATION_DOC_NAME,
    KEY_DERIVATION_PAYLOAD, MAX_DATA_LENGTH, NODE_HELLO, PROTOCOL_ERROR, PUT_FAILED,
    PUT_SUCCESSFUL, SSK_KEYPAIR, URI_GENERATED,
};
use crate::error::FcpError;
use crate::message::{FcpMessage, read_message};

/// Replies that end a fetch.
const GET_TERMINAL: &[&str] = &[ALL_DATA, GET_FAILED, PROTOCOL_ERROR];

/// Replies that end a key generation.
const KEYGEN_TERMINAL: &[&str] = &[SSK_KEYPAIR, PROTOCOL_ERROR];

/// Replies that end a key-only put.
const DERIVE_TERMINAL: &[&str] = &[URI_GENERATED, PUT_SUCCESSFUL, PUT_FAILED, PROTOCOL_ERROR];

/// A request waiting for the node.
enum Pending {
    /// Resolved by the first message whose name is in `terminal`.
    Reply {
        reply: oneshot::Sender<FcpMessage>,
        terminal: &'static [&'static str],
    },
    Put {
        /// Taken when the first reply (`URIGenerated` or a failure) arrives.
        ack: Option<oneshot::Sender<FcpMessage>>,
        callback: PutCallback,
    },
}

/// State shared with the read task.
struct FcpInner {
    writer: Mutex<Option<OwnedWriteHalf>>,
    pending: Mutex<HashMap<String, Pending>>,
    connected: AtomicBool,
}

impl FcpInner {
    async fn send(&self, message: &FcpMessage) -> Result<(), FcpError> {
        let bytes = message.encode()?;
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(FcpError::NotConnected)?;
        trace!(message = message.name(), id = ?message.identifier(), "sending");
        writer.write_all(&bytes).await?;
        Ok(())
    }

    async fn register(&self, id: String, entry: Pending) {
        self.pending.lock().await.insert(id, entry);
    }

    async fn forget(&self, id: &str) {
        self.pending.lock().await.remove(id);
    }

    /// Route one message from the node to whoever is waiting on it.
    async fn dispatch(&self, message: FcpMessage) {
        let Some(id) = message.identifier().map(str::to_owned) else {
            if message.is(PROTOCOL_ERROR) {
                warn!(reason = %describe(&message), "node reported a connection-level error");
            } else {
                trace!(message = message.name(), "ignoring unsolicited message");
            }
            return;
        };

        let mut pending = self.pending.lock().await;
        match pending.remove(&id) {
            None => trace!(%id, message = message.name(), "no request waiting for message"),
            Some(Pending::Reply { reply, terminal }) => {
                if terminal.contains(&message.name()) {
                    let _ = reply.send(message);
                } else {
                    trace!(%id, message = message.name(), "request progress");
                    pending.insert(id, Pending::Reply { reply, terminal });
                }
            }
            Some(Pending::Put { ack, callback }) => match message.name() {
                URI_GENERATED => {
                    if let Some(ack) = ack {
                        let _ = ack.send(message);
                    }
                    pending.insert(id, Pending::Put { ack: None, callback });
                }
                PUT_SUCCESSFUL => {
                    match classify_put_reply(&message) {
                        Ok(uri) => callback.on_success(&uri),
                        Err(e) => callback.on_failure(&e),
                    }
                    if let Some(ack) = ack {
                        let _ = ack.send(message);
                    }
                }
                PUT_FAILED | PROTOCOL_ERROR => match ack {
                    Some(ack) => {
                        let _ = ack.send(message);
                    }
                    None => {
                        if let Err(e) = classify_put_reply(&message) {
                            callback.on_failure(&e);
                        }
                    }
                },
                _ => {
                    trace!(%id, message = message.name(), "insert progress");
                    pending.insert(id, Pending::Put { ack, callback });
                }
            },
        }
    }

    /// Tear down the connection and fail everything still waiting.
    ///
    /// Holds the writer lock while clearing `connected` so a reconnect can
    /// never install its writer before the old one is dropped.
    async fn disconnect(&self) {
        let mut writer = self.writer.lock().await;
        let mut pending = self.pending.lock().await;
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut w) = writer.take() {
            let _ = w.shutdown().await;
        }
        for (id, entry) in pending.drain() {
            match entry {
                Pending::Reply { .. } | Pending::Put { ack: Some(_), .. } => {
                    debug!(%id, "abandoning request on lost connection");
                }
                Pending::Put { ack: None, callback } => {
                    callback.on_failure(&InsertError::NodeUnavailable(
                        "connection to node lost".into(),
                    ));
                }
            }
        }
    }
}

/// A node interface speaking FCP 2.0 to a local node.
///
/// Connects lazily on first use and again after the connection drops. Replies
/// are matched to requests by `Identifier`, so any number of fetches and
/// inserts may be in flight on the one connection.
pub struct FcpClient {
    config: FcpConfig,
    inner: Arc<FcpInner>,
    stop_tx: watch::Sender<bool>,
    connect_lock: Mutex<()>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl FcpClient {
    /// Create a client without connecting.
    pub fn new(config: FcpConfig) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            config,
            inner: Arc::new(FcpInner {
                writer: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                connected: AtomicBool::new(false),
            }),
            stop_tx,
            connect_lock: Mutex::new(()),
            task_handle: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a client and complete the handshake now.
    pub async fn connect(config: FcpConfig) -> Result<Self, FcpError> {
        let client = Self::new(config);
        client.ensure_connected().await?;
        Ok(client)
    }

    pub fn config(&self) -> &FcpConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Connect and handshake unless already connected. Fails after [`close`](Self::close).
    pub async fn ensure_connected(&self) -> Result<(), FcpError> {
        if self.is_connected() {
            return Ok(());
        }
        let _guard = self.connect_lock.lock().await;
        if self.is_connected() {
            return Ok(());
        }
        if *self.stop_tx.borrow() {
            return Err(FcpError::NotConnected);
        }

        let (reader, writer) = self.handshake().await?;
        *self.inner.writer.lock().await = Some(writer);
        self.inner.connected.store(true, Ordering::SeqCst);

        let inner = Arc::clone(&self.inner);
        let stop_rx = self.stop_tx.subscribe();
        let handle = tokio::spawn(read_loop(inner, reader, stop_rx));
        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    async fn handshake(&self) -> Result<(BufReader<OwnedReadHalf>, OwnedWriteHalf), FcpError> {
        let address = &self.config.address;
        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(address.as_str()),
        )
        .await
        .map_err(|_| FcpError::ConnectTimeout(address.clone()))??;
        let _ = stream.set_nodelay(true);
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let hello = FcpMessage::new(CLIENT_HELLO)
            .with_field("Name", &self.config.client_name)?
            .with_field("ExpectedVersion", EXPECTED_VERSION)?;
        writer.write_all(&hello.encode()?).await?;

        let reply = tokio::time::timeout(self.config.connect_timeout, read_message(&mut reader))
            .await
            .map_err(|_| FcpError::Handshake("no NodeHello before timeout".into()))??;
        match reply {
            Some(hello) if hello.is(NODE_HELLO) => {
                info!(
                    %address,
                    node = hello.field("Node").unwrap_or("unknown"),
                    version = hello.field("Version").unwrap_or("unknown"),
                    "connected to node"
                );
                Ok((reader, writer))
            }
            Some(other) => Err(FcpError::Handshake(describe(&other))),
            None => Err(FcpError::Handshake(
                "connection closed before NodeHello".into(),
            )),
        }
    }

    /// Say goodbye to the node and stop the read task. The client cannot reconnect afterwards.
    pub async fn close(&self) {
        if self.is_connected() {
            let _ = self.inner.send(&FcpMessage::new(DISCONNECT)).await;
        }
        self.stop_tx.send_replace(true);
        if let Some(handle) = self.task_handle.lock().await.take() {
            let _ = handle.await;
        }
        self.inner.disconnect().await;
        debug!(address = %self.config.address, "FCP client closed");
    }

    fn next_identifier(&self, kind: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{}-{kind}-{n}", self.config.client_name)
    }

    fn get_request(&self, id: &str, uri: &FreenetUri) -> Result<FcpMessage, FcpError> {
        FcpMessage::new(CLIENT_GET)
            .with_field(FIELD_IDENTIFIER, id)?
            .with_field(FIELD_URI, uri.to_ascii_string())?
            .with_field("ReturnType", "direct")?
            .with_field("MaxRetries", self.config.max_retries.to_string())?
            .with_field("MaxSize", MAX_DATA_LENGTH.to_string())?
            .with_field("Verbosity", "0")?
            .with_field("Global", "false")
    }

    /// Register `request` under `id`, send it and wait for one of `terminal`.
    ///
    /// Fails with a reason when the request never reached the node or the
    /// connection was lost before an answer.
    async fn request_reply(
        &self,
        id: &str,
        request: &FcpMessage,
        terminal: &'static [&'static str],
    ) -> Result<FcpMessage, String> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .register(id.to_owned(), Pending::Reply { reply: tx, terminal })
            .await;
        if let Err(e) = self.inner.send(request).await {
            self.inner.forget(id).await;
            return Err(e.to_string());
        }
        rx.await.map_err(|_| "connection to node lost".to_string())
    }

    /// A put that only computes the final URI of the bare SSK `insert_uri`.
    fn key_only_put(&self, id: &str, insert_uri: &FreenetUri) -> Result<FcpMessage, FcpError> {
        let target = format!("{}{KEY_DERIVATION_DOC_NAME}", insert_uri.to_ascii_string());
        Ok(FcpMessage::new(CLIENT_PUT)
            .with_field(FIELD_IDENTIFIER, id)?
            .with_field(FIELD_URI, target)?
            .with_field("UploadFrom", "direct")?
            .with_field("GetCHKOnly", "true")?
            .with_field("Verbosity", "0")?
            .with_field("Global", "false")?
            .with_data(KEY_DERIVATION_PAYLOAD.to_vec()))
    }

    fn put_request(&self, id: &str, uri: &FreenetUri, payload: String) -> Result<FcpMessage, FcpError> {
        Ok(FcpMessage::new(CLIENT_PUT)
            .with_field(FIELD_IDENTIFIER, id)?
            .with_field(FIELD_URI, uri.to_ascii_string())?
            .with_field("UploadFrom", "direct")?
            .with_field("Metadata.ContentType", "text/plain")?
            .with_field("MaxRetries", self.config.max_retries.to_string())?
            .with_field("Verbosity", "0")?
            .with_field("Global", "false")?
            .with_data(payload.into_bytes()))
    }
}

impl NodeInterface for FcpClient {
    async fn generate_key_pair(&self) -> Result<SignalingKeyPair, KeyGenError> {
        self.ensure_connected()
            .await
            .map_err(|e| KeyGenError::Failed(e.to_string()))?;
        let id = self.next_identifier("keygen");
        let request = FcpMessage::new(GENERATE_SSK)
            .with_field(FIELD_IDENTIFIER, &id)
            .map_err(|e| KeyGenError::Failed(e.to_string()))?;

        debug!(%id, "asking node for a fresh SSK pair");
        let reply = self
            .request_reply(&id, &request, KEYGEN_TERMINAL)
            .await
            .map_err(KeyGenError::Failed)?;
        classify_keypair_reply(&reply)
    }

    async fn request_uri_for(&self, insert_uri: &FreenetUri) -> Result<FreenetUri, KeyGenError> {
        self.ensure_connected()
            .await
            .map_err(|e| KeyGenError::Derivation(e.to_string()))?;
        let bare = insert_uri
            .to_bare_ssk()
            .map_err(|e| KeyGenError::InvalidKeys(e.into()))?;
        let id = self.next_identifier("derive");
        let request = self
            .key_only_put(&id, &bare)
            .map_err(|e| KeyGenError::Derivation(e.to_string()))?;

        debug!(%id, "asking node for the request form of a signaling key");
        let reply = self
            .request_reply(&id, &request, DERIVE_TERMINAL)
            .await
            .map_err(KeyGenError::Derivation)?;
        classify_derived_uri(&reply)
    }

    async fn fetch_uri(&self, uri: &FreenetUri) -> Result<Vec<u8>, FetchError> {
        self.ensure_connected()
            .await
            .map_err(|e| FetchError::Fatal(e.to_string()))?;
        let id = self.next_identifier("get");
        let request = self
            .get_request(&id, uri)
            .map_err(|e| FetchError::Fatal(e.to_string()))?;

        debug!(%uri, %id, "requesting");
        match self.request_reply(&id, &request, GET_TERMINAL).await {
            Ok(reply) => classify_get_reply(reply),
            Err(reason) => Err(FetchError::Transient(reason)),
        }
    }

    async fn insert_single_chunk(
        &self,
        uri: &FreenetUri,
        payload: String,
        callback: PutCallback,
    ) -> Result<FreenetUri, InsertError> {
        self.ensure_connected()
            .await
            .map_err(|e| InsertError::NodeUnavailable(e.to_string()))?;
        let id = self.next_identifier("put");
        let request = self
            .put_request(&id, uri, payload)
            .map_err(|e| InsertError::Encoding(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.inner
            .register(
                id.clone(),
                Pending::Put {
                    ack: Some(tx),
                    callback,
                },
            )
            .await;
        debug!(%id, "submitting insert");
        if let Err(e) = self.inner.send(&request).await {
            self.inner.forget(&id).await;
            return Err(InsertError::NodeUnavailable(e.to_string()));
        }

        match rx.await {
            Ok(reply) => classify_put_reply(&reply),
            Err(_) => Err(InsertError::NodeUnavailable(
                "connection to node lost".into(),
            )),
        }
    }
}

/// Read messages until the node hangs up or a stop is signalled.
async fn read_loop(
    inner: Arc<FcpInner>,
    mut reader: BufReader<OwnedReadHalf>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        if *stop_rx.borrow() {
            break;
        }
        let message = tokio::select! {
            result = read_message(&mut reader) => match result {
                Ok(Some(message)) => message,
                Ok(None) => {
                    info!("node closed the FCP connection");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "unreadable message from node, dropping connection");
                    break;
                }
            },
            _ = stop_rx.changed() => break,
        };
        trace!(message = message.name(), id = ?message.identifier(), "received");
        inner.dispatch(message).await;
    }
    inner.disconnect().await;
}
