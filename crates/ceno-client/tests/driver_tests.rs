//! Driver behaviour against an in-memory bridge.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ceno_client::{DriverSettings, SignalingDriver, Storage};
use ceno_core::signal_key::local_request_uri;
use ceno_core::{FreenetUri, SignalingKeyPair};
use ceno_signaling::probe::system_now_millis;
use ceno_signaling::{
    ChannelStatus, FetchError, InsertError, KeyGenError, NodeInterface, PutCallback,
};

/// A bridge that always serves a puzzle and acknowledges on demand.
#[derive(Default)]
struct FakeBridge {
    ack: Mutex<Option<i64>>,
    inserts: Mutex<Vec<(FreenetUri, String)>>,
    keygens: AtomicUsize,
}

impl FakeBridge {
    fn acknowledge_now(&self) {
        *self.ack.lock().unwrap() = Some(system_now_millis());
    }

    fn insert_count(&self) -> usize {
        self.inserts.lock().unwrap().len()
    }
}

impl NodeInterface for FakeBridge {
    async fn generate_key_pair(&self) -> Result<SignalingKeyPair, KeyGenError> {
        self.keygens.fetch_add(1, Ordering::SeqCst);
        Ok(SignalingKeyPair::generate_local())
    }

    async fn request_uri_for(&self, insert_uri: &FreenetUri) -> Result<FreenetUri, KeyGenError> {
        Ok(local_request_uri(insert_uri)?)
    }

    async fn fetch_uri(&self, uri: &FreenetUri) -> Result<Vec<u8>, FetchError> {
        match uri.doc_name() {
            Some("syn") => match *self.ack.lock().unwrap() {
                Some(ts) => Ok(ts.to_string().into_bytes()),
                None => Err(FetchError::DataNotFound),
            },
            Some("CENO-signaler") => Ok(b"question=driver-test\nEnd\n".to_vec()),
            _ => Err(FetchError::Fatal("unknown record".into())),
        }
    }

    async fn insert_single_chunk(
        &self,
        uri: &FreenetUri,
        payload: String,
        _callback: PutCallback,
    ) -> Result<FreenetUri, InsertError> {
        self.inserts.lock().unwrap().push((uri.clone(), payload));
        Ok(uri.clone())
    }
}

fn settings(regenerate_on_fatal: bool) -> DriverSettings {
    DriverSettings {
        bridge_key: SignalingKeyPair::generate_local().request_uri().to_ascii_string(),
        tick_interval: Duration::from_secs(60),
        regenerate_on_fatal,
    }
}

fn storage(dir: &tempfile::TempDir) -> Storage {
    ceno_client::logging::init_for_tests();
    Storage::new(dir.path().to_path_buf()).unwrap()
}

#[tokio::test]
async fn fresh_start_persists_generated_key() {
    let dir = tempfile::tempdir().unwrap();
    let node = Arc::new(FakeBridge::default());
    let driver = SignalingDriver::new(node, settings(true), Some(storage(&dir))).await;

    assert_eq!(driver.status(), ChannelStatus::Starting);
    let saved = storage(&dir).load_signal_key().await.unwrap();
    assert_eq!(saved, driver.maker().signaling_key_string());
}

#[tokio::test]
async fn restart_resumes_persisted_key() {
    let dir = tempfile::tempdir().unwrap();
    let node = Arc::new(FakeBridge::default());
    let settings = settings(true);

    let first = SignalingDriver::new(Arc::clone(&node), settings.clone(), Some(storage(&dir))).await;
    let second = SignalingDriver::new(Arc::clone(&node), settings, Some(storage(&dir))).await;

    assert_eq!(second.status(), ChannelStatus::WaitingForSyn);
    assert_eq!(second.maker().request_uri(), first.maker().request_uri());
    assert_eq!(node.keygens.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tick_publishes_and_confirms() {
    ceno_client::logging::init_for_tests();
    let node = Arc::new(FakeBridge::default());
    node.acknowledge_now();
    let mut driver = SignalingDriver::new(Arc::clone(&node), settings(true), None).await;

    assert_eq!(driver.tick().await, ChannelStatus::Syn);
    assert_eq!(node.insert_count(), 1);
    assert_eq!(node.inserts.lock().unwrap()[0].0.to_ascii_string(), "KSK@driver-test");

    // Fresh acknowledgement: nothing more to publish.
    assert_eq!(driver.tick().await, ChannelStatus::Syn);
    assert_eq!(node.insert_count(), 1);
}

#[tokio::test]
async fn corrupt_persisted_key_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    storage(&dir).save_signal_key("not a uri").await.unwrap();
    let node = Arc::new(FakeBridge::default());
    let mut driver = SignalingDriver::new(Arc::clone(&node), settings(true), Some(storage(&dir))).await;
    assert_eq!(driver.status(), ChannelStatus::Fatal);

    assert_eq!(driver.tick().await, ChannelStatus::WaitingForSyn);
    assert_eq!(node.insert_count(), 1);

    let saved = storage(&dir).load_signal_key().await.unwrap().unwrap();
    assert!(SignalingKeyPair::restore_local(&saved).is_ok());
    assert_eq!(Some(saved), driver.maker().signaling_key_string());
}

#[tokio::test]
async fn without_regeneration_fatal_is_final() {
    let dir = tempfile::tempdir().unwrap();
    storage(&dir).save_signal_key("not a uri").await.unwrap();
    let node = Arc::new(FakeBridge::default());
    let mut driver =
        SignalingDriver::new(Arc::clone(&node), settings(false), Some(storage(&dir))).await;

    assert_eq!(driver.tick().await, ChannelStatus::Fatal);
    assert_eq!(driver.run().await, ChannelStatus::Fatal);
    assert_eq!(node.insert_count(), 0);
    assert_eq!(
        storage(&dir).load_signal_key().await.unwrap().as_deref(),
        Some("not a uri")
    );
}

#[tokio::test(start_paused = true)]
async fn run_ticks_until_shutdown() {
    ceno_client::logging::init_for_tests();
    let node = Arc::new(FakeBridge::default());
    let mut driver = SignalingDriver::new(Arc::clone(&node), settings(true), None).await;
    let handle = driver.shutdown_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(150)).await;
        handle.shutdown();
    });

    let status = driver.run().await;
    assert_eq!(status, ChannelStatus::WaitingForSyn);
    // Unacknowledged: every cycle republishes.
    assert!(node.insert_count() >= 2);
}

#[tokio::test]
async fn shutdown_before_run_returns_immediately() {
    let node = Arc::new(FakeBridge::default());
    let mut driver = SignalingDriver::new(Arc::clone(&node), settings(true), None).await;
    driver.shutdown_handle().shutdown();

    assert_eq!(driver.run().await, ChannelStatus::Starting);
    assert_eq!(node.insert_count(), 0);
}
