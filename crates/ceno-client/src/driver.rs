//! Periodic driver around a [`ChannelMaker`].

use std::sync::Arc;
use std::time::Duration;

use ceno_signaling::{ChannelMaker, ChannelStatus, NodeInterface};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::storage::Storage;

/// Everything the driver needs besides the node and storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSettings {
    pub bridge_key: String,
    pub tick_interval: Duration,
    pub regenerate_on_fatal: bool,
}

impl DriverSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            bridge_key: config.bridge.key.trim().to_string(),
            tick_interval: Duration::from_secs(config.signaling.tick_interval_secs),
            regenerate_on_fatal: config.signaling.regenerate_on_fatal,
        }
    }
}

/// Requests a running driver to stop. Cloneable across tasks.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Keeps a signaling channel alive by running its channel maker on a tick.
pub struct SignalingDriver<N> {
    node: Arc<N>,
    settings: DriverSettings,
    storage: Option<Storage>,
    maker: ChannelMaker<N>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl<N: NodeInterface> SignalingDriver<N> {
    /// Restore the persisted key if there is one; otherwise generate and persist a new one.
    pub async fn new(node: Arc<N>, settings: DriverSettings, storage: Option<Storage>) -> Self {
        let persisted = match &storage {
            Some(storage) => match storage.load_signal_key().await {
                Ok(key) => key,
                Err(e) => {
                    warn!(error = %e, "could not read persisted signaling key, starting fresh");
                    None
                }
            },
            None => None,
        };

        let maker = ChannelMaker::resume(
            Arc::clone(&node),
            settings.bridge_key.clone(),
            persisted.as_deref(),
        )
        .await;
        match &persisted {
            Some(_) => info!(status = %maker.status(), "resumed persisted signaling key"),
            None => info!("generated new signaling key"),
        }

        let (shutdown_tx, _) = watch::channel(false);
        let driver = Self {
            node,
            settings,
            storage,
            maker,
            shutdown_tx: Arc::new(shutdown_tx),
        };
        if persisted.is_none() {
            driver.persist_key().await;
        }
        driver
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    pub fn maker(&self) -> &ChannelMaker<N> {
        &self.maker
    }

    pub fn status(&self) -> ChannelStatus {
        self.maker.status()
    }

    /// One channel maker cycle, replacing a fatal maker first if configured to.
    pub async fn tick(&mut self) -> ChannelStatus {
        if self.maker.is_fatal() && self.settings.regenerate_on_fatal {
            self.regenerate().await;
        }

        let before = self.maker.status();
        let status = self.maker.run().await;
        if status != before {
            info!(from = %before, to = %status, "channel status changed");
        } else {
            debug!(%status, "cycle complete");
        }
        if status.is_fatal() {
            if self.settings.regenerate_on_fatal {
                warn!(%status, "channel maker failed, a fresh key will be used next cycle");
            } else {
                error!(%status, "channel maker failed permanently");
            }
        }
        status
    }

    /// Run cycles every `tick_interval` until shut down.
    ///
    /// Returns early if the maker is fatal and regeneration is disabled, since
    /// no later cycle could change anything. A cycle in progress is abandoned
    /// at shutdown.
    pub async fn run(&mut self) -> ChannelStatus {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut interval = tokio::time::interval(self.settings.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.settings.tick_interval.as_secs(),
            "signaling driver started"
        );
        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown_rx.changed() => break,
            }

            tokio::select! {
                status = self.tick() => {
                    if status.is_fatal() && !self.settings.regenerate_on_fatal {
                        break;
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }
        info!(status = %self.maker.status(), "signaling driver stopped");
        self.maker.status()
    }

    async fn regenerate(&mut self) {
        info!(old_status = %self.maker.status(), "replacing failed channel maker with a fresh key");
        self.maker =
            ChannelMaker::new(Arc::clone(&self.node), self.settings.bridge_key.clone()).await;
        self.persist_key().await;
    }

    async fn persist_key(&self) {
        let (Some(storage), Some(key)) = (&self.storage, self.maker.signaling_key_string()) else {
            return;
        };
        match storage.save_signal_key(&key).await {
            Ok(()) => debug!(dir = %storage.base_dir().display(), "signaling key persisted"),
            Err(e) => warn!(error = %e, "failed to persist signaling key"),
        }
    }
}

/// Process exit code for a single-cycle run.
pub fn once_exit_code(status: ChannelStatus) -> i32 {
    if status.can_send() {
        0
    } else if status.is_fatal() {
        1
    } else {
        2
    }
}
