//! # Stream Client
//!
//! The handle strategies hold. It multiplexes any number of subscriptions over
//! one connection and keeps them alive across reconnects.
//!
//! ```no_run
//! use lib_stream::core::{StreamClient, StreamConfig, Subscription};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let client = StreamClient::new(StreamConfig::default());
//! client.subscribe(Subscription::trades("BTC"), |msg| {
//!     log::info!("trades: {}", msg.data);
//!     Ok(())
//! });
//! let supervisor = client.spawn()?;
//! supervisor.await??;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::connection::{ConnectionState, Link};
use crate::core::error::StreamError;
use crate::core::pinger::Pinger;
use crate::core::registry::{Callback, Intent, Registry, SubscriptionId};
use crate::core::supervisor::{StreamConfig, Supervisor};
use crate::core::transport::{Connector, WsConnector};
use crate::core::wire::{Subscription, WsMsg};

struct ClientInner {
    config: StreamConfig,
    connector: Arc<dyn Connector>,
    registry: Arc<Registry>,
    link: Arc<Link>,
    cancel: CancellationToken,
    started: AtomicBool,
}

/// Cheap to clone; all clones share one connection.
#[derive(Clone)]
pub struct StreamClient {
    inner: Arc<ClientInner>,
}

impl StreamClient {
    /// Client over a real WebSocket connection.
    pub fn new(config: StreamConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector))
    }

    pub fn with_connector(config: StreamConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                connector,
                registry: Arc::new(Registry::new()),
                link: Arc::new(Link::new()),
                cancel: CancellationToken::new(),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Registers `callback` for every message on the subscription's topic.
    ///
    /// Sent right away when the connection is ready, otherwise queued for the
    /// next connect. Either way it is replayed after every reconnect.
    pub fn subscribe<F>(&self, subscription: Subscription, callback: F) -> SubscriptionId
    where
        F: Fn(&WsMsg) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_with_id(subscription, Arc::new(callback), None)
    }

    /// Like [`subscribe`](Self::subscribe) with a caller-chosen id.
    pub fn subscribe_with_id(
        &self,
        subscription: Subscription,
        callback: Callback,
        id: Option<SubscriptionId>,
    ) -> SubscriptionId {
        self.inner.link.subscribe(&self.inner.registry, subscription, callback, id)
    }

    /// Starts the supervisor and the pinger on the current tokio runtime.
    ///
    /// The returned handle resolves when the client is shut down or, with a
    /// retry cap configured, when reconnecting gives up.
    pub fn spawn(&self) -> Result<JoinHandle<Result<(), StreamError>>, StreamError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(StreamError::AlreadyRunning);
        }

        let inner = &self.inner;
        let pinger = Pinger::new(Arc::clone(&inner.link), inner.config.ping_interval, inner.cancel.clone());
        tokio::spawn(pinger.run());

        let supervisor = Supervisor::new(
            inner.config.clone(),
            Arc::clone(&inner.connector),
            Arc::clone(&inner.registry),
            Arc::clone(&inner.link),
            inner.cancel.clone(),
        );
        let cancel = inner.cancel.clone();

        Ok(tokio::spawn(async move {
            let result = supervisor.run().await;
            // Stops the pinger when the supervisor gives up on its own.
            cancel.cancel();
            result
        }))
    }

    /// Closes the connection and stops the background tasks.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.link.state()
    }

    /// Subscriptions registered since the connection was last ready.
    pub fn pending_len(&self) -> usize {
        self.inner.link.queued_len()
    }

    /// Every subscription registered so far, in registration order.
    pub fn intents(&self) -> Vec<Intent> {
        self.inner.registry.all_intents()
    }

    pub fn config(&self) -> &StreamConfig {
        &self.inner.config
    }
}
