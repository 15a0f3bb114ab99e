//! # Connection Supervisor
//!
//! Owns the single feed connection:
//! `disconnected -> connecting -> ready -> disconnected -> ...`, forever unless
//! a retry cap is configured or the client is shut down.
//!
//! Every time the connection becomes ready the [`Link`] replays all known
//! subscriptions before any other outbound frame. Inbound frames are dispatched
//! on this task, so callbacks for one topic see messages in arrival order.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::core::connection::Link;
use crate::core::dispatcher::Dispatcher;
use crate::core::error::StreamError;
use crate::core::registry::Registry;
use crate::core::transport::{Connection, Connector};
use crate::markets::hyperliquid::MAINNET_WS_URL;

/// Configuration for the feed connection.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub url: String,
    /// Pause between losing a connection and the next connect attempt.
    pub reconnect_interval: Duration,
    /// Keepalive period while the connection is ready.
    pub ping_interval: Duration,
    /// Consecutive failed connect attempts tolerated before giving up.
    /// `Some(0)` gives up on the first failed connect. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: MAINNET_WS_URL.to_string(),
            reconnect_interval: Duration::from_secs(5),
            ping_interval: Duration::from_secs(50),
            max_reconnect_attempts: None,
        }
    }
}

pub(crate) struct Supervisor {
    config: StreamConfig,
    connector: Arc<dyn Connector>,
    registry: Arc<Registry>,
    link: Arc<Link>,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
}

impl Supervisor {
    pub(crate) fn new(
        config: StreamConfig,
        connector: Arc<dyn Connector>,
        registry: Arc<Registry>,
        link: Arc<Link>,
        cancel: CancellationToken,
    ) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        Self { config, connector, registry, link, dispatcher, cancel }
    }

    /// Connect/reconnect loop. Only returns on shutdown or when the retry cap is hit.
    pub(crate) async fn run(self) -> Result<(), StreamError> {
        let mut failures: u32 = 0;

        loop {
            self.link.set_connecting();
            log::info!("Connecting to {}", self.config.url);

            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.connector.connect(&self.config.url) => result,
            };

            match connected {
                Ok(connection) => {
                    failures = 0;
                    log::info!("WebSocket connection opened.");
                    self.drive(connection).await;
                }
                Err(e) => {
                    failures += 1;
                    log::error!("Failed to connect to {}: {}", self.config.url, e);
                }
            }

            self.link.close();
            if self.cancel.is_cancelled() {
                break;
            }

            if let Some(max) = self.config.max_reconnect_attempts {
                // A drop after a successful connect is not a failure, even with a cap of 0.
                if failures > 0 && failures >= max {
                    log::error!("Giving up after {} failed connect attempts.", failures);
                    return Err(StreamError::RetriesExhausted { attempts: failures });
                }
            }

            log::warn!(
                "WebSocket disconnected. Reconnecting in {} seconds...",
                self.config.reconnect_interval.as_secs()
            );
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.config.reconnect_interval) => {}
            }
        }

        self.link.close();
        log::info!("Stream supervisor stopped.");
        Ok(())
    }

    /// Pumps one live connection until it fails, closes or the client shuts down.
    async fn drive(&self, connection: Connection) {
        let Connection { mut sink, mut stream } = connection;
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        self.link.open(outbound_tx, &self.registry);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    log::info!("Closing WebSocket connection.");
                    let _ = sink.close().await;
                    return;
                }
                Some(frame) = outbound_rx.recv() => {
                    log::trace!("Sending frame: {}", frame);
                    if let Err(e) = sink.send(frame).await {
                        log::error!("Failed to send frame: {}", e);
                        break;
                    }
                }
                inbound = stream.next() => match inbound {
                    Some(Ok(text)) => {
                        self.dispatcher.dispatch(&text);
                    }
                    Some(Err(e)) => {
                        log::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        log::warn!("WebSocket closed by remote host.");
                        break;
                    }
                }
            }
        }
    }
}
