//! # Transport Doubles
//!
//! A [`Connector`] backed by in-memory channels so the supervisor, pinger and
//! dispatcher can be exercised without a network. Every successful connect
//! hands the test a [`MockSession`] through the [`MockHub`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use futures_channel::mpsc as fmpsc;
use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use lib_stream::core::{Connection, Connector, TransportError};

/// The far end of one mock connection.
pub struct MockSession {
    sent: fmpsc::UnboundedReceiver<String>,
    inbound: fmpsc::UnboundedSender<Result<String, TransportError>>,
}

impl MockSession {
    /// Next frame written by the client, parsed as JSON. Panics if none arrives in time.
    pub async fn next_sent(&mut self) -> Value {
        let frame = tokio::time::timeout(Duration::from_secs(1), self.sent.next())
            .await
            .expect("timed out waiting for an outbound frame")
            .expect("client closed the connection");
        serde_json::from_str(&frame).expect("outbound frame is not JSON")
    }

    /// `Some(frame)` if the client writes within `within`, `None` otherwise.
    pub async fn sent_within(&mut self, within: Duration) -> Option<String> {
        tokio::time::timeout(within, self.sent.next()).await.ok().flatten()
    }

    /// Resolves once the client has closed its write half.
    pub async fn closed_by_client(&mut self) -> bool {
        matches!(tokio::time::timeout(Duration::from_secs(1), self.sent.next()).await, Ok(None))
    }

    /// Delivers a text frame to the client.
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.inbound.unbounded_send(Ok(text.into()));
    }

    /// Delivers a transport error to the client.
    pub fn fail(&self) {
        let _ = self.inbound.unbounded_send(Err(TransportError::Other("connection reset".into())));
    }

    /// Remote close: the client's read half ends.
    pub fn close(self) {}
}

/// Receives the sessions opened by a [`MockConnector`].
pub struct MockHub {
    sessions: mpsc::UnboundedReceiver<MockSession>,
}

impl MockHub {
    pub async fn next_session(&mut self) -> MockSession {
        tokio::time::timeout(Duration::from_secs(600), self.sessions.recv())
            .await
            .expect("timed out waiting for a connect")
            .expect("connector dropped")
    }
}

#[derive(Debug)]
pub struct MockConnector {
    sessions: mpsc::UnboundedSender<MockSession>,
    failing: AtomicBool,
    attempts: AtomicU32,
}

impl MockConnector {
    pub fn new() -> (Arc<Self>, MockHub) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self { sessions: tx, failing: AtomicBool::new(false), attempts: AtomicU32::new(0) });
        (connector, MockHub { sessions: rx })
    }

    /// While set, every connect attempt is refused.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Connect attempts so far, successful or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    fn connect<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Connection, TransportError>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(TransportError::Other("connection refused".into()));
            }

            let (out_tx, out_rx) = fmpsc::unbounded::<String>();
            let (in_tx, in_rx) = fmpsc::unbounded::<Result<String, TransportError>>();
            self.sessions
                .send(MockSession { sent: out_rx, inbound: in_tx })
                .map_err(|_| TransportError::Other("mock hub dropped".into()))?;

            let sink = out_tx.sink_map_err(|_| TransportError::Closed);
            Ok(Connection::new(Box::pin(sink), Box::pin(in_rx)))
        })
    }
}
