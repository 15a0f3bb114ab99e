//! # Connection Link
//!
//! The one piece of state shared by the supervisor, the pinger and every
//! `subscribe` caller: the connection state, the outbound frame queue of the
//! live connection, and the intents waiting for the next `ready`.
//!
//! Subscribing and the `ready` transition both run under the link lock, so an
//! intent registered while a replay is being queued lands either in the replay
//! snapshot or behind it as a direct send, never in both and never in neither.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::core::error::StreamError;
use crate::core::registry::{Callback, Intent, Registry, SubscriptionId};
use crate::core::wire::{OutboundFrame, Subscription};

/// Lifecycle of the single feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
        };
        f.write_str(name)
    }
}

struct LinkInner {
    state: ConnectionState,
    // Present only while `state == Ready`.
    outbound: Option<mpsc::UnboundedSender<String>>,
    queued: Vec<Intent>,
}

pub struct Link {
    inner: Mutex<LinkInner>,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            inner: Mutex::new(LinkInner {
                state: ConnectionState::Disconnected,
                outbound: None,
                queued: Vec::new(),
            }),
        }
    }
}

impl Link {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LinkInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Number of intents registered since the last `ready` transition.
    pub fn queued_len(&self) -> usize {
        self.lock().queued.len()
    }

    pub fn set_connecting(&self) {
        let mut inner = self.lock();
        inner.state = ConnectionState::Connecting;
        inner.outbound = None;
    }

    /// Registers a subscription and either sends it on the live connection or
    /// queues it for the next `ready`. Never waits on the network.
    pub fn subscribe(
        &self,
        registry: &Registry,
        subscription: Subscription,
        callback: Callback,
        id: Option<SubscriptionId>,
    ) -> SubscriptionId {
        let mut inner = self.lock();
        let intent = registry.register(subscription, callback, id);
        let id = intent.id();

        let outbound = match inner.state {
            ConnectionState::Ready => inner.outbound.clone(),
            _ => None,
        };

        match outbound {
            Some(outbound) => match send_subscribe(&outbound, &intent) {
                Ok(()) => log::info!("Subscription message sent: {:?}", intent.subscription),
                // Still registered; the next replay picks it up.
                Err(e) => log::error!("Subscription failed: {}", e),
            },
            None => {
                log::debug!("Connection {}; queued subscription #{}", inner.state, id);
                inner.queued.push(intent);
            }
        }

        id
    }

    /// Marks the connection ready and queues a subscribe frame for every known
    /// intent, in registration order, ahead of anything sent afterwards.
    ///
    /// Returns the number of subscriptions replayed.
    pub fn open(&self, outbound: mpsc::UnboundedSender<String>, registry: &Registry) -> usize {
        let mut inner = self.lock();
        let intents = registry.all_intents();
        let queued = inner.queued.len();

        let mut replayed = 0;
        for intent in &intents {
            match send_subscribe(&outbound, intent) {
                Ok(()) => replayed += 1,
                Err(e) => log::error!("Replay of subscription #{} failed: {}", intent.id(), e),
            }
        }

        inner.queued.clear();
        inner.outbound = Some(outbound);
        inner.state = ConnectionState::Ready;

        log::info!(
            "WebSocket connection ready. Replayed {} subscriptions ({} newly queued).",
            replayed,
            queued
        );
        replayed
    }

    pub fn close(&self) {
        let mut inner = self.lock();
        inner.outbound = None;
        inner.state = ConnectionState::Disconnected;
    }

    /// Queues a raw frame on the live connection.
    pub fn send(&self, frame: String) -> Result<(), StreamError> {
        let inner = self.lock();
        match (&inner.state, &inner.outbound) {
            (ConnectionState::Ready, Some(outbound)) => {
                outbound.send(frame).map_err(|_| StreamError::ChannelClosed)
            }
            (state, _) => Err(StreamError::NotReady(*state)),
        }
    }
}

fn send_subscribe(outbound: &mpsc::UnboundedSender<String>, intent: &Intent) -> Result<(), StreamError> {
    let frame = OutboundFrame::Subscribe { subscription: &intent.subscription }.encode()?;
    outbound.send(frame).map_err(|_| StreamError::ChannelClosed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::callback;
    use std::collections::HashMap;
    use std::sync::Barrier;
    use std::thread;

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn subscriptions_queue_until_ready() {
        let link = Link::new();
        let registry = Registry::new();
        link.subscribe(&registry, Subscription::AllMids, callback(|_| Ok(())), None);
        link.subscribe(&registry, Subscription::trades("btc"), callback(|_| Ok(())), None);
        assert_eq!(link.queued_len(), 2);
        assert_eq!(link.state(), ConnectionState::Disconnected);

        let (tx, mut rx) = mpsc::unbounded_channel();
        assert_eq!(link.open(tx, &registry), 2);

        assert_eq!(link.queued_len(), 0);
        assert_eq!(
            drain(&mut rx),
            vec![
                r#"{"method":"subscribe","subscription":{"type":"allMids"}}"#.to_string(),
                r#"{"method":"subscribe","subscription":{"type":"trades","coin":"btc"}}"#.to_string(),
            ]
        );
    }

    #[test]
    fn ready_link_sends_immediately() {
        let link = Link::new();
        let registry = Registry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        link.open(tx, &registry);

        link.subscribe(&registry, Subscription::l2_book("ETH"), callback(|_| Ok(())), None);

        assert_eq!(link.queued_len(), 0);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn failed_send_keeps_the_intent_for_replay() {
        let link = Link::new();
        let registry = Registry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        link.open(tx, &registry);
        drop(rx);

        let id = link.subscribe(&registry, Subscription::AllMids, callback(|_| Ok(())), None);
        assert_eq!(registry.all_intents()[0].id(), id);

        link.close();
        let (tx, mut rx) = mpsc::unbounded_channel();
        link.open(tx, &registry);
        assert_eq!(drain(&mut rx).len(), 1);
        assert_eq!(registry.all_intents()[0].id(), id);
    }

    #[test]
    fn raw_frames_need_a_ready_link() {
        let link = Link::new();
        assert!(matches!(
            link.send("{}".to_string()),
            Err(StreamError::NotReady(ConnectionState::Disconnected))
        ));
        link.set_connecting();
        assert!(matches!(link.send("{}".to_string()), Err(StreamError::NotReady(ConnectionState::Connecting))));
    }

    #[test]
    fn concurrent_subscribes_and_open_send_each_intent_once() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 50;

        let link = Link::new();
        let registry = Registry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Barrier::new(THREADS + 1);

        let registered: HashMap<SubscriptionId, String> = thread::scope(|s| {
            let workers: Vec<_> = (0..THREADS)
                .map(|t| {
                    let (link, registry, start) = (&link, &registry, &start);
                    s.spawn(move || {
                        start.wait();
                        (0..PER_THREAD)
                            .map(|i| {
                                let coin = format!("C{t}_{i}");
                                let id = link.subscribe(registry, Subscription::trades(&coin), callback(|_| Ok(())), None);
                                (id, coin)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            start.wait();
            link.open(tx, &registry);
            workers.into_iter().flat_map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(registered.len(), THREADS * PER_THREAD);
        assert!(link.is_ready());
        assert_eq!(link.queued_len(), 0);

        let mut seen: HashMap<String, usize> = HashMap::new();
        for frame in drain(&mut rx) {
            let frame: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(frame["method"], "subscribe");
            let coin = frame["subscription"]["coin"].as_str().unwrap().to_string();
            *seen.entry(coin).or_default() += 1;
        }
        assert_eq!(seen.len(), registered.len());
        for coin in registered.values() {
            assert_eq!(seen.get(coin), Some(&1), "{coin} not sent exactly once");
        }
    }
}
