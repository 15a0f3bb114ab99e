//! # Message Dispatcher
//!
//! Runs on the supervisor's receive loop. Each text frame is parsed, mapped to
//! its topic and handed to every callback registered for that topic, in
//! registration order.
//!
//! Callbacks are isolated from each other: an `Err` or a panic from one is
//! logged and the next callback still runs. The dispatcher never returns an
//! error; the [`DispatchOutcome`] only reports what happened.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::core::identifier::{message_to_topic, TopicKey};
use crate::core::registry::Registry;
use crate::core::wire::{WsMsg, CONNECTION_GREETING};

/// What became of one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Server greeting, nothing to route.
    Greeting,
    /// Not a JSON envelope.
    Malformed,
    /// Parsed, but carries no routable payload.
    Unrouted { channel: String },
    /// Handed to `invoked` callbacks, `failed` of which errored or panicked.
    Delivered { topic: TopicKey, invoked: usize, failed: usize },
}

pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Routes one raw text frame.
    pub fn dispatch(&self, raw: &str) -> DispatchOutcome {
        if raw == CONNECTION_GREETING {
            log::debug!("Server greeting received.");
            return DispatchOutcome::Greeting;
        }

        let msg = match WsMsg::parse(raw) {
            Ok(msg) => msg,
            Err(e) => {
                log::error!("WebSocket message error: {} - {}", e, raw);
                return DispatchOutcome::Malformed;
            }
        };

        match message_to_topic(&msg) {
            Some(topic) => self.deliver(topic, &msg),
            None => {
                log::trace!("No subscribers for '{}' frame", msg.channel);
                DispatchOutcome::Unrouted { channel: msg.channel }
            }
        }
    }

    /// Invokes every callback registered on `topic` with `msg`.
    pub fn deliver(&self, topic: TopicKey, msg: &WsMsg) -> DispatchOutcome {
        // Snapshot first: callbacks may subscribe and must not hit the registry lock.
        let registrations = self.registry.lookup(&topic);
        let mut failed = 0;

        for registration in &registrations {
            match catch_unwind(AssertUnwindSafe(|| (registration.callback)(msg))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failed += 1;
                    log::error!("Callback #{} on {} failed: {:#}", registration.id, topic, e);
                }
                Err(_) => {
                    failed += 1;
                    log::error!("Callback #{} on {} panicked", registration.id, topic);
                }
            }
        }

        DispatchOutcome::Delivered { topic, invoked: registrations.len(), failed }
    }
}
