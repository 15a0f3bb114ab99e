//! # Registry
//!
//! Per-topic callback registrations plus the ordered list of every intent ever
//! registered, which is what a (re)connect replays.
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::identifier::{subscription_to_topic, TopicKey};
use crate::core::wire::{Subscription, WsMsg};

/// Process-unique registration id.
pub type SubscriptionId = u64;

/// Subscriber callback. Errors are logged by the dispatcher and go nowhere else.
pub type Callback = Arc<dyn Fn(&WsMsg) -> anyhow::Result<()> + Send + Sync>;

/// Wraps a closure as a [`Callback`].
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&WsMsg) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A callback and the id it was registered under.
#[derive(Clone)]
pub struct Registration {
    pub id: SubscriptionId,
    pub callback: Callback,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").field("id", &self.id).finish_non_exhaustive()
    }
}

/// A subscription request paired with its registration.
#[derive(Debug, Clone)]
pub struct Intent {
    pub subscription: Subscription,
    pub registration: Registration,
}

impl Intent {
    pub fn id(&self) -> SubscriptionId {
        self.registration.id
    }

    pub fn topic(&self) -> TopicKey {
        subscription_to_topic(&self.subscription)
    }
}

#[derive(Default)]
struct RegistryInner {
    by_topic: HashMap<TopicKey, Vec<Registration>>,
    // Registration order across all topics.
    intents: Vec<Intent>,
    last_id: SubscriptionId,
}

#[derive(Default)]
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // Callbacks never run under this lock, so a poisoned guard still holds
    // consistent data.
    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a registration under the descriptor's topic.
    ///
    /// A fresh id is allocated unless `id` is given; a caller-supplied id also
    /// moves the allocator past it so later ids stay unique.
    pub fn register(
        &self,
        subscription: Subscription,
        callback: Callback,
        id: Option<SubscriptionId>,
    ) -> Intent {
        let mut inner = self.lock();

        let id = match id {
            Some(id) => {
                inner.last_id = inner.last_id.max(id);
                id
            }
            None => {
                inner.last_id += 1;
                inner.last_id
            }
        };

        let registration = Registration { id, callback };
        let intent = Intent { subscription, registration: registration.clone() };

        inner
            .by_topic
            .entry(intent.topic())
            .or_default()
            .push(registration);
        inner.intents.push(intent.clone());

        log::debug!("Registered subscription #{} on {}", id, intent.topic());
        intent
    }

    /// Registrations for a topic in registration order. Empty for unknown topics.
    pub fn lookup(&self, topic: &TopicKey) -> Vec<Registration> {
        self.lock().by_topic.get(topic).cloned().unwrap_or_default()
    }

    /// Snapshot of every intent in registration order.
    pub fn all_intents(&self) -> Vec<Intent> {
        self.lock().intents.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
