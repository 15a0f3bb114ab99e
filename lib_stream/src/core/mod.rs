//! # Core Stream Module
//!
//! The streaming engine: one persistent feed connection carrying any number of
//! logical subscriptions.
//!
//! ## Core Components:
//!
//! - **`identifier`**: maps subscriptions and inbound envelopes to a shared
//!   `TopicKey`.
//! - **`registry`**: per-topic callback registrations and the ordered intent
//!   list used for replay.
//! - **`connection`**: connection state, outbound queue of the live connection
//!   and intents waiting for `ready`.
//! - **`supervisor`**: the connect / replay / receive / backoff loop.
//! - **`pinger`**: periodic keepalive while ready.
//! - **`dispatcher`**: routes parsed frames to callbacks with per-callback
//!   failure isolation.
//! - **`client`**: the `StreamClient` facade that ties the above together.

/// Wire formats for descriptors, outbound frames and inbound envelopes.
pub mod wire;
/// Topic keys derived from subscriptions and messages.
pub mod identifier;
/// Ordered, synchronized subscription registrations.
pub mod registry;
/// Routes inbound frames to subscriber callbacks.
pub mod dispatcher;
/// Connection state shared by the supervisor, pinger and subscribers.
pub mod connection;
/// Transport abstraction and the WebSocket implementation.
pub mod transport;
/// The reconnecting connection loop.
pub mod supervisor;
mod pinger;
/// Public client handle.
pub mod client;
/// Error types of the streaming core.
pub mod error;

// --- Public API Re-exports ---
pub use client::StreamClient;
pub use connection::ConnectionState;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::StreamError;
pub use identifier::{message_to_topic, subscription_to_topic, TopicKey};
pub use registry::{callback, Callback, Intent, Registration, Registry, SubscriptionId};
pub use supervisor::StreamConfig;
pub use transport::{Connection, Connector, FrameSink, FrameStream, TransportError, WsConnector};
pub use wire::{OutboundFrame, Subscription, WsMsg};
