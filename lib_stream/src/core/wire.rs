//! # Wire Formats
//!
//! JSON shapes exchanged with the feed: the subscription descriptors we send,
//! the outbound control frames, and the inbound `{channel, data}` envelope that
//! every subscriber callback receives.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plain-text greeting some feed servers push right after the handshake.
pub const CONNECTION_GREETING: &str = "Websocket connection established.";

/// A subscription descriptor as understood by the feed.
///
/// Serialized with an inline `type` tag, e.g. `{"type":"trades","coin":"BTC"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Subscription {
    /// Mid prices for every listed instrument.
    AllMids,
    /// Level-2 order book snapshots for one instrument.
    L2Book {
        /// Instrument symbol as the caller spelled it.
        coin: String,
    },
    /// Public trade prints for one instrument.
    Trades {
        /// Instrument symbol as the caller spelled it.
        coin: String,
    },
    /// Fills, funding and liquidation events for one account.
    UserEvents {
        /// Account address.
        user: String,
    },
}

impl Subscription {
    /// Shorthand for an order book subscription.
    pub fn l2_book(coin: impl Into<String>) -> Self {
        Self::L2Book { coin: coin.into() }
    }

    /// Shorthand for a trades subscription.
    pub fn trades(coin: impl Into<String>) -> Self {
        Self::Trades { coin: coin.into() }
    }

    /// Shorthand for a user events subscription.
    pub fn user_events(user: impl Into<String>) -> Self {
        Self::UserEvents { user: user.into() }
    }
}

/// Frames written by the client.
#[derive(Debug, Serialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum OutboundFrame<'a> {
    /// `{"method":"subscribe","subscription":{...}}`
    Subscribe {
        /// Descriptor being subscribed to.
        subscription: &'a Subscription,
    },
    /// `{"method":"ping"}`
    Ping,
}

impl OutboundFrame<'_> {
    /// Serializes the frame to the text payload sent over the socket.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// An inbound message envelope.
///
/// `data` is kept as raw JSON; its shape depends on `channel`. Typed views are
/// available through [`WsMsg::data_as`] and the structs in
/// [`crate::markets::hyperliquid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsMsg {
    pub channel: String,
    #[serde(default)]
    pub data: Value,
}

impl WsMsg {
    /// Parses one text frame.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Deserializes `data` into a typed payload.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}
