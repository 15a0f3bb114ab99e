//! # Hyperliquid Feed Payloads
//!
//! Endpoints and typed views of the `data` field for the channels this client
//! routes. Obtain them with [`WsMsg::data_as`](crate::core::WsMsg::data_as).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Production WebSocket endpoint.
pub const MAINNET_WS_URL: &str = "wss://api.hyperliquid.xyz/ws";
/// Testnet WebSocket endpoint.
pub const TESTNET_WS_URL: &str = "wss://api.hyperliquid-testnet.xyz/ws";

/// `allMids` payload: symbol -> mid price, as decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllMids {
    pub mids: HashMap<String, String>,
}

impl AllMids {
    /// Mid price of `coin`, if listed and numeric.
    pub fn mid(&self, coin: &str) -> Option<f64> {
        self.mids.get(coin)?.parse().ok()
    }
}

/// One price level of an order book side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L2Level {
    pub px: String,
    pub sz: String,
    /// Number of resting orders at this level.
    #[serde(default)]
    pub n: u64,
}

/// `l2Book` payload. `levels[0]` are bids, `levels[1]` asks, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct L2Book {
    pub coin: String,
    pub levels: Vec<Vec<L2Level>>,
    #[serde(default)]
    pub time: u64,
}

impl L2Book {
    pub fn best_bid(&self) -> Option<&L2Level> {
        self.levels.first()?.first()
    }

    pub fn best_ask(&self) -> Option<&L2Level> {
        self.levels.get(1)?.first()
    }
}

/// One element of a `trades` batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub coin: String,
    /// `"B"` for buyer-initiated, `"A"` for seller-initiated.
    pub side: String,
    pub px: String,
    pub sz: String,
    #[serde(default)]
    pub time: u64,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub tid: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wire::WsMsg;

    #[test]
    fn all_mids_payload_parses() {
        let msg = WsMsg::parse(r#"{"channel":"allMids","data":{"mids":{"HYPE":"21.5","BAD":"n/a"}}}"#).unwrap();
        let mids: AllMids = msg.data_as().unwrap();
        assert_eq!(mids.mid("HYPE"), Some(21.5));
        assert_eq!(mids.mid("BAD"), None);
        assert_eq!(mids.mid("BTC"), None);
    }

    #[test]
    fn book_sides_are_exposed() {
        let msg = WsMsg::parse(
            r#"{"channel":"l2Book","data":{"coin":"ETH","time":5,
                "levels":[[{"px":"99.5","sz":"1","n":2}],[{"px":"100.5","sz":"3","n":1}]]}}"#,
        )
        .unwrap();
        let book: L2Book = msg.data_as().unwrap();
        assert_eq!(book.best_bid().map(|l| l.px.as_str()), Some("99.5"));
        assert_eq!(book.best_ask().map(|l| l.px.as_str()), Some("100.5"));
    }

    #[test]
    fn trade_batch_parses_with_missing_optional_fields() {
        let msg = WsMsg::parse(r#"{"channel":"trades","data":[{"coin":"BTC","side":"B","px":"1","sz":"2"}]}"#).unwrap();
        let trades: Vec<Trade> = msg.data_as().unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].tid, 0);
    }
}
