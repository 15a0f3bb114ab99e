//! # Topic Identifiers
//!
//! Maps subscription descriptors and inbound envelopes onto one routing key so
//! that many subscribers can share a single server-side subscription.
//! Instrument symbols are lower-cased, which makes `BTC` and `btc` the same topic.

use std::fmt;

use serde_json::Value;

use crate::core::wire::{Subscription, WsMsg};

/// Routing key shared by a subscription and the messages it produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicKey(String);

impl TopicKey {
    fn with_coin(kind: &str, coin: &str) -> Self {
        Self(format!("{}:{}", kind, coin.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Subscription> for TopicKey {
    fn from(subscription: &Subscription) -> Self {
        subscription_to_topic(subscription)
    }
}

/// Topic key a subscription descriptor routes to.
pub fn subscription_to_topic(subscription: &Subscription) -> TopicKey {
    match subscription {
        Subscription::AllMids => TopicKey("allMids".to_string()),
        Subscription::L2Book { coin } => TopicKey::with_coin("l2Book", coin),
        Subscription::Trades { coin } => TopicKey::with_coin("trades", coin),
        Subscription::UserEvents { .. } => TopicKey("userEvents".to_string()),
    }
}

/// Topic key an inbound envelope belongs to.
///
/// `None` for control frames (`pong`, subscription acks), empty trade batches,
/// payloads missing their `coin`, and channels this client does not know.
pub fn message_to_topic(msg: &WsMsg) -> Option<TopicKey> {
    match msg.channel.as_str() {
        "allMids" => Some(TopicKey("allMids".to_string())),
        "l2Book" => coin_of(&msg.data).map(|coin| TopicKey::with_coin("l2Book", coin)),
        "trades" => msg
            .data
            .as_array()
            .and_then(|trades| trades.first())
            .and_then(coin_of)
            .map(|coin| TopicKey::with_coin("trades", coin)),
        "user" => Some(TopicKey("userEvents".to_string())),
        _ => None,
    }
}

fn coin_of(value: &Value) -> Option<&str> {
    value.get("coin").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(channel: &str, data: Value) -> WsMsg {
        WsMsg { channel: channel.to_string(), data }
    }

    #[test]
    fn instrument_case_does_not_change_the_topic() {
        for (upper, lower) in [
            (Subscription::trades("BTC"), Subscription::trades("btc")),
            (Subscription::l2_book("Eth"), Subscription::l2_book("eTH")),
        ] {
            assert_eq!(subscription_to_topic(&upper), subscription_to_topic(&lower));
        }
        assert_eq!(subscription_to_topic(&Subscription::trades("BTC")).as_str(), "trades:btc");
    }

    #[test]
    fn account_wide_topics_ignore_parameters() {
        assert_eq!(
            subscription_to_topic(&Subscription::user_events("0x1")),
            subscription_to_topic(&Subscription::user_events("0x2")),
        );
        assert_eq!(subscription_to_topic(&Subscription::AllMids).as_str(), "allMids");
    }

    #[test]
    fn messages_route_to_their_subscription_topic() {
        let book = msg("l2Book", json!({"coin": "SOL", "levels": [[], []], "time": 1}));
        assert_eq!(message_to_topic(&book), Some(subscription_to_topic(&Subscription::l2_book("sol"))));

        let trades = msg("trades", json!([{"coin": "BTC", "px": "1"}, {"coin": "BTC", "px": "2"}]));
        assert_eq!(message_to_topic(&trades), Some(subscription_to_topic(&Subscription::trades("Btc"))));

        let mids = msg("allMids", json!({"mids": {"BTC": "1"}}));
        assert_eq!(message_to_topic(&mids), Some(subscription_to_topic(&Subscription::AllMids)));

        let user = msg("user", json!({"fills": []}));
        assert_eq!(message_to_topic(&user), Some(subscription_to_topic(&Subscription::user_events("0x1"))));
    }

    #[test]
    fn empty_trade_batch_has_no_topic() {
        assert_eq!(message_to_topic(&msg("trades", json!([]))), None);
    }

    #[test]
    fn control_and_unknown_channels_have_no_topic() {
        assert_eq!(message_to_topic(&msg("pong", Value::Null)), None);
        assert_eq!(message_to_topic(&msg("subscriptionResponse", json!({"method": "subscribe"}))), None);
        assert_eq!(message_to_topic(&msg("candle", json!({"s": "BTC"}))), None);
        assert_eq!(message_to_topic(&msg("l2Book", json!({"levels": []}))), None);
    }
}
