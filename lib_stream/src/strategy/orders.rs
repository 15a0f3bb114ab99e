//! # Order Sink
//!
//! The boundary between strategy decisions and an exchange. Live trading
//! implements [`OrderExecutor`] against a venue; [`PaperExecutor`] fills every
//! order in memory at the last observed price.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::context::{Decision, StrategyParams};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Invalid order: {0}")]
    Invalid(String),

    #[error("Venue returned an error: {0}")]
    Venue(String),

    #[error("Order transport failed: {0}")]
    Transport(String),
}

/// A fill report as the venue returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub oid: u64,
    pub total_sz: String,
    pub avg_px: String,
}

/// Outcome of one order, shaped like the venue's `{"filled":..}` / `{"error":..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Filled(Fill),
    #[serde(rename = "error")]
    Rejected(String),
}

pub trait OrderExecutor: Send + Sync {
    /// Places a market order and returns one status per resulting order.
    fn place_market_order(&self, coin: &str, is_buy: bool, size: f64) -> Result<Vec<OrderStatus>, OrderError>;

    /// Latest price seen by the caller. Executors that simulate fills use it.
    fn observe_price(&self, _coin: &str, _price: f64) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaperOrder {
    pub oid: u64,
    pub coin: String,
    pub is_buy: bool,
    pub size: f64,
    pub price: Option<f64>,
}

/// Records orders instead of sending them.
#[derive(Debug, Default)]
pub struct PaperExecutor {
    next_oid: AtomicU64,
    marks: Mutex<HashMap<String, f64>>,
    orders: Mutex<Vec<PaperOrder>>,
}

impl PaperExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders placed so far, oldest first.
    pub fn orders(&self) -> Vec<PaperOrder> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl OrderExecutor for PaperExecutor {
    fn place_market_order(&self, coin: &str, is_buy: bool, size: f64) -> Result<Vec<OrderStatus>, OrderError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(OrderError::Invalid(format!("size must be positive, got {}", size)));
        }

        let price = self.marks.lock().unwrap_or_else(PoisonError::into_inner).get(coin).copied();
        let Some(px) = price else {
            return Ok(vec![OrderStatus::Rejected(format!("No price observed for {}", coin))]);
        };

        let oid = self.next_oid.fetch_add(1, Ordering::Relaxed) + 1;
        self.orders.lock().unwrap_or_else(PoisonError::into_inner).push(PaperOrder {
            oid,
            coin: coin.to_string(),
            is_buy,
            size,
            price: Some(px),
        });
        log::info!("[paper] #{} {} {} {} @ {}", oid, if is_buy { "BUY" } else { "SELL" }, size, coin, px);

        Ok(vec![OrderStatus::Filled(Fill { oid, total_sz: size.to_string(), avg_px: px.to_string() })])
    }

    fn observe_price(&self, coin: &str, price: f64) {
        self.marks.lock().unwrap_or_else(PoisonError::into_inner).insert(coin.to_string(), price);
    }
}

/// Sends the market order implied by `decision` and logs every status.
pub fn execute_decision(
    executor: &dyn OrderExecutor,
    params: &StrategyParams,
    decision: &Decision,
) -> Result<Vec<OrderStatus>, OrderError> {
    let is_buy = decision.is_buy();
    log::info!(
        "Market {} {} {} ({})",
        if is_buy { "Buy" } else { "Sell" },
        params.size,
        params.coin,
        decision.setup()
    );

    executor.observe_price(&params.coin, decision.price());
    let statuses = executor.place_market_order(&params.coin, is_buy, params.size)?;
    for status in &statuses {
        match status {
            OrderStatus::Filled(fill) => {
                log::info!("Order #{} filled {} @{}", fill.oid, fill.total_sz, fill.avg_px)
            }
            OrderStatus::Rejected(msg) => log::error!("Order error: {}", msg),
        }
    }
    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::context::Setup;

    #[test]
    fn venue_statuses_deserialize() {
        let raw = r#"[{"filled":{"oid":77,"totalSz":"0.5","avgPx":"21.3"}},{"error":"Insufficient margin"}]"#;
        let statuses: Vec<OrderStatus> = serde_json::from_str(raw).unwrap();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Filled(Fill { oid: 77, total_sz: "0.5".into(), avg_px: "21.3".into() }),
                OrderStatus::Rejected("Insufficient margin".into()),
            ]
        );
    }

    #[test]
    fn paper_fills_at_observed_price() {
        let paper = PaperExecutor::new();
        let params = StrategyParams::default();
        let decision = Decision::Enter { setup: Setup::SpikeShort, price: 21.5 };

        let statuses = execute_decision(&paper, &params, &decision).unwrap();
        assert!(matches!(&statuses[..], [OrderStatus::Filled(f)] if f.oid == 1 && f.avg_px == "21.5"));

        let orders = paper.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].coin, "HYPE");
        assert!(!orders[0].is_buy);
    }

    #[test]
    fn paper_rejects_without_price_and_bad_size() {
        let paper = PaperExecutor::new();
        let statuses = paper.place_market_order("BTC", true, 1.0).unwrap();
        assert!(matches!(&statuses[..], [OrderStatus::Rejected(_)]));
        assert!(matches!(paper.place_market_order("BTC", true, 0.0), Err(OrderError::Invalid(_))));
        assert!(paper.orders().is_empty());
    }
}
