//! # Multi-Setup Strategy Context
//!
//! Caller-owned state for the mean-reversion bot: a bounded price history,
//! at most one open position and the time of the last evaluation. Feed it
//! `allMids` messages (or raw prices), trade the returned [`Decision`] and
//! [`commit`](StrategyContext::commit) it once the order went through.
//!
//! Entries are tried in order: Bollinger reversal, then spike rebound, then
//! trend break. An open position is checked for exit before anything else and
//! blocks new entries.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use crate::core::wire::WsMsg;
use crate::markets::hyperliquid::AllMids;
use crate::strategy::indicators::{lower_band, pct_change, sma, zscore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// The entry rule that opened a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setup {
    BollingerReversal,
    SpikeLong,
    SpikeShort,
    TrendLong,
    TrendShort,
}

impl Setup {
    pub fn side(self) -> Side {
        match self {
            Setup::BollingerReversal | Setup::SpikeLong | Setup::TrendLong => Side::Long,
            Setup::SpikeShort | Setup::TrendShort => Side::Short,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Setup::BollingerReversal => "BB Reversal",
            Setup::SpikeLong => "Spike Long",
            Setup::SpikeShort => "Spike Short",
            Setup::TrendLong => "Trend Long",
            Setup::TrendShort => "Trend Short",
        }
    }
}

impl fmt::Display for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Take-profit, stop-loss (both as fractions) and maximum bars held.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitRules {
    pub take_profit: f64,
    pub stop_loss: f64,
    pub max_hold: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub coin: String,
    /// Order size in coin units.
    pub size: f64,
    /// Z-score window.
    pub window: usize,
    /// Minimum time between two evaluations.
    pub eval_interval: Duration,
    pub bb_period: usize,
    pub bb_k: f64,
    pub bb_exit: ExitRules,
    /// Absolute one-bar return that counts as a spike.
    pub spike_threshold: f64,
    pub spike_exit: ExitRules,
    pub trend_short: usize,
    pub trend_long: usize,
    pub trend_exit: ExitRules,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            coin: "HYPE".to_string(),
            size: 0.01,
            window: 30,
            eval_interval: Duration::from_secs(300),
            bb_period: 20,
            bb_k: 2.0,
            bb_exit: ExitRules { take_profit: 0.015, stop_loss: 0.005, max_hold: 3 },
            spike_threshold: 0.02,
            spike_exit: ExitRules { take_profit: 0.01, stop_loss: 0.005, max_hold: 3 },
            trend_short: 20,
            trend_long: 60,
            trend_exit: ExitRules { take_profit: 0.015, stop_loss: 0.01, max_hold: 4 },
        }
    }
}

impl StrategyParams {
    fn exit_rules(&self, setup: Setup) -> ExitRules {
        match setup {
            Setup::BollingerReversal => self.bb_exit,
            Setup::SpikeLong | Setup::SpikeShort => self.spike_exit,
            Setup::TrendLong | Setup::TrendShort => self.trend_exit,
        }
    }

    /// Prices kept in history: enough for every indicator.
    fn history_len(&self) -> usize {
        self.window.max(self.bb_period).max(self.trend_long).max(2)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub setup: Setup,
    pub entry_price: f64,
    pub bars_held: u32,
    pub rules: ExitRules,
}

impl OpenPosition {
    /// Fractional PnL at `price`, positive when the position is in profit.
    pub fn pnl(&self, price: f64) -> f64 {
        match self.setup.side() {
            Side::Long => (price - self.entry_price) / self.entry_price,
            Side::Short => (self.entry_price - price) / self.entry_price,
        }
    }
}

/// What the caller should trade after an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Enter { setup: Setup, price: f64 },
    Exit { setup: Setup, price: f64, pnl: f64, bars_held: u32 },
}

impl Decision {
    pub fn setup(&self) -> Setup {
        match self {
            Decision::Enter { setup, .. } | Decision::Exit { setup, .. } => *setup,
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            Decision::Enter { price, .. } | Decision::Exit { price, .. } => *price,
        }
    }

    /// Buy to open a long or to close a short.
    pub fn is_buy(&self) -> bool {
        match self {
            Decision::Enter { setup, .. } => setup.side() == Side::Long,
            Decision::Exit { setup, .. } => setup.side() == Side::Short,
        }
    }
}

pub struct StrategyContext {
    params: StrategyParams,
    prices: VecDeque<f64>,
    position: Option<OpenPosition>,
    last_eval: Option<Instant>,
}

impl StrategyContext {
    pub fn new(params: StrategyParams) -> Self {
        let capacity = params.history_len();
        Self { params, prices: VecDeque::with_capacity(capacity), position: None, last_eval: None }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn position(&self) -> Option<&OpenPosition> {
        self.position.as_ref()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.prices.iter().copied().collect()
    }

    /// Evaluates an `allMids` message at most once per evaluation interval.
    ///
    /// The interval restarts on every accepted message, even when it carries
    /// no usable price for the configured coin.
    pub fn handle_all_mids(&mut self, msg: &WsMsg, now: Instant) -> Option<Decision> {
        if let Some(last) = self.last_eval {
            if now.saturating_duration_since(last) < self.params.eval_interval {
                return None;
            }
        }
        self.last_eval = Some(now);

        let mids: AllMids = match msg.data_as() {
            Ok(mids) => mids,
            Err(e) => {
                log::warn!("Unreadable allMids payload: {}", e);
                return None;
            }
        };
        match mids.mid(&self.params.coin) {
            Some(price) => self.on_price(price),
            None => {
                log::warn!("Invalid {} price", self.params.coin);
                None
            }
        }
    }

    /// Records `price` and runs the exit check, then the entry rules.
    pub fn on_price(&mut self, price: f64) -> Option<Decision> {
        if !price.is_finite() || price <= 0.0 {
            log::warn!("Invalid {} price: {}", self.params.coin, price);
            return None;
        }

        if self.prices.len() == self.params.history_len() {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
        let prices = self.prices.make_contiguous().to_vec();

        let z = zscore(&prices, self.params.window);
        let sma_short = sma(&prices, self.params.trend_short);
        let sma_long = sma(&prices, self.params.trend_long);
        log::info!(
            "Price: {:.6} | Z: {:.3} | SMA{}: {} | SMA{}: {}",
            price,
            z,
            self.params.trend_short,
            fmt_opt(sma_short),
            self.params.trend_long,
            fmt_opt(sma_long),
        );

        // The position stays open until the exit is committed.
        if let Some(position) = self.position.as_mut() {
            position.bars_held += 1;
            let pnl = position.pnl(price);
            let rules = position.rules;
            if pnl >= rules.take_profit || pnl <= -rules.stop_loss || position.bars_held >= rules.max_hold {
                log::info!("Exit ({}) | PnL: {:.2}%", position.setup, pnl * 100.0);
                return Some(Decision::Exit { setup: position.setup, price, pnl, bars_held: position.bars_held });
            }
            return None;
        }

        let setup = self.entry_setup(&prices, price, sma_short, sma_long)?;
        log::info!("Entry: {} @ {:.6}", setup, price);
        Some(Decision::Enter { setup, price })
    }

    /// Applies a decision once its order went through.
    ///
    /// [`on_price`](Self::on_price) only proposes; until this is called the
    /// context still reflects the exchange position.
    pub fn commit(&mut self, decision: &Decision) {
        match *decision {
            Decision::Enter { setup, price } => {
                self.position = Some(OpenPosition {
                    setup,
                    entry_price: price,
                    bars_held: 0,
                    rules: self.params.exit_rules(setup),
                });
            }
            Decision::Exit { setup, .. } => {
                if self.position.as_ref().is_some_and(|p| p.setup == setup) {
                    self.position = None;
                }
            }
        }
    }

    fn entry_setup(&self, prices: &[f64], price: f64, sma_short: Option<f64>, sma_long: Option<f64>) -> Option<Setup> {
        let p = &self.params;

        if let Some(lower) = lower_band(prices, p.bb_period, p.bb_k) {
            if price < lower {
                return Some(Setup::BollingerReversal);
            }
        }

        if let Some(ret) = pct_change(prices) {
            if ret <= -p.spike_threshold {
                return Some(Setup::SpikeLong);
            }
            if ret >= p.spike_threshold {
                return Some(Setup::SpikeShort);
            }
        }

        match (sma_short, sma_long) {
            (Some(short), Some(long)) if short > long => Some(Setup::TrendLong),
            (Some(short), Some(long)) if short < long => Some(Setup::TrendShort),
            _ => None,
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{:.6}", v))
}
