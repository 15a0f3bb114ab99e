//! # Strategy Module
//!
//! Consumers of the stream: price indicators, the multi-setup strategy state
//! and the order sink it trades through.

/// Rolling statistics over price slices.
pub mod indicators;
/// Strategy parameters, state and decisions.
pub mod context;
/// Order execution boundary and the paper executor.
pub mod orders;

// --- Public API Re-exports ---
pub use context::{Decision, ExitRules, OpenPosition, Setup, Side, StrategyContext, StrategyParams};
pub use orders::{execute_decision, Fill, OrderError, OrderExecutor, OrderStatus, PaperExecutor, PaperOrder};
