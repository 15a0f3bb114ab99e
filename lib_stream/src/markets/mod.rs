//! # Market Feeds Module
//!
//! Venue-specific constants and payload models. The streaming core in
//! [`crate::core`] is venue-agnostic apart from its default endpoint; the
//! shapes of each channel's `data` live here.

/// Hyperliquid endpoints and channel payloads.
pub mod hyperliquid;
