// Declare the modules to re-export
#[cfg(feature = "stream")]
pub mod core; // Connection supervisor, registry, dispatcher and transport
#[cfg(feature = "stream")]
pub mod markets; // Venue endpoints and payload models

#[cfg(feature = "strategy")]
pub mod strategy; // Indicators, strategy context and order sink

// Re-export the everyday entry points
#[cfg(feature = "stream")]
pub use crate::core::{StreamClient, StreamConfig, StreamError, Subscription, WsMsg};
