//! # Liveness Pinger
//!
//! Sends `{"method":"ping"}` every interval while the link is ready. It never
//! decides about reconnects; a failed ping is only logged.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::core::connection::Link;
use crate::core::error::StreamError;
use crate::core::wire::OutboundFrame;

pub(crate) struct Pinger {
    link: Arc<Link>,
    interval: Duration,
    cancel: CancellationToken,
}

impl Pinger {
    pub(crate) fn new(link: Arc<Link>, interval: Duration, cancel: CancellationToken) -> Self {
        Self { link, interval, cancel }
    }

    pub(crate) async fn run(self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = sleep(self.interval) => {}
            }

            if !self.link.is_ready() {
                continue;
            }

            match self.ping() {
                Ok(()) => log::debug!("Ping sent."),
                Err(e) => log::error!("Ping error: {}", e),
            }
        }
    }

    fn ping(&self) -> Result<(), StreamError> {
        let frame = OutboundFrame::Ping.encode()?;
        self.link.send(frame)
    }
}
