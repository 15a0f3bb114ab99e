//! # Transport
//!
//! The supervisor only needs "a sink of text frames and a stream of text
//! frames". [`Connector`] produces that pair; [`WsConnector`] is the real
//! WebSocket implementation and tests plug in channel-backed ones.

use std::pin::Pin;

use futures_util::future::{self, BoxFuture};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Connection closed")]
    Closed,

    #[error("Transport error: {0}")]
    Other(String),
}

/// Write half: accepts text frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;
/// Read half: yields text frames until the peer goes away.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// One established connection, already past the handshake.
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Connection {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

/// Opens connections to the feed.
pub trait Connector: Send + Sync + 'static {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Connection, TransportError>>;
}

/// WebSocket connector over `tokio-tungstenite`.
///
/// Binary frames are ignored; control frames are answered by tungstenite itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Connection, TransportError>> {
        Box::pin(async move {
            let (ws_stream, _) = connect_async(url).await?;
            let (write, read) = ws_stream.split();

            let sink = write
                .sink_map_err(TransportError::from)
                .with(|frame: String| future::ready(Ok::<_, TransportError>(WsMessage::Text(frame.into()))));

            let stream = read.filter_map(|msg| {
                future::ready(match msg {
                    Ok(WsMessage::Text(text)) => Some(Ok(text.as_str().to_owned())),
                    Ok(WsMessage::Close(frame)) => {
                        log::debug!("Close frame received: {:?}", frame);
                        None
                    }
                    Ok(_) => None,
                    Err(e) => Some(Err(TransportError::from(e))),
                })
            });

            Ok(Connection::new(Box::pin(sink), Box::pin(stream)))
        })
    }
}
