//! WebSocket-backed master endpoint.
//!
//! One WebSocket message carries exactly one frame. Text and binary messages
//! are treated alike; control messages are handled by tungstenite and never
//! reach the session.

use std::io;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::WebSocketStream;

use crate::session::{IoFuture, Master};

/// Subprotocol announced by webtty clients.
pub const WEBTTY_SUBPROTOCOL: &str = "webtty";

/// A remote terminal client on a WebSocket connection.
pub struct WsMaster<S> {
    sink: Mutex<SplitSink<WebSocketStream<S>, WsMessage>>,
    stream: Mutex<SplitStream<WebSocketStream<S>>>,
}

impl<S> WsMaster<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps an established WebSocket connection.
    pub fn new(ws: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }

    /// Sends a close message and shuts the sending half down.
    pub async fn close(&self) -> io::Result<()> {
        let mut sink = self.sink.lock().await;
        sink.close().await.map_err(ws_to_io)
    }
}

impl<S> Master for WsMaster<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn read<'a>(&'a self, buf: &'a mut [u8]) -> IoFuture<'a, usize> {
        Box::pin(async move {
            let mut stream = self.stream.lock().await;
            loop {
                let data = match stream.next().await {
                    Some(Ok(WsMessage::Text(text))) => text.into_bytes(),
                    Some(Ok(WsMessage::Binary(data))) => data,
                    Some(Ok(WsMessage::Close(_))) | None => {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "websocket closed",
                        ));
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(ws_to_io(e)),
                };

                let n = data.len().min(buf.len());
                if n < data.len() {
                    tracing::warn!(len = data.len(), max = buf.len(), "Truncating oversized frame");
                }
                buf[..n].copy_from_slice(&data[..n]);
                return Ok(n);
            }
        })
    }

    fn write<'a>(&'a self, frame: &'a [u8]) -> IoFuture<'a, usize> {
        Box::pin(async move {
            let message = match std::str::from_utf8(frame) {
                Ok(text) => WsMessage::Text(text.to_owned()),
                Err(_) => WsMessage::Binary(frame.to_vec()),
            };

            let mut sink = self.sink.lock().await;
            sink.send(message).await.map_err(ws_to_io)?;
            Ok(frame.len())
        })
    }
}

/// Handshake callback that accepts the `webtty` subprotocol when offered.
pub fn negotiate_subprotocol(
    request: &Request,
    mut response: Response,
) -> Result<Response, ErrorResponse> {
    let offered = request
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .any(|protocol| protocol.trim() == WEBTTY_SUBPROTOCOL)
        })
        .unwrap_or(false);

    if offered {
        response.headers_mut().insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static(WEBTTY_SUBPROTOCOL),
        );
    }
    Ok(response)
}

fn ws_to_io(err: WsError) -> io::Error {
    match err {
        WsError::Io(e) => e,
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            io::Error::new(io::ErrorKind::BrokenPipe, err)
        }
        other => io::Error::other(other),
    }
}
