//! WebSocket transport for the coordination channel.
//!
//! One connection carries one player's view of one round, at
//! `/ws/{game_id}/{player_id}` under the server base. Every bingo frame is a
//! JSON text frame; binary frames are dropped with a warning and control
//! frames are left to `tokio-tungstenite`.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), bingo_client::BingoError> {
//! use std::time::Duration;
//!
//! use bingo_client::config::LaunchParams;
//! use bingo_client::{Transport, WebSocketTransport};
//!
//! let launch = LaunchParams::from_query("room=10&game_id=3", 1001)?;
//! let channel = launch.channel_url("ws://127.0.0.1:8000")?;
//! let mut transport = WebSocketTransport::connect(&channel, Duration::from_secs(10)).await?;
//! transport.send(r#"{"type":"buy","card_id":42}"#.to_string()).await?;
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::BingoError;
use crate::transport::Transport;

/// The underlying WebSocket stream, public for [`WebSocketTransport::from_stream`].
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] over the coordinator's WebSocket channel.
///
/// [`recv`](Transport::recv) is cancel-safe, so the client loop can race it
/// against the countdown without losing frames.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

/// What a single WebSocket message means to the session.
enum Inbound {
    Frame(String),
    Closed,
    Ignored,
}

impl WebSocketTransport {
    /// Open the channel at `channel`, usually built by
    /// [`LaunchParams::channel_url`](crate::config::LaunchParams::channel_url).
    ///
    /// # Errors
    ///
    /// - [`BingoError::InvalidLaunchParams`] for a non-WebSocket scheme.
    /// - [`BingoError::Timeout`] if the handshake does not finish in `timeout`.
    /// - [`BingoError::Io`] if the connection is refused or the handshake
    ///   fails. I/O error kinds are preserved.
    pub async fn connect(channel: &Url, timeout: Duration) -> Result<Self, BingoError> {
        if !matches!(channel.scheme(), "ws" | "wss") {
            return Err(BingoError::InvalidLaunchParams(format!(
                "channel {channel} is not a WebSocket URL"
            )));
        }
        debug!(%channel, ?timeout, "opening coordination channel");

        let handshake = tokio_tungstenite::connect_async(channel.as_str());
        let (stream, _response) = tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| BingoError::Timeout)?
            .map_err(handshake_error)?;

        info!(path = channel.path(), "coordination channel open");
        Ok(Self::from_stream(stream))
    }

    /// Wrap a stream that was connected elsewhere (custom TLS, proxies).
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }

    fn classify(message: Message) -> Inbound {
        match message {
            Message::Text(text) => Inbound::Frame(text.as_str().to_owned()),
            Message::Close(frame) => {
                debug!(?frame, "coordinator closed the channel");
                Inbound::Closed
            }
            Message::Binary(bytes) => {
                warn!(len = bytes.len(), "dropping binary frame; bingo frames are JSON text");
                Inbound::Ignored
            }
            // tungstenite answers pings itself.
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Inbound::Ignored,
        }
    }
}

fn handshake_error(e: tungstenite::Error) -> BingoError {
    let kind = match &e {
        tungstenite::Error::Io(io) => io.kind(),
        _ => std::io::ErrorKind::Other,
    };
    BingoError::Io(std::io::Error::new(kind, e))
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), BingoError> {
        if self.closed {
            return Err(BingoError::TransportClosed);
        }
        self.stream
            .send(Message::text(message))
            .await
            .map_err(|e| BingoError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, BingoError>> {
        while let Some(next) = self.stream.next().await {
            let message = match next {
                Ok(message) => message,
                Err(e) => return Some(Err(BingoError::TransportReceive(e.to_string()))),
            };
            match Self::classify(message) {
                Inbound::Frame(text) => return Some(Ok(text)),
                Inbound::Closed => return None,
                Inbound::Ignored => {}
            }
        }
        None
    }

    async fn close(&mut self) -> Result<(), BingoError> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        self.stream
            .close(None)
            .await
            .map_err(|e| BingoError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::config::LaunchParams;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    const HANDSHAKE: Duration = Duration::from_secs(5);

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_rejects_non_websocket_channel() {
        let channel = Url::parse("http://127.0.0.1:1/ws/1/1").unwrap();
        let err = WebSocketTransport::connect(&channel, HANDSHAKE).await.unwrap_err();
        assert!(matches!(err, BingoError::InvalidLaunchParams(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let channel = Url::parse("ws://127.0.0.1:1/ws/1/1").unwrap();
        let err = WebSocketTransport::connect(&channel, HANDSHAKE).await.unwrap_err();
        assert!(matches!(err, BingoError::Io(_)));
    }

    #[tokio::test]
    async fn connect_gives_up_after_timeout() {
        let channel = Url::parse("ws://192.0.2.1:1/ws/1/1").unwrap();
        let err = WebSocketTransport::connect(&channel, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, BingoError::Timeout));
    }

    /// Start a local coordinator stub that runs `handler` on the accepted
    /// connection and returns the channel URL for game 1, player 1001.
    async fn start_mock_server<F, Fut>(handler: F) -> Url
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        LaunchParams::new(5, 1, 1001)
            .unwrap()
            .channel_url(&format!("ws://{addr}"))
            .unwrap()
    }

    #[tokio::test]
    async fn connect_requests_the_launch_channel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<String>();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                let _ = tx.send(req.uri().to_string());
                Ok(resp)
            };
            let _ws = tokio_tungstenite::accept_hdr_async(tcp, callback).await.unwrap();
        });

        let channel = LaunchParams::from_query("room=10&game_id=3", 1001)
            .unwrap()
            .channel_url(&format!("ws://{addr}/?token=abc"))
            .unwrap();
        let _transport = WebSocketTransport::connect(&channel, HANDSHAKE).await.unwrap();
        assert_eq!(rx.await.unwrap(), "/ws/3/1001?token=abc");
    }

    #[tokio::test]
    async fn recv_preserves_call_order() {
        let channel = start_mock_server(|mut ws| async move {
            for value in [7, 22, 61] {
                let frame = format!(r#"{{"type":"number","value":{value}}}"#);
                ws.send(Message::text(frame)).await.unwrap();
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&channel, HANDSHAKE).await.unwrap();
        for value in [7, 22, 61] {
            let text = transport.recv().await.unwrap().unwrap();
            assert_eq!(text, format!(r#"{{"type":"number","value":{value}}}"#));
        }
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_drops_binary_frames() {
        let channel = start_mock_server(|mut ws| async move {
            ws.send(Message::binary(vec![0xDE, 0xAD])).await.unwrap();
            ws.send(Message::text(r#"{"type":"banned"}"#)).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&channel, HANDSHAKE).await.unwrap();
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#"{"type":"banned"}"#);
    }

    #[tokio::test]
    async fn buy_request_reaches_coordinator() {
        let (tx, rx) = tokio::sync::oneshot::channel::<String>();
        let channel = start_mock_server(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = tx.send(text.as_str().to_owned());
            }
        })
        .await;

        let mut transport = WebSocketTransport::connect(&channel, HANDSHAKE).await.unwrap();
        transport
            .send(r#"{"type":"buy","card_id":42}"#.to_string())
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap(), r#"{"type":"buy","card_id":42}"#);
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let channel = start_mock_server(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&channel, HANDSHAKE).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send(r#"{"type":"bingo"}"#.into()).await.unwrap_err();
        assert!(matches!(err, BingoError::TransportClosed));
    }
}
