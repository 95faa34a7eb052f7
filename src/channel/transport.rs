//! WebSocket transport for the room channel.
//!
//! A [`Connector`] starts one connection attempt per call. Each attempt runs
//! in its own task and reports back on a shared event channel, tagged with
//! the generation it was opened for. The task always reports exactly one
//! [`TransportEventKind::Closed`] before it exits.

use std::fmt;

use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use reqwest::Url;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

use crate::channel::machine::{ABNORMAL_CLOSURE, ChannelTarget, NORMAL_CLOSURE, POLICY_VIOLATION};

/// Close code reported when the peer closed without a status.
const NO_STATUS_RECEIVED: u16 = 1005;

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEventKind {
    Opened,
    Frame(String),
    Error(String),
    Closed(u16),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportEvent {
    pub generation: u64,
    pub kind: TransportEventKind,
}

/// Requests from the driver to a live connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    Close(u16),
}

/// The driver's side of one connection attempt. Dropping it closes the
/// connection with 1000.
pub struct TransportLink {
    pub generation: u64,
    pub outbound: UnboundedSender<Outbound>,
}

impl TransportLink {
    /// Asks the connection to close. The task reports `Closed` on its own.
    pub fn close(&self, code: u16) {
        if self.outbound.send(Outbound::Close(code)).is_err() {
            debug!("Link {} already finished", self.generation);
        }
    }

    pub fn transmit(&self, frame: String) {
        if self.outbound.send(Outbound::Text(frame)).is_err() {
            warn!("Link {} gone, frame dropped", self.generation);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    InvalidUrl(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidUrl(msg) => write!(f, "invalid channel URL: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

pub trait Connector: Send + Sync {
    /// Starts connecting to `target`; progress arrives on `events`.
    fn open(
        &self,
        generation: u64,
        target: &ChannelTarget,
        events: UnboundedSender<TransportEvent>,
    ) -> TransportLink;
}

/// Builds `ws(s)://<host>[/prefix]/ws/<room>[?token=...]` from the REST base URL.
pub fn channel_url(base: &Url, room: &str, token: Option<&str>) -> Result<Url, TransportError> {
    let mut url = base.clone();
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(TransportError::InvalidUrl(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|_| TransportError::InvalidUrl(base.to_string()))?;
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| TransportError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(["ws", room]);
    if let Some(token) = token {
        url.query_pairs_mut().append_pair("token", token);
    }
    Ok(url)
}

/// Connects with tokio-tungstenite.
pub struct WsConnector {
    base_url: Url,
}

impl WsConnector {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }
}

impl Connector for WsConnector {
    fn open(
        &self,
        generation: u64,
        target: &ChannelTarget,
        events: UnboundedSender<TransportEvent>,
    ) -> TransportLink {
        let (tx, rx) = unbounded_channel();
        let url = channel_url(&self.base_url, &target.room, target.token.as_deref());
        tokio::spawn(run_connection(url, generation, rx, events));
        TransportLink {
            generation,
            outbound: tx,
        }
    }
}

/// The URL without its query, so tokens stay out of the log.
fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

async fn run_connection(
    url: Result<Url, TransportError>,
    generation: u64,
    mut outbound: UnboundedReceiver<Outbound>,
    events: UnboundedSender<TransportEvent>,
) {
    let emit = |kind: TransportEventKind| {
        if events.send(TransportEvent { generation, kind }).is_err() {
            debug!("Channel driver gone; dropping transport event");
        }
    };

    let url = match url {
        Ok(url) => url,
        Err(e) => {
            emit(TransportEventKind::Error(e.to_string()));
            emit(TransportEventKind::Closed(ABNORMAL_CLOSURE));
            return;
        }
    };

    info!("Connecting channel generation {generation} to {}", redacted(&url));
    let connect = connect_async(url.as_str());
    tokio::pin!(connect);

    let result = loop {
        tokio::select! {
            result = &mut connect => break result,
            request = outbound.recv() => match request {
                Some(Outbound::Text(_)) => debug!("Dropping frame queued before open"),
                Some(Outbound::Close(code)) => {
                    emit(TransportEventKind::Closed(code));
                    return;
                }
                None => {
                    emit(TransportEventKind::Closed(NORMAL_CLOSURE));
                    return;
                }
            },
        }
    };

    let ws_stream = match result {
        Ok((ws_stream, _)) => ws_stream,
        Err(WsError::Http(response))
            if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) =>
        {
            warn!("Channel handshake rejected ({})", response.status());
            emit(TransportEventKind::Error("unauthorized".to_string()));
            emit(TransportEventKind::Closed(POLICY_VIOLATION));
            return;
        }
        Err(e) => {
            warn!("Channel handshake failed: {e}");
            emit(TransportEventKind::Error(e.to_string()));
            emit(TransportEventKind::Closed(ABNORMAL_CLOSURE));
            return;
        }
    };

    debug!("WebSocket handshake completed for generation {generation}");
    emit(TransportEventKind::Opened);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            request = outbound.recv() => match request {
                Some(Outbound::Text(text)) => {
                    debug!("Sending frame ({} bytes)", text.len());
                    if let Err(e) = write.send(WsMessage::Text(text.into())).await {
                        emit(TransportEventKind::Error(e.to_string()));
                        emit(TransportEventKind::Closed(ABNORMAL_CLOSURE));
                        return;
                    }
                }
                Some(Outbound::Close(code)) => {
                    send_close(&mut write, code).await;
                    emit(TransportEventKind::Closed(code));
                    return;
                }
                None => {
                    send_close(&mut write, NORMAL_CLOSURE).await;
                    emit(TransportEventKind::Closed(NORMAL_CLOSURE));
                    return;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    emit(TransportEventKind::Frame(text.to_string()));
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    let code = frame.map_or(NO_STATUS_RECEIVED, |f| u16::from(f.code));
                    info!("Server closed channel generation {generation} (code {code})");
                    emit(TransportEventKind::Closed(code));
                    return;
                }
                Some(Ok(other)) => {
                    debug!("Ignoring non-text frame: {other:?}");
                }
                Some(Err(e)) => {
                    warn!("Channel read error: {e}");
                    emit(TransportEventKind::Error(e.to_string()));
                    emit(TransportEventKind::Closed(ABNORMAL_CLOSURE));
                    return;
                }
                None => {
                    emit(TransportEventKind::Closed(ABNORMAL_CLOSURE));
                    return;
                }
            },
        }
    }
}

async fn send_close<S>(write: &mut S, code: u16)
where
    S: futures::Sink<WsMessage> + Unpin,
    S::Error: fmt::Display,
{
    let frame = CloseFrame {
        code: CloseCode::from(code),
        reason: String::new().into(),
    };
    if let Err(e) = write.send(WsMessage::Close(Some(frame))).await {
        debug!("Close frame not delivered: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    #[test]
    fn test_channel_url_plain() {
        let url = channel_url(&base("http://localhost:8000"), "general", None).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws/general");
    }

    #[test]
    fn test_channel_url_tls_and_token() {
        let url = channel_url(&base("https://chat.example.com/"), "general", Some("abc")).unwrap();
        assert_eq!(url.as_str(), "wss://chat.example.com/ws/general?token=abc");
    }

    #[test]
    fn test_channel_url_keeps_prefix_and_escapes_room() {
        let url = channel_url(&base("http://host/api/"), "my room", Some("a+b")).unwrap();
        assert_eq!(url.as_str(), "ws://host/api/ws/my%20room?token=a%2Bb");
    }

    #[test]
    fn test_channel_url_rejects_other_schemes() {
        assert!(channel_url(&base("ftp://host"), "general", None).is_err());
    }

    #[test]
    fn test_redacted_drops_token() {
        let url = channel_url(&base("http://host"), "general", Some("secret")).unwrap();
        assert!(!redacted(&url).contains("secret"));
    }

    #[tokio::test]
    async fn test_invalid_url_reports_error_then_close() {
        let (events_tx, mut events_rx) = unbounded_channel();
        let (_tx, rx) = unbounded_channel();
        run_connection(
            Err(TransportError::InvalidUrl("x".to_string())),
            7,
            rx,
            events_tx,
        )
        .await;

        let first = events_rx.recv().await.unwrap();
        assert!(matches!(first.kind, TransportEventKind::Error(_)));
        assert_eq!(first.generation, 7);
        let second = events_rx.recv().await.unwrap();
        assert_eq!(second.kind, TransportEventKind::Closed(ABNORMAL_CLOSURE));
    }
}
