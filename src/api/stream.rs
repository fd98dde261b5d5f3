use std::fmt;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use url::Url;

use crate::api::models::{IncomingFrame, OutgoingFrame};
use crate::error::ChatError;

/// Connection state of the message stream. Transitions are driven by the
/// socket task only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Open,
    Closed,
    Errored,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamState::Connecting => "connecting",
            StreamState::Open => "open",
            StreamState::Closed => "closed",
            StreamState::Errored => "errored",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    State(StreamState),
    Frame(IncomingFrame),
}

/// Where the view model hands outgoing frames.
pub trait FrameSink {
    fn state(&self) -> StreamState;
    fn send(&self, frame: OutgoingFrame) -> Result<(), ChatError>;
}

pub struct StreamHandle {
    state: watch::Receiver<StreamState>,
    outgoing: mpsc::UnboundedSender<OutgoingFrame>,
}

impl FrameSink for StreamHandle {
    fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    fn send(&self, frame: OutgoingFrame) -> Result<(), ChatError> {
        let state = self.state();
        if state != StreamState::Open {
            return Err(ChatError::Protocol(state));
        }
        self.outgoing
            .send(frame)
            .map_err(|_| ChatError::Protocol(StreamState::Closed))
    }
}

pub struct MessageStream;

impl MessageStream {
    /// Starts the socket task on the shared runtime. State changes and
    /// decoded frames are delivered through `events`.
    pub fn connect(
        url: Url,
        access_token: Option<String>,
        events: mpsc::UnboundedSender<StreamEvent>,
    ) -> StreamHandle {
        let (state_tx, state_rx) = watch::channel(StreamState::Connecting);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        crate::utils::spawn_async(async move {
            let link = StateLink { state: state_tx, events };
            link.set(StreamState::Connecting);
            let end = match run(&url, access_token.as_deref(), out_rx, &link).await {
                Ok(()) => StreamState::Closed,
                Err(err) => {
                    log::error!("Message stream {url} failed: {err}");
                    StreamState::Errored
                }
            };
            link.set(end);
        });
        StreamHandle { state: state_rx, outgoing: out_tx }
    }

    /// A handle that stays `Errored`, for when no socket can be opened at all.
    pub fn disconnected() -> StreamHandle {
        let (_, state_rx) = watch::channel(StreamState::Errored);
        let (out_tx, _) = mpsc::unbounded_channel();
        StreamHandle { state: state_rx, outgoing: out_tx }
    }
}

struct StateLink {
    state: watch::Sender<StreamState>,
    events: mpsc::UnboundedSender<StreamEvent>,
}

impl StateLink {
    fn set(&self, state: StreamState) {
        self.state.send_replace(state);
        let _ = self.events.send(StreamEvent::State(state));
    }

    fn frame(&self, frame: IncomingFrame) {
        let _ = self.events.send(StreamEvent::Frame(frame));
    }
}

async fn run(
    url: &Url,
    access_token: Option<&str>,
    mut outgoing: mpsc::UnboundedReceiver<OutgoingFrame>,
    link: &StateLink,
) -> Result<(), ChatError> {
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| ChatError::Network(e.to_string()))?;
    if let Some(token) = access_token {
        let cookie = HeaderValue::from_str(&format!("access_token={token}"))
            .map_err(|e| ChatError::Config(e.to_string()))?;
        request.headers_mut().insert(COOKIE, cookie);
    }

    let (ws, _) = connect_async(request)
        .await
        .map_err(|e| ChatError::Network(e.to_string()))?;
    log::info!("Message stream connected to {url}");
    link.set(StreamState::Open);

    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            out = outgoing.recv() => {
                // Every handle dropped: the window is gone.
                let Some(frame) = out else { break };
                let text = serde_json::to_string(&frame)?;
                write
                    .send(WsMessage::Text(text))
                    .await
                    .map_err(|e| ChatError::Network(e.to_string()))?;
            }
            incoming = read.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => match decode_frame(&text) {
                        Some(frame) => link.frame(frame),
                        None => log::debug!("Ignoring non-message frame: {text}"),
                    },
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(ChatError::Network(e.to_string())),
                }
            }
        }
    }
    log::info!("Message stream to {url} closed");
    Ok(())
}

fn decode_frame(text: &str) -> Option<IncomingFrame> {
    serde_json::from_str(text).ok()
}
