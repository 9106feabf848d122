use super::channel::{Channel, ChannelSignal, Connector, ReadyState, SignalReceiver, SignalSender};
use crate::types::close_code::{WS_CLOSE_ABNORMAL, WS_CLOSE_NO_STATUS};
use crate::types::{DEFAULT_CLOSE_TIMEOUT, Result, WsClientError};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use url::Url;

enum Command {
    Text(String),
    Close,
}

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    close_timeout: Duration,
}

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self {
            close_timeout: Duration::from_millis(DEFAULT_CLOSE_TIMEOUT),
        }
    }

    /// How long `close()` waits for the peer's close frame before the
    /// channel reports an abnormal closure.
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for TungsteniteConnector {
    fn connect(&self, url: &Url) -> (Arc<dyn Channel>, SignalReceiver) {
        let state = Arc::new(Mutex::new(ReadyState::Connecting));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_socket(
            url.to_string(),
            Arc::clone(&state),
            command_rx,
            signal_tx,
            self.close_timeout,
        ));

        let channel = TungsteniteChannel {
            state,
            commands: command_tx,
        };
        (Arc::new(channel), signal_rx)
    }
}

struct TungsteniteChannel {
    state: Arc<Mutex<ReadyState>>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Channel for TungsteniteChannel {
    fn send(&self, text: String) -> Result<()> {
        if *self.state.lock() != ReadyState::Open {
            return Err(WsClientError::NotConnected);
        }
        self.commands
            .send(Command::Text(text))
            .map_err(|_| WsClientError::NotConnected)
    }

    fn close(&self) {
        let mut state = self.state.lock();
        if matches!(*state, ReadyState::Connecting | ReadyState::Open) {
            *state = ReadyState::Closing;
            let _ = self.commands.send(Command::Close);
        }
    }

    fn ready_state(&self) -> ReadyState {
        *self.state.lock()
    }
}

fn finish(state: &Mutex<ReadyState>, signals: &SignalSender, code: u16, reason: impl Into<String>) {
    *state.lock() = ReadyState::Closed;
    let _ = signals.send(ChannelSignal::Close {
        code,
        reason: reason.into(),
    });
}

async fn run_socket(
    url: String,
    state: Arc<Mutex<ReadyState>>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    signals: SignalSender,
    close_timeout: Duration,
) {
    tracing::info!("Connecting to {}", url);

    let connect = connect_async(url.as_str());
    tokio::pin!(connect);
    let result = loop {
        tokio::select! {
            result = &mut connect => break result,
            command = commands.recv() => match command {
                // send() refuses text while connecting
                Some(Command::Text(_)) => continue,
                Some(Command::Close) | None => {
                    tracing::debug!("Close requested before the handshake finished");
                    finish(&state, &signals, WS_CLOSE_ABNORMAL, "closed before the connection was established");
                    return;
                }
            },
        }
    };

    let stream = match result {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::error!("WebSocket connect failed: {}", e);
            let _ = signals.send(ChannelSignal::Error(e.to_string()));
            finish(&state, &signals, WS_CLOSE_ABNORMAL, "");
            return;
        }
    };

    {
        let mut state = state.lock();
        if *state == ReadyState::Connecting {
            *state = ReadyState::Open;
        }
    }
    tracing::info!("Connected to WebSocket server");
    let _ = signals.send(ChannelSignal::Open);

    let (mut write, mut read) = stream.split();
    let mut close_deadline: Option<Instant> = None;

    loop {
        let deadline = close_deadline;
        tokio::select! {
            command = commands.recv(), if deadline.is_none() => match command {
                Some(Command::Text(text)) => {
                    if let Err(e) = write.send(Message::text(text)).await {
                        tracing::error!("WebSocket write error: {}", e);
                        let _ = signals.send(ChannelSignal::Error(e.to_string()));
                    }
                }
                Some(Command::Close) | None => {
                    *state.lock() = ReadyState::Closing;
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: String::new().into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        tracing::debug!("Failed to send close frame: {}", e);
                    }
                    close_deadline = Some(Instant::now() + close_timeout);
                }
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let _ = signals.send(ChannelSignal::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                        .unwrap_or((WS_CLOSE_NO_STATUS, String::new()));
                    tracing::info!("Connection closed: code={}, reason='{}'", code, reason);
                    finish(&state, &signals, code, reason);
                    break;
                }
                Some(Ok(Message::Ping(data))) => {
                    tracing::debug!("Received ping ({} bytes)", data.len());
                }
                Some(Ok(Message::Pong(data))) => {
                    tracing::debug!("Received pong ({} bytes)", data.len());
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                }
                Some(Ok(Message::Frame(_))) => {
                    tracing::debug!("Received raw frame (internal)");
                }
                Some(Err(e)) => {
                    tracing::error!("WebSocket read error: {}", e);
                    let _ = signals.send(ChannelSignal::Error(e.to_string()));
                    finish(&state, &signals, WS_CLOSE_ABNORMAL, "");
                    break;
                }
                None => {
                    tracing::warn!("Server closed connection without close frame");
                    finish(&state, &signals, WS_CLOSE_ABNORMAL, "");
                    break;
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                tracing::warn!("Peer did not acknowledge the close frame in time");
                finish(&state, &signals, WS_CLOSE_ABNORMAL, "");
                break;
            }
        }
    }

    tracing::debug!("Socket task for {} finished", url);
}
