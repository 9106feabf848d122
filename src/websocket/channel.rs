use crate::types::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Channel ready state, numbered like the browser `WebSocket.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadyState {
    /// No channel handle exists
    Unconnected,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ReadyState {
    pub fn code(&self) -> i8 {
        match self {
            Self::Unconnected => -1,
            Self::Connecting => 0,
            Self::Open => 1,
            Self::Closing => 2,
            Self::Closed => 3,
        }
    }
}

/// Callback signals delivered by a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSignal {
    Open,
    Error(String),
    Close { code: u16, reason: String },
    Message(String),
}

pub type SignalSender = mpsc::UnboundedSender<ChannelSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<ChannelSignal>;

/// A single duplex session.
pub trait Channel: Send + Sync + 'static {
    /// Queues a text frame. Fails when the channel is not open.
    fn send(&self, text: String) -> Result<()>;

    /// Requests the channel to close. A `Close` signal follows.
    fn close(&self);

    fn ready_state(&self) -> ReadyState;
}

/// Creates channels. Connecting starts immediately and progress is reported
/// through the returned receiver.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: &Url) -> (Arc<dyn Channel>, SignalReceiver);
}
