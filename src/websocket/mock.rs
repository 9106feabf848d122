use super::channel::{Channel, ChannelSignal, Connector, ReadyState, SignalReceiver, SignalSender};
use crate::types::close_code::WS_CLOSE_NO_STATUS;
use crate::types::{Result, WsClientError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use url::Url;

/// Connector whose channels are driven by the test.
#[derive(Default)]
pub(crate) struct MockConnector {
    channels: Mutex<Vec<Arc<MockChannel>>>,
}

impl MockConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn count(&self) -> usize {
        self.channels.lock().len()
    }

    pub(crate) fn channel(&self, index: usize) -> Arc<MockChannel> {
        Arc::clone(&self.channels.lock()[index])
    }

    pub(crate) fn last(&self) -> Arc<MockChannel> {
        let channels = self.channels.lock();
        Arc::clone(channels.last().expect("no channel created"))
    }
}

impl Connector for MockConnector {
    fn connect(&self, url: &Url) -> (Arc<dyn Channel>, SignalReceiver) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let channel = Arc::new(MockChannel::new(url.clone(), signal_tx));
        self.channels.lock().push(Arc::clone(&channel));
        (channel, signal_rx)
    }
}

pub(crate) struct MockChannel {
    pub(crate) url: Url,
    state: Mutex<ReadyState>,
    sent: Mutex<Vec<String>>,
    close_calls: AtomicUsize,
    signals: SignalSender,
}

impl MockChannel {
    fn new(url: Url, signals: SignalSender) -> Self {
        Self {
            url,
            state: Mutex::new(ReadyState::Connecting),
            sent: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
            signals,
        }
    }

    /// Simulates a completed handshake.
    pub(crate) fn open(&self) {
        *self.state.lock() = ReadyState::Open;
        let _ = self.signals.send(ChannelSignal::Open);
    }

    pub(crate) fn fail(&self, error: &str) {
        let _ = self.signals.send(ChannelSignal::Error(error.to_string()));
    }

    /// Simulates the peer dropping the session.
    pub(crate) fn drop_connection(&self, code: u16, reason: &str) {
        *self.state.lock() = ReadyState::Closed;
        let _ = self.signals.send(ChannelSignal::Close {
            code,
            reason: reason.to_string(),
        });
    }

    pub(crate) fn receive(&self, text: &str) {
        let _ = self.signals.send(ChannelSignal::Message(text.to_string()));
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl Channel for MockChannel {
    fn send(&self, text: String) -> Result<()> {
        if *self.state.lock() != ReadyState::Open {
            return Err(WsClientError::NotConnected);
        }
        self.sent.lock().push(text);
        Ok(())
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if matches!(*state, ReadyState::Connecting | ReadyState::Open) {
            *state = ReadyState::Closed;
            let _ = self.signals.send(ChannelSignal::Close {
                code: WS_CLOSE_NO_STATUS,
                reason: String::new(),
            });
        }
    }

    fn ready_state(&self) -> ReadyState {
        *self.state.lock()
    }
}
