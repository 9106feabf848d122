use super::buffer::OutboundBuffer;
use crate::infrastructure::{HeartbeatMonitor, Timer};
use crate::websocket::{Channel, ReadyState};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Consolidated mutable state for WsClient
pub(crate) struct ClientState {
    /// Current channel handle, if any
    pub channel: Option<Arc<dyn Channel>>,

    /// Heartbeat bound to `channel`
    pub heartbeat: Option<HeartbeatMonitor>,

    /// Bumped for every new channel; signals from older channels are stale
    pub generation: u64,

    /// Task draining the current channel's signals
    pub signal_task: Option<JoinHandle<()>>,

    /// Close was requested by the application (suppresses reconnection)
    pub is_manual_close: bool,

    /// A reconnection timer is armed and has not fired yet
    pub reconnect_pending: bool,

    pub reconnect_timer: Timer,

    pub outbound: OutboundBuffer,

    pub destroyed: bool,
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            channel: None,
            heartbeat: None,
            generation: 0,
            signal_task: None,
            is_manual_close: false,
            reconnect_pending: false,
            reconnect_timer: Timer::new(),
            outbound: OutboundBuffer::new(),
            destroyed: false,
        }
    }

    pub fn ready_state(&self) -> ReadyState {
        self.channel
            .as_ref()
            .map_or(ReadyState::Unconnected, |channel| channel.ready_state())
    }

    pub fn is_current(&self, generation: u64) -> bool {
        !self.destroyed && self.generation == generation
    }

    /// Stops the signal task unless the caller is running on it.
    pub fn stop_signal_task(&mut self) {
        if let Some(handle) = self.signal_task.take()
            && tokio::task::try_id() != Some(handle.id())
        {
            handle.abort();
        }
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}
