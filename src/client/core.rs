use super::builder::{WsClientBuilder, WsClientOptions};
use super::state::ClientState;
use crate::infrastructure::HeartbeatMonitor;
use crate::messaging::{
    ClientEvent, EventHub, EventNames, EventPayload, EventStream, Listener, Once, Unsubscribe,
};
use crate::types::heartbeat_tokens::PONG;
use crate::types::{CloseInfo, Result, WsClientError};
use crate::websocket::{ChannelSignal, Connector, ReadyState, SignalReceiver};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use url::Url;

/// A logical, always-on WebSocket connection.
///
/// `WsClient` opens a channel as soon as it is built and keeps one alive:
/// failed or dropped channels are replaced after a fixed delay, a silent peer
/// is detected with an application-level `#PING`/`#PONG` heartbeat, and
/// messages sent while the channel is not open are buffered and flushed in
/// order on the next open. Everything that happens is published on an
/// [`EventHub`] under the [`ClientEvent`] names.
///
/// # Example
///
/// ```no_run
/// use resilient_ws::{ClientEvent, EventPayload, Listener, WsClient, WsClientOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = WsClient::new("ws://localhost:9999", WsClientOptions::default())?;
///
/// client.on(
///     ClientEvent::Notify,
///     Listener::from_fn(|payload: EventPayload| {
///         if let Some(text) = payload.as_message() {
///             println!("received: {}", text);
///         }
///     }),
/// )?;
///
/// // Buffered until the channel is open
/// client.send("hello");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WsClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    url: Url,
    options: WsClientOptions,
    connector: Arc<dyn Connector>,
    hub: EventHub<EventPayload>,
    state: Mutex<ClientState>,
}

impl WsClient {
    /// Creates a client and immediately starts connecting.
    ///
    /// # Errors
    ///
    /// Returns [`WsClientError::InvalidUrl`] if `url` does not start with
    /// `ws://` or `wss://`, [`WsClientError::UrlParse`] if it is malformed,
    /// and [`WsClientError::NoRuntime`] when called outside a tokio runtime.
    pub fn new(url: impl AsRef<str>, options: WsClientOptions) -> Result<Self> {
        WsClientBuilder::new(url, options)?.build()
    }

    pub fn builder(url: impl AsRef<str>, options: WsClientOptions) -> Result<WsClientBuilder> {
        WsClientBuilder::new(url, options)
    }

    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    pub fn options(&self) -> &WsClientOptions {
        &self.inner.options
    }

    /// State of the current channel, or `Unconnected` when there is none.
    pub fn ready_state(&self) -> ReadyState {
        self.inner.state.lock().ready_state()
    }

    pub fn is_open(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    /// Number of messages waiting for the channel to open.
    pub fn buffered_len(&self) -> usize {
        self.inner.state.lock().outbound.len()
    }

    pub fn is_reconnect_pending(&self) -> bool {
        self.inner.state.lock().reconnect_pending
    }

    /// Opens a new channel, replacing the current one.
    ///
    /// Called automatically on construction and by every reconnection.
    pub fn create_channel(&self) -> Result<()> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(WsClientError::NoRuntime);
        }
        if self.inner.state.lock().destroyed {
            return Err(WsClientError::Destroyed);
        }
        self.inner.create_channel();
        Ok(())
    }

    /// Sends `message`, or buffers it until the next open.
    pub fn send(&self, message: impl Into<String>) {
        self.inner.send(message.into());
    }

    /// Schedules a new channel after the reconnect delay.
    ///
    /// Does nothing while a reconnection is already pending or after a
    /// manual close.
    pub fn reconnect(&self) {
        self.inner.reconnect();
    }

    /// Closes the channel without reconnecting.
    ///
    /// Emits a synthetic `onclose` with code 0 and reason
    /// `"manual disconnect"` right away; the channel's own close follows
    /// when it arrives.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Closes, drops the channel, discards buffered messages and clears
    /// every event registration.
    pub fn destroy(&self) {
        self.inner.close();
        {
            let mut state = self.inner.state.lock();
            state.destroyed = true;
            state.channel = None;
            state.heartbeat = None;
            state.outbound.clear();
            state.reconnect_timer.clear();
            state.stop_signal_task();
        }
        self.inner.hub.clear();
        tracing::info!("Client for {} destroyed", self.inner.url);
    }

    pub fn on(
        &self,
        events: impl Into<EventNames>,
        listener: Listener<EventPayload>,
    ) -> Result<Unsubscribe> {
        Ok(self.inner.hub.on(events, listener)?)
    }

    pub fn off(&self, events: impl Into<EventNames>, listener: &Listener<EventPayload>) -> Result<()> {
        Ok(self.inner.hub.off(events, listener)?)
    }

    pub fn once(&self, events: impl Into<EventNames>) -> Result<Once<EventPayload>> {
        Ok(self.inner.hub.once(events)?)
    }

    pub fn events(&self, events: impl Into<EventNames>) -> Result<EventStream<EventPayload>> {
        Ok(self.inner.hub.events(events)?)
    }

    /// The underlying hub, for `on_any`, `any_events` and listener counts.
    pub fn hub(&self) -> &EventHub<EventPayload> {
        &self.inner.hub
    }
}

impl ClientInner {
    pub(crate) fn new(url: Url, options: WsClientOptions, connector: Arc<dyn Connector>) -> Self {
        Self {
            url,
            options,
            connector,
            hub: EventHub::new(),
            state: Mutex::new(ClientState::new()),
        }
    }

    fn create_channel(self: &Arc<Self>) {
        tracing::info!("Opening channel to {}", self.url);
        let (channel, signals) = self.connector.connect(&self.url);
        let heartbeat = HeartbeatMonitor::new(
            Arc::clone(&channel),
            self.options.heartbeat_idle(),
            self.options.heartbeat_ack_timeout(),
        );

        let (previous_channel, previous_heartbeat) = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.reconnect_pending = false;
            state.reconnect_timer.clear();
            state.stop_signal_task();
            state.signal_task = Some(tokio::spawn(drain_signals(
                Arc::downgrade(self),
                state.generation,
                signals,
            )));
            (
                state.channel.replace(channel),
                state.heartbeat.replace(heartbeat),
            )
        };

        if let Some(heartbeat) = previous_heartbeat {
            heartbeat.reset();
        }
        if let Some(channel) = previous_channel {
            channel.close();
        }
    }

    /// Applies one channel signal to the connection state.
    ///
    /// Runs on the channel's signal task. Listener dispatch is spawned.
    fn handle_signal(self: &Arc<Self>, signal: ChannelSignal) {
        match signal {
            ChannelSignal::Open => self.on_open(),
            ChannelSignal::Error(error) => self.on_error(error),
            ChannelSignal::Close { code, reason } => self.on_close(code, &reason),
            ChannelSignal::Message(text) => self.on_message(text),
        }
    }

    fn on_open(self: &Arc<Self>) {
        tracing::info!("Channel to {} is open", self.url);
        self.publish(ClientEvent::OnOpen, EventPayload::Open);

        let pending = self.state.lock().outbound.drain();
        if !pending.is_empty() {
            tracing::debug!("Flushing {} buffered message(s)", pending.len());
        }
        for message in pending {
            self.send(message);
        }

        let heartbeat = {
            let mut state = self.state.lock();
            state.reconnect_pending = false;
            state.heartbeat.clone()
        };
        if let Some(heartbeat) = heartbeat {
            heartbeat.reset();
            heartbeat.start();
        }
    }

    fn on_error(self: &Arc<Self>, error: String) {
        tracing::error!("[websocket onerror] {}", error);
        self.publish(ClientEvent::OnError, EventPayload::Error(error));
        self.reconnect();
    }

    fn on_close(self: &Arc<Self>, code: u16, reason: &str) {
        let info = CloseInfo::from_channel(code, reason);
        tracing::info!("Channel closed: code={}, reason='{}'", info.code, info.reason);

        let heartbeat = self.state.lock().heartbeat.clone();
        if let Some(heartbeat) = heartbeat {
            heartbeat.reset();
        }

        self.publish(ClientEvent::OnClose, EventPayload::Close(info));

        if self.state.lock().is_manual_close {
            return;
        }
        self.reconnect();
    }

    fn on_message(self: &Arc<Self>, text: String) {
        // Any inbound traffic proves the peer is alive
        let heartbeat = self.state.lock().heartbeat.clone();
        if let Some(heartbeat) = heartbeat {
            heartbeat.reset();
            heartbeat.start();
        }

        if text == PONG {
            tracing::trace!("Heartbeat acknowledged");
            return;
        }

        let dispatch = match self
            .hub
            .publish(ClientEvent::Notify, EventPayload::Message(text))
        {
            Ok(dispatch) => dispatch,
            Err(e) => {
                tracing::error!("[websocket onmessage] {}", e);
                return;
            }
        };

        let hub = self.hub.clone();
        tokio::spawn(async move {
            let error = match dispatch.await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e.to_string(),
                Err(e) => e.to_string(),
            };
            tracing::error!("[websocket onmessage] {}", error);
            if let Err(e) = hub
                .emit(ClientEvent::NotifyError, EventPayload::NotifyError(error))
                .await
            {
                tracing::error!("{} listener failed: {}", ClientEvent::NotifyError, e);
            }
        });
    }

    fn send(&self, message: String) {
        let channel = {
            let mut state = self.state.lock();
            if state.destroyed {
                tracing::warn!("Client destroyed, dropping outbound message");
                return;
            }
            let open = state
                .channel
                .as_ref()
                .filter(|channel| channel.ready_state() == ReadyState::Open)
                .cloned();
            match open {
                Some(channel) => channel,
                None => {
                    state.outbound.push(message);
                    tracing::debug!(
                        "Channel not open, buffered message ({} pending)",
                        state.outbound.len()
                    );
                    return;
                }
            }
        };

        if let Err(e) = channel.send(message.clone()) {
            tracing::warn!("Send failed ({}), buffering message", e);
            self.state.lock().outbound.push(message);
        }
    }

    fn reconnect(self: &Arc<Self>) {
        let delay = self.options.reconnect_delay();
        let weak = Arc::downgrade(self);
        {
            let mut state = self.state.lock();
            if state.destroyed || state.is_manual_close {
                tracing::debug!("Manual close detected, will not attempt to reconnect");
                return;
            }
            if state.reconnect_pending {
                tracing::debug!("Reconnection already pending");
                return;
            }
            state.reconnect_pending = true;
            state.reconnect_timer.arm(delay, async move {
                if let Some(inner) = weak.upgrade() {
                    inner.fire_reconnect();
                }
            });
        }

        tracing::info!("Reconnecting to {} in {:?}", self.url, delay);
        self.publish(ClientEvent::Reconnection, EventPayload::Reconnection);
    }

    fn fire_reconnect(self: &Arc<Self>) {
        {
            let state = self.state.lock();
            if state.destroyed || state.is_manual_close {
                return;
            }
        }
        tracing::info!("Attempting to reconnect...");
        self.create_channel();
    }

    fn close(&self) {
        let (channel, heartbeat) = {
            let mut state = self.state.lock();
            state.is_manual_close = true;
            state.reconnect_pending = false;
            state.reconnect_timer.clear();
            (state.channel.clone(), state.heartbeat.clone())
        };

        if let Some(heartbeat) = heartbeat {
            heartbeat.reset();
        }
        if let Some(channel) = channel {
            channel.close();
        }

        tracing::info!("Disconnecting from {}", self.url);
        self.publish(ClientEvent::OnClose, EventPayload::Close(CloseInfo::manual()));
    }

    /// Publishes a client event. Listener failures are logged by the
    /// dispatch task, never propagated.
    fn publish(&self, event: ClientEvent, payload: EventPayload) {
        let dispatch = match self.hub.publish(event, payload) {
            Ok(dispatch) => dispatch,
            Err(e) => {
                tracing::error!("Failed to publish {}: {}", event, e);
                return;
            }
        };
        tokio::spawn(async move {
            if let Ok(Err(e)) = dispatch.await {
                tracing::error!("{} listener failed: {}", event, e);
            }
        });
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.stop_signal_task();
        state.reconnect_timer.clear();
        if let Some(heartbeat) = state.heartbeat.take() {
            heartbeat.reset();
        }
        if let Some(channel) = state.channel.take() {
            channel.close();
        }
    }
}

/// Feeds one channel's signals to the client until the channel is replaced.
async fn drain_signals(client: Weak<ClientInner>, generation: u64, mut signals: SignalReceiver) {
    while let Some(signal) = signals.recv().await {
        let Some(inner) = client.upgrade() else {
            break;
        };
        if !inner.state.lock().is_current(generation) {
            tracing::debug!("Ignoring {:?} from a replaced channel", signal);
            break;
        }
        inner.handle_signal(signal);
    }
}
