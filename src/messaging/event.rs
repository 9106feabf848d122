use crate::types::CloseInfo;
use serde::Serialize;

/// Client event strings (magic strings layer)
pub mod client_events {
    pub const NOTIFY: &str = "notify";
    pub const ON_ERROR: &str = "onerror";
    pub const NOTIFY_ERROR: &str = "notifyError";
    pub const ON_OPEN: &str = "onopen";
    pub const ON_CLOSE: &str = "onclose";
    pub const RECONNECTION: &str = "reconnection";
}

/// Key under which listeners and pull streams are registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    /// String identifier
    Named(String),

    /// Numeric identifier
    Id(i64),

    /// Reserved: listener registered
    ListenerAdded,

    /// Reserved: listener removed
    ListenerRemoved,
}

impl EventName {
    /// Whether this is one of the reserved bookkeeping names.
    pub fn is_meta(&self) -> bool {
        matches!(self, Self::ListenerAdded | Self::ListenerRemoved)
    }
}

impl From<&str> for EventName {
    fn from(s: &str) -> Self {
        Self::Named(s.to_string())
    }
}

impl From<String> for EventName {
    fn from(s: String) -> Self {
        Self::Named(s)
    }
}

impl From<i64> for EventName {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<ClientEvent> for EventName {
    fn from(event: ClientEvent) -> Self {
        Self::Named(event.as_str().to_string())
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{}", name),
            Self::Id(id) => write!(f, "#{}", id),
            Self::ListenerAdded => write!(f, "listenerAdded"),
            Self::ListenerRemoved => write!(f, "listenerRemoved"),
        }
    }
}

/// One or more event names, as accepted by `on`, `off`, `once` and `events`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames(Vec<EventName>);

impl EventNames {
    pub fn as_slice(&self) -> &[EventName] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<EventName> {
        self.0
    }
}

impl From<EventName> for EventNames {
    fn from(name: EventName) -> Self {
        Self(vec![name])
    }
}

impl From<ClientEvent> for EventNames {
    fn from(event: ClientEvent) -> Self {
        Self(vec![event.into()])
    }
}

impl From<&str> for EventNames {
    fn from(s: &str) -> Self {
        Self(vec![s.into()])
    }
}

impl From<String> for EventNames {
    fn from(s: String) -> Self {
        Self(vec![s.into()])
    }
}

impl From<i64> for EventNames {
    fn from(id: i64) -> Self {
        Self(vec![id.into()])
    }
}

impl From<Vec<EventName>> for EventNames {
    fn from(names: Vec<EventName>) -> Self {
        Self(names)
    }
}

impl<const N: usize> From<[&str; N]> for EventNames {
    fn from(names: [&str; N]) -> Self {
        Self(names.into_iter().map(EventName::from).collect())
    }
}

impl<const N: usize> From<[ClientEvent; N]> for EventNames {
    fn from(events: [ClientEvent; N]) -> Self {
        Self(events.into_iter().map(EventName::from).collect())
    }
}

/// Events emitted by `WsClient`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientEvent {
    /// Inbound application message
    Notify,

    /// Channel reported an error
    OnError,

    /// Handling an inbound message failed
    NotifyError,

    /// Channel opened
    OnOpen,

    /// Channel closed (or was closed manually)
    OnClose,

    /// A reconnection was scheduled
    Reconnection,
}

impl ClientEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notify => client_events::NOTIFY,
            Self::OnError => client_events::ON_ERROR,
            Self::NotifyError => client_events::NOTIFY_ERROR,
            Self::OnOpen => client_events::ON_OPEN,
            Self::OnClose => client_events::ON_CLOSE,
            Self::Reconnection => client_events::RECONNECTION,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            client_events::NOTIFY => Some(Self::Notify),
            client_events::ON_ERROR => Some(Self::OnError),
            client_events::NOTIFY_ERROR => Some(Self::NotifyError),
            client_events::ON_OPEN => Some(Self::OnOpen),
            client_events::ON_CLOSE => Some(Self::OnClose),
            client_events::RECONNECTION => Some(Self::Reconnection),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Data carried by client events
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    /// Native open signal
    Open,
    /// Inbound text message
    Message(String),
    /// Channel error description
    Error(String),
    /// Failure raised while dispatching an inbound message
    NotifyError(String),
    /// Decoded close
    Close(CloseInfo),
    /// Reconnection scheduled
    Reconnection,
}

impl EventPayload {
    /// Text of a `Message` payload.
    pub fn as_message(&self) -> Option<&str> {
        match self {
            Self::Message(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_close(&self) -> Option<&CloseInfo> {
        match self {
            Self::Close(info) => Some(info),
            _ => None,
        }
    }
}
