use crate::messaging::EventName;
use thiserror::Error;

/// Error returned by a listener body.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the event hub.
#[derive(Error, Debug)]
pub enum HubError {
    /// Registration or stream over an empty set of names
    #[error("at least one event name is required")]
    NoEventNames,

    /// `emit` was called with one of the reserved bookkeeping names
    #[error("`{0}` is a reserved meta event and cannot be emitted")]
    MetaEvent(EventName),

    /// At least one listener failed; the first failure is reported
    #[error("listener failed: {0}")]
    Listener(#[source] ListenerError),
}

/// Errors that can occur when using the client.
#[derive(Error, Debug)]
pub enum WsClientError {
    /// URL does not start with `ws://` or `wss://`
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Event hub misuse or listener failure
    #[error(transparent)]
    Hub(#[from] HubError),

    /// Unusable configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// The client spawns timers and must be built inside a tokio runtime
    #[error("no tokio runtime available")]
    NoRuntime,

    /// The client was destroyed and cannot open channels anymore
    #[error("client destroyed")]
    Destroyed,

    /// Attempted to write to a channel that is not open
    #[error("Not connected")]
    NotConnected,
}

/// Convenience type alias for `Result<T, WsClientError>`.
pub type Result<T> = std::result::Result<T, WsClientError>;
