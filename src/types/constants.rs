/// Heartbeat wire tokens (magic strings layer)
pub mod heartbeat_tokens {
    /// Sent by the client after an idle interval without traffic.
    pub const PING: &str = "#PING";
    /// Expected reply from the peer. Consumed, never republished as `notify`.
    pub const PONG: &str = "#PONG";
}

/// Accepted URL scheme prefixes
pub const WS_SCHEMES: [&str; 2] = ["ws://", "wss://"];

/// Default reconnection delay (milliseconds)
pub const DEFAULT_RECONNECT_DELAY: u64 = 3000;

/// Default heartbeat idle interval (milliseconds)
pub const DEFAULT_HEARTBEAT_IDLE: u64 = 15000;

/// How long a closing channel waits for the peer's close frame (milliseconds)
pub const DEFAULT_CLOSE_TIMEOUT: u64 = 5000;

/// Environment variables read by `WsClientOptions::from_env`
pub mod env_vars {
    pub const RECONNECT_DELAY_MS: &str = "WS_RECONNECT_DELAY_MS";
    pub const HEARTBEAT_IDLE_MS: &str = "WS_HEARTBEAT_IDLE_MS";
    pub const HEARTBEAT_ACK_TIMEOUT_MS: &str = "WS_HEARTBEAT_ACK_TIMEOUT_MS";
}
