use super::{ClientInner, WsClient};
use crate::types::{
    DEFAULT_HEARTBEAT_IDLE, DEFAULT_RECONNECT_DELAY, Result, WS_SCHEMES, WsClientError, env_vars,
};
use crate::websocket::{Connector, TungsteniteConnector};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Client settings. Unset fields fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WsClientOptions {
    /// Fixed delay before each reconnection attempt. Default: 3000 ms.
    pub reconnect_delay_ms: Option<u64>,
    /// Silence tolerated before a ping is sent. Default: 15000 ms.
    pub heartbeat_idle_ms: Option<u64>,
    /// Wait for any reply after a ping. Default: the idle interval.
    pub heartbeat_ack_timeout_ms: Option<u64>,
}

impl WsClientOptions {
    /// Reads `WS_RECONNECT_DELAY_MS`, `WS_HEARTBEAT_IDLE_MS` and
    /// `WS_HEARTBEAT_ACK_TIMEOUT_MS`. Unset variables stay `None`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            reconnect_delay_ms: env_millis(env_vars::RECONNECT_DELAY_MS)?,
            heartbeat_idle_ms: env_millis(env_vars::HEARTBEAT_IDLE_MS)?,
            heartbeat_ack_timeout_ms: env_millis(env_vars::HEARTBEAT_ACK_TIMEOUT_MS)?,
        })
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms.unwrap_or(DEFAULT_RECONNECT_DELAY))
    }

    pub fn heartbeat_idle(&self) -> Duration {
        Duration::from_millis(self.heartbeat_idle_ms.unwrap_or(DEFAULT_HEARTBEAT_IDLE))
    }

    pub fn heartbeat_ack_timeout(&self) -> Duration {
        self.heartbeat_ack_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.heartbeat_idle())
    }
}

fn env_millis(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| WsClientError::Config(format!("{key}={value:?}: {e}"))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(WsClientError::Config(format!("{key}: {e}"))),
    }
}

/// Checks the scheme prefix, then parses.
pub(crate) fn validate_url(endpoint: &str) -> Result<Url> {
    if !WS_SCHEMES.iter().any(|scheme| endpoint.starts_with(scheme)) {
        return Err(WsClientError::InvalidUrl(endpoint.to_string()));
    }
    Ok(Url::parse(endpoint)?)
}

/// Builder for WsClient that handles initialization
pub struct WsClientBuilder {
    url: Url,
    options: WsClientOptions,
    connector: Arc<dyn Connector>,
}

impl WsClientBuilder {
    /// Create a new builder. Fails if `endpoint` is not a `ws://` or `wss://` URL.
    pub fn new(endpoint: impl AsRef<str>, options: WsClientOptions) -> Result<Self> {
        let url = validate_url(endpoint.as_ref())?;
        Ok(Self {
            url,
            options,
            connector: Arc::new(TungsteniteConnector::new()),
        })
    }

    /// Replaces the default tokio-tungstenite connector.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Build the client and open the first channel.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<WsClient> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(WsClientError::NoRuntime);
        }

        let client = WsClient {
            inner: Arc::new(ClientInner::new(self.url, self.options, self.connector)),
        };
        client.create_channel()?;
        Ok(client)
    }
}
