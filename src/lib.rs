//! # Resilient WS
//!
//! A self-healing WebSocket client: one logical connection that reconnects
//! after a fixed delay, detects silent peers with a `#PING`/`#PONG`
//! heartbeat, buffers outbound messages until the channel opens, and
//! publishes everything on an async event hub.
//!
//! ## Example
//!
//! ```no_run
//! use resilient_ws::{ClientEvent, EventPayload, Listener, WsClient, WsClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WsClient::new("ws://localhost:9999", WsClientOptions::from_env()?)?;
//!
//!     client.on(
//!         [ClientEvent::OnOpen, ClientEvent::OnClose],
//!         Listener::from_fn(|payload: EventPayload| println!("{:?}", payload)),
//!     )?;
//!
//!     let mut messages = client.events(ClientEvent::Notify)?;
//!     client.send("hello");
//!
//!     while let Some(payload) = messages.advance().await {
//!         println!("{:?}", payload);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod types;
pub mod websocket;

pub use client::{WsClient, WsClientBuilder, WsClientOptions};
pub use infrastructure::HeartbeatMonitor;
pub use messaging::{
    ClientEvent, EventHub, EventName, EventPayload, EventStream, Listener, Once, Unsubscribe,
};
pub use types::{CloseInfo, Result, WsClientError};
pub use websocket::{Channel, ChannelSignal, Connector, ReadyState, TungsteniteConnector};
