// Module declarations
mod buffer;
mod builder;
mod core;
mod state;

// Public API exports
pub use buffer::OutboundBuffer;
pub use builder::{WsClientBuilder, WsClientOptions};
pub use self::core::WsClient;

pub(crate) use self::core::ClientInner;
