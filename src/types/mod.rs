pub mod close_code;
pub mod constants;
pub mod error;

pub use close_code::{CloseInfo, close_reason};
pub use constants::*;
pub use error::{HubError, ListenerError, Result, WsClientError};
