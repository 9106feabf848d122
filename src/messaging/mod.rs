pub mod event;
pub mod hub;
pub mod listener;
pub mod stream;

pub use event::{ClientEvent, EventName, EventNames, EventPayload};
pub use hub::{AnyListener, EventHub, Once, Unsubscribe};
pub use listener::{Listener, ListenerId, ListenerResult};
pub use stream::EventStream;
