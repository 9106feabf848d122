pub mod channel;
pub mod factory;
#[cfg(test)]
pub(crate) mod mock;

pub use channel::{Channel, ChannelSignal, Connector, ReadyState, SignalReceiver, SignalSender};
pub use factory::TungsteniteConnector;
