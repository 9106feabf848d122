// Infrastructure module - timers and the heartbeat watchdog
pub mod heartbeat;
pub mod timer;

pub use heartbeat::{HeartbeatMonitor, HeartbeatPhase};
pub use timer::Timer;
