use super::Timer;
use crate::types::heartbeat_tokens::PING;
use crate::websocket::Channel;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Which of the two heartbeat timers is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatPhase {
    Stopped,
    /// Waiting for an idle interval to pass without traffic
    Idle,
    /// Ping sent, waiting for any inbound traffic
    AwaitingAck,
}

struct HeartbeatInner {
    channel: Arc<dyn Channel>,
    idle_interval: Duration,
    ack_timeout: Duration,
    slot: Mutex<Timer>,
    phase: Mutex<HeartbeatPhase>,
}

/// Idle/ack watchdog bound to one channel.
///
/// After `idle_interval` without a reset a ping token is sent; if no reset
/// follows within `ack_timeout` the channel is closed, which lets the owner's
/// close handling take over. Both phases share one timer slot so they can
/// never be armed together.
#[derive(Clone)]
pub struct HeartbeatMonitor {
    inner: Arc<HeartbeatInner>,
}

impl HeartbeatMonitor {
    pub fn new(channel: Arc<dyn Channel>, idle_interval: Duration, ack_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(HeartbeatInner {
                channel,
                idle_interval,
                ack_timeout,
                slot: Mutex::new(Timer::new()),
                phase: Mutex::new(HeartbeatPhase::Stopped),
            }),
        }
    }

    /// Arms the idle timer, clearing any timer already armed.
    pub fn start(&self) {
        let weak = Arc::downgrade(&self.inner);
        let mut slot = self.inner.slot.lock();
        *self.inner.phase.lock() = HeartbeatPhase::Idle;
        slot.arm(self.inner.idle_interval, async move {
            if let Some(inner) = weak.upgrade() {
                inner.on_idle();
            }
        });
    }

    /// Clears whichever timer is armed. Safe to call at any time.
    pub fn reset(&self) {
        self.inner.slot.lock().clear();
        *self.inner.phase.lock() = HeartbeatPhase::Stopped;
    }

    pub fn phase(&self) -> HeartbeatPhase {
        *self.inner.phase.lock()
    }
}

impl HeartbeatInner {
    fn on_idle(self: Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(&self);
        let mut slot = self.slot.lock();
        // Reset or restarted after this callback was already running
        if !slot.is_current_task() {
            return;
        }

        tracing::debug!("No traffic for {:?}, sending heartbeat", self.idle_interval);
        // A failed ping surfaces through the channel's own error signal
        if let Err(e) = self.channel.send(PING.to_string()) {
            tracing::debug!("Heartbeat ping not sent: {}", e);
        }

        *self.phase.lock() = HeartbeatPhase::AwaitingAck;
        slot.arm(self.ack_timeout, async move {
            if let Some(inner) = weak.upgrade() {
                inner.on_ack_timeout();
            }
        });
    }

    fn on_ack_timeout(&self) {
        {
            let slot = self.slot.lock();
            if !slot.is_current_task() {
                return;
            }
            *self.phase.lock() = HeartbeatPhase::Stopped;
        }
        tracing::warn!(
            "[Heartbeat] No reply within {:?}, closing connection",
            self.ack_timeout
        );
        self.channel.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::Connector;
    use crate::websocket::mock::{MockChannel, MockConnector};
    use url::Url;

    fn monitor(idle_ms: u64, ack_ms: u64) -> (Arc<MockChannel>, HeartbeatMonitor) {
        let connector = MockConnector::new();
        let url = Url::parse("ws://localhost/hb").unwrap();
        let (channel, _signals) = connector.connect(&url);
        let mock = connector.channel(0);
        mock.open();
        let monitor = HeartbeatMonitor::new(
            channel,
            Duration::from_millis(idle_ms),
            Duration::from_millis(ack_ms),
        );
        (mock, monitor)
    }

    fn pings(channel: &MockChannel) -> usize {
        channel.sent().iter().filter(|m| m.as_str() == PING).count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_then_close_on_silence() {
        let (channel, monitor) = monitor(100, 100);
        monitor.start();
        assert_eq!(monitor.phase(), HeartbeatPhase::Idle);

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert_eq!(pings(&channel), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(pings(&channel), 1);
        assert_eq!(monitor.phase(), HeartbeatPhase::AwaitingAck);
        assert_eq!(channel.close_calls(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(pings(&channel), 1);
        assert_eq!(channel.close_calls(), 1);
        assert_eq!(monitor.phase(), HeartbeatPhase::Stopped);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(channel.close_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_before_idle_defers_ping() {
        let (channel, monitor) = monitor(100, 100);
        monitor.start();

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(80)).await;
            monitor.reset();
            monitor.start();
        }
        assert_eq!(pings(&channel), 0);

        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(pings(&channel), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_during_ack_phase_prevents_close() {
        let (channel, monitor) = monitor(100, 50);
        monitor.start();
        tokio::time::sleep(Duration::from_millis(110)).await;
        assert_eq!(monitor.phase(), HeartbeatPhase::AwaitingAck);

        monitor.reset();
        monitor.start();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(channel.close_calls(), 0);
        assert_eq!(monitor.phase(), HeartbeatPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_is_idempotent() {
        let (channel, monitor) = monitor(100, 100);
        monitor.reset();
        monitor.start();
        monitor.reset();
        monitor.reset();
        assert_eq!(monitor.phase(), HeartbeatPhase::Stopped);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(channel.sent().is_empty());
        assert_eq!(channel.close_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_callbacks_do_nothing() {
        let (channel, monitor) = monitor(100, 100);
        monitor.start();

        // Not running as the armed timer task
        Arc::clone(&monitor.inner).on_idle();
        monitor.inner.on_ack_timeout();

        assert!(channel.sent().is_empty());
        assert_eq!(channel.close_calls(), 0);
        assert_eq!(monitor.phase(), HeartbeatPhase::Idle);

        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(pings(&channel), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_monitor_stops_timers() {
        let (channel, monitor) = monitor(100, 100);
        monitor.start();
        drop(monitor);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(channel.sent().is_empty());
    }
}
