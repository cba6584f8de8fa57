use embassy_time::{Duration, Instant};

/// Lost-signal watchdog. The plug normally reports once per second; if the
/// latest reading is older than the timeout, nothing can be inferred about
/// the heater and both status axes must read Unknown.
#[derive(Debug, Clone, Copy)]
pub struct StalenessMonitor {
    timeout: Duration,
}

impl StalenessMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// True when the reading has aged past the lost-signal timeout.
    /// Strictly greater-than: a reading exactly at the timeout is still fresh.
    pub fn is_stale(&self, now: Instant, received_at: Instant) -> bool {
        now.duration_since(received_at) > self.timeout
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_within_timeout() {
        let monitor = StalenessMonitor::new(Duration::from_secs(10));
        let received = Instant::from_millis(0);

        assert!(!monitor.is_stale(Instant::from_millis(500), received));
        assert!(!monitor.is_stale(Instant::from_millis(10_000), received));
    }

    #[test]
    fn test_stale_past_timeout() {
        let monitor = StalenessMonitor::new(Duration::from_secs(10));
        let received = Instant::from_millis(0);

        assert!(monitor.is_stale(Instant::from_millis(10_001), received));
        assert!(monitor.is_stale(Instant::from_millis(60_000), received));
    }
}
