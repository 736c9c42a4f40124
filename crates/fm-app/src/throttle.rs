//! Leading/trailing-edge throttle with caller-supplied time.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub interval: Duration,
    /// Fire on the first call of a window.
    pub leading: bool,
    /// Fire once at the end of a window that saw further calls.
    pub trailing: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            leading: true,
            trailing: true,
        }
    }
}

/// Collapses bursts of calls to at most one firing per interval.
///
/// The throttle never sleeps or spawns; callers pass `now` to `call` and
/// check `poll` (typically once per frame) for the trailing edge.
#[derive(Debug, Clone)]
pub struct Throttle {
    config: ThrottleConfig,
    window_start: Option<Instant>,
    pending: bool,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            window_start: None,
            pending: false,
        }
    }

    pub fn config(&self) -> ThrottleConfig {
        self.config
    }

    /// Register a call. Returns true if the action should run now.
    pub fn call(&mut self, now: Instant) -> bool {
        match self.window_start {
            Some(start) if now < start + self.config.interval => {
                self.pending |= self.config.trailing;
                false
            }
            _ => {
                self.window_start = Some(now);
                if self.config.leading {
                    self.pending = false;
                    true
                } else {
                    self.pending = self.config.trailing;
                    false
                }
            }
        }
    }

    /// Returns true if a trailing call is due.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.window_start {
            Some(start) if self.pending && now >= start + self.config.interval => {
                self.pending = false;
                self.window_start = Some(now);
                true
            }
            _ => false,
        }
    }

    /// When the pending trailing call becomes due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        match self.window_start {
            Some(start) if self.pending => Some(start + self.config.interval),
            _ => None,
        }
    }

    /// Drop any pending call and start fresh.
    pub fn cancel(&mut self) {
        self.window_start = None;
        self.pending = false;
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn leading_call_fires_immediately() {
        let t0 = Instant::now();
        let mut throttle = Throttle::default();
        assert!(throttle.call(t0));
        assert!(!throttle.poll(t0 + ms(500)));
    }

    #[test]
    fn burst_collapses_to_leading_plus_trailing() {
        let t0 = Instant::now();
        let mut throttle = Throttle::default();
        assert!(throttle.call(t0));
        assert!(!throttle.call(t0 + ms(10)));
        assert!(!throttle.call(t0 + ms(50)));
        assert_eq!(throttle.deadline(), Some(t0 + ms(100)));
        assert!(!throttle.poll(t0 + ms(99)));
        assert!(throttle.poll(t0 + ms(100)));
        assert!(!throttle.poll(t0 + ms(150)));
    }

    #[test]
    fn calls_after_trailing_start_new_window() {
        let t0 = Instant::now();
        let mut throttle = Throttle::default();
        throttle.call(t0);
        throttle.call(t0 + ms(20));
        assert!(throttle.poll(t0 + ms(120)));
        assert!(!throttle.call(t0 + ms(150)));
        assert!(throttle.poll(t0 + ms(220)));
        assert!(throttle.call(t0 + ms(400)));
    }

    #[test]
    fn trailing_only() {
        let t0 = Instant::now();
        let mut throttle = Throttle::new(ThrottleConfig {
            leading: false,
            ..ThrottleConfig::default()
        });
        assert!(!throttle.call(t0));
        assert!(throttle.poll(t0 + ms(100)));
    }

    #[test]
    fn leading_only_drops_burst() {
        let t0 = Instant::now();
        let mut throttle = Throttle::new(ThrottleConfig {
            trailing: false,
            ..ThrottleConfig::default()
        });
        assert!(throttle.call(t0));
        assert!(!throttle.call(t0 + ms(30)));
        assert_eq!(throttle.deadline(), None);
        assert!(!throttle.poll(t0 + ms(200)));
    }

    #[test]
    fn cancel_clears_pending() {
        let t0 = Instant::now();
        let mut throttle = Throttle::default();
        throttle.call(t0);
        throttle.call(t0 + ms(5));
        throttle.cancel();
        assert!(!throttle.poll(t0 + ms(200)));
        assert!(throttle.call(t0 + ms(6)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn fires_at_most_once_per_interval_and_never_drops_the_last_call(
            gaps in prop::collection::vec(0_u64..250, 1..40)
        ) {
            let interval = Duration::from_millis(100);
            let t0 = Instant::now();
            let mut throttle = Throttle::default();
            let mut fired: Vec<Instant> = Vec::new();
            let mut now = t0;
            let mut last_call_fired = false;

            for gap in gaps {
                now += Duration::from_millis(gap);
                if throttle.poll(now) {
                    fired.push(now);
                }
                last_call_fired = throttle.call(now);
                if last_call_fired {
                    fired.push(now);
                }
            }

            for pair in fired.windows(2) {
                prop_assert!(pair[1] - pair[0] >= interval);
            }

            if !last_call_fired {
                let due = throttle.deadline();
                prop_assert!(due.is_some());
                if let Some(due) = due {
                    prop_assert!(throttle.poll(due));
                }
            }
        }
    }
}
