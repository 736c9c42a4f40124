//! Opt-in phase timing.
//!
//! Off unless `enable_timing()` was called or `FM_TIMING` is set. Elapsed
//! times go out as `tracing` debug events with a `phase` field.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static FORCED: AtomicBool = AtomicBool::new(false);

pub fn enable_timing() {
    FORCED.store(true, Ordering::Relaxed);
}

pub fn disable_timing() {
    FORCED.store(false, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    FORCED.load(Ordering::Relaxed) || std::env::var_os("FM_TIMING").is_some()
}

/// Measures one pipeline phase. Inert when timing is off.
pub struct Timer {
    phase: &'static str,
    started: Option<Instant>,
}

impl Timer {
    pub fn start(phase: &'static str) -> Self {
        Self {
            phase,
            started: is_enabled().then(Instant::now),
        }
    }

    pub fn phase(&self) -> &'static str {
        self.phase
    }

    /// Elapsed time, or `None` if timing was off when the timer started.
    pub fn stop(self) -> Option<Duration> {
        self.started.map(|t| t.elapsed())
    }

    pub fn stop_and_log(self) {
        let phase = self.phase;
        if let Some(elapsed) = self.stop() {
            tracing::debug!(phase, elapsed_ms = elapsed.as_secs_f64() * 1e3, "phase finished");
        }
    }
}
