use std::thread;
use std::time::{Duration, Instant};

/// OS sleep frequently oversleeps by a millisecond or more, so everything
/// shorter than this is spun instead of slept.
const SPIN_THRESHOLD_S: f64 = 0.002;

/// Fixed-rate tick clock. One instance paces one loop; there are no
/// concurrent callers.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    origin: Instant,
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn restart(&mut self) {
        self.origin = Instant::now();
    }

    /// Seconds since the origin. Saturates at zero if `shift_start` has
    /// banked the origin past the present instant.
    pub fn elapsed_seconds(&self) -> f64 {
        Instant::now()
            .saturating_duration_since(self.origin)
            .as_secs_f64()
    }

    /// Millisecond timestamp for Input messages; wraps at `u32::MAX`.
    pub fn timestamp_ms(&self) -> u32 {
        (self.elapsed_seconds() * 1000.0) as u64 as u32
    }

    /// Blocks until `elapsed_seconds() >= target_s`. Sleeps while more
    /// than [`SPIN_THRESHOLD_S`] remains, leaving the threshold as spin
    /// margin so scheduler-granularity oversleep cannot push past the
    /// boundary.
    pub fn wait_until(&self, target_s: f64) {
        loop {
            let remaining = target_s - self.elapsed_seconds();
            if remaining <= 0.0 {
                return;
            }

            if remaining > SPIN_THRESHOLD_S {
                thread::sleep(Duration::from_secs_f64(remaining - SPIN_THRESHOLD_S));
            } else {
                std::hint::spin_loop();
            }
        }
    }

    /// Advances the origin by `accumulate_s`, banking one fixed step so
    /// the next `wait_until` can reuse the same target without wall-clock
    /// delta bookkeeping. Overshoot from the previous tick carries over
    /// and shortens the next wait.
    pub fn shift_start(&mut self, accumulate_s: f64) {
        debug_assert!(accumulate_s >= 0.0);
        self.origin += Duration::from_secs_f64(accumulate_s);
    }
}
