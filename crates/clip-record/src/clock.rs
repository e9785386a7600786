//! The animation clock.
//!
//! Each job's recording loop is driven by its own clock rather than a
//! global animation-frame callback. The clock is injectable: production
//! uses [`SystemClock`] (wall time, sleeping between ticks), tests use
//! [`VirtualClock`] (advances instantly, fully deterministic).

use std::time::Instant;

use clip_core::Timestamp;

/// Default spacing between animation ticks (~30 ticks per second).
pub const DEFAULT_TICK_MS: f64 = 33.0;

/// Source of elapsed time for one recording. Owned exclusively by the
/// job's worker; never shared.
pub trait Clock: Send {
    /// Elapsed time since the clock started.
    fn now(&self) -> Timestamp;

    /// Advance to the next animation tick.
    fn tick(&mut self);
}

/// Wall-clock time; `tick` sleeps out the remainder of the tick interval.
pub struct SystemClock {
    start: Instant,
    tick: std::time::Duration,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_tick_ms(DEFAULT_TICK_MS)
    }

    pub fn with_tick_ms(tick_ms: f64) -> Self {
        Self {
            start: Instant::now(),
            tick: std::time::Duration::from_micros((tick_ms * 1000.0) as u64),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_seconds(self.start.elapsed().as_secs_f64())
    }

    fn tick(&mut self) {
        std::thread::sleep(self.tick);
    }
}

/// Deterministic clock: `tick` advances by a fixed step, no sleeping.
pub struct VirtualClock {
    now_ms: f64,
    step_ms: f64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::with_step_ms(DEFAULT_TICK_MS)
    }

    pub fn with_step_ms(step_ms: f64) -> Self {
        Self {
            now_ms: 0.0,
            step_ms,
        }
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now_ms)
    }

    fn tick(&mut self) {
        self.now_ms += self.step_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock_steps() {
        let mut clock = VirtualClock::with_step_ms(100.0);
        assert_eq!(clock.now().as_millis(), 0.0);
        clock.tick();
        clock.tick();
        assert_eq!(clock.now().as_millis(), 200.0);
    }

    #[test]
    fn test_system_clock_advances() {
        let mut clock = SystemClock::with_tick_ms(1.0);
        let before = clock.now();
        clock.tick();
        assert!(clock.now() >= before);
    }
}
