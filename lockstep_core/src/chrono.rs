//! Free-running chronometer with pause/resume semantics.

use lockstep_traits::TimeDriven;

use crate::util::us_to_seconds;

/// Measures elapsed time fed to it by an engine (or directly via
/// [`TimeDriven::add_time`]). No terminal state: a chronometer runs until
/// stopped. Elapsed time uses wrapping arithmetic so very long uptimes roll
/// over instead of saturating.
#[derive(Debug, Default, Clone)]
pub struct Chronometer {
    elapsed_us: u64,
    running: bool,
    paused: bool,
}

impl Chronometer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) from zero.
    pub fn start(&mut self) {
        self.elapsed_us = 0;
        self.running = true;
        self.paused = false;
    }

    /// Interrupts and resets to zero.
    pub fn stop(&mut self) {
        self.elapsed_us = 0;
        self.running = false;
        self.paused = false;
    }

    /// Freezes elapsed time. Pausing an already-paused or idle chronometer
    /// changes nothing.
    pub fn pause(&mut self) {
        if self.running {
            self.paused = true;
        }
    }

    /// Resumes from a pause (or from idle, preserving elapsed time).
    /// Resuming an already-running chronometer is a no-op.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
        } else if !self.running {
            self.running = true;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Forces the elapsed time.
    pub fn set(&mut self, micros: u64) {
        self.elapsed_us = micros;
    }

    /// Adds time manually, independent of the running state.
    pub fn add(&mut self, micros: u64) {
        self.elapsed_us = self.elapsed_us.wrapping_add(micros);
    }

    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    /// Derived seconds view.
    pub fn seconds(&self) -> f64 {
        us_to_seconds(self.elapsed_us)
    }

    pub fn has_passed(&self, micros: u64) -> bool {
        self.elapsed_us >= micros
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl TimeDriven for Chronometer {
    fn add_time(&mut self, micros: u64) {
        if self.running && !self.paused {
            self.elapsed_us = self.elapsed_us.wrapping_add(micros);
        }
    }

    fn is_running(&self) -> bool {
        self.running && !self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_only_while_running() {
        let mut chrono = Chronometer::new();
        chrono.add_time(1_000);
        assert_eq!(chrono.elapsed_us(), 0);

        chrono.start();
        chrono.add_time(1_000);
        chrono.add_time(500);
        assert_eq!(chrono.elapsed_us(), 1_500);

        chrono.pause();
        chrono.add_time(9_999);
        assert_eq!(chrono.elapsed_us(), 1_500);

        chrono.resume();
        chrono.add_time(500);
        assert_eq!(chrono.elapsed_us(), 2_000);
        assert!(chrono.has_passed(2_000));
        assert!(!chrono.has_passed(2_001));
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let mut chrono = Chronometer::new();
        chrono.start();
        chrono.add_time(100);

        chrono.pause();
        let snapshot = chrono.clone();
        chrono.pause();
        assert_eq!(chrono.elapsed_us(), snapshot.elapsed_us());
        assert_eq!(chrono.is_running(), snapshot.is_running());

        chrono.resume();
        chrono.resume();
        assert!(chrono.is_running());
        assert_eq!(chrono.elapsed_us(), 100);
    }

    #[test]
    fn resume_from_idle_preserves_elapsed() {
        let mut chrono = Chronometer::new();
        chrono.set(42);
        chrono.resume();
        chrono.add_time(8);
        assert_eq!(chrono.elapsed_us(), 50);
    }

    #[test]
    fn elapsed_wraps_instead_of_saturating() {
        let mut chrono = Chronometer::new();
        chrono.start();
        chrono.set(u64::MAX - 1);
        chrono.add_time(3);
        assert_eq!(chrono.elapsed_us(), 1);
    }
}
