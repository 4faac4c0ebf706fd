//! One-shot timer with a bounded duration and a latched finished state.

use lockstep_traits::TimeDriven;

use crate::error::ConfigError;
use crate::util::us_to_seconds;

type FinishListener = Box<dyn FnMut()>;

/// Counts up to a fixed duration and latches `finished`. Elapsed time clamps
/// at the duration, so an overshooting tick never leaks into a restarted
/// cycle. The optional finish listener fires exactly once, in the tick the
/// transition occurs.
pub struct Timer {
    duration_us: u64,
    elapsed_us: u64,
    running: bool,
    paused: bool,
    finished: bool,
    on_finish: Option<FinishListener>,
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("duration_us", &self.duration_us)
            .field("elapsed_us", &self.elapsed_us)
            .field("running", &self.running)
            .field("finished", &self.finished)
            .finish()
    }
}

impl Timer {
    /// Creates an idle timer. A zero duration is a configuration error.
    pub fn new(duration_us: u64) -> Result<Self, ConfigError> {
        if duration_us == 0 {
            return Err(ConfigError::InvalidDuration(duration_us));
        }
        Ok(Self {
            duration_us,
            elapsed_us: 0,
            running: false,
            paused: false,
            finished: false,
            on_finish: None,
        })
    }

    /// Changes the duration. Rejects zero; does not alter elapsed time.
    pub fn set_duration_us(&mut self, duration_us: u64) -> Result<(), ConfigError> {
        if duration_us == 0 {
            return Err(ConfigError::InvalidDuration(duration_us));
        }
        self.duration_us = duration_us;
        Ok(())
    }

    pub fn duration_us(&self) -> u64 {
        self.duration_us
    }

    /// Starts (or restarts) from zero.
    pub fn start(&mut self) {
        self.elapsed_us = 0;
        self.running = true;
        self.paused = false;
        self.finished = false;
    }

    /// Interrupts and resets to zero without firing the listener.
    pub fn stop(&mut self) {
        self.elapsed_us = 0;
        self.running = false;
        self.paused = false;
        self.finished = false;
    }

    pub fn pause(&mut self) {
        if self.running {
            self.paused = true;
        }
    }

    /// Resuming an already-running timer is a no-op; a finished timer stays
    /// finished until restarted.
    pub fn resume(&mut self) {
        if self.finished {
            return;
        }
        if self.paused {
            self.paused = false;
        } else if !self.running {
            self.running = true;
        }
    }

    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    pub fn seconds(&self) -> f64 {
        us_to_seconds(self.elapsed_us)
    }

    /// Completion ratio in [0, 1].
    pub fn progress(&self) -> f32 {
        (self.elapsed_us as f64 / self.duration_us as f64).min(1.0) as f32
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Registers the finish listener, replacing any previous one.
    pub fn on_finish(&mut self, listener: impl FnMut() + 'static) {
        self.on_finish = Some(Box::new(listener));
    }
}

impl TimeDriven for Timer {
    fn add_time(&mut self, micros: u64) {
        if !self.running || self.paused || self.finished {
            return;
        }
        self.elapsed_us = self.elapsed_us.saturating_add(micros).min(self.duration_us);
        if self.elapsed_us >= self.duration_us {
            self.finished = true;
            self.running = false;
            if let Some(listener) = self.on_finish.as_mut() {
                listener();
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running && !self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn zero_duration_rejected_at_construction() {
        assert_eq!(Timer::new(0).unwrap_err(), ConfigError::InvalidDuration(0));
        let mut t = Timer::new(1).unwrap();
        assert!(t.set_duration_us(0).is_err());
    }

    #[test]
    fn finishes_with_clamped_elapsed() {
        let mut timer = Timer::new(1_000_000).unwrap();
        timer.start();
        for _ in 0..3 {
            timer.add_time(300_000);
        }
        assert!(!timer.is_finished());
        assert_eq!(timer.elapsed_us(), 900_000);

        timer.add_time(300_000);
        assert!(timer.is_finished());
        assert_eq!(timer.elapsed_us(), 1_000_000);
        assert_eq!(timer.progress(), 1.0);
    }

    #[test]
    fn restart_does_not_leak_overshoot() {
        let mut timer = Timer::new(100).unwrap();
        timer.start();
        timer.add_time(1_000);
        assert_eq!(timer.elapsed_us(), 100);
        timer.start();
        assert_eq!(timer.elapsed_us(), 0);
        assert!(!timer.is_finished());
    }

    #[test]
    fn finish_listener_fires_exactly_once() {
        let fired = Rc::new(Cell::new(0u32));
        let mut timer = Timer::new(500).unwrap();
        let fired_in_listener = Rc::clone(&fired);
        timer.on_finish(move || fired_in_listener.set(fired_in_listener.get() + 1));

        timer.start();
        timer.add_time(499);
        assert_eq!(fired.get(), 0);
        timer.add_time(1);
        assert_eq!(fired.get(), 1);
        // Further ticks must not re-fire a latched timer.
        timer.add_time(500);
        assert_eq!(fired.get(), 1);

        timer.start();
        timer.add_time(600);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn paused_timer_ignores_time() {
        let mut timer = Timer::new(1_000).unwrap();
        timer.start();
        timer.add_time(400);
        timer.pause();
        timer.add_time(400);
        assert_eq!(timer.elapsed_us(), 400);
        timer.resume();
        timer.add_time(600);
        assert!(timer.is_finished());
    }
}
