//! Exponential smoothing filter.

use crate::engine::Engine;
use crate::error::ConfigError;
use crate::filter::MovingFilter;
use crate::node::Transform;
use crate::stats::{MovingAverage, Window};

/// Default smoothing window.
pub const DEFAULT_TIME_WINDOW_SECONDS: f32 = 0.1;

/// Smooths a signal with an exponential moving average. No clamping.
///
/// Feeding a second value within the same engine step amends the average in
/// place instead of applying it, so a pipeline polled twice in one tick does
/// not smooth twice as fast. Further re-samples in that step are dropped.
/// Pausing calibration freezes the average; `put` then just reports it.
#[derive(Debug, Clone)]
pub struct Smoother {
    engine: Engine,
    avg: MovingAverage,
    calibrating: bool,
    last_step: Option<u64>,
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new()
    }
}

impl Smoother {
    /// Smoother over a 0.1 s window, attached to the primary engine.
    pub fn new() -> Self {
        Self {
            engine: Engine::primary(),
            // Statically valid window; the fallback is unreachable.
            avg: MovingAverage::with_window(Window::Seconds(DEFAULT_TIME_WINDOW_SECONDS))
                .unwrap_or_default(),
            calibrating: true,
            last_step: None,
        }
    }

    pub fn with_window(window: Window) -> Result<Self, ConfigError> {
        let mut s = Self::new();
        s.avg = MovingAverage::with_window(window)?;
        Ok(s)
    }

    /// Attaches the filter to a specific engine (for tests or isolated
    /// pipelines).
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn window(&self) -> Window {
        self.avg.window()
    }

    pub fn set_window(&mut self, window: Window) -> Result<(), ConfigError> {
        self.avg.set_window(window)
    }

    pub fn sample_count(&self) -> u32 {
        self.avg.len()
    }
}

impl Transform for Smoother {
    fn put(&mut self, raw: f32) -> f32 {
        if self.calibrating {
            let step = self.engine.n_steps();
            if self.last_step == Some(step) {
                // A re-sample within one tick replaces the previous reading
                // instead of stacking on top of it. At most one correction
                // per tick; anything beyond that is dropped.
                self.avg.amend(raw);
            } else {
                self.avg.apply(raw, self.engine.sample_rate());
                self.last_step = Some(step);
            }
        }
        self.avg.get()
    }

    fn get(&self) -> f32 {
        self.avg.get()
    }
}

impl MovingFilter for Smoother {
    fn reset(&mut self) {
        self.avg.reset();
        self.calibrating = true;
        self.last_step = None;
    }

    fn is_calibrating(&self) -> bool {
        self.calibrating
    }

    fn pause_calibrating(&mut self) {
        self.calibrating = false;
    }

    fn resume_calibrating(&mut self) {
        self.calibrating = true;
    }
}
