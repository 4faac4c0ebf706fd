//! Range-scaling filters: plain min/max and quantile-based robust scaling.

use crate::engine::Engine;
use crate::error::ConfigError;
use crate::filter::MovingFilter;
use crate::node::Transform;
use crate::stats::{MovingAverage, Window, alpha_for, settled_alpha, window_target};

/// Sentinel output when the learned range is empty or degenerate.
const ZERO_RANGE_SENTINEL: f32 = 0.5;

/// Rescales a signal into [0, 1] against its running minimum and maximum.
///
/// With a finite window the extremes decay toward the current signal once
/// the window has filled, so a range observed long ago gradually loses
/// authority; with the unbounded window they only ever widen. While
/// calibrating, `put` returns the raw value unchanged.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    engine: Engine,
    window: Window,
    min: f32,
    max: f32,
    n_samples: u32,
    calibrating: bool,
    value: f32,
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl MinMaxScaler {
    /// Unbounded scaler attached to the primary engine.
    pub fn new() -> Self {
        Self {
            engine: Engine::primary(),
            window: Window::Unbounded,
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
            n_samples: 0,
            calibrating: true,
            value: ZERO_RANGE_SENTINEL,
        }
    }

    pub fn with_window(window: Window) -> Result<Self, ConfigError> {
        let window = window.validate()?;
        Ok(Self { window, ..Self::new() })
    }

    /// Attaches the filter to a specific engine (for tests or isolated
    /// pipelines).
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Whether the extremes never decay.
    pub fn is_window_infinite(&self) -> bool {
        self.window.is_infinite()
    }

    pub fn set_window(&mut self, window: Window) -> Result<(), ConfigError> {
        self.window = window.validate()?;
        Ok(())
    }

    /// Learned minimum, once at least one sample has been seen.
    pub fn min(&self) -> Option<f32> {
        (self.n_samples > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f32> {
        (self.n_samples > 0).then_some(self.max)
    }

    pub fn sample_count(&self) -> u32 {
        self.n_samples
    }

    fn scale(&self, raw: f32) -> f32 {
        if self.n_samples == 0 {
            return ZERO_RANGE_SENTINEL;
        }
        let range = self.max - self.min;
        if range <= 0.0 {
            ZERO_RANGE_SENTINEL
        } else {
            ((raw - self.min) / range).clamp(0.0, 1.0)
        }
    }

    fn learn(&mut self, raw: f32) {
        let decay = self.decay_alpha();
        if raw <= self.min {
            self.min = raw;
        } else {
            self.min += decay * (raw - self.min);
        }
        if raw >= self.max {
            self.max = raw;
        } else {
            self.max += decay * (raw - self.max);
        }
        self.n_samples = self.n_samples.saturating_add(1);
    }

    /// Decay factor for inside-range samples. Zero while the range is
    /// younger than the window, so early samples cannot erase a freshly
    /// observed extreme; the settled EMA factor afterwards.
    fn decay_alpha(&self) -> f32 {
        match window_target(self.window, self.engine.sample_rate()) {
            Some(n_target) if (self.n_samples as f32) >= n_target => settled_alpha(n_target),
            _ => 0.0,
        }
    }
}

impl Transform for MinMaxScaler {
    fn put(&mut self, raw: f32) -> f32 {
        let out = if self.calibrating {
            self.learn(raw);
            raw
        } else {
            self.scale(raw)
        };
        self.value = out;
        out
    }

    fn get(&self) -> f32 {
        self.value
    }
}

impl MovingFilter for MinMaxScaler {
    fn reset(&mut self) {
        self.min = f32::INFINITY;
        self.max = f32::NEG_INFINITY;
        self.n_samples = 0;
        self.calibrating = true;
        self.value = ZERO_RANGE_SENTINEL;
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

// Quantile estimates barely move on samples inside the learned range, so a
// floor on the step size keeps them adaptive when the decay factor is small.
const MIN_ETA: f32 = 1e-3;
// Quantile levels are kept strictly inside (0, 1).
const QUANTILE_LEVEL_FLOOR: f32 = 1e-4;

/// Default fraction of the signal mass spanned by the learned range.
pub const DEFAULT_SPAN: f32 = 0.99;

/// Rescales a signal into [0, 1] against a low/high quantile pair instead
/// of the absolute extremes, so isolated spikes cannot capture the range.
///
/// The quantiles follow a stochastic (Robbins-Monro style) update: each
/// sample nudges the estimate up or down by a step proportional to the
/// learned spread, weighted so the estimate converges on the configured
/// quantile level. Steps never overshoot past the sample itself. While
/// calibrating, `put` returns the raw value unchanged.
#[derive(Debug, Clone)]
pub struct RobustScaler {
    engine: Engine,
    window: Window,
    span: f32,
    low_level: f32,
    low_q: f32,
    high_q: f32,
    spread: MovingAverage,
    n_samples: u32,
    calibrating: bool,
    value: f32,
}

impl Default for RobustScaler {
    fn default() -> Self {
        Self::new()
    }
}

fn step_quantile(q: f32, sample: f32, eta: f32, level: f32) -> f32 {
    if sample < q {
        (q - eta * (1.0 - level)).max(sample)
    } else if sample > q {
        (q + eta * level).min(sample)
    } else {
        q
    }
}

impl RobustScaler {
    /// Scaler spanning the central 99% of the signal, with an unbounded
    /// window, attached to the primary engine.
    pub fn new() -> Self {
        Self {
            engine: Engine::primary(),
            window: Window::Unbounded,
            span: DEFAULT_SPAN,
            low_level: Self::low_level_for(DEFAULT_SPAN),
            low_q: 0.0,
            high_q: 0.0,
            spread: MovingAverage::new(),
            n_samples: 0,
            calibrating: true,
            value: ZERO_RANGE_SENTINEL,
        }
    }

    pub fn with_span(span: f32) -> Result<Self, ConfigError> {
        let mut s = Self::new();
        s.set_span(span)?;
        Ok(s)
    }

    pub fn with_window(window: Window) -> Result<Self, ConfigError> {
        let window = window.validate()?;
        let mut s = Self::new();
        s.window = window;
        s.spread = MovingAverage::with_window(window)?;
        Ok(s)
    }

    /// Attaches the filter to a specific engine (for tests or isolated
    /// pipelines).
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    fn low_level_for(span: f32) -> f32 {
        ((1.0 - span) * 0.5).max(QUANTILE_LEVEL_FLOOR)
    }

    /// Fraction of the signal mass the learned range should span, in
    /// (0, 1]. A span of 1 degenerates toward plain min/max behavior.
    pub fn set_span(&mut self, span: f32) -> Result<(), ConfigError> {
        if !(span > 0.0 && span <= 1.0) {
            return Err(ConfigError::InvalidSpan(span));
        }
        self.span = span;
        self.low_level = Self::low_level_for(span);
        Ok(())
    }

    pub fn span(&self) -> f32 {
        self.span
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Learned low quantile, once at least one sample has been seen.
    pub fn low_quantile(&self) -> Option<f32> {
        (self.n_samples > 0).then_some(self.low_q)
    }

    pub fn high_quantile(&self) -> Option<f32> {
        (self.n_samples > 0).then_some(self.high_q)
    }

    pub fn sample_count(&self) -> u32 {
        self.n_samples
    }

    fn scale(&self, raw: f32) -> f32 {
        if self.n_samples == 0 {
            return ZERO_RANGE_SENTINEL;
        }
        let range = self.high_q - self.low_q;
        if range <= 0.0 {
            ZERO_RANGE_SENTINEL
        } else {
            ((raw - self.low_q) / range).clamp(0.0, 1.0)
        }
    }

    fn learn(&mut self, raw: f32) {
        let rate = self.engine.sample_rate();
        let alpha = alpha_for(self.window, self.n_samples, rate);
        if self.n_samples == 0 {
            self.low_q = raw;
            self.high_q = raw;
        }
        let mid = 0.5 * (self.low_q + self.high_q);
        self.spread.apply((raw - mid).abs(), rate);
        let eta = alpha.max(MIN_ETA) * 6.0 * self.spread.get();

        self.low_q = step_quantile(self.low_q, raw, eta, self.low_level);
        self.high_q = step_quantile(self.high_q, raw, eta, 1.0 - self.low_level);
        // A crossed pair collapses to its midpoint and re-widens from there.
        if self.low_q > self.high_q {
            let mid = 0.5 * (self.low_q + self.high_q);
            self.low_q = mid;
            self.high_q = mid;
        }
        self.n_samples = self.n_samples.saturating_add(1);
    }
}

impl Transform for RobustScaler {
    fn put(&mut self, raw: f32) -> f32 {
        let out = if self.calibrating {
            self.learn(raw);
            raw
        } else {
            self.scale(raw)
        };
        self.value = out;
        out
    }

    fn get(&self) -> f32 {
        self.value
    }
}

impl MovingFilter for RobustScaler {
    fn reset(&mut self) {
        self.low_q = 0.0;
        self.high_q = 0.0;
        self.spread.reset();
        self.n_samples = 0;
        self.calibrating = true;
        self.value = ZERO_RANGE_SENTINEL;
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
