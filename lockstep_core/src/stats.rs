//! Streaming estimators: exponential moving average and online mean/variance.
//!
//! Both estimators run in O(1) time and O(1) memory regardless of window
//! size. Finite windows (sample count or time duration) are approximated by
//! an exponential decay whose smoothing factor is derived from the window
//! and the engine's sample rate; the unbounded window tracks exact
//! cumulative statistics.

use crate::error::ConfigError;

/// Default number of standard deviations for outlier queries.
pub const DEFAULT_OUTLIER_N_STDDEV: f32 = 1.5;

/// Window semantics for a streaming estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Window {
    /// Cumulative statistics over every sample ever applied.
    Unbounded,
    /// Approximate window over the last `n` samples.
    Samples(u32),
    /// Approximate window over the given duration, converted to a sample
    /// count using the engine's sample rate.
    Seconds(f32),
}

impl Window {
    /// Validates window parameters. Zero-sized windows are configuration
    /// errors, not runtime surprises.
    pub fn validate(self) -> Result<Self, ConfigError> {
        match self {
            Window::Samples(0) => Err(ConfigError::InvalidSampleWindow),
            Window::Seconds(s) if !(s > 0.0) => Err(ConfigError::InvalidTimeWindow(s)),
            w => Ok(w),
        }
    }

    pub fn is_infinite(self) -> bool {
        matches!(self, Window::Unbounded)
    }
}

/// Smoothing factor for the `n_samples`-th update of an estimator with the
/// given window at the given sample rate.
///
/// For the first samples the factor ramps as `1/(n+1)` (a plain cumulative
/// mean), so early values do not take disproportionate weight; once the
/// target window size is reached it settles on the standard EMA factor
/// `2/(n_target+1)`. An unknown sample rate (<= 0) makes a time window
/// behave like the cumulative ramp until the rate is established.
pub(crate) fn alpha_for(window: Window, n_samples: u32, sample_rate: f32) -> f32 {
    let ramp = 1.0 / (n_samples as f32 + 1.0);
    let Some(n_target) = window_target(window, sample_rate) else {
        return ramp;
    };
    if (n_samples as f32) < n_target - 1.0 {
        ramp
    } else {
        settled_alpha(n_target)
    }
}

/// Effective sample-count target of a window. `None` for the unbounded
/// window, or for a time window before the sample rate is established.
pub(crate) fn window_target(window: Window, sample_rate: f32) -> Option<f32> {
    match window {
        Window::Unbounded => None,
        Window::Samples(n) => Some(n as f32),
        Window::Seconds(s) => (sample_rate > 0.0).then(|| s * sample_rate),
    }
}

/// EMA factor once the ramp-in is over: `2/(n_target+1)`.
pub(crate) fn settled_alpha(n_target: f32) -> f32 {
    if n_target > 1.0 { 2.0 / (n_target + 1.0) } else { 1.0 }
}

/// The weighted contribution retained to undo exactly one `apply`.
#[derive(Debug, Clone, Copy)]
struct LastApply {
    sample: f32,
    alpha: f32,
}

/// Exponential moving average with O(1) state.
///
/// The `amend` path replaces the single most recent applied sample with a
/// corrected value without double-counting it. A second consecutive amend,
/// or an amend before any apply, is a no-op (returns `false`).
#[derive(Debug, Clone)]
pub struct MovingAverage {
    value: f32,
    n_samples: u32,
    window: Window,
    last: Option<LastApply>,
}

impl Default for MovingAverage {
    fn default() -> Self {
        Self::new()
    }
}

impl MovingAverage {
    /// Unbounded (cumulative) moving average.
    pub fn new() -> Self {
        Self {
            value: 0.0,
            n_samples: 0,
            window: Window::Unbounded,
            last: None,
        }
    }

    pub fn with_window(window: Window) -> Result<Self, ConfigError> {
        let window = window.validate()?;
        Ok(Self { window, ..Self::new() })
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn set_window(&mut self, window: Window) -> Result<(), ConfigError> {
        self.window = window.validate()?;
        Ok(())
    }

    /// Clears all accumulated state back to "no samples seen".
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.n_samples = 0;
        self.last = None;
    }

    /// Resets with an initial estimate (counts as one sample).
    pub fn reset_to(&mut self, initial: f32) {
        self.value = initial;
        self.n_samples = 1;
        self.last = None;
    }

    /// Smoothing factor that the next `apply` would use.
    pub fn alpha(&self, sample_rate: f32) -> f32 {
        alpha_for(self.window, self.n_samples, sample_rate)
    }

    /// Commits a new sample permanently and returns the updated average.
    pub fn apply(&mut self, sample: f32, sample_rate: f32) -> f32 {
        let alpha = self.alpha(sample_rate);
        self.value += alpha * (sample - self.value);
        self.n_samples = self.n_samples.saturating_add(1);
        self.last = Some(LastApply { sample, alpha });
        self.value
    }

    /// Replaces the most recently applied sample with `corrected` without
    /// double-counting it. Returns `false` (and leaves the state untouched)
    /// when there is no apply left to amend: before the first apply, after
    /// a reset, or when the last apply was already amended.
    pub fn amend(&mut self, corrected: f32) -> bool {
        let Some(last) = self.last.take() else {
            return false;
        };
        self.value += last.alpha * (corrected - last.sample);
        true
    }

    /// Current average. Zero before the first sample.
    pub fn get(&self) -> f32 {
        self.value
    }

    pub fn len(&self) -> u32 {
        self.n_samples
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples == 0
    }
}

/// Online mean/variance estimator.
///
/// The unbounded window uses Welford's algorithm (exact cumulative mean and
/// variance); finite windows track an exponential decay of the mean and of
/// the mean of squares with the shared smoothing factor. Derived variance
/// is clamped at zero.
#[derive(Debug, Clone)]
pub struct MovingStats {
    core: StatsCore,
}

#[derive(Debug, Clone)]
enum StatsCore {
    Welford {
        count: u64,
        mean: f32,
        m2: f32,
        last: Option<f32>,
    },
    Decay {
        window: Window,
        mean: f32,
        mean2: f32,
        n_samples: u32,
        last: Option<LastApply>,
    },
}

impl Default for MovingStats {
    fn default() -> Self {
        Self::new()
    }
}

impl MovingStats {
    /// Unbounded (Welford) statistics.
    pub fn new() -> Self {
        Self {
            core: StatsCore::Welford {
                count: 0,
                mean: 0.0,
                m2: 0.0,
                last: None,
            },
        }
    }

    pub fn with_window(window: Window) -> Result<Self, ConfigError> {
        let window = window.validate()?;
        Ok(match window {
            Window::Unbounded => Self::new(),
            w => Self {
                core: StatsCore::Decay {
                    window: w,
                    mean: 0.0,
                    mean2: 0.0,
                    n_samples: 0,
                    last: None,
                },
            },
        })
    }

    pub fn window(&self) -> Window {
        match &self.core {
            StatsCore::Welford { .. } => Window::Unbounded,
            StatsCore::Decay { window, .. } => *window,
        }
    }

    pub fn is_window_infinite(&self) -> bool {
        self.window().is_infinite()
    }

    /// Clears all accumulated state back to "no samples seen".
    pub fn reset(&mut self) {
        match &mut self.core {
            StatsCore::Welford { count, mean, m2, last } => {
                *count = 0;
                *mean = 0.0;
                *m2 = 0.0;
                *last = None;
            }
            StatsCore::Decay { mean, mean2, n_samples, last, .. } => {
                *mean = 0.0;
                *mean2 = 0.0;
                *n_samples = 0;
                *last = None;
            }
        }
    }

    /// Commits a new sample permanently. Returns the updated mean.
    pub fn apply(&mut self, sample: f32, sample_rate: f32) -> f32 {
        match &mut self.core {
            StatsCore::Welford { count, mean, m2, last } => {
                *count += 1;
                let d = sample - *mean;
                *mean += d / *count as f32;
                let d2 = sample - *mean;
                *m2 += d * d2;
                *last = Some(sample);
                *mean
            }
            StatsCore::Decay {
                window,
                mean,
                mean2,
                n_samples,
                last,
            } => {
                let alpha = alpha_for(*window, *n_samples, sample_rate);
                *mean += alpha * (sample - *mean);
                *mean2 += alpha * (sample * sample - *mean2);
                *n_samples = n_samples.saturating_add(1);
                *last = Some(LastApply { sample, alpha });
                *mean
            }
        }
    }

    /// Replaces the most recently applied sample with `corrected` as if the
    /// original had never been applied. Valid only for undoing the single
    /// most recent `apply`; a second consecutive amend is a no-op and
    /// returns `false`.
    pub fn amend(&mut self, corrected: f32) -> bool {
        match &mut self.core {
            StatsCore::Welford { count, mean, m2, last } => {
                let Some(prev) = last.take() else {
                    return false;
                };
                if *count <= 1 {
                    *mean = corrected;
                    *m2 = 0.0;
                    return true;
                }
                // Undo the previous sample, then fold in the corrected one.
                let n = *count as f32;
                let mean_before = (n * *mean - prev) / (n - 1.0);
                *m2 -= (prev - mean_before) * (prev - *mean);
                let d = corrected - mean_before;
                *mean = mean_before + d / n;
                let d2 = corrected - *mean;
                *m2 = (*m2 + d * d2).max(0.0);
                true
            }
            StatsCore::Decay { mean, mean2, last, .. } => {
                let Some(prev) = last.take() else {
                    return false;
                };
                *mean += prev.alpha * (corrected - prev.sample);
                *mean2 += prev.alpha * (corrected * corrected - prev.sample * prev.sample);
                true
            }
        }
    }

    /// Number of samples applied since the last reset.
    pub fn count(&self) -> u64 {
        match &self.core {
            StatsCore::Welford { count, .. } => *count,
            StatsCore::Decay { n_samples, .. } => u64::from(*n_samples),
        }
    }

    /// Mean of the samples. Zero before the first sample.
    pub fn mean(&self) -> f32 {
        match &self.core {
            StatsCore::Welford { mean, .. } => *mean,
            StatsCore::Decay { mean, .. } => *mean,
        }
    }

    /// Population variance. Never negative; zero before the second sample.
    pub fn variance(&self) -> f32 {
        match &self.core {
            StatsCore::Welford { count, m2, .. } => {
                if *count < 2 {
                    0.0
                } else {
                    (*m2 / *count as f32).max(0.0)
                }
            }
            StatsCore::Decay { mean, mean2, .. } => (mean2 - mean * mean).max(0.0),
        }
    }

    pub fn stddev(&self) -> f32 {
        self.variance().sqrt()
    }

    /// Z-score of `value` against the current statistics. Returns the 0
    /// sentinel when the standard deviation is zero or no samples exist.
    pub fn normalize(&self, value: f32) -> f32 {
        let s = self.stddev();
        if self.count() == 0 || s <= 0.0 {
            0.0
        } else {
            (value - self.mean()) / s
        }
    }

    /// True iff `value` lies at least `n_stddev` standard deviations above
    /// the mean. False before the first sample or while no spread exists.
    pub fn is_high_outlier(&self, value: f32, n_stddev: f32) -> bool {
        self.normalize(value) >= n_stddev.abs()
    }

    /// True iff `value` lies at least `n_stddev` standard deviations below
    /// the mean. False before the first sample or while no spread exists.
    pub fn is_low_outlier(&self, value: f32, n_stddev: f32) -> bool {
        self.normalize(value) <= -n_stddev.abs()
    }

    /// True iff `value` is an outlier on either side.
    pub fn is_outlier(&self, value: f32, n_stddev: f32) -> bool {
        self.normalize(value).abs() >= n_stddev.abs()
    }
}
