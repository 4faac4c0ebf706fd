//! Z-score normalizing filter.

use crate::engine::Engine;
use crate::error::ConfigError;
use crate::filter::MovingFilter;
use crate::node::Transform;
use crate::stats::{DEFAULT_OUTLIER_N_STDDEV, MovingStats, Window};

/// Target mean and standard deviation for pipelines working in [0, 1].
pub const UNIT_TARGET_MEAN: f32 = 0.5;
pub const UNIT_TARGET_STDDEV: f32 = 0.15;

/// Remaps a signal to a configured target mean and standard deviation.
///
/// Output is `target_mean + z * target_stddev` where `z` is the z-score of
/// the raw value against the learned statistics. The plain constructor
/// targets mean 0 and standard deviation 1 with no clamping; `unit_range`
/// re-centers into [0, 1] the way sensor pipelines usually want.
///
/// While calibrating, the output is pinned at the target mean (the zero
/// z-score point), so downstream nodes see a stable neutral level until the
/// statistics are representative.
#[derive(Debug, Clone)]
pub struct Normalizer {
    engine: Engine,
    stats: MovingStats,
    target_mean: f32,
    target_stddev: f32,
    clamp: Option<(f32, f32)>,
    calibrating: bool,
    clamped: bool,
    value: f32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Pure z-score normalizer (target mean 0, stddev 1, no clamp) with an
    /// unbounded window, attached to the primary engine.
    pub fn new() -> Self {
        Self {
            engine: Engine::primary(),
            stats: MovingStats::new(),
            target_mean: 0.0,
            target_stddev: 1.0,
            clamp: None,
            calibrating: true,
            clamped: false,
            value: 0.0,
        }
    }

    /// Normalizer targeting mean 0.5 and stddev 0.15, clamped to [0, 1].
    pub fn unit_range() -> Self {
        let mut n = Self::new();
        n.target_mean = UNIT_TARGET_MEAN;
        n.target_stddev = UNIT_TARGET_STDDEV;
        n.clamp = Some((0.0, 1.0));
        n.value = n.target_mean;
        n
    }

    pub fn with_window(window: Window) -> Result<Self, ConfigError> {
        let mut n = Self::new();
        n.stats = MovingStats::with_window(window)?;
        Ok(n)
    }

    /// Attaches the filter to a specific engine (for tests or isolated
    /// pipelines).
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    /// Changes the output targets. The standard deviation must be positive.
    pub fn set_targets(&mut self, mean: f32, stddev: f32) -> Result<(), ConfigError> {
        if !(stddev > 0.0) {
            return Err(ConfigError::InvalidTargetStddev(stddev));
        }
        self.target_mean = mean;
        self.target_stddev = stddev;
        Ok(())
    }

    pub fn target_mean(&self) -> f32 {
        self.target_mean
    }

    pub fn target_stddev(&self) -> f32 {
        self.target_stddev
    }

    /// Clamps output to `[low, high]`; `None` disables clamping.
    pub fn set_clamp(&mut self, clamp: Option<(f32, f32)>) {
        self.clamp = clamp;
    }

    /// Whether the last output was clipped by the configured clamp.
    pub fn is_clamped(&self) -> bool {
        self.clamped
    }

    pub fn window(&self) -> Window {
        self.stats.window()
    }

    /// Learned mean of the raw signal.
    pub fn mean(&self) -> f32 {
        self.stats.mean()
    }

    pub fn stddev(&self) -> f32 {
        self.stats.stddev()
    }

    pub fn sample_count(&self) -> u64 {
        self.stats.count()
    }

    /// Whether `raw` would be an outlier against the learned statistics,
    /// at the default threshold of 1.5 standard deviations.
    pub fn is_outlier(&self, raw: f32) -> bool {
        self.stats.is_outlier(raw, DEFAULT_OUTLIER_N_STDDEV)
    }

    pub fn is_high_outlier(&self, raw: f32, n_stddev: f32) -> bool {
        self.stats.is_high_outlier(raw, n_stddev)
    }

    pub fn is_low_outlier(&self, raw: f32, n_stddev: f32) -> bool {
        self.stats.is_low_outlier(raw, n_stddev)
    }

    /// Raw value below which `is_low_outlier` at the default threshold holds.
    pub fn low_outlier_threshold(&self) -> f32 {
        self.stats.mean() - DEFAULT_OUTLIER_N_STDDEV * self.stats.stddev()
    }

    /// Raw value above which `is_high_outlier` at the default threshold holds.
    pub fn high_outlier_threshold(&self) -> f32 {
        self.stats.mean() + DEFAULT_OUTLIER_N_STDDEV * self.stats.stddev()
    }
}

impl Transform for Normalizer {
    fn put(&mut self, raw: f32) -> f32 {
        if self.calibrating {
            self.stats.apply(raw, self.engine.sample_rate());
        }
        let out = if self.calibrating {
            self.target_mean
        } else {
            self.target_mean + self.stats.normalize(raw) * self.target_stddev
        };
        let (out, clipped) = match self.clamp {
            Some((low, high)) => {
                let clamped = out.clamp(low, high);
                (clamped, clamped != out)
            }
            None => (out, false),
        };
        self.clamped = clipped;
        self.value = out;
        out
    }

    fn get(&self) -> f32 {
        self.value
    }
}

impl MovingFilter for Normalizer {
    fn reset(&mut self) {
        self.stats.reset();
        self.calibrating = true;
        self.clamped = false;
        self.value = self.target_mean;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrated(samples: &[f32]) -> Normalizer {
        let mut n = Normalizer::new().with_engine(Engine::new());
        for &v in samples {
            n.put(v);
        }
        n.pause_calibrating();
        n
    }

    #[test]
    fn outputs_target_mean_while_calibrating() {
        let mut n = Normalizer::new().with_engine(Engine::new());
        assert!(n.is_calibrating());
        assert_eq!(n.put(42.0), 0.0);

        let mut unit = Normalizer::unit_range().with_engine(Engine::new());
        assert_eq!(unit.put(42.0), 0.5);
    }

    #[test]
    fn committed_output_is_a_z_score() {
        let mut n = calibrated(&[9.0, 10.0, 11.0, 10.0, 9.0, 11.0]);
        let mean = n.mean();
        let stddev = n.stddev();
        assert!((n.put(mean)).abs() < 1e-5);
        assert!((n.put(mean + 2.0 * stddev) - 2.0).abs() < 1e-4);
        assert!((n.put(mean - stddev) + 1.0).abs() < 1e-4);
    }

    #[test]
    fn committed_statistics_are_frozen() {
        let mut n = calibrated(&[1.0, 2.0, 3.0]);
        let count = n.sample_count();
        n.put(1_000.0);
        assert_eq!(n.sample_count(), count);
        n.resume_calibrating();
        n.put(1_000.0);
        assert_eq!(n.sample_count(), count + 1);
    }

    #[test]
    fn clamp_is_reported() {
        let mut n = calibrated(&[0.4, 0.5, 0.6, 0.5]);
        n.set_targets(0.5, 0.15).unwrap();
        n.set_clamp(Some((0.0, 1.0)));
        n.put(0.5);
        assert!(!n.is_clamped());
        n.put(100.0);
        assert!(n.is_clamped());
        assert_eq!(n.get(), 1.0);
    }

    #[test]
    fn zero_spread_yields_neutral_output() {
        let mut n = calibrated(&[2.0, 2.0, 2.0]);
        // No spread: z-score sentinel is 0, output is the target mean.
        assert_eq!(n.put(5.0), 0.0);
    }

    #[test]
    fn non_positive_target_stddev_rejected() {
        let mut n = Normalizer::new();
        assert!(n.set_targets(0.5, 0.0).is_err());
        assert!(n.set_targets(0.5, -1.0).is_err());
    }

    #[test]
    fn outlier_thresholds_bracket_the_mean() {
        let n = calibrated(&[9.0, 10.0, 11.0, 10.0, 9.0, 11.0]);
        assert!(n.low_outlier_threshold() < n.mean());
        assert!(n.high_outlier_threshold() > n.mean());
        assert!(n.is_high_outlier(n.high_outlier_threshold() + 0.1, DEFAULT_OUTLIER_N_STDDEV));
        assert!(!n.is_high_outlier(n.high_outlier_threshold() - 0.1, DEFAULT_OUTLIER_N_STDDEV));
    }

    #[test]
    fn reset_reenters_calibration() {
        let mut n = calibrated(&[1.0, 2.0]);
        assert!(!n.is_calibrating());
        n.reset();
        assert!(n.is_calibrating());
        assert_eq!(n.sample_count(), 0);
    }
}
