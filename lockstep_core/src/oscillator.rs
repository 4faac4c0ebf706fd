//! Phase-accumulator oscillator with selectable waveform and optional
//! per-cycle jitter.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use lockstep_traits::TimeDriven;

use crate::error::ConfigError;
use crate::node::Source;
use crate::util::MICROS_PER_SEC;

// Jitter rate multipliers are clamped to [1/K, K] so a pathological draw
// cannot stall or race the oscillator.
const JITTER_CLAMP: f32 = 32.0;

/// Output shape of an [`Oscillator`]. Tagged variants instead of a subclass
/// per shape: the phase machinery is identical, only the final mapping from
/// phase to value differs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    /// Rises over `width` of the period, falls over the rest. `width` of 0
    /// or 1 degenerates to a sawtooth.
    Triangle { width: f32 },
    Sine,
    /// High for `duty` of the period.
    Square { duty: f32 },
}

impl Waveform {
    pub fn triangle(width: f32) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&width) {
            return Err(ConfigError::InvalidWaveformParam(width));
        }
        Ok(Waveform::Triangle { width })
    }

    pub fn square(duty: f32) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&duty) {
            return Err(ConfigError::InvalidWaveformParam(duty));
        }
        Ok(Waveform::Square { duty })
    }

    /// Maps a phase in [0, 1) to an output level in [0, 1].
    fn shape(self, phase: f64) -> f32 {
        let p = phase as f32;
        match self {
            Waveform::Triangle { width } => {
                if width <= 0.0 {
                    1.0 - p
                } else if width >= 1.0 {
                    p
                } else if p < width {
                    p / width
                } else {
                    (1.0 - p) / (1.0 - width)
                }
            }
            Waveform::Sine => 0.5 * (1.0 - (std::f32::consts::TAU * p).cos()),
            Waveform::Square { duty } => {
                if p < duty {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Periodic scalar source driven by elapsed time.
///
/// Phase lives in [0, 1) and advances by `micros / period` per update,
/// direction-adjusted. With randomness enabled, each cycle blends the
/// nominal rate with a rate multiplier drawn from a truncated exponential,
/// giving organic variation without losing the configured mean period.
#[derive(Debug, Clone)]
pub struct Oscillator {
    period_us: u64,
    phase: f64,
    phase_shift: f64,
    forward: bool,
    running: bool,
    randomness: f32,
    cycle_rate_mult: Option<f32>,
    waveform: Waveform,
    rng: SmallRng,
}

impl Oscillator {
    /// Creates a stopped oscillator. A zero period is a configuration error.
    pub fn new(period_us: u64, waveform: Waveform) -> Result<Self, ConfigError> {
        if period_us == 0 {
            return Err(ConfigError::InvalidPeriod(period_us));
        }
        Ok(Self {
            period_us,
            phase: 0.0,
            phase_shift: 0.0,
            forward: true,
            running: false,
            randomness: 0.0,
            cycle_rate_mult: None,
            waveform,
            rng: SmallRng::from_entropy(),
        })
    }

    pub fn sine(period_us: u64) -> Result<Self, ConfigError> {
        Self::new(period_us, Waveform::Sine)
    }

    /// Symmetric triangle.
    pub fn triangle(period_us: u64) -> Result<Self, ConfigError> {
        Self::new(period_us, Waveform::Triangle { width: 0.5 })
    }

    /// Square with 50% duty cycle.
    pub fn square(period_us: u64) -> Result<Self, ConfigError> {
        Self::new(period_us, Waveform::Square { duty: 0.5 })
    }

    /// Reseeds the jitter source, for deterministic tests.
    pub fn seed_jitter(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
        self.cycle_rate_mult = None;
    }

    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    pub fn set_period_us(&mut self, period_us: u64) -> Result<(), ConfigError> {
        if period_us == 0 {
            return Err(ConfigError::InvalidPeriod(period_us));
        }
        self.period_us = period_us;
        Ok(())
    }

    /// Frequency view of the period.
    pub fn frequency_hz(&self) -> f32 {
        MICROS_PER_SEC as f32 / self.period_us as f32
    }

    pub fn start(&mut self) {
        self.phase = 0.0;
        self.running = true;
        self.cycle_rate_mult = None;
    }

    pub fn stop(&mut self) {
        self.phase = 0.0;
        self.running = false;
    }

    /// Freezes the phase in place.
    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Current phase in [0, 1), before phase shift.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Forces the phase; any value is wrapped into [0, 1).
    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase.rem_euclid(1.0);
    }

    pub fn phase_shift(&self) -> f64 {
        self.phase_shift
    }

    pub fn set_phase_shift(&mut self, shift: f64) {
        self.phase_shift = shift;
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    /// Sets the direction of oscillation without resetting the phase.
    pub fn set_forward(&mut self, forward: bool) {
        self.forward = forward;
    }

    pub fn reverse(&mut self) {
        self.forward = !self.forward;
    }

    pub fn randomness(&self) -> f32 {
        self.randomness
    }

    /// Sets the jitter amount in [0, 1] without resetting the phase. 0 is
    /// fully deterministic; 1 draws the whole cycle rate from the jitter
    /// distribution.
    pub fn randomize(&mut self, amount: f32) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&amount) {
            return Err(ConfigError::InvalidRandomness(amount));
        }
        self.randomness = amount;
        if amount == 0.0 {
            self.cycle_rate_mult = None;
        }
        Ok(())
    }

    /// Instantaneous output level in [0, 1].
    pub fn value(&self) -> f32 {
        let shifted = (self.phase + self.phase_shift).rem_euclid(1.0);
        self.waveform.shape(shifted)
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    // Rate multiplier k = 1 / (-ln U) with U uniform in (0, 1], clamped to
    // [1/K, K]. Mean cycle length stays near the nominal period.
    fn draw_rate_mult(&mut self) -> f32 {
        let u: f32 = self.rng.gen_range(f32::EPSILON..=1.0);
        let k = 1.0 / (-u.ln()).max(f32::MIN_POSITIVE);
        k.clamp(1.0 / JITTER_CLAMP, JITTER_CLAMP)
    }
}

impl TimeDriven for Oscillator {
    fn add_time(&mut self, micros: u64) {
        if !self.running || micros == 0 {
            return;
        }
        let rate_mult = if self.randomness > 0.0 {
            let drawn = match self.cycle_rate_mult {
                Some(k) => k,
                None => {
                    let k = self.draw_rate_mult();
                    self.cycle_rate_mult = Some(k);
                    k
                }
            };
            (1.0 - self.randomness) + self.randomness * drawn
        } else {
            1.0
        };

        let delta = micros as f64 / self.period_us as f64 * f64::from(rate_mult);
        let advanced = if self.forward {
            self.phase + delta
        } else {
            self.phase - delta
        };
        // Cycle boundary crossed: schedule a fresh jitter draw.
        if !(0.0..1.0).contains(&advanced) {
            self.cycle_rate_mult = None;
        }
        self.phase = advanced.rem_euclid(1.0);
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

impl Source for Oscillator {
    fn read(&mut self) -> f32 {
        self.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn zero_period_rejected() {
        assert!(Oscillator::sine(0).is_err());
        let mut osc = Oscillator::sine(1_000).unwrap();
        assert_eq!(osc.set_period_us(0), Err(ConfigError::InvalidPeriod(0)));
    }

    #[test]
    fn phase_advances_modulo_one() {
        let mut osc = Oscillator::triangle(1_000_000).unwrap();
        osc.start();
        osc.add_time(250_000);
        assert!((osc.phase() - 0.25).abs() < 1e-9);
        osc.add_time(1_000_000);
        assert!((osc.phase() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn reverse_direction_without_phase_reset() {
        let mut osc = Oscillator::triangle(1_000_000).unwrap();
        osc.start();
        osc.add_time(300_000);
        osc.reverse();
        assert!((osc.phase() - 0.3).abs() < 1e-9);
        osc.add_time(100_000);
        assert!((osc.phase() - 0.2).abs() < 1e-9);
        // Underflow wraps into [0, 1).
        osc.add_time(400_000);
        assert!((osc.phase() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn paused_oscillator_holds_phase() {
        let mut osc = Oscillator::sine(10_000).unwrap();
        osc.start();
        osc.add_time(2_500);
        osc.pause();
        osc.add_time(9_999);
        assert!((osc.phase() - 0.25).abs() < 1e-9);
        osc.resume();
        assert!(osc.is_running());
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(0.25, 0.5)]
    #[case(0.5, 1.0)]
    #[case(0.75, 0.5)]
    fn triangle_shape(#[case] phase: f64, #[case] expected: f32) {
        let w = Waveform::Triangle { width: 0.5 };
        assert!((w.shape(phase) - expected).abs() < 1e-6);
    }

    #[test]
    fn sine_spans_unit_range() {
        let w = Waveform::Sine;
        assert!(w.shape(0.0).abs() < 1e-6);
        assert!((w.shape(0.5) - 1.0).abs() < 1e-6);
        assert!((w.shape(0.25) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn square_duty_cycle() {
        let w = Waveform::square(0.2).unwrap();
        assert_eq!(w.shape(0.1), 1.0);
        assert_eq!(w.shape(0.3), 0.0);
        assert!(Waveform::square(1.5).is_err());
    }

    #[test]
    fn randomness_out_of_range_rejected() {
        let mut osc = Oscillator::sine(1_000).unwrap();
        assert!(osc.randomize(1.5).is_err());
        assert!(osc.randomize(-0.1).is_err());
        assert!(osc.randomize(0.5).is_ok());
    }

    #[test]
    fn jitter_preserves_phase_continuity() {
        let mut osc = Oscillator::sine(1_000_000).unwrap();
        osc.seed_jitter(7);
        osc.start();
        osc.add_time(100_000);
        let before = osc.phase();
        osc.randomize(0.8).unwrap();
        assert!((osc.phase() - before).abs() < 1e-12);
        // Jittered advance still lands in [0, 1).
        for _ in 0..50 {
            osc.add_time(90_000);
            assert!((0.0..1.0).contains(&osc.phase()));
        }
    }

    #[test]
    fn zero_randomness_is_deterministic() {
        let mut a = Oscillator::sine(500_000).unwrap();
        let mut b = Oscillator::sine(500_000).unwrap();
        a.start();
        b.start();
        for _ in 0..17 {
            a.add_time(30_000);
            b.add_time(30_000);
        }
        assert_eq!(a.phase(), b.phase());
    }
}
