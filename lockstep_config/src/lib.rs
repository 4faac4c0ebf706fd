#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for pipeline demos.
//!
//! `Config` and sub-structs are deserialized from TOML and validated before
//! any pipeline is built. Validation mirrors the core's construction rules
//! (non-positive periods, durations and windows are rejected), so a config
//! that validates here will not fail node construction later.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineCfg {
    /// Target tick rate of the main loop.
    pub tick_hz: u32,
    /// Total run time in seconds; 0 runs until interrupted.
    pub run_s: f32,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            tick_hz: 100,
            run_s: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WaveformKind {
    #[default]
    Sine,
    Triangle,
    Square,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OscillatorCfg {
    pub waveform: WaveformKind,
    /// Oscillation period in seconds.
    pub period_s: f32,
    /// Triangle rise fraction or square duty cycle, in [0, 1].
    pub shape_param: f32,
    /// Cycle-to-cycle jitter amount, in [0, 1].
    pub randomness: f32,
    /// Phase offset in cycles.
    pub phase_shift: f64,
}

impl Default for OscillatorCfg {
    fn default() -> Self {
        Self {
            waveform: WaveformKind::Sine,
            period_s: 1.0,
            shape_param: 0.5,
            randomness: 0.0,
            phase_shift: 0.0,
        }
    }
}

/// Estimator window, expressed as exactly one of the two fields.
#[derive(Debug, Deserialize, Default, Clone, Copy)]
#[serde(default)]
pub struct WindowCfg {
    /// Window as a sample count.
    pub samples: Option<u32>,
    /// Window as a time span in seconds.
    pub seconds: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SmootherCfg {
    pub enabled: bool,
    pub window: WindowCfg,
}

impl Default for SmootherCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            window: WindowCfg {
                samples: None,
                seconds: Some(0.1),
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScalerKind {
    /// No rescaling stage.
    #[default]
    None,
    MinMax,
    Robust,
    Normalize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScalerCfg {
    pub kind: ScalerKind,
    pub window: WindowCfg,
    /// Calibration time in seconds before the scaler commits.
    pub calibrate_s: f32,
    /// Robust scaler span, in (0, 1].
    pub span: f32,
}

impl Default for ScalerCfg {
    fn default() -> Self {
        Self {
            kind: ScalerKind::None,
            window: WindowCfg::default(),
            calibrate_s: 2.0,
            span: 0.99,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ThresholdCfg {
    pub enabled: bool,
    pub value: f32,
    pub hysteresis: f32,
}

impl Default for ThresholdCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            value: 0.5,
            hysteresis: 0.0,
        }
    }
}

/// Simulated sensor feeding the pipeline when no oscillator is wanted.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    /// Underlying signal period in seconds.
    pub period_s: f32,
    /// Additive uniform noise amplitude.
    pub noise: f32,
    /// PRNG seed for reproducible runs.
    pub seed: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            period_s: 2.0,
            noise: 0.05,
            seed: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    /// Path to a .log file (JSON lines); stderr-only when absent.
    pub file: Option<String>,
    /// "info", "debug", ...
    pub level: Option<String>,
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub engine: EngineCfg,
    pub oscillator: OscillatorCfg,
    pub sensor: SensorCfg,
    pub smoother: SmootherCfg,
    pub scaler: ScalerCfg,
    pub threshold: ThresholdCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn validate_window(name: &str, w: WindowCfg) -> eyre::Result<()> {
    if w.samples.is_some() && w.seconds.is_some() {
        eyre::bail!("{name}: set either samples or seconds, not both");
    }
    if let Some(n) = w.samples
        && n == 0
    {
        eyre::bail!("{name}.samples must be >= 1");
    }
    if let Some(s) = w.seconds
        && !(s > 0.0)
    {
        eyre::bail!("{name}.seconds must be > 0");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Engine
        if self.engine.tick_hz == 0 {
            eyre::bail!("engine.tick_hz must be > 0");
        }
        if self.engine.tick_hz > 1_000_000 {
            eyre::bail!("engine.tick_hz is unreasonably large (>1MHz)");
        }
        if self.engine.run_s < 0.0 {
            eyre::bail!("engine.run_s must be >= 0");
        }

        // Oscillator
        if !(self.oscillator.period_s > 0.0) {
            eyre::bail!("oscillator.period_s must be > 0");
        }
        if !(0.0..=1.0).contains(&self.oscillator.shape_param) {
            eyre::bail!("oscillator.shape_param must be in [0.0, 1.0]");
        }
        if !(0.0..=1.0).contains(&self.oscillator.randomness) {
            eyre::bail!("oscillator.randomness must be in [0.0, 1.0]");
        }

        // Sensor
        if !(self.sensor.period_s > 0.0) {
            eyre::bail!("sensor.period_s must be > 0");
        }
        if self.sensor.noise < 0.0 {
            eyre::bail!("sensor.noise must be >= 0");
        }

        // Filters
        validate_window("smoother.window", self.smoother.window)?;
        validate_window("scaler.window", self.scaler.window)?;
        if self.scaler.calibrate_s < 0.0 {
            eyre::bail!("scaler.calibrate_s must be >= 0");
        }
        if !(self.scaler.span > 0.0 && self.scaler.span <= 1.0) {
            eyre::bail!("scaler.span must be in (0.0, 1.0]");
        }

        // Threshold
        if self.threshold.hysteresis < 0.0 {
            eyre::bail!("threshold.hysteresis must be >= 0");
        }

        Ok(())
    }
}
