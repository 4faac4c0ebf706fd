use thiserror::Error;

/// Malformed configuration, rejected synchronously at the point of
/// configuration. Values are never silently clamped into range.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("period must be positive (got {0} us)")]
    InvalidPeriod(u64),
    #[error("duration must be positive (got {0} us)")]
    InvalidDuration(u64),
    #[error("time window must be positive (got {0} s)")]
    InvalidTimeWindow(f32),
    #[error("sample window must hold at least one sample")]
    InvalidSampleWindow,
    #[error("sample rate must be positive (got {0} Hz)")]
    InvalidSampleRate(f32),
    #[error("randomness must lie in [0, 1] (got {0})")]
    InvalidRandomness(f32),
    #[error("waveform duty/width must lie in [0, 1] (got {0})")]
    InvalidWaveformParam(f32),
    #[error("span must lie in (0, 1] (got {0})")]
    InvalidSpan(f32),
    #[error("target standard deviation must be positive (got {0})")]
    InvalidTargetStddev(f32),
}

/// Programmer error against the scheduling protocol. Logged at error level
/// at the detection site and degraded to a safe refusal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UsageError {
    #[error("entity is already registered with a different engine")]
    AlreadyRegistered,
    #[error("tick re-entered while a pass is in progress")]
    ReentrantTick,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
