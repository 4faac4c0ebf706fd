pub mod clock;

pub use clock::{Clock, MonotonicClock, TestClock};

/// Boxed error type used across the hardware seams.
pub type PinError = Box<dyn std::error::Error + Send + Sync>;

/// Contract for anything that advances with elapsed time.
///
/// `add_time` is the sole mutator driven by the engine; implementations must
/// treat it as a no-op while idle or paused.
pub trait TimeDriven {
    /// Advances the entity's internal state by `micros` microseconds.
    fn add_time(&mut self, micros: u64);

    /// Returns true iff the entity is currently running (not idle/paused).
    fn is_running(&self) -> bool;
}

/// Injected primitive producing a normalized analog level in [0, 1].
pub trait AnalogRead {
    fn read(&mut self) -> Result<f32, PinError>;
}

/// Injected primitive accepting a normalized analog level in [0, 1].
pub trait AnalogWrite {
    fn write(&mut self, value: f32) -> Result<(), PinError>;
}

/// Injected primitive producing a digital level.
pub trait DigitalRead {
    fn read(&mut self) -> Result<bool, PinError>;
}

/// Injected primitive accepting a digital level.
pub trait DigitalWrite {
    fn write(&mut self, on: bool) -> Result<(), PinError>;
}
