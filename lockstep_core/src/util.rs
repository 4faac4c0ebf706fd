//! Common time/period helpers for lockstep_core.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Compute the period in microseconds for a given rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Rate in Hz for a given period in microseconds (0 for a zero period).
#[inline]
pub fn rate_hz(period_us: u64) -> f32 {
    if period_us == 0 {
        0.0
    } else {
        MICROS_PER_SEC as f32 / period_us as f32
    }
}

/// Derived seconds view of a microsecond count. Never authoritative.
#[inline]
pub fn us_to_seconds(us: u64) -> f64 {
    us as f64 / MICROS_PER_SEC as f64
}

/// Seconds expressed as whole microseconds, saturating for huge inputs.
/// Non-finite or negative values map to 0.
#[inline]
pub fn seconds_to_us(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    let us = seconds * MICROS_PER_SEC as f64;
    if us >= u64::MAX as f64 { u64::MAX } else { us as u64 }
}
