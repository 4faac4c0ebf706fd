#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core signal-pipeline scheduling and filtering (hardware-agnostic).
//!
//! This crate provides the time-driven update machinery for composing
//! real-time signal pipelines. All hardware interactions go through the
//! `lockstep_traits` pin traits.
//!
//! ## Architecture
//!
//! - **Scheduling**: an [`Engine`] feeds elapsed time to registered
//!   entities in registration order (`engine` module)
//! - **Time-driven entities**: chronometer, one-shot timer, oscillator
//!   (`chrono`, `timer`, `oscillator` modules)
//! - **Streaming estimators**: O(1) moving average and mean/variance with
//!   apply/amend semantics (`stats` module)
//! - **Filters**: normalizer, min/max and robust scalers, smoother, all
//!   with an explicit calibration phase (`filter` and sibling modules)
//! - **Composition**: `Source`/`Transform` chaining (`node` module)
//!
//! ## Time base
//!
//! Time is carried as `u64` microseconds. Long-running accumulators wrap
//! instead of saturating; bounded timers clamp at their duration.

pub mod chrono;
pub mod engine;
pub mod error;
pub mod filter;
pub mod io;
pub mod mocks;
pub mod node;
pub mod normalizer;
pub mod oscillator;
pub mod scaler;
pub mod smoother;
pub mod stats;
pub mod timer;
pub mod util;

pub use chrono::Chronometer;
pub use engine::Engine;
pub use error::{ConfigError, Result, UsageError};
pub use filter::MovingFilter;
pub use io::{AnalogIn, AnalogOut, DigitalIn, DigitalOut};
pub use node::{Piped, Source, SourceExt, Thresholder, Transform};
pub use normalizer::Normalizer;
pub use oscillator::{Oscillator, Waveform};
pub use scaler::{MinMaxScaler, RobustScaler};
pub use smoother::Smoother;
pub use stats::{DEFAULT_OUTLIER_N_STDDEV, MovingAverage, MovingStats, Window};
pub use timer::Timer;

pub use lockstep_traits::TimeDriven;
