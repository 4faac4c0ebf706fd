//! Simulated pin implementations for demos and tests.
//!
//! Real deployments supply their own `lockstep_traits` pin impls over the
//! target's GPIO/ADC registers; everything here stays hardware-free so the
//! rest of the workspace builds and runs anywhere.

pub mod error;

pub use error::HwError;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use lockstep_traits::{AnalogRead, AnalogWrite, DigitalRead, DigitalWrite, PinError};

/// Simulated analog sensor: a slow sine with additive uniform noise,
/// advancing one step per read. Output stays in [0, 1].
pub struct SimulatedAnalogPin {
    reads_per_period: u32,
    noise: f32,
    step: u32,
    rng: SmallRng,
}

impl SimulatedAnalogPin {
    pub fn new(reads_per_period: u32, noise: f32, seed: u64) -> Self {
        Self {
            reads_per_period: reads_per_period.max(1),
            noise,
            step: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl AnalogRead for SimulatedAnalogPin {
    fn read(&mut self) -> Result<f32, PinError> {
        let phase = std::f32::consts::TAU * self.step as f32 / self.reads_per_period as f32;
        self.step = self.step.wrapping_add(1);
        let clean = 0.5 * (1.0 - phase.cos());
        let noise = if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        };
        Ok((clean + noise).clamp(0.0, 1.0))
    }
}

/// Analog pin backed by a shared cell, settable from outside the pipeline.
#[derive(Debug, Clone, Default)]
pub struct SharedAnalogPin {
    level: Rc<Cell<f32>>,
}

impl SharedAnalogPin {
    pub fn new(initial: f32) -> Self {
        Self {
            level: Rc::new(Cell::new(initial)),
        }
    }

    /// Handle writing to the same underlying level.
    pub fn handle(&self) -> SharedAnalogPin {
        self.clone()
    }

    pub fn set(&self, level: f32) {
        self.level.set(level);
    }
}

impl AnalogRead for SharedAnalogPin {
    fn read(&mut self) -> Result<f32, PinError> {
        Ok(self.level.get())
    }
}

/// Digital pin backed by a shared cell.
#[derive(Debug, Clone, Default)]
pub struct SharedDigitalPin {
    level: Rc<Cell<bool>>,
}

impl SharedDigitalPin {
    pub fn new(initial: bool) -> Self {
        Self {
            level: Rc::new(Cell::new(initial)),
        }
    }

    pub fn handle(&self) -> SharedDigitalPin {
        self.clone()
    }

    pub fn set(&self, on: bool) {
        self.level.set(on);
    }
}

impl DigitalRead for SharedDigitalPin {
    fn read(&mut self) -> Result<bool, PinError> {
        Ok(self.level.get())
    }
}

/// Digital line replaying a fixed level sequence, for exercising edge and
/// debounce behavior deterministically. Reads past the end of the script
/// fail with [`HwError::ScriptExhausted`].
#[derive(Debug, Clone)]
pub struct ScriptedDigitalPin {
    levels: Vec<bool>,
    next: usize,
}

impl ScriptedDigitalPin {
    pub fn new(levels: impl Into<Vec<bool>>) -> Self {
        Self {
            levels: levels.into(),
            next: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.levels.len().saturating_sub(self.next)
    }
}

impl DigitalRead for ScriptedDigitalPin {
    fn read(&mut self) -> Result<bool, PinError> {
        match self.levels.get(self.next) {
            Some(&level) => {
                self.next += 1;
                Ok(level)
            }
            None => Err(HwError::ScriptExhausted { reads: self.next }.into()),
        }
    }
}

/// Analog sink recording every write into shared storage.
#[derive(Debug, Clone, Default)]
pub struct RecordingAnalogPin {
    writes: Rc<RefCell<Vec<f32>>>,
}

impl RecordingAnalogPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> RecordingAnalogPin {
        self.clone()
    }

    pub fn writes(&self) -> Vec<f32> {
        self.writes.borrow().clone()
    }

    pub fn last(&self) -> Option<f32> {
        self.writes.borrow().last().copied()
    }
}

impl AnalogWrite for RecordingAnalogPin {
    fn write(&mut self, value: f32) -> Result<(), PinError> {
        self.writes.borrow_mut().push(value);
        Ok(())
    }
}

/// Digital sink recording every write into shared storage.
#[derive(Debug, Clone, Default)]
pub struct RecordingDigitalPin {
    writes: Rc<RefCell<Vec<bool>>>,
}

impl RecordingDigitalPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> RecordingDigitalPin {
        self.clone()
    }

    pub fn writes(&self) -> Vec<bool> {
        self.writes.borrow().clone()
    }

    pub fn last(&self) -> Option<bool> {
        self.writes.borrow().last().copied()
    }
}

impl DigitalWrite for RecordingDigitalPin {
    fn write(&mut self, on: bool) -> Result<(), PinError> {
        self.writes.borrow_mut().push(on);
        Ok(())
    }
}

/// Digital sink logging level changes, for demo runs.
#[derive(Debug, Default)]
pub struct ConsoleDigitalPin {
    last: Option<bool>,
}

impl DigitalWrite for ConsoleDigitalPin {
    fn write(&mut self, on: bool) -> Result<(), PinError> {
        if self.last != Some(on) {
            tracing::info!(level = on, "digital output changed");
            self.last = Some(on);
        }
        Ok(())
    }
}
