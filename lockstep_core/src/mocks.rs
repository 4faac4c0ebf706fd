//! Test doubles for sources and pin primitives.

use lockstep_traits::{AnalogRead, AnalogWrite, DigitalRead, DigitalWrite, PinError};

use crate::node::Source;

/// Source that always produces the same value.
#[derive(Debug, Clone)]
pub struct ConstSource(pub f32);

impl Source for ConstSource {
    fn read(&mut self) -> f32 {
        self.0
    }
}

/// Source replaying a fixed sequence, then repeating its last value.
#[derive(Debug, Clone)]
pub struct SeqSource {
    values: Vec<f32>,
    idx: usize,
    reads: usize,
}

impl SeqSource {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            idx: 0,
            reads: 0,
        }
    }

    /// Number of reads served so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl Source for SeqSource {
    fn read(&mut self) -> f32 {
        self.reads += 1;
        let value = self
            .values
            .get(self.idx)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(0.0);
        self.idx += 1;
        value
    }
}

/// Analog pin replaying a fixed sequence, then repeating its last value.
#[derive(Debug, Clone)]
pub struct ScriptedAnalogRead {
    values: Vec<f32>,
    idx: usize,
}

impl ScriptedAnalogRead {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, idx: 0 }
    }
}

impl AnalogRead for ScriptedAnalogRead {
    fn read(&mut self) -> Result<f32, PinError> {
        let value = self
            .values
            .get(self.idx)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(0.0);
        self.idx += 1;
        Ok(value)
    }
}

/// Analog pin that fails every read.
#[derive(Debug, Clone, Copy)]
pub struct FailingAnalogRead;

impl AnalogRead for FailingAnalogRead {
    fn read(&mut self) -> Result<f32, PinError> {
        Err("scripted read failure".into())
    }
}

/// Digital pin replaying a fixed sequence, then repeating its last level.
#[derive(Debug, Clone)]
pub struct ScriptedDigitalRead {
    levels: Vec<bool>,
    idx: usize,
}

impl ScriptedDigitalRead {
    pub fn new(levels: Vec<bool>) -> Self {
        Self { levels, idx: 0 }
    }
}

impl DigitalRead for ScriptedDigitalRead {
    fn read(&mut self) -> Result<bool, PinError> {
        let level = self
            .levels
            .get(self.idx)
            .or_else(|| self.levels.last())
            .copied()
            .unwrap_or(false);
        self.idx += 1;
        Ok(level)
    }
}

/// Analog pin recording every written value.
#[derive(Debug, Clone, Default)]
pub struct RecordingAnalogWrite {
    pub writes: Vec<f32>,
}

impl AnalogWrite for RecordingAnalogWrite {
    fn write(&mut self, value: f32) -> Result<(), PinError> {
        self.writes.push(value);
        Ok(())
    }
}

/// Digital pin recording every written level.
#[derive(Debug, Clone, Default)]
pub struct RecordingDigitalWrite {
    pub writes: Vec<bool>,
}

impl DigitalWrite for RecordingDigitalWrite {
    fn write(&mut self, on: bool) -> Result<(), PinError> {
        self.writes.push(on);
        Ok(())
    }
}
