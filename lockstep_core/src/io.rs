//! Pipeline endpoints over injected pin primitives.
//!
//! These nodes never touch hardware directly; they wrap the read/write
//! traits from `lockstep_traits` and keep the pipeline alive on transient
//! pin errors by holding the last good value.

use tracing::warn;

use lockstep_traits::{AnalogRead, AnalogWrite, DigitalRead, DigitalWrite, TimeDriven};

use crate::node::{Source, Transform, digital_to_analog};

/// Analog input node producing values in [0, 1].
#[derive(Debug)]
pub struct AnalogIn<R> {
    reader: R,
    invert: bool,
    value: f32,
}

impl<R: AnalogRead> AnalogIn<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            invert: false,
            value: 0.0,
        }
    }

    /// Inverts the scale, mapping raw 0 to 1 and raw 1 to 0.
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

impl<R: AnalogRead> Source for AnalogIn<R> {
    fn read(&mut self) -> f32 {
        match self.reader.read() {
            Ok(raw) => {
                let raw = raw.clamp(0.0, 1.0);
                self.value = if self.invert { 1.0 - raw } else { raw };
            }
            Err(e) => warn!(error = %e, "analog read failed, holding last value"),
        }
        self.value
    }
}

type EdgeListener = Box<dyn FnMut()>;

/// Debounced digital input node.
///
/// Driven by the engine: each tick polls the pin and feeds the elapsed time
/// into the debounce window. A level change is reported only after the new
/// level has held for the configured debounce time; edge queries (`rose`,
/// `fell`, `changed`) describe the most recent tick, and edge listeners
/// fire exactly once per qualifying transition, in the tick it occurs.
pub struct DigitalIn<R> {
    reader: R,
    invert: bool,
    debounce_us: u64,
    stable: bool,
    candidate: bool,
    candidate_us: u64,
    rose: bool,
    fell: bool,
    on_rise: Option<EdgeListener>,
    on_fall: Option<EdgeListener>,
    on_change: Option<EdgeListener>,
}

impl<R> std::fmt::Debug for DigitalIn<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalIn")
            .field("invert", &self.invert)
            .field("debounce_us", &self.debounce_us)
            .field("stable", &self.stable)
            .finish()
    }
}

impl<R: DigitalRead> DigitalIn<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            invert: false,
            debounce_us: 0,
            stable: false,
            candidate: false,
            candidate_us: 0,
            rose: false,
            fell: false,
            on_rise: None,
            on_fall: None,
            on_change: None,
        }
    }

    /// Inverts the logic level (active-low wiring).
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    /// Requires a new level to hold this long before it is reported. Zero
    /// disables debouncing.
    pub fn set_debounce_us(&mut self, debounce_us: u64) {
        self.debounce_us = debounce_us;
    }

    pub fn debounce_us(&self) -> u64 {
        self.debounce_us
    }

    /// Debounced level.
    pub fn is_on(&self) -> bool {
        self.stable
    }

    /// Whether the level rose during the last tick.
    pub fn rose(&self) -> bool {
        self.rose
    }

    /// Whether the level fell during the last tick.
    pub fn fell(&self) -> bool {
        self.fell
    }

    pub fn changed(&self) -> bool {
        self.rose || self.fell
    }

    /// Registers the rise listener, replacing any previous one.
    pub fn on_rise(&mut self, listener: impl FnMut() + 'static) {
        self.on_rise = Some(Box::new(listener));
    }

    /// Registers the fall listener, replacing any previous one.
    pub fn on_fall(&mut self, listener: impl FnMut() + 'static) {
        self.on_fall = Some(Box::new(listener));
    }

    /// Registers the change listener, replacing any previous one.
    pub fn on_change(&mut self, listener: impl FnMut() + 'static) {
        self.on_change = Some(Box::new(listener));
    }

    fn transition(&mut self, level: bool) {
        self.stable = level;
        self.rose = level;
        self.fell = !level;
        let listener = if level {
            self.on_rise.as_mut()
        } else {
            self.on_fall.as_mut()
        };
        if let Some(listener) = listener {
            listener();
        }
        if let Some(listener) = self.on_change.as_mut() {
            listener();
        }
    }
}

impl<R: DigitalRead> TimeDriven for DigitalIn<R> {
    fn add_time(&mut self, micros: u64) {
        self.rose = false;
        self.fell = false;
        let raw = match self.reader.read() {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "digital read failed, holding last level");
                return;
            }
        };
        let level = raw != self.invert;
        if level == self.stable {
            self.candidate = level;
            self.candidate_us = 0;
            return;
        }
        if self.debounce_us == 0 {
            self.transition(level);
            return;
        }
        if level == self.candidate {
            self.candidate_us = self.candidate_us.saturating_add(micros);
            if self.candidate_us >= self.debounce_us {
                self.transition(level);
            }
        } else {
            // New candidate level: restart the debounce window.
            self.candidate = level;
            self.candidate_us = micros;
            if self.candidate_us >= self.debounce_us {
                self.transition(level);
            }
        }
    }

    fn is_running(&self) -> bool {
        true
    }
}

impl<R: DigitalRead> Source for DigitalIn<R> {
    fn read(&mut self) -> f32 {
        digital_to_analog(self.stable)
    }
}

/// Analog output node; writes are clamped to [0, 1].
#[derive(Debug)]
pub struct AnalogOut<W> {
    writer: W,
    invert: bool,
    value: f32,
}

impl<W: AnalogWrite> AnalogOut<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            invert: false,
            value: 0.0,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

impl<W: AnalogWrite> Transform for AnalogOut<W> {
    fn put(&mut self, value: f32) -> f32 {
        let clamped = value.clamp(0.0, 1.0);
        let level = if self.invert { 1.0 - clamped } else { clamped };
        if let Err(e) = self.writer.write(level) {
            warn!(error = %e, "analog write failed");
        }
        self.value = clamped;
        clamped
    }

    fn get(&self) -> f32 {
        self.value
    }
}

/// Digital output node; analog inputs are thresholded at 0.5.
#[derive(Debug)]
pub struct DigitalOut<W> {
    writer: W,
    invert: bool,
    on: bool,
}

impl<W: DigitalWrite> DigitalOut<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            invert: false,
            on: false,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn set(&mut self, on: bool) {
        if let Err(e) = self.writer.write(on != self.invert) {
            warn!(error = %e, "digital write failed");
        }
        self.on = on;
    }

    pub fn toggle(&mut self) {
        self.set(!self.on);
    }
}

impl<W: DigitalWrite> Transform for DigitalOut<W> {
    fn put(&mut self, value: f32) -> f32 {
        self.set(crate::node::analog_to_digital(value));
        digital_to_analog(self.on)
    }

    fn get(&self) -> f32 {
        digital_to_analog(self.on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{
        FailingAnalogRead, RecordingAnalogWrite, RecordingDigitalWrite, ScriptedAnalogRead,
        ScriptedDigitalRead,
    };
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn analog_in_clamps_and_inverts() {
        let mut input = AnalogIn::new(ScriptedAnalogRead::new(vec![0.25, 1.5, -0.5])).inverted();
        assert_eq!(input.read(), 0.75);
        assert_eq!(input.read(), 0.0);
        assert_eq!(input.read(), 1.0);
    }

    #[test]
    fn analog_in_holds_last_value_on_error() {
        let mut input = AnalogIn::new(ScriptedAnalogRead::new(vec![0.6]));
        assert_eq!(input.read(), 0.6);
        let mut failing = AnalogIn::new(FailingAnalogRead);
        assert_eq!(failing.read(), 0.0);
    }

    #[test]
    fn digital_in_reports_edges_once() {
        let levels = vec![false, true, true, false];
        let mut input = DigitalIn::new(ScriptedDigitalRead::new(levels));
        let rises = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&rises);
        input.on_rise(move || counter.set(counter.get() + 1));

        input.add_time(1_000);
        assert!(!input.is_on());
        input.add_time(1_000);
        assert!(input.is_on());
        assert!(input.rose());
        input.add_time(1_000);
        assert!(!input.rose());
        input.add_time(1_000);
        assert!(input.fell());
        assert_eq!(rises.get(), 1);
    }

    #[test]
    fn digital_in_debounces_glitches() {
        // A one-tick glitch shorter than the debounce window is swallowed.
        let levels = vec![true, false, true, true, true];
        let mut input = DigitalIn::new(ScriptedDigitalRead::new(levels));
        input.set_debounce_us(2_500);

        input.add_time(1_000);
        assert!(!input.is_on());
        input.add_time(1_000);
        input.add_time(1_000);
        input.add_time(1_000);
        assert!(!input.is_on());
        input.add_time(1_000);
        assert!(input.is_on());
        assert!(input.rose());
    }

    #[test]
    fn analog_out_clamps_writes() {
        let mut out = AnalogOut::new(RecordingAnalogWrite::default());
        assert_eq!(out.put(1.7), 1.0);
        assert_eq!(out.put(-0.2), 0.0);
        assert_eq!(out.put(0.3), 0.3);
    }

    #[test]
    fn digital_out_thresholds_and_toggles() {
        let mut out = DigitalOut::new(RecordingDigitalWrite::default());
        assert_eq!(out.put(0.7), 1.0);
        assert!(out.is_on());
        assert_eq!(out.put(0.3), 0.0);
        out.toggle();
        assert!(out.is_on());
    }
}
