//! Signal-node composition glue.
//!
//! A pipeline is an acyclic chain where every stage uniquely owns its
//! upstream. A pull on the chain reads the upstream exactly once and pushes
//! the value through each transform in order.

/// A node producing a scalar value on demand.
pub trait Source {
    fn read(&mut self) -> f32;
}

/// A node consuming a scalar and producing a transformed scalar.
pub trait Transform {
    /// Feeds one value through the node and returns the transformed value.
    fn put(&mut self, value: f32) -> f32;

    /// Last produced value, without feeding a new one.
    fn get(&self) -> f32;
}

/// A source chained into a transform; itself a source.
#[derive(Debug, Clone)]
pub struct Piped<S, T> {
    source: S,
    transform: T,
}

impl<S, T> Piped<S, T> {
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut T {
        &mut self.transform
    }

    pub fn into_parts(self) -> (S, T) {
        (self.source, self.transform)
    }
}

impl<S: Source, T: Transform> Source for Piped<S, T> {
    fn read(&mut self) -> f32 {
        let raw = self.source.read();
        self.transform.put(raw)
    }
}

/// Chaining adapter for any source.
pub trait SourceExt: Source + Sized {
    /// Chains `transform` downstream of `self`.
    fn pipe<T: Transform>(self, transform: T) -> Piped<Self, T> {
        Piped {
            source: self,
            transform,
        }
    }
}

impl<S: Source> SourceExt for S {}

/// Converts an analog level to a digital one (threshold at 0.5).
#[inline]
pub fn analog_to_digital(value: f32) -> bool {
    value >= 0.5
}

/// Converts a digital level to an analog one.
#[inline]
pub fn digital_to_analog(on: bool) -> f32 {
    if on { 1.0 } else { 0.0 }
}

/// Digital threshold node with optional hysteresis: the output switches on
/// at `threshold` and back off at `threshold - hysteresis`.
#[derive(Debug, Clone)]
pub struct Thresholder {
    threshold: f32,
    hysteresis: f32,
    on: bool,
}

impl Thresholder {
    pub fn new(threshold: f32) -> Self {
        Self::with_hysteresis(threshold, 0.0)
    }

    pub fn with_hysteresis(threshold: f32, hysteresis: f32) -> Self {
        Self {
            threshold,
            hysteresis: hysteresis.max(0.0),
            on: false,
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl Transform for Thresholder {
    fn put(&mut self, value: f32) -> f32 {
        if self.on {
            if value < self.threshold - self.hysteresis {
                self.on = false;
            }
        } else if value >= self.threshold {
            self.on = true;
        }
        digital_to_analog(self.on)
    }

    fn get(&self) -> f32 {
        digital_to_analog(self.on)
    }
}
