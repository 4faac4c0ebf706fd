use thiserror::Error;

/// Failure modes of the simulated pins.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HwError {
    #[error("pin script exhausted after {reads} reads")]
    ScriptExhausted { reads: usize },
}
