//! Common contract for calibratable filter nodes.

use crate::node::Transform;

/// A [`Transform`] whose parameters are learned from the signal itself.
///
/// Filters start out calibrating: every value fed through `put` also feeds
/// the underlying estimator. Pausing calibration commits the current
/// parameters; the filter keeps transforming but stops learning until
/// calibration is resumed or the filter is reset.
pub trait MovingFilter: Transform {
    /// Clears learned statistics back to "no samples seen" and re-enters
    /// calibration.
    fn reset(&mut self);

    fn is_calibrating(&self) -> bool;

    /// Commits the current parameters and stops accumulating statistics.
    fn pause_calibrating(&mut self);

    /// Re-enters calibration without discarding prior statistics.
    fn resume_calibrating(&mut self);

    fn toggle_calibrating(&mut self) {
        if self.is_calibrating() {
            self.pause_calibrating();
        } else {
            self.resume_calibrating();
        }
    }
}
