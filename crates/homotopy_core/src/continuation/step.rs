use super::track::{HomotopyTrack, Point};

/// Step-length controller consulted by the predictor.
pub trait StepAdjuster {
    /// The step length the next prediction should use.
    fn cur_step_size(&self) -> f64;

    /// Observes the most recently accepted point and may update the step length.
    fn adjust<T: HomotopyTrack + ?Sized>(&mut self, track: &T, point: &Point);
}

/// Keeps the step length fixed for the whole trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantStep {
    h: f64,
}

impl ConstantStep {
    pub fn new(h: f64) -> Self {
        Self { h }
    }
}

impl Default for ConstantStep {
    fn default() -> Self {
        Self::new(1e-2)
    }
}

impl StepAdjuster for ConstantStep {
    fn cur_step_size(&self) -> f64 {
        self.h
    }

    fn adjust<T: HomotopyTrack + ?Sized>(&mut self, _track: &T, _point: &Point) {}
}
