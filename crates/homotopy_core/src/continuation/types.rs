//! Serializable settings and results for curve tracing.

use serde::{Deserialize, Serialize};

use super::criterion::{CorrectorCriterion, TracerCriterion};
use super::predictor_corrector::EulerNewton;
use super::step::ConstantStep;
use super::track::Point;
use crate::error::{ContinuationError, ContinuationResult};

/// The reference method as built from [`TraceSettings`].
pub type ReferenceMethod = EulerNewton<ConstantStep, TracerCriterion, CorrectorCriterion>;

/// Settings for the Euler–Newton method with constant step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSettings {
    pub step_size: f64,
    pub corrector_tolerance: f64,
    pub corrector_max_iters: usize,
    /// Overshoot past λ₁ required before the trace stops.
    pub tracer_tolerance: f64,
    pub tracer_max_iters: usize,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            step_size: 1e-2,
            corrector_tolerance: 1e-6,
            corrector_max_iters: 1_000,
            tracer_tolerance: 1e-6,
            tracer_max_iters: 10_000,
        }
    }
}

impl TraceSettings {
    pub fn validate(&self) -> ContinuationResult<()> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(ContinuationError::InvalidSettings(format!(
                "step size must be positive and finite, got {}",
                self.step_size
            )));
        }
        if !(self.corrector_tolerance.is_finite() && self.corrector_tolerance > 0.0) {
            return Err(ContinuationError::InvalidSettings(format!(
                "corrector tolerance must be positive and finite, got {}",
                self.corrector_tolerance
            )));
        }
        if !(self.tracer_tolerance.is_finite() && self.tracer_tolerance >= 0.0) {
            return Err(ContinuationError::InvalidSettings(format!(
                "tracer tolerance must be non-negative and finite, got {}",
                self.tracer_tolerance
            )));
        }
        if self.corrector_max_iters == 0 || self.tracer_max_iters == 0 {
            return Err(ContinuationError::InvalidSettings(
                "iteration budgets must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates and composes the reference method.
    pub fn build(&self) -> ContinuationResult<ReferenceMethod> {
        self.validate()?;
        Ok(EulerNewton::euler_newton(
            ConstantStep::new(self.step_size),
            TracerCriterion::new(self.tracer_tolerance, self.tracer_max_iters),
            CorrectorCriterion::new(self.corrector_tolerance, self.corrector_max_iters),
        ))
    }
}

/// A point of the traced curve split into state and parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcPoint {
    pub state: Vec<f64>,
    pub param: f64,
}

impl ArcPoint {
    pub fn from_point(point: &Point) -> Self {
        let n = point.len().saturating_sub(1);
        Self {
            state: point.as_slice()[..n].to_vec(),
            param: point.as_slice().get(n).copied().unwrap_or(f64::NAN),
        }
    }
}

/// Result of a completed trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceOutcome {
    pub final_point: ArcPoint,
    pub arc: Vec<ArcPoint>,
}

/// Progress report of a stepped trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceProgress {
    pub done: bool,
    pub current_step: usize,
    pub max_steps: usize,
    pub points_computed: usize,
    pub current_param: f64,
}
