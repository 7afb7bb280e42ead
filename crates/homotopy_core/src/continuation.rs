//! Homotopy curve tracing.
//!
//! A [`HomotopyTrack`] describes a curve H(x, λ) = 0 in ℝⁿ⁺¹ together with a
//! start point and the interval of λ to cover. A [`PredictorCorrectorMethod`]
//! follows the curve by arc length, which lets it pass turning points where λ
//! reverses direction.

pub mod auto_track;
pub mod criterion;
pub mod predictor_corrector;
pub mod runner;
pub mod schmitt_trigger;
pub mod step;
pub mod track;
pub mod types;
pub mod util;

pub use auto_track::AutoHomotopyTrack;
pub use criterion::{ConvergenceCriterion, CorrectorCriterion, SolutionArc, TracerCriterion};
pub use predictor_corrector::{
    Corrector, EulerNewton, EulerPredictor, NewtonCorrector, Predictor, PredictorCorrectorMethod,
};
pub use runner::TraceRunner;
pub use schmitt_trigger::{SchmittTriggerHomotopy, SchmittTriggerTrack, SCHMITT_PARAM_RANGE};
pub use step::{ConstantStep, StepAdjuster};
pub use track::{HomotopyTrack, Point};
pub use types::{ArcPoint, ReferenceMethod, TraceOutcome, TraceProgress, TraceSettings};
pub use util::{kernel_unit_basis, orient_tangent};
