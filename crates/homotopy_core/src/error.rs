//! Error types for continuation runs.

use thiserror::Error;

/// Which guarded loop ran out of iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DivergenceKind {
    /// The Newton corrector did not reach the curve.
    #[error("corrector failed to converge within {max_iters} iterations")]
    CorrectorDivergence { max_iters: usize },

    /// The tracer did not reach the end of the parameter interval.
    #[error("tracer failed to converge within {max_iters} iterations")]
    TracerDivergence { max_iters: usize },
}

/// Errors raised by tracks, criteria and the predictor-corrector loop.
///
/// None of these are retried inside the engine; they surface to the caller of
/// `trace`, which decides whether to re-run with different settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContinuationError {
    /// The track cannot supply the requested capability (e.g. a start point).
    #[error("not supported: {0}")]
    NotSupported(&'static str),

    /// Elimination of the Jacobian hit a (near-)zero pivot.
    ///
    /// `turning_point` is set when the Jacobian still has full row rank, i.e. the
    /// curve is perpendicular to the parameter axis and the pinned-coordinate
    /// kernel basis does not exist even though the curve is regular.
    #[error("singular Jacobian: pivot {pivot:e} in row {row} (turning point: {turning_point})")]
    SingularJacobian {
        row: usize,
        pivot: f64,
        turning_point: bool,
    },

    /// An iteration budget was exhausted.
    #[error(transparent)]
    FailedToConverge(#[from] DivergenceKind),

    /// A vector or matrix had the wrong shape for the track.
    #[error("{what} dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Trace settings failed validation.
    #[error("invalid trace settings: {0}")]
    InvalidSettings(String),

    /// A stepped trace was asked for its result before it finished.
    #[error("trace has not finished")]
    TraceUnfinished,

    /// The SVD behind the Newton pseudo-inverse could not be formed.
    #[error("pseudo-inverse failed: {0}")]
    PseudoInverse(&'static str),
}

/// Result type for continuation operations.
pub type ContinuationResult<T> = std::result::Result<T, ContinuationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divergence_messages_name_the_loop() {
        let err = ContinuationError::from(DivergenceKind::CorrectorDivergence { max_iters: 5 });
        assert_eq!(
            format!("{err}"),
            "corrector failed to converge within 5 iterations"
        );

        let err = ContinuationError::from(DivergenceKind::TracerDivergence { max_iters: 7 });
        assert!(format!("{err}").contains("tracer"));
    }

    #[test]
    fn singular_jacobian_reports_row() {
        let err = ContinuationError::SingularJacobian {
            row: 1,
            pivot: 0.0,
            turning_point: false,
        };
        assert!(format!("{err}").contains("row 1"));
    }
}
