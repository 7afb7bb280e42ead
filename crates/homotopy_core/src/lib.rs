/// The `homotopy_core` crate traces solution curves of parameterised nonlinear
/// systems H(x, λ) = 0 with predictor-corrector continuation.
///
/// Key components:
/// - **Traits**: `Scalar` (numeric type abstraction) and `Homotopy` (a system generic over it).
/// - **Autodiff**: Dual numbers and `dual_jacobian` for exact n×(n+1) Jacobians.
/// - **Equation Engine**: A bytecode VM for evaluating user-defined homotopies.
/// - **Continuation**: Tracks, convergence criteria, step control and the Euler–Newton method.
pub mod autodiff;
pub mod continuation;
pub mod equation_engine;
pub mod error;
pub mod traits;

pub use error::{ContinuationError, ContinuationResult, DivergenceKind};
