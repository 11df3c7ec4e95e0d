use crate::dense::Mat;
use crate::error::PowerFlowError;

/// Solves the dense linear system `A x = b` formed at each Newton step.
///
/// Implementations report a matrix that cannot be factored (or a solution
/// that is not finite) as [`PowerFlowError::SingularJacobian`].
pub trait LinearSolver {
    fn solve(&self, a_mat: &Mat<f64>, b: &[f64]) -> Result<Vec<f64>, PowerFlowError>;
}
