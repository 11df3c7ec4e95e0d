use nalgebra::{DMatrix, DVector};

use crate::dense::Mat;
use crate::error::{PowerFlowError, Result};
use crate::traits::LinearSolver;

/// LU decomposition with partial pivoting.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenseLU;

impl LinearSolver for DenseLU {
    fn solve(&self, a_mat: &Mat<f64>, b: &[f64]) -> Result<Vec<f64>> {
        let (rows, cols) = a_mat.shape();
        if rows != cols {
            return Err(PowerFlowError::NonSquare { rows, cols });
        }
        if b.len() != rows {
            return Err(PowerFlowError::shape("rhs", rows, b.len()));
        }

        let a = DMatrix::from_row_slice(rows, cols, a_mat.values());
        let x = a
            .lu()
            .solve(&DVector::from_column_slice(b))
            .ok_or(PowerFlowError::SingularJacobian)?;

        if x.iter().any(|v| !v.is_finite()) {
            return Err(PowerFlowError::SingularJacobian);
        }
        Ok(x.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn solves_small_system() -> anyhow::Result<()> {
        let a = Mat::from_rows(vec![
            vec![4.0, -2.0, 1.0],
            vec![-2.0, 4.0, -2.0],
            vec![1.0, -2.0, 4.0],
        ])?;
        let b = [11.0, -16.0, 17.0];

        let x = DenseLU.solve(&a, &b)?;

        let ax = a.mat_vec(&x);
        for (lhs, rhs) in ax.iter().zip(&b) {
            assert_abs_diff_eq!(*lhs, *rhs, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[2], 3.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn zero_matrix_is_singular() {
        let a = Mat::zeros(2, 2);
        assert_eq!(
            DenseLU.solve(&a, &[1.0, 1.0]),
            Err(PowerFlowError::SingularJacobian)
        );
    }

    #[test]
    fn rhs_length_checked() {
        let a = Mat::zeros(2, 2);
        assert!(matches!(
            DenseLU.solve(&a, &[1.0]),
            Err(PowerFlowError::Shape { name: "rhs", .. })
        ));
    }
}
