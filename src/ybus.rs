use num_complex::Complex64;

use crate::dense::Mat;
use crate::error::{PowerFlowError, Result};

/// Magnitude/angle decomposition of the bus admittance matrix.
///
/// Computed once per solve. Angles come from `atan2`, so entries with a
/// zero real or imaginary part (and the zero admittance itself, which has
/// angle 0) are well defined.
#[derive(Debug, Clone)]
pub struct YbusPolar {
    mag: Mat<f64>,
    ang: Mat<f64>,
}

impl YbusPolar {
    pub fn new(y_bus: &Mat<Complex64>) -> Result<Self> {
        if !y_bus.is_square() {
            return Err(PowerFlowError::NonSquare {
                rows: y_bus.rows(),
                cols: y_bus.cols(),
            });
        }
        Ok(Self {
            mag: y_bus.map(|y| y.norm()),
            ang: y_bus.map(|y| y.arg()),
        })
    }

    /// Number of buses.
    pub fn len(&self) -> usize {
        self.mag.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `|Y[i][j]|`
    #[inline]
    pub fn mag(&self, i: usize, j: usize) -> f64 {
        self.mag.get(i, j)
    }

    /// `∠Y[i][j]` in radians.
    #[inline]
    pub fn ang(&self, i: usize, j: usize) -> f64 {
        self.ang.get(i, j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn decomposes_pure_reactance() -> anyhow::Result<()> {
        let y = cmplx!(1.0) / cmplx!(0.0, 0.05);
        let y_bus = Mat::from_rows(vec![vec![y, -y], vec![-y, y]])?;
        let yp = YbusPolar::new(&y_bus)?;

        assert_eq!(yp.len(), 2);
        assert_abs_diff_eq!(yp.mag(0, 0), 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(yp.ang(0, 0), -FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(yp.ang(0, 1), FRAC_PI_2, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn zero_admittance_has_zero_angle() -> anyhow::Result<()> {
        let y_bus = Mat::from_rows(vec![vec![cmplx!(), cmplx!()], vec![cmplx!(), cmplx!()]])?;
        let yp = YbusPolar::new(&y_bus)?;
        assert_eq!(yp.mag(0, 1), 0.0);
        assert_eq!(yp.ang(0, 1), 0.0);
        Ok(())
    }

    #[test]
    fn non_square_is_rejected() {
        let y_bus = Mat::<Complex64>::zeros(2, 3);
        assert_eq!(
            YbusPolar::new(&y_bus).unwrap_err(),
            PowerFlowError::NonSquare { rows: 2, cols: 3 }
        );
    }
}
