//! Reactive power capability curves.
//!
//! A curve maps the present terminal voltage and active power output of a
//! voltage-regulating source onto its available reactive range. All values
//! are in per unit of the system base, so any scaling to machine ratings
//! belongs inside the curve.

use std::sync::Arc;

use crate::error::{CapabilityCurveError, PowerFlowError, Result};

/// Voltage and loading dependent reactive power limits.
pub trait CapabilityCurve: Send + Sync {
    /// Returns `(qmin, qmax)` at terminal voltage `vm` (p.u.) and active
    /// power `p` (p.u.).
    fn limits(&self, vm: f64, p: f64) -> std::result::Result<(f64, f64), CapabilityCurveError>;
}

/// Shared handle to a capability curve, as stored per bus.
pub type Curve = Arc<dyn CapabilityCurve>;

impl<F> CapabilityCurve for F
where
    F: Fn(f64, f64) -> std::result::Result<(f64, f64), CapabilityCurveError> + Send + Sync,
{
    fn limits(&self, vm: f64, p: f64) -> std::result::Result<(f64, f64), CapabilityCurveError> {
        self(vm, p)
    }
}

/// Piecewise-linear reactive range as a function of active power.
///
/// Breakpoints are `(p, qmin, qmax)` sorted by strictly increasing `p`.
/// Outside the first and last breakpoint the end values are held.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseCurve {
    points: Vec<(f64, f64, f64)>,
}

impl PiecewiseCurve {
    pub fn new(points: Vec<(f64, f64, f64)>) -> Result<Self> {
        if points.is_empty() {
            return Err(PowerFlowError::InvalidCurve(
                "at least one breakpoint is required".to_string(),
            ));
        }
        for &(p, qmin, qmax) in &points {
            if !(p.is_finite() && qmin.is_finite() && qmax.is_finite()) {
                return Err(PowerFlowError::InvalidCurve(format!(
                    "non-finite breakpoint ({}, {}, {})",
                    p, qmin, qmax
                )));
            }
            if qmin > qmax {
                return Err(PowerFlowError::InvalidCurve(format!(
                    "qmin ({}) exceeds qmax ({}) at p = {}",
                    qmin, qmax, p
                )));
            }
        }
        if points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(PowerFlowError::InvalidCurve(
                "breakpoints must have strictly increasing p".to_string(),
            ));
        }
        Ok(Self { points })
    }

    /// Two-point curve with the reactive range `[qc1min, qc1max]` at `pc1`
    /// and `[qc2min, qc2max]` at `pc2`.
    pub fn two_point(
        pc1: f64,
        qc1min: f64,
        qc1max: f64,
        pc2: f64,
        qc2min: f64,
        qc2max: f64,
    ) -> Result<Self> {
        Self::new(vec![(pc1, qc1min, qc1max), (pc2, qc2min, qc2max)])
    }

    pub fn points(&self) -> &[(f64, f64, f64)] {
        &self.points
    }
}

impl CapabilityCurve for PiecewiseCurve {
    fn limits(&self, _vm: f64, p: f64) -> std::result::Result<(f64, f64), CapabilityCurveError> {
        if !p.is_finite() {
            return Err(CapabilityCurveError::new(format!("active power is {}", p)));
        }
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if p <= first.0 {
            return Ok((first.1, first.2));
        }
        if p >= last.0 {
            return Ok((last.1, last.2));
        }
        let k = self.points.partition_point(|pt| pt.0 <= p);
        let (p0, qmin0, qmax0) = self.points[k - 1];
        let (p1, qmin1, qmax1) = self.points[k];
        let t = (p - p0) / (p1 - p0);
        Ok((qmin0 + t * (qmin1 - qmin0), qmax0 + t * (qmax1 - qmax0)))
    }
}

/// Reactive range that scales with terminal voltage, `q * vm^exponent`.
///
/// An exponent of 1 models a current-limited converter, 2 a switched
/// capacitor/reactor bank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageScaled {
    qmin: f64,
    qmax: f64,
    exponent: f64,
}

impl VoltageScaled {
    /// `qmin` and `qmax` are the limits at 1.0 p.u. voltage.
    pub fn new(qmin: f64, qmax: f64, exponent: f64) -> Result<Self> {
        if !(qmin.is_finite() && qmax.is_finite() && exponent.is_finite()) {
            return Err(PowerFlowError::InvalidCurve(
                "limits and exponent must be finite".to_string(),
            ));
        }
        if qmin > qmax {
            return Err(PowerFlowError::InvalidCurve(format!(
                "qmin ({}) exceeds qmax ({})",
                qmin, qmax
            )));
        }
        Ok(Self {
            qmin,
            qmax,
            exponent,
        })
    }
}

impl CapabilityCurve for VoltageScaled {
    fn limits(&self, vm: f64, _p: f64) -> std::result::Result<(f64, f64), CapabilityCurveError> {
        if !vm.is_finite() || vm < 0.0 {
            return Err(CapabilityCurveError::new(format!(
                "terminal voltage {} out of range",
                vm
            )));
        }
        let k = vm.powf(self.exponent);
        Ok((self.qmin * k, self.qmax * k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn two_point_interpolates_and_holds_ends() -> anyhow::Result<()> {
        let curve = PiecewiseCurve::two_point(0.0, -0.6, 0.6, 1.0, -0.2, 0.2)?;

        let (qmin, qmax) = curve.limits(1.0, 0.5)?;
        assert_abs_diff_eq!(qmin, -0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(qmax, 0.4, epsilon = 1e-12);

        assert_eq!(curve.limits(1.0, -1.0)?, (-0.6, 0.6));
        assert_eq!(curve.limits(1.0, 2.0)?, (-0.2, 0.2));
        Ok(())
    }

    #[test]
    fn piecewise_picks_segment() -> anyhow::Result<()> {
        let curve = PiecewiseCurve::new(vec![
            (0.0, -1.0, 1.0),
            (0.5, -0.8, 0.8),
            (1.0, 0.0, 0.0),
        ])?;
        let (qmin, qmax) = curve.limits(1.0, 0.75)?;
        assert_abs_diff_eq!(qmin, -0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(qmax, 0.4, epsilon = 1e-12);
        assert_eq!(curve.limits(1.0, 0.5)?, (-0.8, 0.8));
        Ok(())
    }

    #[test]
    fn invalid_curves_rejected_at_construction() {
        assert!(PiecewiseCurve::new(vec![]).is_err());
        assert!(PiecewiseCurve::new(vec![(1.0, 0.0, 1.0), (0.5, 0.0, 1.0)]).is_err());
        assert!(PiecewiseCurve::new(vec![(0.0, 1.0, -1.0)]).is_err());
        assert!(VoltageScaled::new(0.5, -0.5, 1.0).is_err());
        assert!(VoltageScaled::new(-0.5, 0.5, f64::NAN).is_err());
    }

    #[test]
    fn voltage_scaled_follows_exponent() -> anyhow::Result<()> {
        let cap_bank = VoltageScaled::new(0.0, 0.5, 2.0)?;
        let (qmin, qmax) = cap_bank.limits(0.9, 0.0)?;
        assert_eq!(qmin, 0.0);
        assert_abs_diff_eq!(qmax, 0.405, epsilon = 1e-12);

        assert!(cap_bank.limits(f64::NAN, 0.0).is_err());
        Ok(())
    }

    #[test]
    fn closures_are_curves() {
        let curve: Curve = Arc::new(
            |vm: f64, p: f64| -> std::result::Result<(f64, f64), CapabilityCurveError> {
                Ok((-vm, vm - p))
            },
        );
        assert_eq!(curve.limits(1.0, 0.25), Ok((-1.0, 0.75)));
    }
}
