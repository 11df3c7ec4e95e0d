use std::time::Instant;

use num_complex::Complex64;
use serde::Serialize;

use crate::bus::BusSystem;
use crate::error::Result;
use crate::lu::DenseLU;
use crate::newton::{newtonpf, ProgressMonitor};
use crate::opt::PFOpt;
use crate::traits::LinearSolver;

/// Outcome of a power flow solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PfStatus {
    /// Largest correction within tolerance.
    Converged,
    /// Iteration limit reached without converging.
    MaxIterations,
    /// The linear solve failed; voltages are from the last completed
    /// iteration.
    SingularJacobian,
}

/// Bus voltages and injections from a power flow solve.
///
/// Unless [`solved`](Self::solved) returns `true` the voltages are the best
/// available estimate and must not be relied on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerFlowSolution {
    /// Complex bus voltages (p.u.).
    pub v: Vec<Complex64>,

    /// Complex power flowing into the network at each bus,
    /// `V * conj(Ybus * V)` (p.u.).
    pub s: Vec<Complex64>,

    /// Generation at each bus. The reactive part of a bus held at a limit
    /// is that limit; regulating buses and the slack report what they
    /// must supply to match the calculated injection plus local load.
    pub sgen: Vec<Complex64>,

    /// Whether each bus was holding its voltage setpoint at the last
    /// iteration. Always `false` for the slack and PQ buses.
    pub regulating: Vec<bool>,

    pub status: PfStatus,

    /// Newton iterations performed.
    pub iterations: usize,
}

impl PowerFlowSolution {
    pub fn solved(&self) -> bool {
        self.status == PfStatus::Converged
    }

    /// Voltage magnitude at bus `i` (p.u.).
    pub fn vm(&self, i: usize) -> f64 {
        self.v[i].norm()
    }

    /// Voltage angle at bus `i` (radians).
    pub fn va(&self, i: usize) -> f64 {
        self.v[i].arg()
    }
}

/// Runs a power flow with default options and the dense LU solver.
///
/// `initial_v` is typically the voltage vector from the previous call,
/// which for small changes in the inputs converges in a few iterations.
pub fn solve(sys: &BusSystem, initial_v: Option<&[Complex64]>) -> Result<PowerFlowSolution> {
    runpf(sys, initial_v, &PFOpt::default(), &DenseLU, None)
}

/// Runs a power flow.
pub fn runpf(
    sys: &BusSystem,
    initial_v: Option<&[Complex64]>,
    opt: &PFOpt,
    linsol: &dyn LinearSolver,
    progress: Option<&dyn ProgressMonitor>,
) -> Result<PowerFlowSolution> {
    let t0 = Instant::now();

    let sol = newtonpf(sys, initial_v, linsol, opt, progress)?;

    log::debug!(
        "power flow on {} buses: {:?} after {} iterations in {:.3?}",
        sys.len(),
        sol.status,
        sol.iterations,
        t0.elapsed()
    );
    Ok(sol)
}
