use log::{debug, info, warn};
use num_complex::Complex64;

use crate::bus::BusSystem;
use crate::bus_types::classify_buses;
use crate::debug::{format_f64_vec, format_polar_vec};
use crate::error::{check_len, PowerFlowError, Result};
use crate::jac::make_jac;
use crate::math::{norm_inf, polar};
use crate::opt::PFOpt;
use crate::pf::{PfStatus, PowerFlowSolution};
use crate::sbus::{bus_power, make_sbus};
use crate::traits::LinearSolver;
use crate::ybus::YbusPolar;
use crate::zip::total_load;

pub trait ProgressMonitor {
    fn update(&self, i: usize, norm_f: f64);
}

/// Prints the largest correction of each iteration to stdout.
pub struct PrintProgress {}

impl ProgressMonitor for PrintProgress {
    fn update(&self, i: usize, norm_f: f64) {
        if i <= 1 {
            println!(" it    max correction (p.u., rad)");
            println!("----  ---------------------------");
        }
        println!("{:3}        {:10.3e}", i, norm_f);
    }
}

/// Solves power flow using full Newton's method (power balance, polar).
///
/// `v0` warm starts every non-slack bus from a previous solution; without
/// it regulated buses start at their setpoint and the others at 1.0 p.u.,
/// all at zero angle. The slack bus is always held at its setpoint at
/// angle zero.
///
/// Each iteration reclassifies the regulated buses against their reactive
/// limits before the mismatch is formed, so a bus may drop out of (or
/// return to) voltage regulation during the solve. Failure to converge and
/// a singular Jacobian are reported through [`PfStatus`]; only malformed
/// input is returned as an error, before any iteration runs.
pub fn newtonpf(
    sys: &BusSystem,
    v0: Option<&[Complex64]>,
    lin_solver: &dyn LinearSolver,
    opt: &PFOpt,
    progress: Option<&dyn ProgressMonitor>,
) -> Result<PowerFlowSolution> {
    let nb = sys.len();
    if let Some(v0) = v0 {
        check_len("initial_v", v0.len(), nb)?;
    }
    let ybus = YbusPolar::new(sys.y_bus())?;

    let (mut vm, mut va): (Vec<f64>, Vec<f64>) = match v0 {
        Some(v0) => v0.iter().map(|v| (v.norm(), v.arg())).unzip(),
        None => (0..nb).map(|i| (sys.vreg(i).unwrap_or(1.0), 0.0)).unzip(),
    };
    vm[0] = sys.slack_voltage();
    va[0] = 0.0;

    let mut sgen: Vec<Complex64> = (0..nb).map(|i| sys.sgen(i)).collect();
    let mut regulating: Vec<bool> = (0..nb).map(|i| i > 0 && sys.is_regulated(i)).collect();

    let n = nb - 1; // buses solved for
    let mut status = if n == 0 {
        PfStatus::Converged
    } else {
        PfStatus::MaxIterations
    };
    let mut i = 0;

    debug!("V0: {}", format_polar_vec(&polar(&vm, &va)));

    // do Newton iterations
    while status != PfStatus::Converged && i < opt.max_it {
        let s = bus_power(sys.y_bus(), &polar(&vm, &va));

        classify_buses(sys, &s, &vm, &mut sgen, &mut regulating);

        // evaluate F(x)
        let s_net = make_sbus(sys, &sgen, &vm);
        let mut f = vec![0.0; 2 * n];
        for k in 1..nb {
            let err = s_net[k] - s[k];
            f[k - 1] = err.re;
            f[k - 1 + n] = if regulating[k] { 0.0 } else { err.im };
        }
        debug!("F: {}", format_f64_vec(&f));

        // compute update step
        let jac = make_jac(&ybus, &vm, &va);
        let dx = match lin_solver.solve(&jac, &f) {
            Ok(dx) => dx,
            Err(PowerFlowError::SingularJacobian) => {
                warn!("singular Jacobian at iteration {}", i + 1);
                status = PfStatus::SingularJacobian;
                break;
            }
            Err(err) => return Err(err),
        };
        debug!("dx: {}", format_f64_vec(&dx));

        // update voltage
        for k in 1..nb {
            va[k] += dx[k - 1];

            vm[k] = update_magnitude(vm[k], dx[k - 1 + n], sys.vreg(k), regulating[k]);
        }
        debug!("V: {}", format_polar_vec(&polar(&vm, &va)));

        i += 1;

        // check for convergence
        let norm_dx = norm_inf(&dx);
        if let Some(pm) = progress {
            pm.update(i, norm_dx);
        }
        if norm_dx <= opt.tolerance {
            status = PfStatus::Converged;
        }
    }

    match status {
        PfStatus::Converged => info!(
            "Newton's method power flow (power balance, polar) converged in {} iterations.",
            i
        ),
        PfStatus::MaxIterations => warn!(
            "Newton's method power flow (power balance, polar) did not converge in {} iterations.",
            i
        ),
        PfStatus::SingularJacobian => {}
    }

    let v = polar(&vm, &va);
    let s = bus_power(sys.y_bus(), &v);

    // generation that balances the calculated injections
    let load = |k: usize| total_load(sys.sload(k), sys.sload_i(k), sys.sload_y(k), vm[k]);
    sgen[0] = s[0] + load(0);
    for k in 1..nb {
        if regulating[k] {
            sgen[k].im = s[k].im + load(k).im;
        }
    }

    Ok(PowerFlowSolution {
        v,
        s,
        sgen,
        regulating,
        status,
        iterations: i,
    })
}

/// Applies the magnitude correction `d` to a bus at `vm`.
///
/// Regulating buses are held at their setpoint. A regulated bus that is
/// limited may approach its setpoint but not step across it.
fn update_magnitude(vm: f64, d: f64, vreg: Option<f64>, regulating: bool) -> f64 {
    match vreg {
        Some(vreg) if regulating => vreg,
        Some(vreg) if vm > vreg && d < vreg - vm => vreg,
        Some(vreg) if vm < vreg && d > vreg - vm => vreg,
        _ => vm + d,
    }
}
