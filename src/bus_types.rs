use log::{debug, warn};
use num_complex::Complex64;

use crate::bus::BusSystem;

/// Decides whether regulated bus `i` still holds its voltage setpoint.
///
/// `s` is the power currently flowing into the network at the bus and `vm`
/// its present voltage magnitude. A bus is held at a limit when its
/// reactive output has reached the limit, or when its voltage sits on the
/// side of the setpoint that the limit implies (above it for `qmin`, below
/// it for `qmax`). A limited bus has the reactive part of `sgen` pinned to
/// the violated limit; when a static limit and the capability curve trip in
/// the same direction the tighter of the two is kept.
///
/// Returns `false` for PQ buses.
pub fn classify_bus(
    sys: &BusSystem,
    i: usize,
    s: Complex64,
    vm: f64,
    sgen: &mut Complex64,
) -> bool {
    let Some(vreg) = sys.vreg(i) else {
        return false;
    };
    let q = s.im + sys.sload(i).im;

    let mut under = false;
    let mut over = false;

    if let Some(qmin) = sys.qmin(i) {
        if q <= qmin || vm > vreg {
            under = true;
            sgen.im = qmin;
        }
    }
    if let Some(qmax) = sys.qmax(i) {
        if q >= qmax || vm < vreg {
            over = true;
            sgen.im = qmax;
        }
    }

    if let Some(curve) = sys.qcap(i) {
        match curve.limits(vm, sgen.re) {
            Ok((qmin, qmax)) => {
                if q <= qmin || vm > vreg {
                    sgen.im = if under { sgen.im.max(qmin) } else { qmin };
                    under = true;
                }
                if q >= qmax || vm < vreg {
                    sgen.im = if over { sgen.im.min(qmax) } else { qmax };
                    over = true;
                }
            }
            Err(err) => warn!("bus {}: {}", i, err),
        }
    }

    !under && !over
}

/// Refreshes the regulation state of every non-slack bus.
///
/// Run once per iteration: the operating point and any voltage dependent
/// capability move as the solve progresses, so a bus may leave and later
/// resume regulation within one solve.
pub fn classify_buses(
    sys: &BusSystem,
    s: &[Complex64],
    vm: &[f64],
    sgen: &mut [Complex64],
    regulating: &mut [bool],
) {
    for i in 1..sys.len() {
        let was_regulating = regulating[i];
        regulating[i] = classify_bus(sys, i, s[i], vm[i], &mut sgen[i]);

        if sys.is_regulated(i) && !regulating[i] {
            debug!(
                "bus {} at reactive limit, holding Qg = {:.6} p.u.{}",
                i,
                sgen[i].im,
                if was_regulating { " (left regulation)" } else { "" }
            );
        }
    }
}
