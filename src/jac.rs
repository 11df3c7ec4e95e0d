use crate::debug::format_table;
use crate::dense::Mat;
use crate::ybus::YbusPolar;

/// Forms the power flow Jacobian.
///
/// Rows hold the sensitivities of the active power injections at buses
/// `1..N` followed by the reactive ones; columns the voltage angles of the
/// same buses followed by their magnitudes. The slack bus (bus 0) has no
/// row or column, but its voltage enters every sum. Angles are in radians
/// and all other quantities in per unit.
///
/// The reactive rows are kept for regulating buses. Zeroing their mismatch
/// is what holds the voltage magnitude during the update.
pub fn make_jac(ybus: &YbusPolar, vm: &[f64], va: &[f64]) -> Mat<f64> {
    let nb = ybus.len();
    let n = nb.saturating_sub(1);
    let mut jac = Mat::zeros(2 * n, 2 * n);

    for i in 1..nb {
        let (p_row, q_row) = (i - 1, i - 1 + n);

        // sums over every bus, the slack included
        let mut sum_sin = 0.0;
        let mut sum_cos = 0.0;
        for k in 0..nb {
            let a = va[i] - va[k] - ybus.ang(i, k);
            let yv = ybus.mag(i, k) * vm[k];
            sum_sin += yv * a.sin();
            sum_cos += yv * a.cos();
        }
        // the k == i terms drop out of the angle derivatives
        let yv_ii = ybus.mag(i, i) * vm[i];
        let self_sin = yv_ii * (-ybus.ang(i, i)).sin();
        let self_cos = yv_ii * (-ybus.ang(i, i)).cos();

        for j in 1..nb {
            let (d_col, m_col) = (j - 1, j - 1 + n);

            if i == j {
                let (y_ii, theta_ii) = (ybus.mag(i, i), ybus.ang(i, i));

                // dP/dδ, dP/d|V|
                jac.set(p_row, d_col, -vm[i] * (sum_sin - self_sin));
                jac.set(p_row, m_col, vm[i] * y_ii * theta_ii.cos() + sum_cos);

                // dQ/dδ, dQ/d|V|
                jac.set(q_row, d_col, vm[i] * (sum_cos - self_cos));
                jac.set(q_row, m_col, -vm[i] * y_ii * theta_ii.sin() + sum_sin);
            } else {
                let a = va[i] - va[j] - ybus.ang(i, j);
                let vy = vm[i] * ybus.mag(i, j);

                jac.set(p_row, d_col, vy * vm[j] * a.sin());
                jac.set(p_row, m_col, vy * a.cos());

                jac.set(q_row, d_col, -vy * vm[j] * a.cos());
                jac.set(q_row, m_col, vy * a.sin());
            }
        }
    }
    log::trace!("J:\n{}", format_table(&jac));

    jac
}
