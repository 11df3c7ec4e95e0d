use num_complex::Complex64;

/// Net complex power injected at a bus: generation minus the ZIP load
/// evaluated at voltage magnitude `vm`.
///
/// `sload` is the constant power portion. `sload_i` (constant current) and
/// `sload_y` (constant admittance) are given in p.u. at nominal voltage and
/// scale with `vm` and `vm^2` respectively. Absent portions contribute
/// nothing.
pub fn net_injection(
    sgen: Complex64,
    sload: Complex64,
    sload_i: Option<Complex64>,
    sload_y: Option<Complex64>,
    vm: f64,
) -> Complex64 {
    sgen - total_load(sload, sload_i, sload_y, vm)
}

/// ZIP load demanded at voltage magnitude `vm`.
pub fn total_load(
    sload: Complex64,
    sload_i: Option<Complex64>,
    sload_y: Option<Complex64>,
    vm: f64,
) -> Complex64 {
    let mut sd = sload;
    if let Some(sd_i) = sload_i {
        sd += sd_i * vm;
    }
    if let Some(sd_z) = sload_y {
        sd += sd_z * (vm * vm);
    }
    sd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;
    use approx::assert_abs_diff_eq;

    #[test]
    fn constant_power_only() {
        let s = net_injection(cmplx!(1.0, 0.2), cmplx!(0.3, 0.1), None, None, 0.9);
        assert_abs_diff_eq!(s.re, 0.7, epsilon = 1e-15);
        assert_abs_diff_eq!(s.im, 0.1, epsilon = 1e-15);
    }

    #[test]
    fn current_and_admittance_scale_with_voltage() {
        let vm = 0.95;
        let s = net_injection(
            cmplx!(),
            cmplx!(0.2, 0.0),
            Some(cmplx!(0.3, 0.1)),
            Some(cmplx!(0.5, 0.2)),
            vm,
        );
        assert_abs_diff_eq!(s.re, -(0.2 + 0.3 * vm + 0.5 * vm * vm), epsilon = 1e-15);
        assert_abs_diff_eq!(s.im, -(0.1 * vm + 0.2 * vm * vm), epsilon = 1e-15);
    }

    #[test]
    fn nominal_voltage_sums_portions() {
        let sd = total_load(cmplx!(0.1), Some(cmplx!(0.2)), Some(cmplx!(0.3)), 1.0);
        assert_abs_diff_eq!(sd.re, 0.6, epsilon = 1e-15);
    }
}
