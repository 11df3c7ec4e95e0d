use num_complex::Complex64;

use crate::bus::BusSystem;
use crate::dense::Mat;
use crate::zip::net_injection;

/// Complex power flowing into the network at each bus, `S = V * conj(Ybus * V)`.
pub fn bus_power(y_bus: &Mat<Complex64>, v: &[Complex64]) -> Vec<Complex64> {
    let i_bus = y_bus.mat_vec(v);
    v.iter().zip(i_bus).map(|(v, i)| v * i.conj()).collect()
}

/// Builds the vector of scheduled net bus injections (generation minus
/// load) at voltage magnitudes `vm`.
///
/// `sgen` overrides the generation held by `sys`, so that reactive limits
/// pinned during a solve are taken into account.
pub fn make_sbus(sys: &BusSystem, sgen: &[Complex64], vm: &[f64]) -> Vec<Complex64> {
    (0..sys.len())
        .map(|i| {
            net_injection(
                sgen[i],
                sys.sload(i),
                sys.sload_i(i),
                sys.sload_y(i),
                vm[i],
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;
    use approx::assert_abs_diff_eq;

    #[test]
    fn two_bus_power_matches_line_flow() -> anyhow::Result<()> {
        let z = cmplx!(0.0, 0.05);
        let y = cmplx!(1.0) / z;
        let y_bus = Mat::from_rows(vec![vec![y, -y], vec![-y, y]])?;
        let v = vec![cmplx!(1.0), Complex64::from_polar(0.99, 0.04)];

        let s = bus_power(&y_bus, &v);

        // power leaving bus 1 through the line towards bus 0
        let s1 = v[1] * ((v[1] - v[0]) / z).conj();
        assert_abs_diff_eq!(s[1].re, s1.re, epsilon = 1e-12);
        assert_abs_diff_eq!(s[1].im, s1.im, epsilon = 1e-12);

        // lossless line: real power balances
        assert_abs_diff_eq!(s[0].re + s[1].re, 0.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn scheduled_injection_uses_override() -> anyhow::Result<()> {
        let y_bus = Mat::from_fn(2, 2, |_, _| cmplx!());
        let sys = BusSystem::builder()
            .y_bus(y_bus)
            .vreg(vec![Some(1.0), Some(1.0)])
            .sgen(vec![cmplx!(), cmplx!(0.5, 0.9)])
            .sload(vec![cmplx!(), cmplx!(0.1, 0.1)])
            .sload_y(vec![None, Some(cmplx!(0.2, 0.0))])
            .build()?;

        let sgen = vec![cmplx!(), cmplx!(0.5, 0.3)];
        let s = make_sbus(&sys, &sgen, &[1.0, 0.5]);
        assert_abs_diff_eq!(s[1].re, 0.5 - 0.1 - 0.2 * 0.25, epsilon = 1e-15);
        assert_abs_diff_eq!(s[1].im, 0.3 - 0.1, epsilon = 1e-15);
        Ok(())
    }
}
