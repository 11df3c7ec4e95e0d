// Copyright (c) 2022-2024, Richard Lincoln. All rights reserved.

use num_complex::Complex64;

pub const J: Complex64 = Complex64 { re: 0.0, im: 1.0 };

#[macro_export]
macro_rules! cmplx {
    () => {
        num_complex::Complex64::new(0.0, 0.0)
    };
    ($arg1:expr) => {
        num_complex::Complex64::new($arg1, 0.0)
    };
    ($arg1:expr, $arg2:expr) => {
        num_complex::Complex64::new($arg1, $arg2)
    };
}

/// Forms complex voltages from magnitudes and angles (radians).
pub fn polar(vm: &[f64], va: &[f64]) -> Vec<Complex64> {
    vm.iter()
        .zip(va)
        .map(|(&m, &a)| Complex64::from_polar(m, a))
        .collect()
}

/// Returns `max(max(a), -min(a))`, the largest excursion from zero.
///
/// A NaN anywhere in `a` yields NaN, so it never passes a `<=` tolerance
/// test. Empty input yields zero.
pub fn norm_inf(a: &[f64]) -> f64 {
    if a.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let max = a.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = a.iter().copied().fold(f64::INFINITY, f64::min);
    if a.is_empty() {
        0.0
    } else {
        max.max(-min)
    }
}
