use num_complex::Complex64;
use pretty_dtoa::{dtoa, FmtFloatConfig};

use crate::dense::Mat;

const FLOAT_CONFIG: FmtFloatConfig = FmtFloatConfig::default()
    .add_point_zero(false)
    .max_significant_digits(9);

pub fn format_f64(f: f64) -> String {
    dtoa(f, FLOAT_CONFIG)
}

pub fn format_f64_vec(v: &[f64]) -> String {
    let a: Vec<String> = v.iter().map(|&f| format_f64(f)).collect();
    format!("[{}]", a.join(", "))
}

fn format_complex(z: &Complex64) -> String {
    format!(
        "{}{}j{}",
        format_f64(z.re),
        if z.im.is_sign_negative() { "-" } else { "+" },
        format_f64(z.im.abs())
    )
}

pub fn format_rect_vec(v: &[Complex64]) -> String {
    let a: Vec<String> = v.iter().map(format_complex).collect();
    format!("[{}]", a.join(", "))
}

fn format_polar(z: &Complex64) -> String {
    format!(
        "{}\u{2220}{}\u{00B0}",
        format_f64(z.norm()),
        format_f64(z.arg().to_degrees())
    )
}

pub fn format_polar_vec(v: &[Complex64]) -> String {
    let a: Vec<String> = v.iter().map(format_polar).collect();
    format!("[{}]", a.join(", "))
}

/// Renders a real matrix as right-aligned columns, one row per line.
pub fn format_table(m: &Mat<f64>) -> String {
    let cells: Vec<String> = m.values().iter().map(|&f| format_f64(f)).collect();
    let width = cells.iter().map(String::len).max().unwrap_or(0);

    let mut s = String::new();
    for r in 0..m.rows() {
        let row: Vec<String> = cells[r * m.cols()..(r + 1) * m.cols()]
            .iter()
            .map(|c| format!("{:>width$}", c, width = width))
            .collect();
        s.push_str(&row.join("  "));
        s.push('\n');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmplx;

    #[test]
    fn polar_in_degrees() {
        let v = vec![cmplx!(1.0), cmplx!(0.0, 0.5)];
        assert_eq!(format_polar_vec(&v), "[1\u{2220}0\u{00B0}, 0.5\u{2220}90\u{00B0}]");
    }

    #[test]
    fn rect_sign() {
        assert_eq!(format_rect_vec(&[cmplx!(0.8, -0.25)]), "[0.8-j0.25]");
    }

    #[test]
    fn table_aligns_columns() -> anyhow::Result<()> {
        let m = Mat::from_rows(vec![vec![1.0, -20.5], vec![30.0, 4.0]])?;
        assert_eq!(format_table(&m), "    1  -20.5\n   30      4\n");
        Ok(())
    }
}
