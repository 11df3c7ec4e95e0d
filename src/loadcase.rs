use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::bus::BusSystem;
use crate::capability::{Curve, PiecewiseCurve, VoltageScaled};
use crate::dense::Mat;
use crate::pf::PowerFlowSolution;

/// Bus system description as read from a JSON case file.
///
/// Complex values are written as `[re, im]` pairs, all in per unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseFile {
    pub name: Option<String>,
    /// Bus admittance matrix, one array per row.
    pub ybus: Vec<Vec<Complex64>>,
    /// One record per bus, bus 0 first.
    pub buses: Vec<BusRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusRecord {
    pub vreg: Option<f64>,
    #[serde(default)]
    pub sgen: Complex64,
    #[serde(default)]
    pub sload: Complex64,
    pub sload_i: Option<Complex64>,
    pub sload_y: Option<Complex64>,
    pub qmin: Option<f64>,
    pub qmax: Option<f64>,
    pub capability: Option<CurveSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurveSpec {
    /// Breakpoints `[p, qmin, qmax]` with increasing `p`.
    Piecewise { points: Vec<(f64, f64, f64)> },
    VoltageScaled {
        qmin: f64,
        qmax: f64,
        #[serde(default = "default_exponent")]
        exponent: f64,
    },
}

fn default_exponent() -> f64 {
    1.0
}

impl CurveSpec {
    fn to_curve(&self) -> Result<Curve> {
        let curve: Curve = match self {
            CurveSpec::Piecewise { points } => Arc::new(PiecewiseCurve::new(points.clone())?),
            CurveSpec::VoltageScaled {
                qmin,
                qmax,
                exponent,
            } => Arc::new(VoltageScaled::new(*qmin, *qmax, *exponent)?),
        };
        Ok(curve)
    }
}

impl CaseFile {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("parsing case file")
    }

    /// Validates the case and builds the bus system it describes.
    pub fn to_bus_system(&self) -> Result<BusSystem> {
        let y_bus = Mat::from_rows(self.ybus.clone())?;
        let buses = &self.buses;

        let mut qcap = Vec::with_capacity(buses.len());
        for (i, b) in buses.iter().enumerate() {
            let curve = match &b.capability {
                Some(spec) => Some(
                    spec.to_curve()
                        .with_context(|| format!("capability curve of bus {}", i))?,
                ),
                None => None,
            };
            qcap.push(curve);
        }

        let mut builder = BusSystem::builder()
            .y_bus(y_bus)
            .vreg(buses.iter().map(|b| b.vreg).collect())
            .sgen(buses.iter().map(|b| b.sgen).collect())
            .sload(buses.iter().map(|b| b.sload).collect());

        if buses.iter().any(|b| b.sload_i.is_some()) {
            builder = builder.sload_i(buses.iter().map(|b| b.sload_i).collect());
        }
        if buses.iter().any(|b| b.sload_y.is_some()) {
            builder = builder.sload_y(buses.iter().map(|b| b.sload_y).collect());
        }
        if buses.iter().any(|b| b.qmin.is_some()) {
            builder = builder.qmin(buses.iter().map(|b| b.qmin).collect());
        }
        if buses.iter().any(|b| b.qmax.is_some()) {
            builder = builder.qmax(buses.iter().map(|b| b.qmax).collect());
        }
        if qcap.iter().any(Option::is_some) {
            builder = builder.qcap(qcap);
        }

        Ok(builder.build()?)
    }
}

pub fn load_case(case_path: &Path) -> Result<CaseFile> {
    let s = fs::read_to_string(case_path)
        .with_context(|| format!("reading {}", case_path.display()))?;
    CaseFile::from_json(&s)
}

pub fn write_solution(out_path: &Path, sol: &PowerFlowSolution) -> Result<()> {
    let s = serde_json::to_string_pretty(sol)?;
    fs::write(out_path, s).with_context(|| format!("writing {}", out_path.display()))
}
