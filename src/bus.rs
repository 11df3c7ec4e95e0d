use derive_builder::Builder;
use num_complex::Complex64;

use crate::capability::{CapabilityCurve, Curve};
use crate::dense::Mat;
use crate::error::{check_len, PowerFlowError, Result};

/// A bus system: admittance matrix plus per-bus generation, load and
/// voltage regulation intent.
///
/// Bus 0 is the slack bus. It must carry a voltage magnitude setpoint and
/// is never solved for. A bus with `vreg[i] == None` is a PQ bus; any other
/// bus regulates its voltage magnitude while its reactive output stays
/// within the static limits (`qmin`/`qmax`) and the capability curve
/// (`qcap`), when given.
///
/// All per-bus vectors must have one entry per row of `y_bus`. Optional
/// vectors may be left unset entirely.
///
/// # Panics
///
/// The per-bus getters panic if the bus index is not less than
/// [`len`](Self::len). The setters return [`PowerFlowError::BusIndex`]
/// instead.
///
/// ```
/// use rtflow::{cmplx, BusSystem, Mat};
///
/// let y = cmplx!(1.0) / cmplx!(0.0, 0.05);
/// let sys = BusSystem::builder()
///     .y_bus(Mat::from_rows(vec![vec![y, -y], vec![-y, y]])?)
///     .vreg(vec![Some(1.0), None])
///     .sgen(vec![cmplx!(), cmplx!(0.8, 0.0)])
///     .build()?;
/// assert_eq!(sys.len(), 2);
/// # Ok::<(), rtflow::PowerFlowError>(())
/// ```
#[derive(Builder, Clone)]
#[builder(
    pattern = "owned",
    build_fn(validate = "Self::validate", error = "PowerFlowError")
)]
pub struct BusSystem {
    /// Complex bus admittance matrix (p.u.).
    y_bus: Mat<Complex64>,

    /// Regulated voltage magnitude (p.u.), `None` for PQ buses.
    vreg: Vec<Option<f64>>,

    /// Generation injected at each bus (p.u.). Unset means no generation.
    #[builder(default, setter(strip_option))]
    sgen: Option<Vec<Complex64>>,

    /// Constant power load (p.u.). Unset means no load.
    #[builder(default, setter(strip_option))]
    sload: Option<Vec<Complex64>>,

    /// Constant current load, p.u. at nominal voltage.
    #[builder(default, setter(strip_option))]
    sload_i: Option<Vec<Option<Complex64>>>,

    /// Constant admittance load, p.u. at nominal voltage.
    #[builder(default, setter(strip_option))]
    sload_y: Option<Vec<Option<Complex64>>>,

    /// Static minimum reactive generation (p.u.).
    #[builder(default, setter(strip_option))]
    qmin: Option<Vec<Option<f64>>>,

    /// Static maximum reactive generation (p.u.).
    #[builder(default, setter(strip_option))]
    qmax: Option<Vec<Option<f64>>>,

    /// Voltage/loading dependent reactive capability.
    #[builder(default, setter(strip_option))]
    qcap: Option<Vec<Option<Curve>>>,
}

impl BusSystemBuilder {
    fn validate(&self) -> Result<()> {
        // Missing required fields are reported by the generated build fn.
        let Some(y_bus) = &self.y_bus else {
            return Ok(());
        };
        if !y_bus.is_square() {
            return Err(PowerFlowError::NonSquare {
                rows: y_bus.rows(),
                cols: y_bus.cols(),
            });
        }
        let nb = y_bus.rows();
        if nb == 0 {
            return Err(PowerFlowError::EmptySystem);
        }

        if let Some(vreg) = &self.vreg {
            check_len("vreg", vreg.len(), nb)?;
            if vreg[0].is_none() {
                return Err(PowerFlowError::MissingSlackSetpoint);
            }
        }
        if let Some(Some(sgen)) = &self.sgen {
            check_len("sgen", sgen.len(), nb)?;
        }
        if let Some(Some(sload)) = &self.sload {
            check_len("sload", sload.len(), nb)?;
        }
        if let Some(Some(sload_i)) = &self.sload_i {
            check_len("sload_i", sload_i.len(), nb)?;
        }
        if let Some(Some(sload_y)) = &self.sload_y {
            check_len("sload_y", sload_y.len(), nb)?;
        }
        if let Some(Some(qmin)) = &self.qmin {
            check_len("qmin", qmin.len(), nb)?;
        }
        if let Some(Some(qmax)) = &self.qmax {
            check_len("qmax", qmax.len(), nb)?;
        }
        if let Some(Some(qcap)) = &self.qcap {
            check_len("qcap", qcap.len(), nb)?;
        }
        Ok(())
    }
}

impl BusSystem {
    pub fn builder() -> BusSystemBuilder {
        BusSystemBuilder::default()
    }

    /// Number of buses.
    pub fn len(&self) -> usize {
        self.y_bus.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn y_bus(&self) -> &Mat<Complex64> {
        &self.y_bus
    }

    pub fn vreg(&self, i: usize) -> Option<f64> {
        self.vreg[i]
    }

    pub fn is_regulated(&self, i: usize) -> bool {
        self.vreg[i].is_some()
    }

    /// Slack bus voltage magnitude setpoint.
    pub fn slack_voltage(&self) -> f64 {
        self.vreg[0].unwrap_or(1.0)
    }

    pub fn sgen(&self, i: usize) -> Complex64 {
        self.sgen
            .as_ref()
            .map_or(Complex64::default(), |sgen| sgen[i])
    }

    pub fn sload(&self, i: usize) -> Complex64 {
        self.sload
            .as_ref()
            .map_or(Complex64::default(), |sload| sload[i])
    }

    pub fn sload_i(&self, i: usize) -> Option<Complex64> {
        self.sload_i.as_ref().and_then(|s| s[i])
    }

    pub fn sload_y(&self, i: usize) -> Option<Complex64> {
        self.sload_y.as_ref().and_then(|s| s[i])
    }

    pub fn qmin(&self, i: usize) -> Option<f64> {
        self.qmin.as_ref().and_then(|q| q[i])
    }

    pub fn qmax(&self, i: usize) -> Option<f64> {
        self.qmax.as_ref().and_then(|q| q[i])
    }

    pub fn qcap(&self, i: usize) -> Option<&dyn CapabilityCurve> {
        self.qcap
            .as_ref()
            .and_then(|q| q[i].as_deref())
    }

    /// Updates the slack bus voltage setpoint, e.g. to follow a grid
    /// voltage that varies between simulation ticks.
    pub fn set_slack_voltage(&mut self, vm: f64) {
        self.vreg[0] = Some(vm);
    }

    pub fn set_sgen(&mut self, i: usize, sgen: Complex64) -> Result<()> {
        let nb = self.check_bus(i)?;
        self.sgen
            .get_or_insert_with(|| vec![Complex64::default(); nb])[i] = sgen;
        Ok(())
    }

    /// Changes the regulation setpoint of a non-slack bus.
    pub fn set_vreg(&mut self, i: usize, vreg: Option<f64>) -> Result<()> {
        self.check_bus(i)?;
        if i == 0 && vreg.is_none() {
            return Err(PowerFlowError::MissingSlackSetpoint);
        }
        self.vreg[i] = vreg;
        Ok(())
    }

    fn check_bus(&self, i: usize) -> Result<usize> {
        let nb = self.len();
        if i < nb {
            Ok(nb)
        } else {
            Err(PowerFlowError::BusIndex {
                index: i,
                buses: nb,
            })
        }
    }
}
