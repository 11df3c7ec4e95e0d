//! Newton-Raphson AC power flow for small bus systems, with reactive limit
//! enforcement on voltage regulated buses, and a closed-loop voltage
//! control simulation built on top of it.
//!
//! ```
//! use rtflow::{cmplx, solve, BusSystem, Mat};
//!
//! let y = cmplx!(1.0) / cmplx!(0.0, 0.05);
//! let sys = BusSystem::builder()
//!     .y_bus(Mat::from_rows(vec![vec![y, -y], vec![-y, y]])?)
//!     .vreg(vec![Some(1.0), None])
//!     .sgen(vec![cmplx!(), cmplx!(0.8, 0.0)])
//!     .build()?;
//!
//! let sol = solve(&sys, None)?;
//! assert!(sol.solved());
//! assert!(sol.vm(1) < 1.0);
//! # Ok::<(), rtflow::PowerFlowError>(())
//! ```

mod bus;
mod bus_types;
mod capability;
mod dense;
mod error;
mod jac;
mod loadcase;
mod lu;
mod math;
mod newton;
mod opt;
mod pf;
mod sbus;
mod sim;
mod traits;
mod ybus;
mod zip;

pub mod debug;

pub use bus::*;
pub use bus_types::*;
pub use capability::*;
pub use dense::*;
pub use error::{CapabilityCurveError, PowerFlowError, Result};
pub use jac::*;
pub use loadcase::*;
pub use lu::*;
pub use math::*;
pub use newton::*;
pub use opt::*;
pub use pf::*;
pub use sbus::*;
pub use sim::*;
pub use traits::*;
pub use ybus::*;
pub use zip::*;
