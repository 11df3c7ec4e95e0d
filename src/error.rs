//! Error types for the power flow solver.
//!
//! Input problems (matrix and vector shapes, a missing slack setpoint) are
//! reported as [`PowerFlowError`] before any iteration runs. Numerical
//! failure during a solve is not an error: it is reported through
//! [`PfStatus`](crate::PfStatus) on the returned solution.

use derive_builder::UninitializedFieldError;
use thiserror::Error;

/// Result type alias using [`PowerFlowError`].
pub type Result<T> = std::result::Result<T, PowerFlowError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PowerFlowError {
    /// Admittance matrix is not square.
    #[error("admittance matrix must be square (got {rows}x{cols})")]
    NonSquare { rows: usize, cols: usize },

    /// A per-bus vector (or matrix row) does not match the bus count.
    #[error("{name} has length {actual}, expected {expected}")]
    Shape {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("slack bus (bus 0) must have a voltage magnitude setpoint")]
    MissingSlackSetpoint,

    #[error("bus system has no buses")]
    EmptySystem,

    /// Raised by a [`LinearSolver`](crate::LinearSolver) when the Jacobian
    /// cannot be factored.
    #[error("singular Jacobian")]
    SingularJacobian,

    #[error("invalid capability curve: {0}")]
    InvalidCurve(String),

    #[error("missing required field `{0}`")]
    UninitializedField(&'static str),

    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("bus {index} out of range for {buses} buses")]
    BusIndex { index: usize, buses: usize },
}

impl PowerFlowError {
    pub(crate) fn shape(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::Shape {
            name,
            expected,
            actual,
        }
    }
}

impl From<UninitializedFieldError> for PowerFlowError {
    fn from(err: UninitializedFieldError) -> Self {
        Self::UninitializedField(err.field_name())
    }
}

/// Failure inside a user supplied reactive capability curve.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("capability curve evaluation failed: {0}")]
pub struct CapabilityCurveError(pub String);

impl CapabilityCurveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Checks that a per-bus vector has one entry per bus.
pub(crate) fn check_len(name: &'static str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        Err(PowerFlowError::shape(name, expected, actual))
    } else {
        Ok(())
    }
}
