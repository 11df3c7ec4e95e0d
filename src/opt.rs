/// Termination tolerance on the largest Newton correction.
pub const TOLERANCE: f64 = 1e-9;

/// Iteration limit for Newton's method.
pub const MAX_ITERATIONS: usize = 200;

/// Power flow options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PFOpt {
    /// Termination tolerance on the largest entry of the correction vector.
    /// Angle (rad) and magnitude (p.u.) corrections are compared against
    /// the same value.
    pub tolerance: f64,

    /// Maximum number of Newton iterations.
    pub max_it: usize,
}

impl Default for PFOpt {
    fn default() -> Self {
        Self {
            tolerance: TOLERANCE,
            max_it: MAX_ITERATIONS,
        }
    }
}
