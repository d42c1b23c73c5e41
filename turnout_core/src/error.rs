//! Error types for model inputs.

use thiserror::Error;

/// Errors raised when simulation inputs are outside their valid domain.
///
/// The decision models themselves never fail; they clamp. These errors only
/// come from validating configuration before any draw is made.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// A skew (shape) parameter was zero, negative, or not finite
    #[error("Skew parameter `{field}` must be > 0, got {value}")]
    InvalidSkew { field: &'static str, value: f64 },

    /// A probability or normalized value was outside [0, 1]
    #[error("`{field}` must lie in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    /// Population size was zero
    #[error("Population size must be at least 1")]
    EmptyPopulation,

    /// Monte Carlo path settings cannot produce a single finite path
    #[error("Path simulation needs repetitions >= 1 and positive dt and max_time, got {repetitions}, {dt}, {max_time}")]
    InvalidPathSettings { repetitions: usize, dt: f64, max_time: f64 },

    /// Treatment fraction left one arm of an experiment empty
    #[error("Treatment fraction {0} leaves an empty control or treatment group")]
    EmptyArm(f64),
}

impl ModelError {
    pub(crate) fn check_unit(field: &'static str, value: f64) -> Result<(), ModelError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(ModelError::OutOfUnitRange { field, value })
        }
    }
}
