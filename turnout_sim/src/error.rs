//! Errors raised by calibration and analysis runs.

use thiserror::Error;
use turnout_core::ModelError;
use turnout_env::EnvError;

#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("No calibration scenarios were supplied")]
    NoScenarios,

    #[error("Invalid calibration config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Cancelled(#[from] EnvError),
}
