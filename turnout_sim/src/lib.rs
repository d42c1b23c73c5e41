//! Turnout Sim - Calibration and Nudge Analysis Harness
//!
//! This crate drives the models in [`turnout_core`] against observed
//! turnout:
//! - **Calibration**: multi-start simulated annealing over one model's
//!   parameters, validated at high fidelity
//! - **Sensitivity**: one-at-a-time bumps ranked by relative RMSE change
//! - **Deep analysis**: every scenario against every nudge, ranked by lift
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 CalibrationSession                   │
//! │   chain 0 ─► chain 1 ─► ... ─► chain R-1             │
//! │      │ step()                                        │
//! │  ┌───▼──────────────┐        ┌───────────────────┐   │
//! │  │    ParamSpace    │───────►│     Objective      │   │
//! │  │ (DVector + box)  │ decode │ cached populations │   │
//! │  └──────────────────┘        └─────────┬─────────┘   │
//! │                                        │ RMSE        │
//! │                              ┌─────────▼─────────┐   │
//! │                              │  SensitivityEntry │   │
//! │                              └───────────────────┘   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Both long-running operations are explicit step functions that check a
//! [`turnout_env::CancelToken`] between steps.
//!
//! # Usage
//!
//! ```ignore
//! use turnout_sim::{calibrate, CalibrationConfig, ScenarioId};
//! use turnout_core::ModelKind;
//!
//! let targets = ScenarioId::all().iter().map(|s| s.config()).collect();
//! let result = calibrate(CalibrationConfig::new(ModelKind::DriftDiffusion), targets)?;
//! println!("RMSE {:.4}, R² {:.3}", result.final_error, result.r_squared);
//! ```

pub mod analysis;
pub mod calibration;
mod error;
pub mod objective;
pub mod scenarios;
pub mod sensitivity;

pub use analysis::{deep_analysis, DeepAnalysisConfig, DeepAnalysisResult, DeepAnalysisSweep, SweepStatus};
pub use calibration::{calibrate, CalibrationConfig, CalibrationSession, StepStatus, TuningResult};
pub use error::CalibrationError;
pub use objective::{Objective, ParamSpace};
pub use scenarios::ScenarioId;
pub use sensitivity::SensitivityEntry;
