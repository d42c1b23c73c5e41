//! Turnout Core - Behavioral Decision Models for Voter Turnout
//!
//! This library turns a synthetic population into vote/abstain decisions:
//! 1. **Generator**: skewed trait draws produce an immutable [`Agent`] population
//! 2. **Decision models**: Utility, Drift-Diffusion and Dual-System strategies
//!    map one agent to a vote probability
//! 3. **Nudges**: a sum-typed intervention each model applies to its own terms
//! 4. **Orchestrator**: [`Simulator`] aggregates decisions into turnout,
//!    histograms and nudge lift
//!
//! All randomness flows through [`turnout_env::SimContext`] streams, so a run
//! is fully determined by its seed.

pub mod agent;
pub mod error;
pub mod experiment;
pub mod generator;
pub mod models;
pub mod nudge;
pub mod physics;
pub mod simulation;
pub mod stats;

// Re-export key types for convenience
pub use agent::{Agent, ScenarioContext};
pub use error::ModelError;
pub use generator::{AgentGenerationParams, AgentGenerator, PopulationStats};
pub use models::{Decision, DecisionModel, ModelKind};
pub use nudge::{Nudge, NudgeKind};
pub use physics::{ModelPhysicsParams, ParamKey};
pub use simulation::{
    FullSimulationConfig, PathSettings, PathSimulationResult, SimulationResult, SimulationSettings, Simulator,
};
pub use stats::CalibrationPoint;
