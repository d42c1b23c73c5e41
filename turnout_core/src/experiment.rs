//! Randomized treatment experiments.
//!
//! Splits one population into a control arm (no nudge) and a treated arm,
//! optionally within civic-duty strata, and reports the average treatment
//! effect.

use crate::agent::Agent;
use crate::error::ModelError;
use crate::models::ModelKind;
use crate::nudge::{Nudge, NudgeKind};
use crate::simulation::{FullSimulationConfig, Simulator};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;
use turnout_env::{SimContext, StreamId};

const ASSIGNMENT_STREAM: u64 = 0xA551;
const CONTROL_STREAM: u64 = 0xC0;
const TREATMENT_STREAM: u64 = 0x7E;

/// Outcome of one control/treatment comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentEffect {
    pub nudge: NudgeKind,
    pub control_size: usize,
    pub treatment_size: usize,
    pub control_turnout: f64,
    pub treatment_turnout: f64,
    /// `treatment − control`
    pub average_effect: f64,
    /// Effect relative to control turnout (0 when control turnout is 0)
    pub relative_effect: f64,
}

/// Half-open civic-duty band `[lower, upper)`; the last band includes 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stratum {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
}

impl Stratum {
    pub fn new(label: &str, lower: f64, upper: f64) -> Self {
        Self { label: label.to_string(), lower, upper }
    }

    fn contains(&self, value: f64) -> bool {
        value >= self.lower && (value < self.upper || (self.upper >= 1.0 && value <= 1.0))
    }

    /// Low / Medium / High civic duty terciles.
    pub fn civic_duty_terciles() -> Vec<Stratum> {
        vec![
            Stratum::new("low", 0.0, 0.33),
            Stratum::new("medium", 0.33, 0.67),
            Stratum::new("high", 0.67, 1.0),
        ]
    }
}

/// Treatment effect within one stratum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratifiedEffect {
    pub stratum: Stratum,
    pub effect: TreatmentEffect,
}

/// Runs a randomized split of one population.
pub fn run_treatment_experiment(
    config: &FullSimulationConfig,
    model: ModelKind,
    nudge: &Nudge,
    population_size: usize,
    treatment_fraction: f64,
    ctx: &SimContext,
) -> Result<TreatmentEffect, ModelError> {
    let mut agents = Simulator::population(config, population_size, ctx)?;
    let mut rng = ctx.stream(StreamId::Custom(ASSIGNMENT_STREAM));
    agents.shuffle(&mut rng);
    compare_arms(config, model, nudge, &agents, treatment_fraction, ctx)
}

/// Runs the experiment separately within each civic-duty stratum.
///
/// Strata with fewer than two agents are skipped.
pub fn stratified_effects(
    config: &FullSimulationConfig,
    model: ModelKind,
    nudge: &Nudge,
    population_size: usize,
    strata: &[Stratum],
    ctx: &SimContext,
) -> Result<Vec<StratifiedEffect>, ModelError> {
    let mut agents = Simulator::population(config, population_size, ctx)?;
    let mut rng = ctx.stream(StreamId::Custom(ASSIGNMENT_STREAM));
    agents.shuffle(&mut rng);

    let mut results = Vec::new();
    for stratum in strata {
        let members: Vec<Agent> = agents
            .iter()
            .filter(|a| stratum.contains(a.civic_duty))
            .cloned()
            .collect();

        if members.len() < 2 {
            debug!("Skipping stratum '{}' with {} agents", stratum.label, members.len());
            continue;
        }

        let effect = compare_arms(config, model, nudge, &members, 0.5, ctx)?;
        results.push(StratifiedEffect { stratum: stratum.clone(), effect });
    }
    Ok(results)
}

fn compare_arms(
    config: &FullSimulationConfig,
    model: ModelKind,
    nudge: &Nudge,
    agents: &[Agent],
    treatment_fraction: f64,
    ctx: &SimContext,
) -> Result<TreatmentEffect, ModelError> {
    let n_control = ((agents.len() as f64) * (1.0 - treatment_fraction)).round() as usize;
    if !(0.0..=1.0).contains(&treatment_fraction) || n_control == 0 || n_control >= agents.len() {
        return Err(ModelError::EmptyArm(treatment_fraction));
    }

    let (control, treated) = agents.split_at(n_control);

    let mut control_rng = ctx.stream(StreamId::Custom(CONTROL_STREAM));
    let control_turnout =
        Simulator::turnout(control, &config.scenario, &config.physics, model, &Nudge::None, &mut control_rng);

    let mut treatment_rng = ctx.stream(StreamId::Custom(TREATMENT_STREAM));
    let treatment_turnout =
        Simulator::turnout(treated, &config.scenario, &config.physics, model, nudge, &mut treatment_rng);

    let average_effect = treatment_turnout - control_turnout;
    Ok(TreatmentEffect {
        nudge: nudge.kind(),
        control_size: control.len(),
        treatment_size: treated.len(),
        control_turnout,
        treatment_turnout,
        average_effect,
        relative_effect: if control_turnout > 0.0 { average_effect / control_turnout } else { 0.0 },
    })
}
