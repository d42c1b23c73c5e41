//! Simulation orchestrator.
//!
//! One call generates a single population, runs the selected model, runs
//! every model for comparison, and (when a nudge is active) reruns the
//! selected model without the nudge to report lift.
//!
//! Agents are immutable and only borrowed by the models, so every model run
//! sees exactly the same population without any copying.
//!
//! [`Simulator::simulate_paths`] is the Monte Carlo alternative for the
//! drift-diffusion model: instead of the closed-form first-passage
//! probability it walks each agent's diffusion repeatedly and also reports
//! decision times.

use crate::agent::{Agent, ScenarioContext};
use crate::error::ModelError;
use crate::generator::{AgentGenerationParams, AgentGenerator, PopulationStats};
use crate::models::{DdmTerms, Decision, ModelKind};
use crate::nudge::{Nudge, NudgeKind};
use crate::physics::ModelPhysicsParams;
use crate::stats::{mean_and_variance, ProbabilityHistogram, HISTOGRAM_BINS};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use turnout_env::{SimContext, StreamId};

/// Stream for Monte Carlo diffusion paths.
const PATH_STREAM: u64 = 0xDD3;

/// Everything needed to simulate one scenario.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FullSimulationConfig {
    pub scenario: ScenarioContext,
    pub generation: AgentGenerationParams,
    pub physics: ModelPhysicsParams,
}

/// Run-level choices: model, nudge and population size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub model: ModelKind,
    pub nudge: Nudge,
    pub population_size: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            model: ModelKind::Utility,
            nudge: Nudge::None,
            population_size: 1000,
        }
    }
}

impl SimulationSettings {
    pub fn new(model: ModelKind) -> Self {
        Self { model, ..Default::default() }
    }

    pub fn with_nudge(mut self, nudge: Nudge) -> Self {
        self.nudge = nudge;
        self
    }

    pub fn with_population(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }
}

/// Aggregate outcome of one model over the population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelTurnout {
    pub model: ModelKind,
    /// Share of agents that realized a vote
    pub turnout: f64,
    /// Mean per-agent probability
    pub mean_probability: f64,
}

/// Output of [`Simulator::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub scenario: String,
    pub model: ModelKind,
    pub nudge: NudgeKind,
    pub population_size: usize,

    /// Realized turnout of the selected model
    pub turnout: f64,
    pub mean_probability: f64,
    pub probability_std: f64,

    /// Every model on the same population and nudge
    pub comparison: Vec<ModelTurnout>,

    pub histogram: ProbabilityHistogram,
    pub decisions: Vec<Decision>,
    pub population: PopulationStats,

    /// Selected model without the nudge (only when a nudge is active)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_turnout: Option<f64>,

    /// `turnout − baseline_turnout`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lift: Option<f64>,
}

/// Euler–Maruyama settings for Monte Carlo drift-diffusion runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Simulated paths per agent
    pub repetitions: usize,
    pub dt: f64,
    pub max_time: f64,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            repetitions: 100,
            dt: 0.01,
            max_time: 10.0,
        }
    }
}

impl PathSettings {
    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_step(mut self, dt: f64, max_time: f64) -> Self {
        self.dt = dt;
        self.max_time = max_time;
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if self.repetitions == 0 || !positive(self.dt) || !positive(self.max_time) {
            return Err(ModelError::InvalidPathSettings {
                repetitions: self.repetitions,
                dt: self.dt,
                max_time: self.max_time,
            });
        }
        Ok(())
    }
}

/// Output of [`Simulator::simulate_paths`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSimulationResult {
    pub scenario: String,
    pub nudge: NudgeKind,
    pub population_size: usize,
    pub repetitions: usize,

    /// Mean over agents of the share of paths that reached the vote barrier
    pub turnout: f64,
    /// Mean closed-form vote probability on the same agents
    pub analytic_turnout: f64,
    /// Mean time to a barrier; timed-out paths count `max_time`
    pub mean_decision_time: f64,
    /// Share of paths that hit neither barrier
    pub timeout_share: f64,

    /// Per-agent share of voting paths
    pub vote_shares: Vec<f64>,
}

/// Runs populations through the decision models.
pub struct Simulator;

impl Simulator {
    /// Generates the population for a config from the context's population stream.
    pub fn population(
        config: &FullSimulationConfig,
        n: usize,
        ctx: &SimContext,
    ) -> Result<Vec<Agent>, ModelError> {
        if n == 0 {
            return Err(ModelError::EmptyPopulation);
        }
        config.scenario.validate()?;
        let mut rng = ctx.stream(StreamId::Population);
        AgentGenerator::generate(&config.generation, n, &mut rng)
    }

    /// Evaluates one model on every agent.
    pub fn decide_all(
        agents: &[Agent],
        scenario: &ScenarioContext,
        physics: &ModelPhysicsParams,
        model: ModelKind,
        nudge: &Nudge,
        rng: &mut dyn RngCore,
    ) -> Vec<Decision> {
        let model = model.model();
        agents
            .iter()
            .map(|agent| model.decide(agent, scenario, physics, nudge, rng))
            .collect()
    }

    /// Realized turnout only, without per-agent records.
    pub fn turnout(
        agents: &[Agent],
        scenario: &ScenarioContext,
        physics: &ModelPhysicsParams,
        model: ModelKind,
        nudge: &Nudge,
        rng: &mut dyn RngCore,
    ) -> f64 {
        if agents.is_empty() {
            return 0.0;
        }
        let model = model.model();
        let votes = agents
            .iter()
            .filter(|agent| model.decide(agent, scenario, physics, nudge, rng).voted)
            .count();
        votes as f64 / agents.len() as f64
    }

    /// Monte Carlo drift-diffusion run over one generated population.
    ///
    /// Every agent's diffusion is walked `repetitions` times from its nudged
    /// terms, all paths drawing from one dedicated stream.
    pub fn simulate_paths(
        config: &FullSimulationConfig,
        nudge: &Nudge,
        population_size: usize,
        paths: &PathSettings,
        ctx: &SimContext,
    ) -> Result<PathSimulationResult, ModelError> {
        paths.validate()?;
        let agents = Self::population(config, population_size, ctx)?;
        let mut rng = ctx.stream(StreamId::Custom(PATH_STREAM));

        let mut vote_shares = Vec::with_capacity(agents.len());
        let mut analytic = 0.0;
        let mut total_time = 0.0;
        let mut timeouts = 0usize;

        for agent in &agents {
            let terms = DdmTerms::compute(agent, &config.scenario, &config.physics, nudge);
            analytic += terms.vote_probability();

            let mut votes = 0usize;
            for _ in 0..paths.repetitions {
                let outcome = terms.simulate_path(paths.dt, paths.max_time, &mut rng);
                votes += usize::from(outcome.voted);
                timeouts += usize::from(outcome.timed_out);
                total_time += outcome.decision_time;
            }
            vote_shares.push(votes as f64 / paths.repetitions as f64);
        }

        let n = agents.len() as f64;
        let total_paths = n * paths.repetitions as f64;
        let result = PathSimulationResult {
            scenario: config.scenario.name.clone(),
            nudge: nudge.kind(),
            population_size: agents.len(),
            repetitions: paths.repetitions,
            turnout: vote_shares.iter().sum::<f64>() / n,
            analytic_turnout: analytic / n,
            mean_decision_time: total_time / total_paths,
            timeout_share: timeouts as f64 / total_paths,
            vote_shares,
        };

        debug!(
            "Monte Carlo DDM on '{}': turnout {:.4} (closed form {:.4}), mean decision time {:.3}",
            result.scenario, result.turnout, result.analytic_turnout, result.mean_decision_time
        );
        Ok(result)
    }

    /// Runs the full orchestration pass.
    ///
    /// Each model draws from its own decision stream; the no-nudge baseline
    /// reuses the selected model's stream so lift reflects only the change
    /// in probabilities.
    pub fn run(
        config: &FullSimulationConfig,
        settings: &SimulationSettings,
        ctx: &SimContext,
    ) -> Result<SimulationResult, ModelError> {
        let agents = Self::population(config, settings.population_size, ctx)?;
        debug!(
            "Simulating {} agents in '{}' with {} / {}",
            agents.len(),
            config.scenario.name,
            settings.model,
            settings.nudge.name()
        );

        let mut selected = Vec::new();
        let mut comparison = Vec::with_capacity(ModelKind::ALL.len());

        for kind in ModelKind::ALL {
            let mut rng = ctx.stream(StreamId::Decisions(kind.index()));
            let decisions = Self::decide_all(
                &agents,
                &config.scenario,
                &config.physics,
                kind,
                &settings.nudge,
                &mut rng,
            );
            comparison.push(summarize(kind, &decisions));
            if kind == settings.model {
                selected = decisions;
            }
        }

        let summary = summarize(settings.model, &selected);
        let probabilities: Vec<f64> = selected.iter().map(|d| d.probability).collect();
        let (_, variance) = mean_and_variance(&probabilities);

        let (baseline_turnout, lift) = if settings.nudge.is_active() {
            let mut rng = ctx.stream(StreamId::Decisions(settings.model.index()));
            let baseline = Self::turnout(
                &agents,
                &config.scenario,
                &config.physics,
                settings.model,
                &Nudge::None,
                &mut rng,
            );
            (Some(baseline), Some(summary.turnout - baseline))
        } else {
            (None, None)
        };

        Ok(SimulationResult {
            scenario: config.scenario.name.clone(),
            model: settings.model,
            nudge: settings.nudge.kind(),
            population_size: agents.len(),
            turnout: summary.turnout,
            mean_probability: summary.mean_probability,
            probability_std: variance.sqrt(),
            comparison,
            histogram: ProbabilityHistogram::from_probabilities(probabilities, HISTOGRAM_BINS),
            decisions: selected,
            population: PopulationStats::from_agents(&agents),
            baseline_turnout,
            lift,
        })
    }
}

fn summarize(model: ModelKind, decisions: &[Decision]) -> ModelTurnout {
    let n = decisions.len().max(1) as f64;
    ModelTurnout {
        model,
        turnout: decisions.iter().filter(|d| d.voted).count() as f64 / n,
        mean_probability: decisions.iter().map(|d| d.probability).sum::<f64>() / n,
    }
}
