//! Deep nudge analysis.
//!
//! Sweeps every scenario against every nudge variant and ranks the nudges by
//! mean turnout lift. The sweep is a step function: one step evaluates all
//! nudges for one scenario.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use turnout_core::stats::mean_and_variance;
use turnout_core::{FullSimulationConfig, ModelKind, Nudge, NudgeKind, Simulator};
use turnout_env::{CancelToken, SimContext, StreamId};

use crate::error::CalibrationError;

/// Outcome of a single [`DeepAnalysisSweep::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStatus {
    Running { scenario: usize },
    Done,
}

/// Sweep settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepAnalysisConfig {
    pub model: ModelKind,
    pub population_size: usize,
    /// Variants to compare; defaults to every active kind with default payload
    pub nudges: Vec<Nudge>,
    pub seed: u64,
}

impl Default for DeepAnalysisConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Utility,
            population_size: 2000,
            nudges: NudgeKind::ACTIVE.iter().map(|k| k.with_defaults()).collect(),
            seed: 42,
        }
    }
}

impl DeepAnalysisConfig {
    pub fn new(model: ModelKind) -> Self {
        Self { model, ..Default::default() }
    }

    pub fn with_population(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_nudges(mut self, nudges: Vec<Nudge>) -> Self {
        self.nudges = nudges;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Lift of one nudge in one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftCell {
    pub scenario: String,
    pub nudge: NudgeKind,
    pub baseline_turnout: f64,
    pub nudged_turnout: f64,
    pub lift: f64,
}

/// Aggregate performance of one nudge across scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NudgePerformance {
    pub nudge: NudgeKind,
    pub mean_lift: f64,
    pub lift_variance: f64,
    /// Scenario with the largest lift
    pub best_scenario: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepAnalysisResult {
    pub model: ModelKind,
    pub population_size: usize,
    pub cells: Vec<LiftCell>,
    /// Highest mean lift first
    pub ranking: Vec<NudgePerformance>,
}

impl DeepAnalysisResult {
    /// All cells for one nudge, in scenario order.
    pub fn lifts_for(&self, nudge: NudgeKind) -> impl Iterator<Item = &LiftCell> {
        self.cells.iter().filter(move |c| c.nudge == nudge)
    }
}

/// Incremental scenario × nudge sweep.
pub struct DeepAnalysisSweep {
    config: DeepAnalysisConfig,
    scenarios: Vec<FullSimulationConfig>,
    ctx: SimContext,
    next: usize,
    cells: Vec<LiftCell>,
}

impl DeepAnalysisSweep {
    pub fn new(config: DeepAnalysisConfig, scenarios: Vec<FullSimulationConfig>) -> Result<Self, CalibrationError> {
        if scenarios.is_empty() {
            return Err(CalibrationError::NoScenarios);
        }
        if config.population_size == 0 {
            return Err(CalibrationError::InvalidConfig("population_size must be at least 1".into()));
        }
        let ctx = SimContext::new(config.seed);
        let capacity = scenarios.len() * config.nudges.len();
        Ok(Self { config, scenarios, ctx, next: 0, cells: Vec::with_capacity(capacity) })
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.scenarios.len()
    }

    /// Evaluates every nudge for the next scenario.
    ///
    /// Baseline and nudged runs share the population and decision stream, so
    /// each lift reflects only the nudge.
    pub fn step(&mut self) -> Result<SweepStatus, CalibrationError> {
        let Some(target) = self.scenarios.get(self.next) else {
            return Ok(SweepStatus::Done);
        };
        let index = self.next;
        let ctx = self.ctx.child(index as u64);
        let model = self.config.model;
        let agents = Simulator::population(target, self.config.population_size, &ctx)?;

        let turnout = |nudge: &Nudge| {
            let mut rng = ctx.stream(StreamId::Decisions(model.index()));
            Simulator::turnout(&agents, &target.scenario, &target.physics, model, nudge, &mut rng)
        };

        let baseline = turnout(&Nudge::None);
        for nudge in &self.config.nudges {
            let nudged = turnout(nudge);
            debug!(
                "{} / {}: {:.4} -> {:.4}",
                target.scenario.name,
                nudge.name(),
                baseline,
                nudged
            );
            self.cells.push(LiftCell {
                scenario: target.scenario.name.clone(),
                nudge: nudge.kind(),
                baseline_turnout: baseline,
                nudged_turnout: nudged,
                lift: nudged - baseline,
            });
        }

        self.next += 1;
        Ok(SweepStatus::Running { scenario: index })
    }

    /// Steps through every scenario, checking `cancel` between scenarios.
    pub fn run(mut self, cancel: &CancelToken) -> Result<DeepAnalysisResult, CalibrationError> {
        loop {
            cancel.check("deep analysis step")?;
            if self.step()? == SweepStatus::Done {
                break;
            }
        }
        Ok(self.finish())
    }

    /// Aggregates the cells collected so far.
    ///
    /// Variants of the same kind are pooled into one ranking entry, listed
    /// in the order the kinds first appear in the config.
    pub fn finish(self) -> DeepAnalysisResult {
        let mut kinds: Vec<NudgeKind> = Vec::with_capacity(self.config.nudges.len());
        for nudge in &self.config.nudges {
            if !kinds.contains(&nudge.kind()) {
                kinds.push(nudge.kind());
            }
        }

        let mut ranking: Vec<NudgePerformance> = kinds
            .into_iter()
            .map(|kind| {
                let cells: Vec<&LiftCell> = self.cells.iter().filter(|c| c.nudge == kind).collect();
                let lifts: Vec<f64> = cells.iter().map(|c| c.lift).collect();
                let (mean_lift, lift_variance) = mean_and_variance(&lifts);
                let best_scenario = cells
                    .iter()
                    .copied()
                    .fold(None::<&LiftCell>, |best, c| match best {
                        Some(b) if b.lift >= c.lift => Some(b),
                        _ => Some(c),
                    })
                    .map(|c| c.scenario.clone())
                    .unwrap_or_default();
                NudgePerformance { nudge: kind, mean_lift, lift_variance, best_scenario }
            })
            .collect();

        ranking.sort_by(|a, b| b.mean_lift.total_cmp(&a.mean_lift));

        if let Some(top) = ranking.first() {
            info!(
                "Deep analysis ({}): best nudge {} with mean lift {:+.4}",
                self.config.model, top.nudge, top.mean_lift
            );
        }

        DeepAnalysisResult {
            model: self.config.model,
            population_size: self.config.population_size,
            cells: self.cells,
            ranking,
        }
    }
}

/// Runs the whole sweep without cancellation.
pub fn deep_analysis(
    config: DeepAnalysisConfig,
    scenarios: Vec<FullSimulationConfig>,
) -> Result<DeepAnalysisResult, CalibrationError> {
    DeepAnalysisSweep::new(config, scenarios)?.run(&CancelToken::new())
}
