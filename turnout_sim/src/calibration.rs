//! Multi-start simulated annealing calibration.
//!
//! A [`CalibrationSession`] is an explicit state machine: every call to
//! [`CalibrationSession::step`] runs one annealing iteration of the current
//! chain. Chains run one after another, each on its own RNG stream. Chain 0
//! starts from the supplied defaults, the rest from uniform draws in the box.
//!
//! ```text
//! for each chain:
//!     x ← start, T ← 1
//!     repeat N times:
//!         x' ← clamp(x + (u − ½)·2·scale·T)
//!         accept if ΔE < 0 or u < exp(−ΔE / T)
//!         T ← T × cooling_rate
//! validate global best at high fidelity (and on any held-out scenarios)
//! ```

use nalgebra::DVector;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use turnout_core::stats::{mae, r_squared_with_tolerance, rmse, turnout_standard_error, CalibrationPoint};
use turnout_core::{FullSimulationConfig, ModelKind, ModelPhysicsParams};
use turnout_env::{CancelToken, SimContext, StreamId};

use crate::error::CalibrationError;
use crate::objective::{Objective, ParamSpace};
use crate::sensitivity::{self, SensitivityEntry};

/// Starting temperature of every chain.
pub const INITIAL_TEMPERATURE: f64 = 1.0;

/// Temperature floor used in the acceptance test.
const MIN_TEMPERATURE: f64 = 1e-12;

/// Standard errors of sampling noise tolerated by R² on constant targets.
pub const R2_NOISE_SES: f64 = 3.0;

/// Child context index for held-out populations.
const HOLDOUT_CONTEXT: u64 = 0x401D_0000;

/// Annealing and fidelity settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub model: ModelKind,
    /// Number of sequential restarts
    pub chains: usize,
    pub iterations_per_chain: usize,
    /// Geometric factor applied to T after each iteration
    pub cooling_rate: f64,
    /// Agents per scenario during the search
    pub low_fidelity_population: usize,
    /// Agents per scenario for the final validation
    pub high_fidelity_population: usize,
    /// Relative bump for the sensitivity pass
    pub sensitivity_step: f64,
    pub seed: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Utility,
            chains: 4,
            iterations_per_chain: 200,
            cooling_rate: 0.97,
            low_fidelity_population: 500,
            high_fidelity_population: 5000,
            sensitivity_step: sensitivity::RELATIVE_STEP,
            seed: 42,
        }
    }
}

impl CalibrationConfig {
    pub fn new(model: ModelKind) -> Self {
        Self { model, ..Default::default() }
    }

    pub fn with_chains(mut self, chains: usize) -> Self {
        self.chains = chains;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations_per_chain = iterations;
        self
    }

    pub fn with_cooling_rate(mut self, rate: f64) -> Self {
        self.cooling_rate = rate;
        self
    }

    pub fn with_fidelity(mut self, low: usize, high: usize) -> Self {
        self.low_fidelity_population = low;
        self.high_fidelity_population = high;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.chains == 0 {
            return Err(CalibrationError::InvalidConfig("chains must be at least 1".into()));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(CalibrationError::InvalidConfig(format!(
                "cooling_rate must lie in (0, 1), got {}",
                self.cooling_rate
            )));
        }
        if self.low_fidelity_population == 0 || self.high_fidelity_population == 0 {
            return Err(CalibrationError::InvalidConfig("populations must be non-empty".into()));
        }
        Ok(())
    }
}

/// One annealing iteration, as recorded in a chain's history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Temperature the move was evaluated at
    pub temperature: f64,
    pub candidate_energy: f64,
    pub current_energy: f64,
    pub best_energy: f64,
    pub accepted: bool,
}

/// Where a chain started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStart {
    Defaults,
    Random,
}

/// Completed chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub chain: usize,
    pub start: ChainStart,
    pub initial_energy: f64,
    pub best_energy: f64,
    pub acceptance_rate: f64,
    pub history: Vec<IterationRecord>,
}

impl ChainSummary {
    /// Best energy after each iteration.
    pub fn best_series(&self) -> Vec<f64> {
        self.history.iter().map(|r| r.best_energy).collect()
    }
}

/// Output of a finished calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningResult {
    pub model: ModelKind,
    pub seed: u64,
    /// Global best parameters; only the model's own fields differ from the start
    pub optimized: ModelPhysicsParams,
    /// Best low-fidelity RMSE found by the search
    pub search_error: f64,
    /// High-fidelity RMSE of the optimized parameters
    pub final_error: f64,
    pub mae: f64,
    pub r_squared: f64,
    pub calibration_points: Vec<CalibrationPoint>,
    /// Held-out scenarios scored at high fidelity; never seen by the search
    #[serde(default)]
    pub holdout_points: Vec<CalibrationPoint>,
    /// RMSE over `holdout_points`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holdout_error: Option<f64>,
    pub sensitivity: Vec<SensitivityEntry>,
    pub chains: Vec<ChainSummary>,
    /// Global best energy after each iteration across all chains
    pub global_best_history: Vec<f64>,
    pub evaluations: usize,
}

/// Outcome of a single [`CalibrationSession::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Running { chain: usize, iteration: usize },
    Done,
}

struct Chain {
    index: usize,
    start: ChainStart,
    rng: ChaCha8Rng,
    current: DVector<f64>,
    current_energy: f64,
    best_energy: f64,
    initial_energy: f64,
    temperature: f64,
    accepted: usize,
    history: Vec<IterationRecord>,
}

impl Chain {
    fn summary(self) -> ChainSummary {
        let iterations = self.history.len();
        ChainSummary {
            chain: self.index,
            start: self.start,
            initial_energy: self.initial_energy,
            best_energy: self.best_energy,
            acceptance_rate: if iterations > 0 { self.accepted as f64 / iterations as f64 } else { 0.0 },
            history: self.history,
        }
    }
}

/// Incremental annealing run over a fixed set of scenarios.
pub struct CalibrationSession {
    config: CalibrationConfig,
    ctx: SimContext,
    space: ParamSpace,
    base: ModelPhysicsParams,
    objective: Objective,
    targets: Vec<FullSimulationConfig>,
    holdout: Vec<FullSimulationConfig>,
    active: Option<Chain>,
    next_chain: usize,
    finished: Vec<ChainSummary>,
    global_best: DVector<f64>,
    global_best_energy: f64,
    global_history: Vec<f64>,
    evaluations: usize,
}

impl CalibrationSession {
    /// Prepares a session starting chain 0 from default parameters.
    pub fn new(config: CalibrationConfig, targets: Vec<FullSimulationConfig>) -> Result<Self, CalibrationError> {
        Self::with_initial(config, targets, ModelPhysicsParams::default())
    }

    /// Prepares a session starting chain 0 from `initial`.
    pub fn with_initial(
        config: CalibrationConfig,
        targets: Vec<FullSimulationConfig>,
        initial: ModelPhysicsParams,
    ) -> Result<Self, CalibrationError> {
        config.validate()?;
        let ctx = SimContext::new(config.seed);
        let objective = Objective::new(config.model, &targets, config.low_fidelity_population, &ctx)?;
        let space = ParamSpace::for_model(config.model);
        let global_best = space.clamp(&space.encode(&initial));

        info!(
            "Calibrating {} over {} scenarios: {} chains x {} iterations",
            config.model,
            targets.len(),
            config.chains,
            config.iterations_per_chain
        );

        Ok(Self {
            config,
            ctx,
            space,
            base: initial,
            objective,
            targets,
            holdout: Vec::new(),
            active: None,
            next_chain: 0,
            finished: Vec::with_capacity(config.chains),
            global_best,
            global_best_energy: f64::INFINITY,
            global_history: Vec::new(),
            evaluations: 0,
        })
    }

    /// Adds scenarios that are only scored after the search.
    ///
    /// Held-out populations come from their own child context, so they never
    /// share agents with the search or validation populations.
    pub fn with_holdout(mut self, holdout: Vec<FullSimulationConfig>) -> Result<Self, CalibrationError> {
        for config in &holdout {
            config.scenario.validate()?;
            config.generation.validate()?;
        }
        self.holdout = holdout;
        Ok(self)
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn is_done(&self) -> bool {
        self.active.is_none() && self.next_chain >= self.config.chains
    }

    /// Fraction of the iteration budget consumed.
    pub fn progress(&self) -> f64 {
        let total = self.config.chains * self.config.iterations_per_chain;
        if total == 0 {
            return if self.is_done() { 1.0 } else { 0.0 };
        }
        let in_flight = self.active.as_ref().map_or(0, |c| c.history.len());
        let done = self.next_chain.saturating_sub(usize::from(self.active.is_some()))
            * self.config.iterations_per_chain
            + in_flight;
        done as f64 / total as f64
    }

    /// Best low-fidelity energy seen so far.
    pub fn best_energy(&self) -> f64 {
        self.global_best_energy
    }

    /// Best parameters seen so far.
    pub fn best_params(&self) -> ModelPhysicsParams {
        self.space.decode(&self.base, &self.global_best)
    }

    fn evaluate(&mut self, x: &DVector<f64>) -> f64 {
        self.evaluations += 1;
        self.objective.energy(&self.space.decode(&self.base, x))
    }

    fn start_chain(&mut self) -> Chain {
        let index = self.next_chain;
        self.next_chain += 1;

        let mut rng = self.ctx.stream(StreamId::Chain(index as u64));
        let (start, current) = if index == 0 {
            (ChainStart::Defaults, self.space.clamp(&self.space.encode(&self.base)))
        } else {
            (ChainStart::Random, self.space.sample(&mut rng))
        };

        let energy = self.evaluate(&current);
        if energy < self.global_best_energy {
            self.global_best = current.clone();
            self.global_best_energy = energy;
        }
        debug!("Chain {} starts ({:?}) at energy {:.5}", index, start, energy);

        Chain {
            index,
            start,
            rng,
            current,
            current_energy: energy,
            best_energy: energy,
            initial_energy: energy,
            temperature: INITIAL_TEMPERATURE,
            accepted: 0,
            history: Vec::with_capacity(self.config.iterations_per_chain),
        }
    }

    fn finish_chain(&mut self, chain: Chain) {
        info!(
            "Chain {} done: best {:.5}, accepted {}/{}",
            chain.index,
            chain.best_energy,
            chain.accepted,
            chain.history.len()
        );
        self.finished.push(chain.summary());
    }

    /// Advances the search by one annealing iteration.
    pub fn step(&mut self) -> StepStatus {
        loop {
            let mut chain = match self.active.take() {
                Some(chain) => chain,
                None if self.next_chain < self.config.chains => self.start_chain(),
                None => return StepStatus::Done,
            };

            if chain.history.len() >= self.config.iterations_per_chain {
                self.finish_chain(chain);
                continue;
            }

            let temperature = chain.temperature;
            let candidate = self.space.perturb(&chain.current, temperature, &mut chain.rng);
            let candidate_energy = self.evaluate(&candidate);

            let delta = candidate_energy - chain.current_energy;
            let accepted = delta < 0.0
                || chain.rng.gen::<f64>() < (-delta / temperature.max(MIN_TEMPERATURE)).exp();

            if accepted {
                chain.current = candidate;
                chain.current_energy = candidate_energy;
                chain.accepted += 1;

                if candidate_energy < chain.best_energy {
                    chain.best_energy = candidate_energy;
                }
                if candidate_energy < self.global_best_energy {
                    self.global_best = chain.current.clone();
                    self.global_best_energy = candidate_energy;
                }
            }

            chain.temperature *= self.config.cooling_rate;

            let iteration = chain.history.len();
            chain.history.push(IterationRecord {
                iteration,
                temperature,
                candidate_energy,
                current_energy: chain.current_energy,
                best_energy: chain.best_energy,
                accepted,
            });
            self.global_history.push(self.global_best_energy);

            let status = StepStatus::Running { chain: chain.index, iteration };
            if chain.history.len() >= self.config.iterations_per_chain {
                self.finish_chain(chain);
            } else {
                self.active = Some(chain);
            }
            return status;
        }
    }

    /// Steps until done, checking `cancel` before every step.
    pub fn run(mut self, cancel: &CancelToken) -> Result<TuningResult, CalibrationError> {
        loop {
            cancel.check("calibration step")?;
            if self.step() == StepStatus::Done {
                break;
            }
        }
        self.finish()
    }

    /// Re-evaluates the global best at high fidelity and ranks sensitivity.
    ///
    /// Any chain still in progress is closed with the iterations it has run.
    pub fn finish(mut self) -> Result<TuningResult, CalibrationError> {
        if let Some(chain) = self.active.take() {
            self.finish_chain(chain);
        }
        if !self.global_best_energy.is_finite() {
            // Nothing was evaluated yet; score the starting point
            let start = self.global_best.clone();
            self.global_best_energy = self.evaluate(&start);
        }

        let optimized = self.best_params();

        let high = if self.config.high_fidelity_population == self.config.low_fidelity_population {
            None
        } else {
            Some(Objective::new(
                self.config.model,
                &self.targets,
                self.config.high_fidelity_population,
                &self.ctx,
            )?)
        };
        let validation = high.as_ref().unwrap_or(&self.objective);
        let calibration_points = validation.predictions(&optimized);
        let tolerance = fit_tolerance(
            &calibration_points,
            self.config.low_fidelity_population,
            self.config.high_fidelity_population,
        );

        let holdout_points = if self.holdout.is_empty() {
            Vec::new()
        } else {
            self.evaluations += 1;
            Objective::new(
                self.config.model,
                &self.holdout,
                self.config.high_fidelity_population,
                &self.ctx.child(HOLDOUT_CONTEXT),
            )?
            .predictions(&optimized)
        };
        let holdout_error = (!holdout_points.is_empty()).then(|| rmse(&holdout_points));

        let sensitivity = sensitivity::analyze(
            &self.objective,
            &optimized,
            self.space.keys(),
            self.config.sensitivity_step,
        );
        // Validation pass, sensitivity baseline and one bump per field
        self.evaluations += 2 + self.space.dim();

        let result = TuningResult {
            model: self.config.model,
            seed: self.config.seed,
            optimized,
            search_error: self.global_best_energy,
            final_error: rmse(&calibration_points),
            mae: mae(&calibration_points),
            r_squared: r_squared_with_tolerance(&calibration_points, tolerance),
            calibration_points,
            holdout_points,
            holdout_error,
            sensitivity,
            chains: self.finished,
            global_best_history: self.global_history,
            evaluations: self.evaluations,
        };

        info!(
            "Calibration of {} done: search RMSE {:.5}, validation RMSE {:.5}, R² {:.3}",
            result.model, result.search_error, result.final_error, result.r_squared
        );
        if let Some(error) = result.holdout_error {
            info!("Held-out RMSE {:.5} over {} scenarios", error, result.holdout_points.len());
        }
        Ok(result)
    }
}

/// Residual scale that counts as noise when every target is the same.
///
/// The search scores turnout on `low` agents and validation on `high`
/// agents, so a search optimum is only resolved to within the standard error
/// of the gap between the two estimates.
fn fit_tolerance(points: &[CalibrationPoint], low: usize, high: usize) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let turnout = points.iter().map(|p| p.actual).sum::<f64>() / points.len() as f64;
    let low_se = turnout_standard_error(turnout, low);
    let high_se = turnout_standard_error(turnout, high);
    R2_NOISE_SES * low_se.hypot(high_se)
}

/// Runs a full calibration without cancellation.
pub fn calibrate(
    config: CalibrationConfig,
    targets: Vec<FullSimulationConfig>,
) -> Result<TuningResult, CalibrationError> {
    CalibrationSession::new(config, targets)?.run(&CancelToken::new())
}
