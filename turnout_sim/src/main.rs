//! Turnout Simulator CLI
//!
//! Simulate scenarios, run randomized nudge experiments, calibrate model
//! parameters against observed turnout and rank nudges across the built-in
//! scenario catalog.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use turnout_core::experiment::{run_treatment_experiment, stratified_effects, Stratum};
use turnout_core::{FullSimulationConfig, ModelKind, NudgeKind, PathSettings, SimulationSettings, Simulator};
use turnout_env::{CancelToken, SimContext};
use turnout_sim::{
    CalibrationConfig, CalibrationSession, DeepAnalysisConfig, DeepAnalysisSweep, ScenarioId,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "turnout-sim")]
#[command(about = "Simulate, calibrate and analyze voter turnout models", long_about = None)]
struct Cli {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42", global = true)]
    seed: u64,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON output for scripting
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one scenario through every model
    Simulate {
        /// Scenario from the built-in catalog
        #[arg(short = 'S', long, default_value = "urban_metro")]
        scenario: ScenarioId,

        #[command(flatten)]
        model: ModelArgs,

        /// Nudge to apply with its default payload
        #[arg(short, long, default_value = "none")]
        nudge: NudgeKind,

        /// Number of agents
        #[arg(short, long, default_value = "1000")]
        population: usize,

        /// Also walk each agent's diffusion this many times (DDM Monte Carlo)
        #[arg(long)]
        paths: Option<usize>,
    },

    /// Randomized control/treatment split of one population
    Experiment {
        /// Scenario from the built-in catalog
        #[arg(short = 'S', long, default_value = "urban_metro")]
        scenario: ScenarioId,

        #[command(flatten)]
        model: ModelArgs,

        /// Nudge given to the treated arm, with its default payload
        #[arg(short, long, default_value = "social_norm")]
        nudge: NudgeKind,

        /// Number of agents
        #[arg(short, long, default_value = "2000")]
        population: usize,

        /// Share of agents assigned to treatment
        #[arg(long, default_value = "0.5")]
        treatment_fraction: f64,

        /// Repeat the experiment within civic-duty terciles
        #[arg(long)]
        stratified: bool,
    },

    /// Fit one model's parameters to the scenario catalog
    Calibrate {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        scenarios: ScenarioArgs,

        /// Number of annealing chains
        #[arg(long, default_value = "4")]
        chains: usize,

        /// Iterations per chain
        #[arg(long, default_value = "200")]
        iterations: usize,

        /// Geometric cooling factor
        #[arg(long, default_value = "0.97")]
        cooling: f64,

        /// Agents per scenario during the search
        #[arg(long, default_value = "500")]
        low: usize,

        /// Agents per scenario for validation
        #[arg(long, default_value = "5000")]
        high: usize,

        /// Scenario held out of the search and scored afterwards (repeatable)
        #[arg(long = "holdout")]
        holdout: Vec<ScenarioId>,
    },

    /// Rank every nudge across the scenario catalog
    Analyze {
        #[command(flatten)]
        model: ModelArgs,

        #[command(flatten)]
        scenarios: ScenarioArgs,

        /// Agents per scenario
        #[arg(short, long, default_value = "2000")]
        population: usize,
    },
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Decision model (utility, ddm, dual_system)
    #[arg(short, long, default_value = "utility")]
    model: ModelKind,
}

#[derive(Args, Debug)]
struct ScenarioArgs {
    /// Scenario to include (repeatable, default: all)
    #[arg(short = 'S', long = "scenario")]
    scenarios: Vec<ScenarioId>,
}

impl ScenarioArgs {
    fn configs(&self) -> Vec<FullSimulationConfig> {
        self.configs_excluding(&[])
    }

    fn configs_excluding(&self, excluded: &[ScenarioId]) -> Vec<FullSimulationConfig> {
        let ids = if self.scenarios.is_empty() { ScenarioId::all() } else { self.scenarios.clone() };
        ids.iter().filter(|id| !excluded.contains(id)).map(|id| id.config()).collect()
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            error!("Failed to encode JSON: {}", e);
            std::process::exit(1);
        }
    }
}

fn simulate(
    seed: u64,
    json: bool,
    scenario: ScenarioId,
    model: ModelKind,
    nudge: NudgeKind,
    population: usize,
    paths: Option<usize>,
) -> Result<()> {
    let settings = SimulationSettings::new(model)
        .with_nudge(nudge.with_defaults())
        .with_population(population);
    let ctx = SimContext::new(seed);
    let result = Simulator::run(&scenario.config(), &settings, &ctx)?;

    let monte_carlo = match paths {
        Some(repetitions) => {
            let paths = PathSettings::default().with_repetitions(repetitions);
            Some(Simulator::simulate_paths(&scenario.config(), &settings.nudge, population, &paths, &ctx)?)
        }
        None => None,
    };

    if json {
        let summary = serde_json::json!({
            "scenario": result.scenario,
            "seed": seed,
            "model": result.model,
            "nudge": result.nudge,
            "population_size": result.population_size,
            "turnout": result.turnout,
            "mean_probability": result.mean_probability,
            "probability_std": result.probability_std,
            "baseline_turnout": result.baseline_turnout,
            "lift": result.lift,
            "comparison": result.comparison,
            "histogram": result.histogram,
            "population": result.population,
            "monte_carlo": monte_carlo,
        });
        print_json(&summary);
        return Ok(());
    }

    info!("Scenario {} ({}), seed={}", scenario.name(), scenario.description(), seed);
    info!("Target turnout {:.1}%", scenario.context().target_turnout * 100.0);
    for row in &result.comparison {
        let marker = if row.model == model { "▶" } else { " " };
        info!(
            "{} {:<12} turnout {:>5.1}%  mean p {:.3}",
            marker,
            row.model.name(),
            row.turnout * 100.0,
            row.mean_probability
        );
    }
    if let (Some(baseline), Some(lift)) = (result.baseline_turnout, result.lift) {
        info!("Nudge {}: baseline {:.1}% → lift {:+.2}pp", nudge, baseline * 100.0, lift * 100.0);
    }
    if let Some(mc) = monte_carlo {
        info!(
            "DDM Monte Carlo ({} paths/agent): turnout {:.1}% vs closed form {:.1}%, mean decision time {:.2}, {:.1}% timed out",
            mc.repetitions,
            mc.turnout * 100.0,
            mc.analytic_turnout * 100.0,
            mc.mean_decision_time,
            mc.timeout_share * 100.0
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn experiment(
    seed: u64,
    json: bool,
    scenario: ScenarioId,
    model: ModelKind,
    nudge: NudgeKind,
    population: usize,
    treatment_fraction: f64,
    stratified: bool,
) -> Result<()> {
    let config = scenario.config();
    let nudge = nudge.with_defaults();
    let ctx = SimContext::new(seed);
    if !nudge.is_active() {
        warn!("Treated arm gets no nudge; any effect is sampling noise");
    }

    let overall = run_treatment_experiment(&config, model, &nudge, population, treatment_fraction, &ctx)?;
    let strata = if stratified {
        stratified_effects(&config, model, &nudge, population, &Stratum::civic_duty_terciles(), &ctx)?
    } else {
        Vec::new()
    };

    if json {
        let summary = serde_json::json!({
            "scenario": scenario.name(),
            "seed": seed,
            "model": model,
            "overall": overall,
            "strata": strata,
        });
        print_json(&summary);
        return Ok(());
    }

    info!("Experiment: {} on {} with {}", nudge.name(), scenario.name(), model);
    info!(
        "  control {:>5.1}% (n={})  treated {:>5.1}% (n={})  effect {:+.2}pp ({:+.1}%)",
        overall.control_turnout * 100.0,
        overall.control_size,
        overall.treatment_turnout * 100.0,
        overall.treatment_size,
        overall.average_effect * 100.0,
        overall.relative_effect * 100.0
    );
    for entry in &strata {
        info!(
            "  {:<8} civic duty: effect {:+.2}pp over {} agents",
            entry.stratum.label,
            entry.effect.average_effect * 100.0,
            entry.effect.control_size + entry.effect.treatment_size
        );
    }
    Ok(())
}

fn calibrate(
    seed: u64,
    json: bool,
    config: CalibrationConfig,
    targets: Vec<FullSimulationConfig>,
    holdout: Vec<FullSimulationConfig>,
) -> Result<()> {
    let session = CalibrationSession::new(config.with_seed(seed), targets)?.with_holdout(holdout)?;
    let result = session.run(&CancelToken::new())?;

    if json {
        print_json(&result);
        return Ok(());
    }

    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "{}: RMSE {:.4} (search {:.4}), MAE {:.4}, R² {:.3}, {} evaluations",
        result.model, result.final_error, result.search_error, result.mae, result.r_squared, result.evaluations
    );
    for point in &result.calibration_points {
        info!(
            "  {:<18} actual {:>5.1}%  predicted {:>5.1}%",
            point.scenario,
            point.actual * 100.0,
            point.predicted * 100.0
        );
    }
    if let Some(holdout_error) = result.holdout_error {
        info!("Held-out RMSE {:.4}", holdout_error);
        for point in &result.holdout_points {
            info!(
                "  {:<18} actual {:>5.1}%  predicted {:>5.1}%",
                point.scenario,
                point.actual * 100.0,
                point.predicted * 100.0
            );
        }
    }
    info!("Most sensitive parameters:");
    for entry in result.sensitivity.iter().take(5) {
        info!("  {:<26} {:.4}", entry.name, entry.score);
    }
    Ok(())
}

fn analyze(seed: u64, json: bool, config: DeepAnalysisConfig, targets: Vec<FullSimulationConfig>) -> Result<()> {
    let sweep = DeepAnalysisSweep::new(config.with_seed(seed), targets)?;
    let result = sweep.run(&CancelToken::new())?;

    if json {
        print_json(&result);
        return Ok(());
    }

    info!("Nudge ranking for {} ({} agents per scenario):", result.model, result.population_size);
    for (rank, perf) in result.ranking.iter().enumerate() {
        info!(
            "  {}. {:<16} mean lift {:+.2}pp  sd {:.2}pp  best in {}",
            rank + 1,
            perf.nudge.name(),
            perf.mean_lift * 100.0,
            perf.lift_variance.sqrt() * 100.0,
            perf.best_scenario
        );
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let seed = if cli.seed == 0 { SimContext::from_clock().seed() } else { cli.seed };

    if !cli.json {
        info!("Turnout Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("Seed: {}", seed);
    }

    let outcome = match cli.command {
        Command::Simulate { scenario, model, nudge, population, paths } => {
            simulate(seed, cli.json, scenario, model.model, nudge, population, paths)
        }
        Command::Experiment { scenario, model, nudge, population, treatment_fraction, stratified } => {
            experiment(seed, cli.json, scenario, model.model, nudge, population, treatment_fraction, stratified)
        }
        Command::Calibrate { model, scenarios, chains, iterations, cooling, low, high, holdout } => {
            let config = CalibrationConfig::new(model.model)
                .with_chains(chains)
                .with_iterations(iterations)
                .with_cooling_rate(cooling)
                .with_fidelity(low, high);
            let holdout_configs = holdout.iter().map(|id| id.config()).collect();
            calibrate(seed, cli.json, config, scenarios.configs_excluding(&holdout), holdout_configs)
        }
        Command::Analyze { model, scenarios, population } => {
            let config = DeepAnalysisConfig::new(model.model).with_population(population);
            analyze(seed, cli.json, config, scenarios.configs())
        }
    };

    if let Err(e) = outcome {
        error!("✗ {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experiment_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "turnout-sim", "experiment", "-S", "swing", "-m", "ddm", "-n", "monetary",
            "--treatment-fraction", "0.3", "--stratified",
        ])
        .unwrap();

        match cli.command {
            Command::Experiment { scenario, model, nudge, population, treatment_fraction, stratified } => {
                assert_eq!(scenario, ScenarioId::SwingSeat);
                assert_eq!(model.model, ModelKind::DriftDiffusion);
                assert_eq!(nudge, NudgeKind::Monetary);
                assert_eq!(population, 2000);
                assert_eq!(treatment_fraction, 0.3);
                assert!(stratified);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_holdout_scenarios_leave_the_search_set() {
        let cli = Cli::try_parse_from(["turnout-sim", "calibrate", "--holdout", "midterm", "--holdout", "safe"]).unwrap();
        let Command::Calibrate { scenarios, holdout, .. } = cli.command else {
            panic!("expected calibrate");
        };
        let training = scenarios.configs_excluding(&holdout);
        assert_eq!(training.len(), ScenarioId::all().len() - 2);
        assert!(training.iter().all(|c| c.scenario.name != "midterm" && c.scenario.name != "safe_seat"));
    }
}
