use proptest::prelude::*;
use turnout_core::{FullSimulationConfig, ModelKind, ModelPhysicsParams, ScenarioContext};
use turnout_env::{CancelToken, SimContext};
use turnout_sim::{calibrate, CalibrationConfig, CalibrationSession, Objective, ScenarioId, StepStatus};

const SEED: u64 = 2024;
const POPULATION: usize = 400;

/// Targets whose observed turnout is exactly what default parameters produce.
fn targets_matching_defaults(model: ModelKind) -> Vec<FullSimulationConfig> {
    let base: Vec<FullSimulationConfig> = [ScenarioId::UrbanMetro, ScenarioId::SwingSeat, ScenarioId::Midterm]
        .iter()
        .map(|id| id.config())
        .collect();

    let objective = Objective::new(model, &base, POPULATION, &SimContext::new(SEED)).unwrap();
    let points = objective.predictions(&ModelPhysicsParams::default());

    base.into_iter()
        .zip(points)
        .map(|(mut config, point)| {
            config.scenario.target_turnout = point.predicted;
            config
        })
        .collect()
}

#[test]
fn recovers_defaults_when_they_fit_exactly() {
    for model in ModelKind::ALL {
        let config = CalibrationConfig::new(model)
            .with_chains(3)
            .with_iterations(20)
            .with_fidelity(POPULATION, POPULATION)
            .with_seed(SEED);

        let result = calibrate(config, targets_matching_defaults(model)).unwrap();

        assert_eq!(result.search_error, 0.0, "{}", model);
        assert_eq!(result.final_error, 0.0, "{}", model);
        assert_eq!(result.mae, 0.0, "{}", model);
        assert_eq!(result.r_squared, 1.0, "{}", model);
        assert_eq!(result.optimized, ModelPhysicsParams::default(), "{}", model);
    }
}

#[test]
fn single_constant_target_scores_r_squared_one_on_exact_fit() {
    let model = ModelKind::Utility;
    let mut targets = targets_matching_defaults(model);
    targets.truncate(1);

    let config = CalibrationConfig::new(model)
        .with_chains(1)
        .with_iterations(5)
        .with_fidelity(POPULATION, POPULATION)
        .with_seed(SEED);
    let result = calibrate(config, targets).unwrap();

    assert_eq!(result.final_error, 0.0);
    assert_eq!(result.r_squared, 1.0);
}

#[test]
fn default_fidelity_fit_of_a_single_scenario_scores_high_r_squared() {
    let model = ModelKind::Utility;
    let config = CalibrationConfig::new(model).with_chains(2).with_iterations(30).with_seed(SEED);

    // Observed turnout is what the defaults produce on the validation population
    let mut target = ScenarioId::SwingSeat.config();
    let validation =
        Objective::new(model, &[target.clone()], config.high_fidelity_population, &SimContext::new(SEED)).unwrap();
    target.scenario.target_turnout = validation.predictions(&ModelPhysicsParams::default())[0].predicted;

    let result = calibrate(config, vec![target]).unwrap();

    // Search and validation populations differ, so the fit is exact only up to
    // sampling noise of the 500-agent search
    assert!(result.final_error < 0.05, "final error {}", result.final_error);
    assert!(result.r_squared > 0.5, "R² {} at RMSE {}", result.r_squared, result.final_error);
}

#[test]
fn search_improves_on_a_poor_start() {
    let targets: Vec<FullSimulationConfig> = ScenarioId::all().iter().map(|id| id.config()).collect();
    let mut poor = ModelPhysicsParams::default();
    poor.utility.beta_c = -5.0;
    poor.utility.beta_d = 0.0;

    let config = CalibrationConfig::new(ModelKind::Utility)
        .with_chains(2)
        .with_iterations(40)
        .with_fidelity(200, 400)
        .with_seed(7);
    let session = CalibrationSession::with_initial(config, targets, poor).unwrap();
    let result = session.run(&CancelToken::new()).unwrap();

    let start = result.chains[0].initial_energy;
    assert!(result.search_error <= start);
    assert!(result.final_error.is_finite());
    assert_eq!(result.calibration_points.len(), ScenarioId::all().len());
}

#[test]
fn cancellation_mid_run() {
    let targets = vec![FullSimulationConfig {
        scenario: ScenarioContext::new("only", 0.6, 0.5, 0.3),
        ..Default::default()
    }];
    let config = CalibrationConfig::new(ModelKind::DriftDiffusion)
        .with_chains(2)
        .with_iterations(10)
        .with_fidelity(100, 100);

    let mut session = CalibrationSession::new(config, targets).unwrap();
    for _ in 0..5 {
        assert!(matches!(session.step(), StepStatus::Running { chain: 0, .. }));
    }
    assert!(session.progress() > 0.0 && session.progress() < 1.0);

    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(session.run(&cancel).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn best_series_monotone_for_any_seed(seed in any::<u64>()) {
        let targets = vec![
            FullSimulationConfig { scenario: ScenarioContext::new("a", 0.5, 0.4, 0.4), ..Default::default() },
            FullSimulationConfig { scenario: ScenarioContext::new("b", 0.7, 0.8, 0.2), ..Default::default() },
        ];
        let config = CalibrationConfig::new(ModelKind::DualSystem)
            .with_chains(2)
            .with_iterations(8)
            .with_fidelity(80, 80)
            .with_seed(seed);

        let result = calibrate(config, targets).unwrap();
        for chain in &result.chains {
            for pair in chain.best_series().windows(2) {
                prop_assert!(pair[1] <= pair[0]);
            }
        }
        for pair in result.global_best_history.windows(2) {
            prop_assert!(pair[1] <= pair[0]);
        }
    }
}
