//! Calibration objective and parameter space.
//!
//! The objective is the RMSE between each scenario's observed turnout and
//! the selected model's realized turnout. Populations are generated once per
//! scenario and decision streams are reopened on every evaluation, so the
//! same parameters always score the same energy.

use nalgebra::DVector;
use rand::Rng;
use turnout_core::stats::{rmse, CalibrationPoint};
use turnout_core::{
    Agent, FullSimulationConfig, ModelKind, ModelPhysicsParams, Nudge, ParamKey, ScenarioContext,
    Simulator,
};
use turnout_env::{SimContext, StreamId};

use crate::error::CalibrationError;

/// Fixed-population RMSE objective for one model.
pub struct Objective {
    model: ModelKind,
    scenarios: Vec<ScenarioContext>,
    populations: Vec<Vec<Agent>>,
    contexts: Vec<SimContext>,
}

impl Objective {
    /// Generates one population of `population_size` agents per target.
    ///
    /// Scenario `i` draws from `ctx.child(i)`, so two objectives built from
    /// the same context and size are identical.
    pub fn new(
        model: ModelKind,
        targets: &[FullSimulationConfig],
        population_size: usize,
        ctx: &SimContext,
    ) -> Result<Self, CalibrationError> {
        if targets.is_empty() {
            return Err(CalibrationError::NoScenarios);
        }

        let mut scenarios = Vec::with_capacity(targets.len());
        let mut populations = Vec::with_capacity(targets.len());
        let mut contexts = Vec::with_capacity(targets.len());

        for (i, target) in targets.iter().enumerate() {
            let child = ctx.child(i as u64);
            populations.push(Simulator::population(target, population_size, &child)?);
            scenarios.push(target.scenario.clone());
            contexts.push(child);
        }

        Ok(Self { model, scenarios, populations, contexts })
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn scenarios(&self) -> &[ScenarioContext] {
        &self.scenarios
    }

    /// Population size per scenario.
    pub fn population_size(&self) -> usize {
        self.populations.first().map_or(0, Vec::len)
    }

    /// Realized turnout of the model in every scenario.
    pub fn predictions(&self, physics: &ModelPhysicsParams) -> Vec<CalibrationPoint> {
        self.scenarios
            .iter()
            .zip(&self.populations)
            .zip(&self.contexts)
            .map(|((scenario, agents), ctx)| {
                let mut rng = ctx.stream(StreamId::Decisions(self.model.index()));
                let predicted =
                    Simulator::turnout(agents, scenario, physics, self.model, &Nudge::None, &mut rng);
                CalibrationPoint {
                    scenario: scenario.name.clone(),
                    actual: scenario.target_turnout,
                    predicted,
                }
            })
            .collect()
    }

    /// RMSE over every scenario.
    pub fn energy(&self, physics: &ModelPhysicsParams) -> f64 {
        rmse(&self.predictions(physics))
    }
}

/// The searchable fields of one model as a flat vector.
#[derive(Debug, Clone)]
pub struct ParamSpace {
    keys: Vec<ParamKey>,
    lower: DVector<f64>,
    upper: DVector<f64>,
    scale: DVector<f64>,
}

impl ParamSpace {
    pub fn for_model(model: ModelKind) -> Self {
        let keys = ParamKey::for_model(model);
        let lower = DVector::from_iterator(keys.len(), keys.iter().map(|k| k.bounds().0));
        let upper = DVector::from_iterator(keys.len(), keys.iter().map(|k| k.bounds().1));
        let scale = DVector::from_iterator(keys.len(), keys.iter().map(|k| k.range_scale()));
        Self { keys, lower, upper, scale }
    }

    pub fn keys(&self) -> &[ParamKey] {
        &self.keys
    }

    pub fn dim(&self) -> usize {
        self.keys.len()
    }

    /// Reads the searched fields out of a parameter set.
    pub fn encode(&self, physics: &ModelPhysicsParams) -> DVector<f64> {
        DVector::from_iterator(self.dim(), self.keys.iter().map(|k| k.get(physics)))
    }

    /// Writes a vector back over `base`; fields of other models are untouched.
    pub fn decode(&self, base: &ModelPhysicsParams, x: &DVector<f64>) -> ModelPhysicsParams {
        let mut physics = *base;
        for (key, value) in self.keys.iter().zip(x.iter()) {
            key.set(&mut physics, *value);
        }
        physics
    }

    /// Componentwise clamp to the admissible box.
    pub fn clamp(&self, x: &DVector<f64>) -> DVector<f64> {
        x.zip_zip_map(&self.lower, &self.upper, |v, lo, hi| v.clamp(lo, hi))
    }

    /// Uniform draw inside the box.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        DVector::from_iterator(
            self.dim(),
            self.lower
                .iter()
                .zip(self.upper.iter())
                .map(|(lo, hi)| lo + rng.gen::<f64>() * (hi - lo)),
        )
    }

    /// Annealing move: `x + (u − 0.5)·2·scale·T`, then clamped.
    pub fn perturb<R: Rng + ?Sized>(&self, x: &DVector<f64>, temperature: f64, rng: &mut R) -> DVector<f64> {
        let step = DVector::from_iterator(
            self.dim(),
            self.scale.iter().map(|s| (rng.gen::<f64>() - 0.5) * 2.0 * s * temperature),
        );
        self.clamp(&(x + step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn targets() -> Vec<FullSimulationConfig> {
        vec![
            FullSimulationConfig {
                scenario: ScenarioContext::new("a", 0.55, 0.4, 0.3),
                ..Default::default()
            },
            FullSimulationConfig {
                scenario: ScenarioContext::new("b", 0.7, 0.8, 0.2),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_energy_is_repeatable() {
        let objective = Objective::new(ModelKind::Utility, &targets(), 300, &SimContext::new(5)).unwrap();
        let physics = ModelPhysicsParams::default();
        assert_eq!(objective.energy(&physics), objective.energy(&physics));
        assert_eq!(objective.predictions(&physics).len(), 2);
    }

    #[test]
    fn test_same_context_same_objective() {
        let ctx = SimContext::new(8);
        let a = Objective::new(ModelKind::DualSystem, &targets(), 200, &ctx).unwrap();
        let b = Objective::new(ModelKind::DualSystem, &targets(), 200, &ctx).unwrap();
        let physics = ModelPhysicsParams::default();
        assert_eq!(a.predictions(&physics), b.predictions(&physics));
    }

    #[test]
    fn test_no_targets_rejected() {
        let err = Objective::new(ModelKind::Utility, &[], 100, &SimContext::new(1)).err();
        assert_eq!(err, Some(CalibrationError::NoScenarios));
    }

    #[test]
    fn test_decode_leaves_other_models_alone() {
        let space = ParamSpace::for_model(ModelKind::DriftDiffusion);
        let base = ModelPhysicsParams::default();
        let x = DVector::from_element(space.dim(), 0.25);
        let decoded = space.decode(&base, &x);

        assert_eq!(decoded.utility, base.utility);
        assert_eq!(decoded.dual_system, base.dual_system);
        assert_eq!(decoded.ddm.threshold, 0.25);
    }

    #[test]
    fn test_perturb_stays_in_bounds() {
        let space = ParamSpace::for_model(ModelKind::Utility);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut x = space.encode(&ModelPhysicsParams::default());

        for _ in 0..500 {
            x = space.perturb(&x, 50.0, &mut rng);
            for (key, v) in space.keys().iter().zip(x.iter()) {
                let (lo, hi) = key.bounds();
                assert!(*v >= lo && *v <= hi, "{} = {}", key, v);
            }
        }
    }
}
