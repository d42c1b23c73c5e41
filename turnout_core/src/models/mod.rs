//! Decision model family.
//!
//! Three interchangeable strategies map one agent, scenario, parameter set
//! and nudge to a vote probability:
//!
//! - [`UtilityModel`]: rational-choice utility through a logistic link
//! - [`DriftDiffusionModel`]: first-passage probability of a biased Wiener process
//! - [`DualSystemModel`]: heuristic and rational estimates mixed by an arbiter
//!
//! All three are total over their clamped domains and always return a
//! probability in [0, 1].

mod ddm;
mod dual_system;
mod utility;

pub use ddm::{first_passage_probability, DdmTerms, DriftDiffusionModel, PathOutcome};
pub use dual_system::{DualSystemModel, DualSystemTerms};
pub use utility::{UtilityModel, UtilityTerms};

use crate::agent::{Agent, ScenarioContext};
use crate::nudge::Nudge;
use crate::physics::ModelPhysicsParams;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Identifies one of the decision models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Utility,
    DriftDiffusion,
    DualSystem,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Utility, ModelKind::DriftDiffusion, ModelKind::DualSystem];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Utility => "utility",
            ModelKind::DriftDiffusion => "ddm",
            ModelKind::DualSystem => "dual_system",
        }
    }

    /// Index used to pick an independent decision stream.
    pub fn index(&self) -> u64 {
        match self {
            ModelKind::Utility => 0,
            ModelKind::DriftDiffusion => 1,
            ModelKind::DualSystem => 2,
        }
    }

    /// Returns the model implementation.
    pub fn model(&self) -> &'static dyn DecisionModel {
        match self {
            ModelKind::Utility => &UtilityModel,
            ModelKind::DriftDiffusion => &DriftDiffusionModel,
            ModelKind::DualSystem => &DualSystemModel,
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "utility" | "rational" => Ok(ModelKind::Utility),
            "ddm" | "drift_diffusion" | "driftdiffusion" => Ok(ModelKind::DriftDiffusion),
            "dual_system" | "dualsystem" | "dual" => Ok(ModelKind::DualSystem),
            _ => Err(format!("Unknown model: {}", s)),
        }
    }
}

/// Per-agent outcome of one decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub agent_id: u32,
    /// Vote probability in [0, 1]
    pub probability: f64,
    /// Bernoulli realization of `probability`
    pub voted: bool,
}

/// Strategy interface shared by the decision models.
pub trait DecisionModel: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Returns the vote probability in [0, 1].
    fn probability(
        &self,
        agent: &Agent,
        scenario: &ScenarioContext,
        physics: &ModelPhysicsParams,
        nudge: &Nudge,
    ) -> f64;

    /// Computes the probability and draws the realized vote from it.
    fn decide(
        &self,
        agent: &Agent,
        scenario: &ScenarioContext,
        physics: &ModelPhysicsParams,
        nudge: &Nudge,
        rng: &mut dyn rand::RngCore,
    ) -> Decision {
        let probability = sanitize_probability(self.probability(agent, scenario, physics, nudge));
        let voted = rng.gen::<f64>() < probability;
        Decision { agent_id: agent.id, probability, voted }
    }
}

/// Standard logistic function.
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Clamps to [0, 1] and maps NaN to 0.
pub fn sanitize_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_logistic_midpoint_and_symmetry() {
        assert_eq!(logistic(0.0), 0.5);
        assert!((logistic(2.0) + logistic(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sanitize_probability() {
        assert_eq!(sanitize_probability(f64::NAN), 0.0);
        assert_eq!(sanitize_probability(1.5), 1.0);
        assert_eq!(sanitize_probability(-0.2), 0.0);
    }

    #[test]
    fn test_model_kind_parse() {
        for kind in ModelKind::ALL {
            assert_eq!(kind.name().parse::<ModelKind>().unwrap(), kind);
            assert_eq!(kind.model().kind(), kind);
        }
    }

    #[test]
    fn test_decide_realizes_extremes() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut agent = Agent::neutral(3);
        agent.civic_duty = 1.0;
        let scenario = ScenarioContext::default();
        let mut physics = ModelPhysicsParams::default();
        physics.utility.beta_d = 5.0;
        physics.utility.beta_c = 0.0;
        physics.utility.noise = 0.05;

        let decision = UtilityModel.decide(&agent, &scenario, &physics, &Nudge::None, &mut rng);
        assert_eq!(decision.agent_id, 3);
        assert!(decision.probability > 0.999);
        assert!(decision.voted);
    }
}
