//! Rational-choice utility model.
//!
//! ```text
//! B  = issue_salience × partisan_strength × candidate_match
//! p  = competitiveness × (1 + 0.2 × overconfidence)
//! C  = voting_cost × (1 − 0.4 × education) × (1 + 0.3 × risk_aversion)
//! U  = β_pB·pB + β_C·C + β_D·duty + β_S·social + β_H·habit
//! P  = logistic(U / max(noise, 0.01))
//! ```

use super::{logistic, sanitize_probability, DecisionModel, ModelKind};
use crate::agent::{Agent, ScenarioContext};
use crate::nudge::{self, Nudge};
use crate::physics::ModelPhysicsParams;

/// Floor for the logistic temperature.
pub const MIN_NOISE: f64 = 0.01;

/// Intermediate terms of one utility evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilityTerms {
    /// Pivotal benefit `p × B`
    pub pivotal_benefit: f64,
    pub cost: f64,
    pub duty: f64,
    pub social: f64,
    pub habit: f64,
    /// Additive nudge term (lottery)
    pub bonus: f64,
}

impl UtilityTerms {
    /// Builds the nudged terms for one agent.
    pub fn compute(agent: &Agent, scenario: &ScenarioContext, nudge: &Nudge) -> Self {
        let mut competitiveness = scenario.competitiveness;
        let mut cost_scale = 1.0;
        let mut duty = agent.civic_duty;
        let mut social = agent.social_sensitivity;
        let mut bonus = 0.0;

        match *nudge {
            Nudge::None => {}
            Nudge::Monetary { lottery_prob, lottery_value } => {
                bonus += nudge::monetary_bonus(lottery_prob, lottery_value, agent.civic_duty);
            }
            Nudge::SocialNorm { revealed_turnout, strength } => {
                social += nudge::social_norm_shift(revealed_turnout, strength);
            }
            Nudge::IdentityFrame { strength } => {
                duty *= 1.0 + strength;
            }
            Nudge::Disclosure { threat_level, credibility } => {
                social += nudge::disclosure_pressure(threat_level, credibility, agent.social_sensitivity);
            }
            Nudge::Implementation { cost_reduction, .. } => {
                cost_scale = nudge::cost_factor(cost_reduction);
            }
            Nudge::Competitiveness { info_boost } => {
                competitiveness = nudge::boosted_competitiveness(competitiveness, info_boost);
            }
        }

        let pivotal = competitiveness * (1.0 + 0.2 * agent.overconfidence);
        let cost = scenario.voting_cost
            * (1.0 - 0.4 * agent.education)
            * (1.0 + 0.3 * agent.risk_aversion)
            * cost_scale;

        Self {
            pivotal_benefit: pivotal * agent.instrumental_benefit(),
            cost,
            duty,
            social,
            habit: agent.habit_strength,
            bonus,
        }
    }

    /// Weighted utility `U`.
    pub fn utility(&self, physics: &ModelPhysicsParams) -> f64 {
        let w = &physics.utility;
        w.beta_pb * self.pivotal_benefit
            + w.beta_c * self.cost
            + w.beta_d * self.duty
            + w.beta_s * self.social
            + w.beta_h * self.habit
            + self.bonus
    }
}

/// Logistic utility model.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtilityModel;

impl DecisionModel for UtilityModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Utility
    }

    fn probability(
        &self,
        agent: &Agent,
        scenario: &ScenarioContext,
        physics: &ModelPhysicsParams,
        nudge: &Nudge,
    ) -> f64 {
        let u = UtilityTerms::compute(agent, scenario, nudge).utility(physics);
        let temperature = physics.utility.noise.max(MIN_NOISE);
        sanitize_probability(logistic(u / temperature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::UtilityParams;
    use approx::assert_relative_eq;

    fn pure_benefit_agent() -> Agent {
        Agent {
            education: 0.0,
            civic_duty: 0.0,
            habit_strength: 0.0,
            social_sensitivity: 0.0,
            risk_aversion: 0.0,
            partisan_strength: 1.0,
            overconfidence: 0.0,
            candidate_match: 1.0,
            issue_salience: 1.0,
            ..Agent::neutral(0)
        }
    }

    fn unit_physics() -> ModelPhysicsParams {
        ModelPhysicsParams {
            utility: UtilityParams { beta_pb: 1.0, beta_c: -1.0, beta_d: 1.0, beta_s: 1.0, beta_h: 1.0, noise: 1.0 },
            ..Default::default()
        }
    }

    #[test]
    fn test_unit_pivotal_benefit_gives_logistic_one() {
        // pB = 1, C = D = S = H = 0, noise = 1 → U = 1
        let scenario = ScenarioContext::new("pivotal", 0.5, 1.0, 0.0);
        let p = UtilityModel.probability(&pure_benefit_agent(), &scenario, &unit_physics(), &Nudge::None);

        assert_relative_eq!(p, 0.7310585786300049, epsilon = 1e-12);
        assert_relative_eq!(p, 0.731, epsilon = 1e-3);
    }

    #[test]
    fn test_noise_floor_avoids_division_by_zero() {
        let scenario = ScenarioContext::new("pivotal", 0.5, 1.0, 0.0);
        let mut physics = unit_physics();
        physics.utility.noise = 0.0;

        let p = UtilityModel.probability(&pure_benefit_agent(), &scenario, &physics, &Nudge::None);
        assert!(p.is_finite());
        assert!(p > 0.999);
    }

    #[test]
    fn test_cost_lowers_probability() {
        let agent = Agent::neutral(0);
        let cheap = ScenarioContext::new("cheap", 0.5, 0.5, 0.0);
        let costly = ScenarioContext::new("costly", 0.5, 0.5, 1.0);
        let physics = ModelPhysicsParams::default();

        let p_cheap = UtilityModel.probability(&agent, &cheap, &physics, &Nudge::None);
        let p_costly = UtilityModel.probability(&agent, &costly, &physics, &Nudge::None);
        assert!(p_costly < p_cheap);
    }

    #[test]
    fn test_monetary_bonus_is_additive() {
        let agent = Agent::neutral(0);
        let scenario = ScenarioContext::default();
        let nudge = Nudge::Monetary { lottery_prob: 0.1, lottery_value: 3.0 };

        let base = UtilityTerms::compute(&agent, &scenario, &Nudge::None);
        let nudged = UtilityTerms::compute(&agent, &scenario, &nudge);
        let physics = ModelPhysicsParams::default();

        // 0.1 × 3 / (1 + 0.5)
        assert_relative_eq!(nudged.utility(&physics) - base.utility(&physics), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_implementation_scales_cost() {
        let agent = Agent::neutral(0);
        let scenario = ScenarioContext::default();
        let base = UtilityTerms::compute(&agent, &scenario, &Nudge::None);
        let planned = UtilityTerms::compute(
            &agent,
            &scenario,
            &Nudge::Implementation { cost_reduction: 0.5, habit_boost: 0.0 },
        );
        assert_relative_eq!(planned.cost, base.cost * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_competitiveness_info_caps_at_one() {
        let agent = pure_benefit_agent();
        let scenario = ScenarioContext::new("close", 0.5, 0.9, 0.0);
        let terms = UtilityTerms::compute(&agent, &scenario, &Nudge::Competitiveness { info_boost: 1.0 });
        assert_relative_eq!(terms.pivotal_benefit, 1.0, epsilon = 1e-12);
    }
}
