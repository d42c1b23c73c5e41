//! Dual-system (heuristic vs. rational) model.
//!
//! System 1 reacts to habit, social cues and affect; System 2 weighs benefit,
//! cost and duty. An arbiter weight `λ ∈ [0, 1]` mixes them:
//! `p = λ·p_s1 + (1 − λ)·p_s2`.

use super::{logistic, sanitize_probability, DecisionModel, ModelKind};
use crate::agent::{Agent, ScenarioContext};
use crate::nudge::{self, Nudge};
use crate::physics::ModelPhysicsParams;
use serde::{Deserialize, Serialize};

/// Weight of the habit × social synergy in System 1.
pub const SYNERGY_WEIGHT: f64 = 0.5;

/// Intermediate estimates of one dual-system evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualSystemTerms {
    /// Heuristic activation
    pub activation: f64,
    /// System 1 probability `logistic(activation − 0.5)`
    pub p_s1: f64,
    /// Rational utility
    pub utility: f64,
    /// System 2 probability `logistic(utility)`
    pub p_s2: f64,
    /// Arbiter weight on System 1
    pub lambda: f64,
}

impl DualSystemTerms {
    pub fn compute(
        agent: &Agent,
        scenario: &ScenarioContext,
        physics: &ModelPhysicsParams,
        nudge: &Nudge,
    ) -> Self {
        let w = &physics.dual_system;

        let mut competitiveness = scenario.competitiveness;
        let mut cost = scenario.voting_cost;
        let mut duty = agent.civic_duty;
        let mut social = agent.social_sensitivity;
        let mut affect = 0.6 * agent.candidate_match + 0.4 * agent.overconfidence;
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
                affect *= 1.0 + strength;
                duty *= 1.0 + strength;
            }
            Nudge::Disclosure { threat_level, credibility } => {
                social += nudge::disclosure_pressure(threat_level, credibility, agent.social_sensitivity);
            }
            Nudge::Implementation { cost_reduction, .. } => {
                cost *= nudge::cost_factor(cost_reduction);
            }
            Nudge::Competitiveness { info_boost } => {
                competitiveness = nudge::boosted_competitiveness(competitiveness, info_boost);
            }
        }

        let activation = w.momentum
            + w.h_habit * agent.habit_strength
            + w.h_social * social
            + w.h_affect * affect
            + SYNERGY_WEIGHT * agent.habit_strength * social;

        let benefit = competitiveness * agent.issue_salience * agent.partisan_strength;
        let utility = w.u_pb * benefit + w.u_cost * cost + w.u_duty * duty + bonus;

        let lambda = w.lambda_base + w.lambda_edu * agent.education + w.lambda_risk * agent.risk_aversion;

        Self {
            activation,
            p_s1: logistic(activation - 0.5),
            utility,
            p_s2: logistic(utility),
            lambda: if lambda.is_nan() { 0.0 } else { lambda.clamp(0.0, 1.0) },
        }
    }

    /// Arbiter-weighted probability.
    pub fn combined(&self) -> f64 {
        sanitize_probability(self.lambda * self.p_s1 + (1.0 - self.lambda) * self.p_s2)
    }
}

/// Heuristic/rational mixture model.
#[derive(Debug, Clone, Copy, Default)]
pub struct DualSystemModel;

impl DecisionModel for DualSystemModel {
    fn kind(&self) -> ModelKind {
        ModelKind::DualSystem
    }

    fn probability(
        &self,
        agent: &Agent,
        scenario: &ScenarioContext,
        physics: &ModelPhysicsParams,
        nudge: &Nudge,
    ) -> f64 {
        DualSystemTerms::compute(agent, scenario, physics, nudge).combined()
    }
}
