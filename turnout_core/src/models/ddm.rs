//! Drift-diffusion model.
//!
//! The vote decision is a Wiener process with drift `μ` and diffusion `σ'`
//! starting at `z'` between an absorbing "abstain" barrier at 0 and an
//! absorbing "vote" barrier at `a'`. The vote probability is the closed-form
//! probability of hitting `a'` first.
//!
//! ```text
//! a' = a × (1 + 0.4·risk) × (1 − 0.3·education)
//! z' = clamp(a' × (0.5 + 0.2·habit + 0.1·(partisan − 0.5)), ε, a' − ε)
//! σ' = σ × (1 + 0.3·(1 − education))
//! μ  = clamp(base + β_D·duty + β_H·habit + β_S·social
//!            + β_pB·(comp·issue·partisan) + β_OC·overconfidence + β_C·cost, −2, 2)
//! ```

use super::{sanitize_probability, DecisionModel, ModelKind};
use crate::agent::{Agent, ScenarioContext};
use crate::nudge::{self, Nudge};
use crate::physics::ModelPhysicsParams;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Below this |μ| the zero-drift limit `z'/a'` is used.
pub const ZERO_DRIFT_EPS: f64 = 1e-5;

/// Drift is clamped to ±this before exponentiation.
pub const MAX_DRIFT: f64 = 2.0;

/// Minimum distance between the start point and either barrier.
pub const START_EPS: f64 = 1e-3;

/// Floor for threshold and diffusion.
pub const MIN_SCALE: f64 = 0.01;

/// Per-agent DDM quantities after nudges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DdmTerms {
    /// Upper ("vote") barrier `a'`
    pub threshold: f64,
    /// Start point `z'` in (0, a')
    pub start: f64,
    /// Diffusion coefficient `σ'`
    pub sigma: f64,
    /// Clamped drift `μ`
    pub drift: f64,
}

impl DdmTerms {
    pub fn compute(
        agent: &Agent,
        scenario: &ScenarioContext,
        physics: &ModelPhysicsParams,
        nudge: &Nudge,
    ) -> Self {
        let p = &physics.ddm;

        let mut competitiveness = scenario.competitiveness;
        let mut duty = agent.civic_duty;
        let mut social = agent.social_sensitivity;
        let mut bonus = 0.0;
        let mut threshold_scale = 1.0;
        let mut start_boost = 0.0;

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
            Nudge::Implementation { cost_reduction, habit_boost } => {
                threshold_scale = nudge::cost_factor(cost_reduction);
                start_boost = habit_boost;
            }
            Nudge::Competitiveness { info_boost } => {
                competitiveness = nudge::boosted_competitiveness(competitiveness, info_boost);
            }
        }

        let threshold = (p.threshold
            * (1.0 + 0.4 * agent.risk_aversion)
            * (1.0 - 0.3 * agent.education)
            * threshold_scale)
            .max(MIN_SCALE);

        let bias = 0.2 * agent.habit_strength + 0.1 * (agent.partisan_strength - 0.5);
        let start = (threshold * (0.5 + bias + start_boost)).clamp(START_EPS, threshold - START_EPS);

        let sigma = (p.sigma * (1.0 + 0.3 * (1.0 - agent.education))).max(MIN_SCALE);

        let benefit = competitiveness * agent.issue_salience * agent.partisan_strength;
        let drift = p.base_drift
            + p.beta_d * duty
            + p.beta_h * agent.habit_strength
            + p.beta_s * social
            + p.beta_pb * benefit
            + p.beta_oc * agent.overconfidence
            + p.beta_c * scenario.voting_cost
            + bonus;

        Self {
            threshold,
            start,
            sigma,
            drift: clamp_drift(drift),
        }
    }

    /// Closed-form probability of reaching the vote barrier first.
    pub fn vote_probability(&self) -> f64 {
        first_passage_probability(self.drift, self.threshold, self.start, self.sigma)
    }

    /// Simulates one path with Euler–Maruyama steps of `dt`.
    ///
    /// If neither barrier is reached by `max_time`, the walk counts as a vote
    /// when it ended in the upper half of the span.
    pub fn simulate_path<R: Rng + ?Sized>(&self, dt: f64, max_time: f64, rng: &mut R) -> PathOutcome {
        let dt = dt.max(1e-6);
        let sqrt_dt = dt.sqrt();
        let mut x = self.start;
        let mut t = 0.0;

        while t < max_time {
            let dw: f64 = rng.sample::<f64, _>(StandardNormal) * sqrt_dt;
            x += self.drift * dt + self.sigma * dw;
            t += dt;

            if x >= self.threshold {
                return PathOutcome { voted: true, decision_time: t, timed_out: false };
            }
            if x <= 0.0 {
                return PathOutcome { voted: false, decision_time: t, timed_out: false };
            }
        }

        PathOutcome {
            voted: x > self.threshold / 2.0,
            decision_time: max_time,
            timed_out: true,
        }
    }
}

/// Result of one simulated diffusion path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathOutcome {
    pub voted: bool,
    pub decision_time: f64,
    /// Neither barrier was hit before `max_time`
    pub timed_out: bool,
}

fn clamp_drift(mu: f64) -> f64 {
    if mu.is_nan() {
        0.0
    } else {
        mu.clamp(-MAX_DRIFT, MAX_DRIFT)
    }
}

/// Probability that a Wiener process with drift `mu` and diffusion `sigma`
/// started at `z` hits `a` before 0.
///
/// Negative drift uses `λ = −2μ/σ² > 0` so every exponent is non-positive.
pub fn first_passage_probability(mu: f64, a: f64, z: f64, sigma: f64) -> f64 {
    if mu.abs() < ZERO_DRIFT_EPS {
        return sanitize_probability(z / a);
    }

    let s2 = sigma * sigma;
    let p = if mu > 0.0 {
        let k = 2.0 * mu / s2;
        // (1 − e^(−kz)) / (1 − e^(−ka))
        (-k * z).exp_m1() / (-k * a).exp_m1()
    } else {
        let lambda = -2.0 * mu / s2;
        // e^(λ(z−a)) − e^(−λa), factored when the two terms nearly cancel
        let numerator = if lambda * z < 1.0 {
            (-lambda * a).exp() * (lambda * z).exp_m1()
        } else {
            (lambda * (z - a)).exp() - (-lambda * a).exp()
        };
        numerator / -(-lambda * a).exp_m1()
    };

    sanitize_probability(p)
}

/// Drift-diffusion decision model.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriftDiffusionModel;

impl DecisionModel for DriftDiffusionModel {
    fn kind(&self) -> ModelKind {
        ModelKind::DriftDiffusion
    }

    fn probability(
        &self,
        agent: &Agent,
        scenario: &ScenarioContext,
        physics: &ModelPhysicsParams,
        nudge: &Nudge,
    ) -> f64 {
        DdmTerms::compute(agent, scenario, physics, nudge).vote_probability()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_zero_drift_midpoint_is_half() {
        assert_eq!(first_passage_probability(0.0, 2.0, 1.0, 1.0), 0.5);
    }

    #[test]
    fn test_zero_drift_limit_is_continuous() {
        let (a, z, s) = (2.0, 0.6, 1.0);
        let limit = z / a;

        for mu in [2e-5, -2e-5, 1e-4, -1e-4] {
            let p = first_passage_probability(mu, a, z, s);
            assert!((p - limit).abs() < 1e-3, "mu={} p={} limit={}", mu, p, limit);
        }
        assert_relative_eq!(first_passage_probability(9e-6, a, z, s), limit, epsilon = 1e-12);
    }

    #[test]
    fn test_monotone_in_drift() {
        let (a, z, s) = (1.8, 0.7, 0.9);
        let mut prev = -1.0;
        for i in -400..=400 {
            let mu = i as f64 * 0.005;
            let p = first_passage_probability(mu, a, z, s);
            assert!(p >= prev - 1e-12, "not monotone at mu={}: {} < {}", mu, p, prev);
            prev = p;
        }
    }

    #[test]
    fn test_negative_drift_is_finite_for_steep_exponents() {
        // λ·a ≈ 8000: the naive formula overflows here
        let p = first_passage_probability(-2.0, 2.0, 1.0, 0.01);
        assert!(p.is_finite());
        assert!(p < 1e-6);

        let q = first_passage_probability(2.0, 2.0, 1.0, 0.01);
        assert!(q > 1.0 - 1e-6);
    }

    #[test]
    fn test_negative_drift_matches_naive_formula_when_safe() {
        let (mu, a, z, s): (f64, f64, f64, f64) = (-0.3, 1.5, 0.5, 1.0);
        let k = 2.0 * mu / (s * s);
        let naive = (1.0 - (-k * z).exp()) / (1.0 - (-k * a).exp());
        assert_relative_eq!(first_passage_probability(mu, a, z, s), naive, epsilon = 1e-12);
    }

    #[test]
    fn test_terms_respect_clamps() {
        let agent = Agent { habit_strength: 1.0, partisan_strength: 1.0, ..Agent::neutral(0) };
        let scenario = ScenarioContext::default();
        let mut physics = ModelPhysicsParams::default();
        physics.ddm.base_drift = 50.0;

        let terms = DdmTerms::compute(&agent, &scenario, &physics, &Nudge::Implementation {
            cost_reduction: 0.2,
            habit_boost: 2.0,
        });

        assert_eq!(terms.drift, MAX_DRIFT);
        assert!(terms.start >= START_EPS);
        assert!(terms.start <= terms.threshold - START_EPS);
    }

    #[test]
    fn test_implementation_lowers_threshold() {
        let agent = Agent::neutral(0);
        let scenario = ScenarioContext::default();
        let physics = ModelPhysicsParams::default();

        let base = DdmTerms::compute(&agent, &scenario, &physics, &Nudge::None);
        let planned = DdmTerms::compute(&agent, &scenario, &physics, &Nudge::Implementation {
            cost_reduction: 0.5,
            habit_boost: 0.0,
        });
        assert_relative_eq!(planned.threshold, base.threshold * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_habit_boost_moves_start_without_habit() {
        let agent = Agent { habit_strength: 0.0, ..Agent::neutral(0) };
        let scenario = ScenarioContext::default();
        let physics = ModelPhysicsParams::default();

        let base = DdmTerms::compute(&agent, &scenario, &physics, &Nudge::None);
        let planned = DdmTerms::compute(&agent, &scenario, &physics, &Nudge::Implementation {
            cost_reduction: 0.0,
            habit_boost: 0.2,
        });

        assert_relative_eq!(planned.threshold, base.threshold, epsilon = 1e-12);
        assert_relative_eq!(base.start, 0.5 * base.threshold, epsilon = 1e-12);
        assert_relative_eq!(planned.start - base.start, 0.2 * planned.threshold, epsilon = 1e-12);
        assert!(planned.vote_probability() > base.vote_probability());
    }

    #[test]
    fn test_monte_carlo_matches_closed_form() {
        let terms = DdmTerms { threshold: 1.0, start: 0.4, sigma: 1.0, drift: 0.5 };
        let mut rng = ChaCha8Rng::seed_from_u64(17);

        let runs = 2000;
        let votes = (0..runs)
            .filter(|_| terms.simulate_path(0.001, 20.0, &mut rng).voted)
            .count();
        let empirical = votes as f64 / runs as f64;

        // Discretization biases slightly toward later crossings
        assert!((empirical - terms.vote_probability()).abs() < 0.05,
            "empirical {} vs analytic {}", empirical, terms.vote_probability());
    }
}
