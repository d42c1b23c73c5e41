//! Agent population generator.
//!
//! Skewed traits use the inverse-CDF transform `1 − U^(1/shape)` with
//! `U ~ Uniform(0, 1)`, which is an exact Beta(1, shape) draw with mean
//! `1 / (1 + shape)`:
//!
//! - `shape > 1` pushes the trait toward 0
//! - `shape < 1` pushes it toward 1
//! - `shape = 1` is uniform
//!
//! Habit is the share of five Bernoulli(`past_vote_prob`) past elections that
//! were voted in.

use crate::agent::Agent;
use crate::error::ModelError;
use rand::Rng;
use rand_distr::{Bernoulli, Binomial, Distribution};
use serde::{Deserialize, Serialize};

/// Number of past elections that make up the habit score.
pub const HABIT_ELECTIONS: u64 = 5;

/// Shape and probability parameters for population generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentGenerationParams {
    pub education_skew: f64,
    pub civic_duty_skew: f64,
    pub social_skew: f64,
    pub risk_skew: f64,
    pub partisan_skew: f64,
    pub overconfidence_skew: f64,
    pub candidate_match_skew: f64,
    pub issue_salience_skew: f64,

    /// Probability of having voted in each past election
    pub past_vote_prob: f64,

    /// Probability of being urban
    pub urban_prob: f64,

    /// Youngest age drawn
    pub age_min: u32,

    /// Width of the age range
    pub age_range: u32,
}

impl Default for AgentGenerationParams {
    fn default() -> Self {
        Self {
            education_skew: 0.8,
            civic_duty_skew: 0.65,
            social_skew: 1.0,
            risk_skew: 1.0,
            partisan_skew: 1.1,
            overconfidence_skew: 1.25,
            candidate_match_skew: 1.0,
            issue_salience_skew: 0.9,
            past_vote_prob: 0.6,
            urban_prob: 0.4,
            age_min: 18,
            age_range: 62,
        }
    }
}

impl AgentGenerationParams {
    fn skews(&self) -> [(&'static str, f64); 8] {
        [
            ("education_skew", self.education_skew),
            ("civic_duty_skew", self.civic_duty_skew),
            ("social_skew", self.social_skew),
            ("risk_skew", self.risk_skew),
            ("partisan_skew", self.partisan_skew),
            ("overconfidence_skew", self.overconfidence_skew),
            ("candidate_match_skew", self.candidate_match_skew),
            ("issue_salience_skew", self.issue_salience_skew),
        ]
    }

    /// Rejects non-positive skews and probabilities outside [0, 1].
    pub fn validate(&self) -> Result<(), ModelError> {
        for (field, value) in self.skews() {
            if !(value.is_finite() && value > 0.0) {
                return Err(ModelError::InvalidSkew { field, value });
            }
        }
        ModelError::check_unit("past_vote_prob", self.past_vote_prob)?;
        ModelError::check_unit("urban_prob", self.urban_prob)?;
        Ok(())
    }
}

/// Draws one skewed trait value.
pub fn skewed_trait<R: Rng + ?Sized>(rng: &mut R, shape: f64) -> f64 {
    let u: f64 = rng.gen();
    (1.0 - u.powf(1.0 / shape)).clamp(0.0, 1.0)
}

/// Generates agent populations.
pub struct AgentGenerator;

impl AgentGenerator {
    /// Generates `n` agents.
    ///
    /// Parameters are validated before any draw is made.
    pub fn generate<R: Rng + ?Sized>(
        params: &AgentGenerationParams,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<Agent>, ModelError> {
        params.validate()?;

        let habit = Binomial::new(HABIT_ELECTIONS, params.past_vote_prob).map_err(|_| {
            ModelError::OutOfUnitRange { field: "past_vote_prob", value: params.past_vote_prob }
        })?;
        let urban = Bernoulli::new(params.urban_prob).map_err(|_| {
            ModelError::OutOfUnitRange { field: "urban_prob", value: params.urban_prob }
        })?;
        let age_max = params.age_min.saturating_add(params.age_range);

        let agents = (0..n)
            .map(|i| Agent {
                id: i as u32,
                education: skewed_trait(rng, params.education_skew),
                civic_duty: skewed_trait(rng, params.civic_duty_skew),
                habit_strength: habit.sample(rng) as f64 / HABIT_ELECTIONS as f64,
                social_sensitivity: skewed_trait(rng, params.social_skew),
                risk_aversion: skewed_trait(rng, params.risk_skew),
                partisan_strength: skewed_trait(rng, params.partisan_skew),
                overconfidence: skewed_trait(rng, params.overconfidence_skew),
                candidate_match: skewed_trait(rng, params.candidate_match_skew),
                issue_salience: skewed_trait(rng, params.issue_salience_skew),
                age: rng.gen_range(params.age_min..=age_max),
                urban: urban.sample(rng),
            })
            .collect();

        Ok(agents)
    }
}

/// Mean and standard deviation of one trait across a population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitSummary {
    pub name: String,
    pub mean: f64,
    pub std_dev: f64,
}

/// Descriptive statistics of a generated population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub size: usize,
    pub traits: Vec<TraitSummary>,
    pub urban_share: f64,
    pub mean_age: f64,
}

impl PopulationStats {
    pub fn from_agents(agents: &[Agent]) -> Self {
        let n = agents.len().max(1) as f64;
        let names = Agent::neutral(0).traits().map(|(name, _)| name);

        let traits = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let values: Vec<f64> = agents.iter().map(|a| a.traits()[idx].1).collect();
                let mean = values.iter().sum::<f64>() / n;
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                TraitSummary { name: name.to_string(), mean, std_dev: var.sqrt() }
            })
            .collect();

        Self {
            size: agents.len(),
            traits,
            urban_share: agents.iter().filter(|a| a.urban).count() as f64 / n,
            mean_age: agents.iter().map(|a| a.age as f64).sum::<f64>() / n,
        }
    }

    /// Looks up a trait summary by name.
    pub fn get(&self, name: &str) -> Option<&TraitSummary> {
        self.traits.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_generate_population_size_and_ids() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let agents = AgentGenerator::generate(&AgentGenerationParams::default(), 50, &mut rng).unwrap();

        assert_eq!(agents.len(), 50);
        for (i, agent) in agents.iter().enumerate() {
            assert_eq!(agent.id, i as u32);
        }
    }

    #[test]
    fn test_rejects_non_positive_skew() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let params = AgentGenerationParams { risk_skew: 0.0, ..Default::default() };

        let err = AgentGenerator::generate(&params, 10, &mut rng).unwrap_err();
        assert_eq!(err, ModelError::InvalidSkew { field: "risk_skew", value: 0.0 });

        let params = AgentGenerationParams { civic_duty_skew: -1.0, ..Default::default() };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_habit_is_discrete() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let agents = AgentGenerator::generate(&AgentGenerationParams::default(), 200, &mut rng).unwrap();

        for agent in &agents {
            let scaled = agent.habit_strength * HABIT_ELECTIONS as f64;
            assert!((scaled - scaled.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_age_within_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let params = AgentGenerationParams { age_min: 30, age_range: 5, ..Default::default() };
        let agents = AgentGenerator::generate(&params, 100, &mut rng).unwrap();

        assert!(agents.iter().all(|a| (30..=35).contains(&a.age)));
    }

    #[test]
    fn test_skew_direction() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let high: f64 = (0..5000).map(|_| skewed_trait(&mut rng, 4.0)).sum::<f64>() / 5000.0;
        let low: f64 = (0..5000).map(|_| skewed_trait(&mut rng, 0.25)).sum::<f64>() / 5000.0;

        // E[1 - U^(1/k)] = 1 / (k + 1)
        assert!((high - 0.2).abs() < 0.02, "high skew mean {}", high);
        assert!((low - 0.8).abs() < 0.02, "low skew mean {}", low);
    }

    #[test]
    fn test_default_population_leans_dutiful() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let agents = AgentGenerator::generate(&AgentGenerationParams::default(), 4000, &mut rng).unwrap();
        let stats = PopulationStats::from_agents(&agents);

        // civic duty shape 0.65 has mean 1 / 1.65
        let duty = stats.get("civic_duty").unwrap();
        assert!((duty.mean - 1.0 / 1.65).abs() < 0.02, "civic duty mean {}", duty.mean);
        assert!(duty.mean > 0.5);

        let midterm = AgentGenerationParams { issue_salience_skew: 2.0, ..Default::default() };
        let agents = AgentGenerator::generate(&midterm, 4000, &mut rng).unwrap();
        let salience = PopulationStats::from_agents(&agents).get("issue_salience").unwrap().mean;
        assert!(salience < 0.4, "low salience mean {}", salience);
    }

    #[test]
    fn test_population_stats() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let params = AgentGenerationParams { urban_prob: 1.0, ..Default::default() };
        let agents = AgentGenerator::generate(&params, 300, &mut rng).unwrap();
        let stats = PopulationStats::from_agents(&agents);

        assert_eq!(stats.size, 300);
        assert_eq!(stats.traits.len(), 9);
        assert_eq!(stats.urban_share, 1.0);
        let habit = stats.get("habit_strength").unwrap();
        assert!((habit.mean - 0.6).abs() < 0.05);
    }
}
