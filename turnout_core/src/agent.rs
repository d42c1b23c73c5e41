//! Synthetic voters and the electoral context they decide in.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// A synthetic voter.
///
/// All behavioral traits are normalized to [0, 1]. Agents are created once per
/// run by the generator and only ever borrowed by the decision models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Sequential id within the population
    pub id: u32,

    pub education: f64,
    pub civic_duty: f64,

    /// Share of the last five elections voted in (0, 0.2, ..., 1.0)
    pub habit_strength: f64,

    /// Sensitivity to social pressure
    pub social_sensitivity: f64,
    pub risk_aversion: f64,
    pub partisan_strength: f64,
    pub overconfidence: f64,

    /// How well the preferred candidate matches the voter
    pub candidate_match: f64,
    pub issue_salience: f64,

    /// Age in years
    pub age: u32,

    /// Lives in an urban area
    pub urban: bool,
}

impl Agent {
    /// Creates an agent with every trait at the midpoint.
    pub fn neutral(id: u32) -> Self {
        Self {
            id,
            education: 0.5,
            civic_duty: 0.5,
            habit_strength: 0.5,
            social_sensitivity: 0.5,
            risk_aversion: 0.5,
            partisan_strength: 0.5,
            overconfidence: 0.5,
            candidate_match: 0.5,
            issue_salience: 0.5,
            age: 40,
            urban: false,
        }
    }

    /// Instrumental benefit `B = issue_salience × partisan_strength × candidate_match`.
    pub fn instrumental_benefit(&self) -> f64 {
        self.issue_salience * self.partisan_strength * self.candidate_match
    }

    /// Returns the normalized traits as (name, value) pairs.
    pub fn traits(&self) -> [(&'static str, f64); 9] {
        [
            ("education", self.education),
            ("civic_duty", self.civic_duty),
            ("habit_strength", self.habit_strength),
            ("social_sensitivity", self.social_sensitivity),
            ("risk_aversion", self.risk_aversion),
            ("partisan_strength", self.partisan_strength),
            ("overconfidence", self.overconfidence),
            ("candidate_match", self.candidate_match),
            ("issue_salience", self.issue_salience),
        ]
    }
}

/// Electoral context and ground truth for one scenario.
///
/// Supplied from outside the core and treated as read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioContext {
    pub name: String,

    /// Observed turnout (0-1)
    pub target_turnout: f64,

    /// Closeness of the race, used as a pivotality proxy (0-1)
    pub competitiveness: f64,

    /// Aggregate cost of voting (0-1)
    pub voting_cost: f64,

    /// Population size the scenario is normally simulated at
    pub population_size: usize,

    /// Campaign length in days
    pub campaign_days: u32,
}

impl ScenarioContext {
    pub fn new(name: &str, target_turnout: f64, competitiveness: f64, voting_cost: f64) -> Self {
        Self {
            name: name.to_string(),
            target_turnout,
            competitiveness,
            voting_cost,
            population_size: 1000,
            campaign_days: 30,
        }
    }

    /// Checks that every normalized field lies in [0, 1].
    pub fn validate(&self) -> Result<(), ModelError> {
        ModelError::check_unit("target_turnout", self.target_turnout)?;
        ModelError::check_unit("competitiveness", self.competitiveness)?;
        ModelError::check_unit("voting_cost", self.voting_cost)?;
        Ok(())
    }
}

impl Default for ScenarioContext {
    fn default() -> Self {
        Self::new("default", 0.6, 0.5, 0.3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrumental_benefit() {
        let mut agent = Agent::neutral(0);
        agent.issue_salience = 1.0;
        agent.partisan_strength = 0.5;
        agent.candidate_match = 0.4;
        assert!((agent.instrumental_benefit() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_scenario_validation() {
        assert!(ScenarioContext::default().validate().is_ok());

        let bad = ScenarioContext::new("bad", 1.2, 0.5, 0.3);
        assert_eq!(
            bad.validate(),
            Err(ModelError::OutOfUnitRange { field: "target_turnout", value: 1.2 })
        );
    }
}
