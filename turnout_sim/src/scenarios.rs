//! Built-in election scenarios.

use turnout_core::{AgentGenerationParams, FullSimulationConfig, ScenarioContext};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Dense city with renters and long queues
    UrbanMetro,

    /// Older, settled rural electorate with strong habits
    RuralDistrict,

    /// Knife-edge race with heavy campaigning
    SwingSeat,

    /// Foregone conclusion, little reason to show up
    SafeSeat,

    /// Low-salience off-cycle election
    Midterm,

    /// Polling places far away and hard to reach
    RemoteHighCost,

    /// Campus-heavy electorate with weak habits
    YouthCampus,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::UrbanMetro,
            ScenarioId::RuralDistrict,
            ScenarioId::SwingSeat,
            ScenarioId::SafeSeat,
            ScenarioId::Midterm,
            ScenarioId::RemoteHighCost,
            ScenarioId::YouthCampus,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::UrbanMetro => "urban_metro",
            ScenarioId::RuralDistrict => "rural_district",
            ScenarioId::SwingSeat => "swing_seat",
            ScenarioId::SafeSeat => "safe_seat",
            ScenarioId::Midterm => "midterm",
            ScenarioId::RemoteHighCost => "remote_high_cost",
            ScenarioId::YouthCampus => "youth_campus",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::UrbanMetro => "58% turnout, moderate race, queues raise the cost of voting",
            ScenarioId::RuralDistrict => "74% turnout, older electorate with entrenched voting habits",
            ScenarioId::SwingSeat => "69% turnout, highly competitive race",
            ScenarioId::SafeSeat => "51% turnout, uncompetitive race",
            ScenarioId::Midterm => "43% turnout, low issue salience",
            ScenarioId::RemoteHighCost => "47% turnout, distant polling stations",
            ScenarioId::YouthCampus => "39% turnout, young first-time voters",
        }
    }

    /// Observed turnout, competitiveness and cost.
    pub fn context(&self) -> ScenarioContext {
        let (target, competitiveness, cost) = match self {
            ScenarioId::UrbanMetro => (0.58, 0.45, 0.40),
            ScenarioId::RuralDistrict => (0.74, 0.50, 0.30),
            ScenarioId::SwingSeat => (0.69, 0.90, 0.30),
            ScenarioId::SafeSeat => (0.51, 0.15, 0.30),
            ScenarioId::Midterm => (0.43, 0.35, 0.35),
            ScenarioId::RemoteHighCost => (0.47, 0.50, 0.70),
            ScenarioId::YouthCampus => (0.39, 0.55, 0.30),
        };
        ScenarioContext::new(self.name(), target, competitiveness, cost)
    }

    /// Population shape for the scenario.
    pub fn generation(&self) -> AgentGenerationParams {
        let base = AgentGenerationParams::default();
        match self {
            ScenarioId::UrbanMetro => AgentGenerationParams { urban_prob: 0.9, ..base },
            ScenarioId::RuralDistrict => AgentGenerationParams {
                urban_prob: 0.1,
                past_vote_prob: 0.75,
                age_min: 25,
                ..base
            },
            ScenarioId::Midterm => AgentGenerationParams { issue_salience_skew: 2.0, ..base },
            ScenarioId::YouthCampus => AgentGenerationParams {
                past_vote_prob: 0.3,
                age_min: 18,
                age_range: 8,
                urban_prob: 0.7,
                ..base
            },
            ScenarioId::SwingSeat | ScenarioId::SafeSeat | ScenarioId::RemoteHighCost => base,
        }
    }

    /// Scenario plus population shape with default physics.
    pub fn config(&self) -> FullSimulationConfig {
        FullSimulationConfig {
            scenario: self.context(),
            generation: self.generation(),
            ..Default::default()
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "urban_metro" | "urban" => Ok(ScenarioId::UrbanMetro),
            "rural_district" | "rural" => Ok(ScenarioId::RuralDistrict),
            "swing_seat" | "swing" => Ok(ScenarioId::SwingSeat),
            "safe_seat" | "safe" => Ok(ScenarioId::SafeSeat),
            "midterm" => Ok(ScenarioId::Midterm),
            "remote_high_cost" | "remote" => Ok(ScenarioId::RemoteHighCost),
            "youth_campus" | "youth" => Ok(ScenarioId::YouthCampus),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
