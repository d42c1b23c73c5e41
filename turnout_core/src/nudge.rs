//! Behavioral interventions ("nudges").
//!
//! Exactly one [`Nudge`] is active per simulation pass. The enum only carries
//! the payload; each decision model matches on it exhaustively and rewrites
//! its own terms, using the shared term helpers below.

use serde::{Deserialize, Serialize};

/// Active intervention with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Nudge {
    None,

    /// Lottery entry for voters
    Monetary { lottery_prob: f64, lottery_value: f64 },

    /// "Most of your neighbours vote" messaging
    SocialNorm { revealed_turnout: f64, strength: f64 },

    /// "Be a voter" identity framing
    IdentityFrame { strength: f64 },

    /// Public disclosure of who voted
    Disclosure { threat_level: f64, credibility: f64 },

    /// Implementation-intention planning prompts
    Implementation { cost_reduction: f64, habit_boost: f64 },

    /// Information about how close the race is
    Competitiveness { info_boost: f64 },
}

impl Default for Nudge {
    fn default() -> Self {
        Nudge::None
    }
}

impl Nudge {
    pub fn kind(&self) -> NudgeKind {
        match self {
            Nudge::None => NudgeKind::None,
            Nudge::Monetary { .. } => NudgeKind::Monetary,
            Nudge::SocialNorm { .. } => NudgeKind::SocialNorm,
            Nudge::IdentityFrame { .. } => NudgeKind::IdentityFrame,
            Nudge::Disclosure { .. } => NudgeKind::Disclosure,
            Nudge::Implementation { .. } => NudgeKind::Implementation,
            Nudge::Competitiveness { .. } => NudgeKind::Competitiveness,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Nudge::None)
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// Payload-free nudge discriminant, used for sweeps and parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeKind {
    None,
    Monetary,
    SocialNorm,
    IdentityFrame,
    Disclosure,
    Implementation,
    Competitiveness,
}

impl NudgeKind {
    /// Every intervention except `None`.
    pub const ACTIVE: [NudgeKind; 6] = [
        NudgeKind::Monetary,
        NudgeKind::SocialNorm,
        NudgeKind::IdentityFrame,
        NudgeKind::Disclosure,
        NudgeKind::Implementation,
        NudgeKind::Competitiveness,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NudgeKind::None => "none",
            NudgeKind::Monetary => "monetary",
            NudgeKind::SocialNorm => "social_norm",
            NudgeKind::IdentityFrame => "identity_frame",
            NudgeKind::Disclosure => "disclosure",
            NudgeKind::Implementation => "implementation",
            NudgeKind::Competitiveness => "competitiveness",
        }
    }

    /// The nudge with its standard payload.
    pub fn with_defaults(&self) -> Nudge {
        match self {
            NudgeKind::None => Nudge::None,
            NudgeKind::Monetary => Nudge::Monetary { lottery_prob: 0.05, lottery_value: 5.0 },
            NudgeKind::SocialNorm => Nudge::SocialNorm { revealed_turnout: 0.75, strength: 1.0 },
            NudgeKind::IdentityFrame => Nudge::IdentityFrame { strength: 0.3 },
            NudgeKind::Disclosure => Nudge::Disclosure { threat_level: 1.5, credibility: 0.5 },
            NudgeKind::Implementation => Nudge::Implementation { cost_reduction: 0.3, habit_boost: 0.1 },
            NudgeKind::Competitiveness => Nudge::Competitiveness { info_boost: 0.5 },
        }
    }
}

impl std::fmt::Display for NudgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for NudgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "baseline" => Ok(NudgeKind::None),
            "monetary" | "lottery" => Ok(NudgeKind::Monetary),
            "social_norm" | "socialnorm" | "social" => Ok(NudgeKind::SocialNorm),
            "identity_frame" | "identity" => Ok(NudgeKind::IdentityFrame),
            "disclosure" => Ok(NudgeKind::Disclosure),
            "implementation" | "plan" => Ok(NudgeKind::Implementation),
            "competitiveness" | "close_race" => Ok(NudgeKind::Competitiveness),
            _ => Err(format!("Unknown nudge: {}", s)),
        }
    }
}

// =============================================================================
// TERM HELPERS
// =============================================================================

/// Additive lottery incentive, discounted for voters who already feel a duty.
pub fn monetary_bonus(lottery_prob: f64, lottery_value: f64, civic_duty: f64) -> f64 {
    lottery_prob * lottery_value / (1.0 + civic_duty)
}

/// Shift of the social term from revealing turnout among peers.
///
/// Positive when revealed turnout is above one half, negative below.
pub fn social_norm_shift(revealed_turnout: f64, strength: f64) -> f64 {
    strength * (revealed_turnout - 0.5)
}

/// Extra social pressure from having one's participation disclosed.
pub fn disclosure_pressure(threat_level: f64, credibility: f64, social_sensitivity: f64) -> f64 {
    social_sensitivity * threat_level * credibility
}

/// Perceived competitiveness after a closeness-information nudge, capped at 1.
pub fn boosted_competitiveness(competitiveness: f64, info_boost: f64) -> f64 {
    (competitiveness * (1.0 + info_boost)).min(1.0)
}

/// Multiplier applied to cost (or DDM threshold) by a planning prompt.
pub fn cost_factor(cost_reduction: f64) -> f64 {
    (1.0 - cost_reduction).max(0.0)
}
