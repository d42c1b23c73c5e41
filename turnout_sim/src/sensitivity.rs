//! One-at-a-time parameter sensitivity.

use serde::{Deserialize, Serialize};
use turnout_core::{ModelPhysicsParams, ParamKey};

use crate::objective::Objective;

/// Default relative bump applied to each field.
pub const RELATIVE_STEP: f64 = 0.10;

/// Absolute bump used when a field is (nearly) zero.
pub const ZERO_STEP: f64 = 0.1;

const ZERO_THRESHOLD: f64 = 1e-6;

/// How strongly one field moves the objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityEntry {
    pub key: ParamKey,
    pub name: String,
    pub value: f64,
    pub perturbed_value: f64,
    pub perturbed_energy: f64,
    /// `|ΔRMSE| / (baseline + 1e-9)`
    pub score: f64,
}

/// The bumped value for one field.
pub fn bump(value: f64, relative_step: f64) -> f64 {
    if value.abs() < ZERO_THRESHOLD {
        value + ZERO_STEP
    } else {
        value * (1.0 + relative_step)
    }
}

/// Scores every key at `physics`, most sensitive first.
///
/// The bump is not clamped, so a field at its bound is still moved. Equal
/// scores keep the order of `keys`.
pub fn analyze(
    objective: &Objective,
    physics: &ModelPhysicsParams,
    keys: &[ParamKey],
    relative_step: f64,
) -> Vec<SensitivityEntry> {
    let baseline = objective.energy(physics);

    let mut entries: Vec<SensitivityEntry> = keys
        .iter()
        .map(|&key| {
            let value = key.get(physics);
            let perturbed_value = bump(value, relative_step);
            let perturbed_energy = objective.energy(&physics.with(key, perturbed_value));
            SensitivityEntry {
                key,
                name: key.name().to_string(),
                value,
                perturbed_value,
                perturbed_energy,
                score: (perturbed_energy - baseline).abs() / (baseline + 1e-9),
            }
        })
        .collect();

    // Stable sort keeps field order for ties
    entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    entries
}
