//! Model physics parameters.
//!
//! [`ModelPhysicsParams`] holds the weight vectors of all three decision
//! models. Each scalar is addressable through [`ParamKey`], which also carries
//! the admissible bounds and perturbation scale the calibration engine uses.

use crate::models::ModelKind;
use serde::{Deserialize, Serialize};

/// Utility model weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilityParams {
    /// Weight on pivotal benefit `p·B`
    pub beta_pb: f64,
    /// Weight on cost (≤ 0)
    pub beta_c: f64,
    /// Weight on civic duty
    pub beta_d: f64,
    /// Weight on social sensitivity
    pub beta_s: f64,
    /// Weight on habit
    pub beta_h: f64,
    /// Logistic temperature
    pub noise: f64,
}

impl Default for UtilityParams {
    fn default() -> Self {
        Self {
            beta_pb: 0.8,
            beta_c: -1.5,
            beta_d: 0.6,
            beta_s: 0.3,
            beta_h: 0.5,
            noise: 1.0,
        }
    }
}

/// Drift-diffusion model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DdmParams {
    pub base_drift: f64,
    /// Base barrier separation `a`
    pub threshold: f64,
    /// Base diffusion coefficient `σ`
    pub sigma: f64,
    pub beta_d: f64,
    pub beta_h: f64,
    pub beta_s: f64,
    pub beta_pb: f64,
    pub beta_oc: f64,
    /// Cost weight (≤ 0)
    pub beta_c: f64,
}

impl Default for DdmParams {
    fn default() -> Self {
        Self {
            base_drift: 0.0,
            threshold: 1.5,
            sigma: 1.0,
            beta_d: 0.4,
            beta_h: 0.4,
            beta_s: 0.2,
            beta_pb: 0.3,
            beta_oc: 0.1,
            beta_c: -0.6,
        }
    }
}

/// Dual-system model weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualSystemParams {
    /// System 1 baseline activation
    pub momentum: f64,
    pub h_habit: f64,
    pub h_social: f64,
    pub h_affect: f64,
    pub u_pb: f64,
    /// System 2 cost weight (≤ 0)
    pub u_cost: f64,
    pub u_duty: f64,
    /// Arbiter intercept
    pub lambda_base: f64,
    pub lambda_edu: f64,
    pub lambda_risk: f64,
}

impl Default for DualSystemParams {
    fn default() -> Self {
        Self {
            momentum: 0.0,
            h_habit: 1.0,
            h_social: 0.5,
            h_affect: 0.5,
            u_pb: 1.0,
            u_cost: -1.5,
            u_duty: 1.0,
            lambda_base: 0.5,
            lambda_edu: -0.3,
            lambda_risk: 0.1,
        }
    }
}

/// Weights for every decision model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelPhysicsParams {
    pub utility: UtilityParams,
    pub ddm: DdmParams,
    pub dual_system: DualSystemParams,
}

impl ModelPhysicsParams {
    pub fn get(&self, key: ParamKey) -> f64 {
        key.get(self)
    }

    /// Sets a field, clamped to its admissible bounds.
    pub fn set_clamped(&mut self, key: ParamKey, value: f64) {
        let (lo, hi) = key.bounds();
        key.set(self, value.clamp(lo, hi));
    }

    /// Returns a copy with one field replaced (unclamped).
    pub fn with(mut self, key: ParamKey, value: f64) -> Self {
        key.set(&mut self, value);
        self
    }

    /// Clamps every field to its bounds.
    pub fn clamped(mut self) -> Self {
        for key in ParamKey::ALL {
            self.set_clamped(key, key.get(&self));
        }
        self
    }
}

/// Addresses one scalar field of [`ModelPhysicsParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    UtilityBetaPb,
    UtilityBetaC,
    UtilityBetaD,
    UtilityBetaS,
    UtilityBetaH,
    UtilityNoise,

    DdmBaseDrift,
    DdmThreshold,
    DdmSigma,
    DdmBetaD,
    DdmBetaH,
    DdmBetaS,
    DdmBetaPb,
    DdmBetaOc,
    DdmBetaC,

    DualMomentum,
    DualHHabit,
    DualHSocial,
    DualHAffect,
    DualUPb,
    DualUCost,
    DualUDuty,
    DualLambdaBase,
    DualLambdaEdu,
    DualLambdaRisk,
}

impl ParamKey {
    pub const ALL: [ParamKey; 25] = [
        ParamKey::UtilityBetaPb,
        ParamKey::UtilityBetaC,
        ParamKey::UtilityBetaD,
        ParamKey::UtilityBetaS,
        ParamKey::UtilityBetaH,
        ParamKey::UtilityNoise,
        ParamKey::DdmBaseDrift,
        ParamKey::DdmThreshold,
        ParamKey::DdmSigma,
        ParamKey::DdmBetaD,
        ParamKey::DdmBetaH,
        ParamKey::DdmBetaS,
        ParamKey::DdmBetaPb,
        ParamKey::DdmBetaOc,
        ParamKey::DdmBetaC,
        ParamKey::DualMomentum,
        ParamKey::DualHHabit,
        ParamKey::DualHSocial,
        ParamKey::DualHAffect,
        ParamKey::DualUPb,
        ParamKey::DualUCost,
        ParamKey::DualUDuty,
        ParamKey::DualLambdaBase,
        ParamKey::DualLambdaEdu,
        ParamKey::DualLambdaRisk,
    ];

    /// Fields that influence the given model, in declaration order.
    pub fn for_model(model: ModelKind) -> Vec<ParamKey> {
        Self::ALL.into_iter().filter(|k| k.model() == model).collect()
    }

    /// The model that reads this field.
    pub fn model(&self) -> ModelKind {
        use ParamKey::*;
        match self {
            UtilityBetaPb | UtilityBetaC | UtilityBetaD | UtilityBetaS | UtilityBetaH
            | UtilityNoise => ModelKind::Utility,
            DdmBaseDrift | DdmThreshold | DdmSigma | DdmBetaD | DdmBetaH | DdmBetaS
            | DdmBetaPb | DdmBetaOc | DdmBetaC => ModelKind::DriftDiffusion,
            _ => ModelKind::DualSystem,
        }
    }

    pub fn name(&self) -> &'static str {
        use ParamKey::*;
        match self {
            UtilityBetaPb => "utility.beta_pb",
            UtilityBetaC => "utility.beta_c",
            UtilityBetaD => "utility.beta_d",
            UtilityBetaS => "utility.beta_s",
            UtilityBetaH => "utility.beta_h",
            UtilityNoise => "utility.noise",
            DdmBaseDrift => "ddm.base_drift",
            DdmThreshold => "ddm.threshold",
            DdmSigma => "ddm.sigma",
            DdmBetaD => "ddm.beta_d",
            DdmBetaH => "ddm.beta_h",
            DdmBetaS => "ddm.beta_s",
            DdmBetaPb => "ddm.beta_pb",
            DdmBetaOc => "ddm.beta_oc",
            DdmBetaC => "ddm.beta_c",
            DualMomentum => "dual_system.momentum",
            DualHHabit => "dual_system.h_habit",
            DualHSocial => "dual_system.h_social",
            DualHAffect => "dual_system.h_affect",
            DualUPb => "dual_system.u_pb",
            DualUCost => "dual_system.u_cost",
            DualUDuty => "dual_system.u_duty",
            DualLambdaBase => "dual_system.lambda_base",
            DualLambdaEdu => "dual_system.lambda_edu",
            DualLambdaRisk => "dual_system.lambda_risk",
        }
    }

    /// Admissible `(min, max)` range.
    ///
    /// Cost weights stay ≤ 0, thresholds and noise stay > 0, the arbiter
    /// intercept stays in [0, 1].
    pub fn bounds(&self) -> (f64, f64) {
        use ParamKey::*;
        match self {
            UtilityBetaPb | UtilityBetaD | UtilityBetaH => (0.0, 5.0),
            UtilityBetaS => (0.0, 3.0),
            UtilityBetaC => (-5.0, 0.0),
            UtilityNoise => (0.05, 3.0),

            DdmBaseDrift => (-2.0, 2.0),
            DdmThreshold => (0.1, 5.0),
            DdmSigma => (0.1, 3.0),
            DdmBetaD | DdmBetaH | DdmBetaS | DdmBetaPb => (0.0, 2.0),
            DdmBetaOc => (-1.0, 1.0),
            DdmBetaC => (-2.0, 0.0),

            DualMomentum => (-2.0, 2.0),
            DualHHabit | DualHSocial | DualHAffect => (0.0, 3.0),
            DualUPb | DualUDuty => (0.0, 5.0),
            DualUCost => (-5.0, 0.0),
            DualLambdaBase => (0.0, 1.0),
            DualLambdaEdu | DualLambdaRisk => (-1.0, 1.0),
        }
    }

    /// Maximum displacement at temperature 1.0.
    pub fn range_scale(&self) -> f64 {
        use ParamKey::*;
        match self {
            UtilityBetaPb | UtilityBetaC | UtilityBetaD | UtilityBetaH => 0.5,
            UtilityBetaS => 0.3,
            UtilityNoise => 0.2,
            DdmBaseDrift | DdmThreshold => 0.3,
            DdmSigma => 0.2,
            DdmBetaD | DdmBetaH | DdmBetaS | DdmBetaPb | DdmBetaC => 0.2,
            DdmBetaOc => 0.1,
            DualMomentum => 0.3,
            DualHHabit | DualHSocial | DualHAffect => 0.3,
            DualUPb | DualUCost | DualUDuty => 0.5,
            DualLambdaBase | DualLambdaEdu | DualLambdaRisk => 0.1,
        }
    }

    pub fn get(&self, p: &ModelPhysicsParams) -> f64 {
        use ParamKey::*;
        match self {
            UtilityBetaPb => p.utility.beta_pb,
            UtilityBetaC => p.utility.beta_c,
            UtilityBetaD => p.utility.beta_d,
            UtilityBetaS => p.utility.beta_s,
            UtilityBetaH => p.utility.beta_h,
            UtilityNoise => p.utility.noise,
            DdmBaseDrift => p.ddm.base_drift,
            DdmThreshold => p.ddm.threshold,
            DdmSigma => p.ddm.sigma,
            DdmBetaD => p.ddm.beta_d,
            DdmBetaH => p.ddm.beta_h,
            DdmBetaS => p.ddm.beta_s,
            DdmBetaPb => p.ddm.beta_pb,
            DdmBetaOc => p.ddm.beta_oc,
            DdmBetaC => p.ddm.beta_c,
            DualMomentum => p.dual_system.momentum,
            DualHHabit => p.dual_system.h_habit,
            DualHSocial => p.dual_system.h_social,
            DualHAffect => p.dual_system.h_affect,
            DualUPb => p.dual_system.u_pb,
            DualUCost => p.dual_system.u_cost,
            DualUDuty => p.dual_system.u_duty,
            DualLambdaBase => p.dual_system.lambda_base,
            DualLambdaEdu => p.dual_system.lambda_edu,
            DualLambdaRisk => p.dual_system.lambda_risk,
        }
    }

    pub fn set(&self, p: &mut ModelPhysicsParams, value: f64) {
        use ParamKey::*;
        let slot = match self {
            UtilityBetaPb => &mut p.utility.beta_pb,
            UtilityBetaC => &mut p.utility.beta_c,
            UtilityBetaD => &mut p.utility.beta_d,
            UtilityBetaS => &mut p.utility.beta_s,
            UtilityBetaH => &mut p.utility.beta_h,
            UtilityNoise => &mut p.utility.noise,
            DdmBaseDrift => &mut p.ddm.base_drift,
            DdmThreshold => &mut p.ddm.threshold,
            DdmSigma => &mut p.ddm.sigma,
            DdmBetaD => &mut p.ddm.beta_d,
            DdmBetaH => &mut p.ddm.beta_h,
            DdmBetaS => &mut p.ddm.beta_s,
            DdmBetaPb => &mut p.ddm.beta_pb,
            DdmBetaOc => &mut p.ddm.beta_oc,
            DdmBetaC => &mut p.ddm.beta_c,
            DualMomentum => &mut p.dual_system.momentum,
            DualHHabit => &mut p.dual_system.h_habit,
            DualHSocial => &mut p.dual_system.h_social,
            DualHAffect => &mut p.dual_system.h_affect,
            DualUPb => &mut p.dual_system.u_pb,
            DualUCost => &mut p.dual_system.u_cost,
            DualUDuty => &mut p.dual_system.u_duty,
            DualLambdaBase => &mut p.dual_system.lambda_base,
            DualLambdaEdu => &mut p.dual_system.lambda_edu,
            DualLambdaRisk => &mut p.dual_system.lambda_risk,
        };
        *slot = value;
    }
}

impl std::fmt::Display for ParamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_within_bounds() {
        let params = ModelPhysicsParams::default();
        for key in ParamKey::ALL {
            let (lo, hi) = key.bounds();
            let v = key.get(&params);
            assert!(v >= lo && v <= hi, "{} = {} outside [{}, {}]", key, v, lo, hi);
        }
    }

    #[test]
    fn test_get_set_roundtrip_every_key() {
        let mut params = ModelPhysicsParams::default();
        for (i, key) in ParamKey::ALL.iter().enumerate() {
            key.set(&mut params, i as f64 * 0.01);
        }
        for (i, key) in ParamKey::ALL.iter().enumerate() {
            assert_eq!(key.get(&params), i as f64 * 0.01);
        }
    }

    #[test]
    fn test_set_clamped_respects_sign_constraints() {
        let mut params = ModelPhysicsParams::default();
        params.set_clamped(ParamKey::UtilityBetaC, 0.7);
        params.set_clamped(ParamKey::DdmThreshold, -1.0);
        params.set_clamped(ParamKey::DualLambdaBase, 1.4);

        assert_eq!(params.utility.beta_c, 0.0);
        assert_eq!(params.ddm.threshold, 0.1);
        assert_eq!(params.dual_system.lambda_base, 1.0);
    }

    #[test]
    fn test_keys_partition_by_model() {
        let total: usize = ModelKind::ALL.iter().map(|m| ParamKey::for_model(*m).len()).sum();
        assert_eq!(total, ParamKey::ALL.len());
        assert_eq!(ParamKey::for_model(ModelKind::Utility).len(), 6);
        assert_eq!(ParamKey::for_model(ModelKind::DriftDiffusion).len(), 9);
        assert_eq!(ParamKey::for_model(ModelKind::DualSystem).len(), 10);
    }
}
