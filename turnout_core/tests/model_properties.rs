use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use turnout_core::models::first_passage_probability;
use turnout_core::{
    Agent, AgentGenerationParams, AgentGenerator, FullSimulationConfig, ModelKind, ModelPhysicsParams,
    NudgeKind, ParamKey, ScenarioContext, SimulationSettings, Simulator,
};
use turnout_env::SimContext;

fn unit() -> impl Strategy<Value = f64> {
    0.0f64..=1.0
}

prop_compose! {
    fn arb_agent()(
        education in unit(),
        civic_duty in unit(),
        habit in 0u32..=5,
        social in unit(),
        risk in unit(),
        partisan in unit(),
        overconfidence in unit(),
        candidate in unit(),
        issue in unit(),
    ) -> Agent {
        Agent {
            id: 0,
            education,
            civic_duty,
            habit_strength: habit as f64 / 5.0,
            social_sensitivity: social,
            risk_aversion: risk,
            partisan_strength: partisan,
            overconfidence,
            candidate_match: candidate,
            issue_salience: issue,
            age: 40,
            urban: false,
        }
    }
}

prop_compose! {
    fn arb_scenario()(target in unit(), comp in unit(), cost in unit()) -> ScenarioContext {
        ScenarioContext::new("prop", target, comp, cost)
    }
}

prop_compose! {
    /// Any parameter set within the admissible bounds.
    fn arb_physics()(fractions in prop::collection::vec(unit(), ParamKey::ALL.len())) -> ModelPhysicsParams {
        let mut physics = ModelPhysicsParams::default();
        for (key, f) in ParamKey::ALL.iter().zip(fractions) {
            let (lo, hi) = key.bounds();
            key.set(&mut physics, lo + f * (hi - lo));
        }
        physics
    }
}

fn arb_nudge() -> impl Strategy<Value = NudgeKind> {
    prop::sample::select(vec![
        NudgeKind::None,
        NudgeKind::Monetary,
        NudgeKind::SocialNorm,
        NudgeKind::IdentityFrame,
        NudgeKind::Disclosure,
        NudgeKind::Implementation,
        NudgeKind::Competitiveness,
    ])
}

proptest! {
    #[test]
    fn probability_always_in_unit_interval(
        agent in arb_agent(),
        scenario in arb_scenario(),
        physics in arb_physics(),
        nudge in arb_nudge(),
    ) {
        let nudge = nudge.with_defaults();
        for kind in ModelKind::ALL {
            let p = kind.model().probability(&agent, &scenario, &physics, &nudge);
            prop_assert!(p.is_finite());
            prop_assert!((0.0..=1.0).contains(&p), "{} gave {}", kind, p);
        }
    }

    #[test]
    fn ddm_monotone_in_drift(
        a in 0.05f64..5.0,
        z_frac in 0.01f64..0.99,
        sigma in 0.05f64..3.0,
        mu in -2.0f64..2.0,
        step in 0.0f64..0.5,
    ) {
        let z = a * z_frac;
        let lower = first_passage_probability(mu, a, z, sigma);
        let upper = first_passage_probability((mu + step).min(2.0), a, z, sigma);
        prop_assert!(upper >= lower - 1e-9, "P({}) = {} > P({}) = {}", mu, lower, mu + step, upper);
    }

    #[test]
    fn generated_traits_are_normalized(seed in any::<u64>(), skew in 0.05f64..10.0) {
        let params = AgentGenerationParams {
            education_skew: skew,
            civic_duty_skew: skew,
            issue_salience_skew: 1.0 / skew,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let agents = AgentGenerator::generate(&params, 50, &mut rng).unwrap();

        for agent in &agents {
            for (name, value) in agent.traits() {
                prop_assert!((0.0..=1.0).contains(&value), "{} = {}", name, value);
            }
        }
    }
}

/// Realized turnout converges to the mean per-agent probability.
#[test]
fn turnout_converges_to_mean_probability() {
    let config = FullSimulationConfig::default();
    let seeds = 0..8u64;

    for kind in ModelKind::ALL {
        let gaps: Vec<f64> = seeds
            .clone()
            .map(|seed| {
                let settings = SimulationSettings::new(kind).with_population(10_000);
                let result = Simulator::run(&config, &settings, &SimContext::new(seed)).unwrap();
                (result.turnout - result.mean_probability).abs()
            })
            .collect();

        // Standard error is at most 0.5pp at N = 10,000
        let mean_gap = gaps.iter().sum::<f64>() / gaps.len() as f64;
        assert!(mean_gap < 0.01, "{}: mean gap {} over seeds {:?}", kind, mean_gap, gaps);
        assert!(gaps.iter().all(|g| *g < 0.02), "{}: gaps {:?}", kind, gaps);
    }
}
