//! Property-Based Tests
//!
//! Invariants verified across randomized inputs. Uses a small xorshift
//! generator built on the standard library rather than external crates.
//!
//! ## Invariants Tested
//!
//! - trust: tau follows the weighted formula and stays in [0.0, 1.0]
//! - regulation: the selector is total and its row precedence is fixed
//! - intensity: aggregation is idempotent and bounded
//! - contradiction: the score stays in [0.0, 1.0] for any transcript
//! - plans: validated weights always sum to 1.0

use sera_common::{
    clamp01, Conversation, InternalState, Message, Participant, RawPlan, RawSubtask,
    RegulationMode, TaskPlan, WEIGHT_SUM_TOLERANCE,
};
use serad::coherence::{contradiction, intensity, regulation, trust};

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Simple pseudo-random number generator for test inputs
/// Uses xorshift64 algorithm
struct TestRng {
    state: u64,
}

impl TestRng {
    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64)
    }

    fn next_range(&mut self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        min + (self.next_u64() % (max - min))
    }
}

/// Word pool mixing neutral filler with polarity, hedging and marker words,
/// so random transcripts exercise every scoring path.
const WORD_POOL: [&str; 14] = [
    "the", "plan", "seems", "fine", "today", "work", "later", "yes", "no", "agree", "disagree",
    "maybe", "but", "true",
];

fn random_message(rng: &mut TestRng) -> String {
    let words = rng.next_range(1, 12) as usize;
    (0..words)
        .map(|_| WORD_POOL[(rng.next_u64() % WORD_POOL.len() as u64) as usize])
        .collect::<Vec<_>>()
        .join(" ")
}

fn random_conversation(rng: &mut TestRng, max_messages: u64) -> Conversation {
    let mut conv = Conversation::new();
    let count = rng.next_range(0, max_messages + 1);
    for i in 0..count {
        let content = random_message(rng);
        if i % 2 == 0 {
            conv.push(Message::user(content));
        } else {
            conv.push(Message::assistant(content));
        }
    }
    conv
}

// ============================================================================
// Trust Invariants
// ============================================================================

mod trust_properties {
    use super::*;

    /// Tau MUST equal the weighted formula for in-range signals
    #[test]
    fn test_prop_trust_001_formula_holds() {
        let mut rng = TestRng::new(42);

        for _ in 0..1000 {
            let t = rng.next_f64();
            let u = rng.next_f64();
            let c = rng.next_f64();

            let expected = clamp01(1.0 - (0.4 * t + 0.3 * u + 0.3 * c));
            let tau = trust::compute(t, u, c);
            assert!(
                (tau - expected).abs() < 1e-12,
                "tau {} != expected {} for ({}, {}, {})",
                tau,
                expected,
                t,
                u,
                c
            );
        }
    }

    /// Tau MUST stay in [0.0, 1.0] even for out-of-range signals
    #[test]
    fn test_prop_trust_002_bounds() {
        let mut rng = TestRng::new(12345);

        for _ in 0..1000 {
            let t = rng.next_f64() * 4.0 - 1.0;
            let u = rng.next_f64() * 4.0 - 1.0;
            let c = rng.next_f64() * 4.0 - 1.0;

            let tau = trust::compute(t, u, c);
            assert!(
                (0.0..=1.0).contains(&tau),
                "tau {} outside [0,1] for ({}, {}, {})",
                tau,
                t,
                u,
                c
            );
        }
    }

    /// Raising any single signal MUST never raise tau
    #[test]
    fn test_prop_trust_003_monotone_in_each_signal() {
        let mut rng = TestRng::new(67890);

        for _ in 0..500 {
            let t = rng.next_f64() * 0.5;
            let u = rng.next_f64() * 0.5;
            let c = rng.next_f64() * 0.5;
            let bump = rng.next_f64() * 0.5;

            let base = trust::compute(t, u, c);
            assert!(trust::compute(t + bump, u, c) <= base + 1e-12);
            assert!(trust::compute(t, u + bump, c) <= base + 1e-12);
            assert!(trust::compute(t, u, c + bump) <= base + 1e-12);
        }
    }

    /// The documented reference point MUST hold
    #[test]
    fn test_prop_trust_004_reference_example() {
        // T=0.1, U=0.0004, C=0.0 -> tau = 1 - (0.04 + 0.00012) = 0.95988.
        let tau = trust::compute(0.1, 0.0004, 0.0);
        assert!((tau - 0.95988).abs() < 1e-9, "tau {} != 0.95988", tau);
    }
}

// ============================================================================
// Regulation Invariants
// ============================================================================

mod regulation_properties {
    use super::*;

    /// The selector MUST return a mode for every signal combination
    #[test]
    fn test_prop_reg_001_totality() {
        let mut rng = TestRng::new(22222);

        for _ in 0..1000 {
            let mode = regulation::select(rng.next_f64(), rng.next_f64(), rng.next_f64());
            match mode {
                RegulationMode::Normal | RegulationMode::Clarify | RegulationMode::SlowDown => {}
            }
        }
    }

    /// Tension or contradiction above 0.7 MUST force slow_down, whatever
    /// the other signals say
    #[test]
    fn test_prop_reg_002_slow_down_precedence() {
        let mut rng = TestRng::new(33333);

        for _ in 0..1000 {
            let u = rng.next_f64();

            let t = 0.7 + rng.next_f64() * 0.3 + 1e-9;
            assert_eq!(
                regulation::select(t, u, rng.next_f64()),
                RegulationMode::SlowDown,
                "tension {} did not force slow_down",
                t
            );

            let c = 0.7 + rng.next_f64() * 0.3 + 1e-9;
            assert_eq!(
                regulation::select(rng.next_f64() * 0.7, u, c),
                RegulationMode::SlowDown,
                "contradiction {} did not force slow_down",
                c
            );
        }
    }

    /// Contradiction in (0.6, 0.7] with tension at or below 0.7 MUST
    /// clarify regardless of uncertainty
    #[test]
    fn test_prop_reg_003_forced_clarify_band() {
        let mut rng = TestRng::new(44444);

        for _ in 0..1000 {
            let c = 0.601 + rng.next_f64() * 0.099;
            let t = rng.next_f64() * 0.7;
            let u = rng.next_f64();

            assert_eq!(
                regulation::select(t, u, c),
                RegulationMode::Clarify,
                "({}, {}, {}) escaped the forced-clarify band",
                t,
                u,
                c
            );
        }
    }

    /// Thresholds MUST be strict: boundary values match no row
    #[test]
    fn test_prop_reg_004_boundaries_are_strict() {
        assert_eq!(regulation::select(0.7, 0.0, 0.0), RegulationMode::Normal);
        assert_eq!(regulation::select(0.0, 0.0, 0.7), RegulationMode::Clarify);
        assert_eq!(regulation::select(0.0, 0.0, 0.6), RegulationMode::Normal);
        assert_eq!(regulation::select(0.5, 0.5, 0.0), RegulationMode::Normal);
        assert_eq!(regulation::select(0.7, 0.5, 0.6), RegulationMode::Normal);
    }

    /// Selection MUST be deterministic
    #[test]
    fn test_prop_reg_005_determinism() {
        let mut rng = TestRng::new(55555);

        for _ in 0..500 {
            let t = rng.next_f64();
            let u = rng.next_f64();
            let c = rng.next_f64();
            assert_eq!(regulation::select(t, u, c), regulation::select(t, u, c));
        }
    }
}

// ============================================================================
// Intensity Aggregation Invariants
// ============================================================================

mod intensity_properties {
    use super::*;

    /// Aggregating twice over an unchanged transcript MUST change nothing
    #[test]
    fn test_prop_sim_001_idempotence() {
        let mut rng = TestRng::new(66666);

        for _ in 0..200 {
            let conv = random_conversation(&mut rng, 10);
            let mut state = InternalState::new();
            state.tension = rng.next_f64();
            state.emotional_intensity = rng.next_f64();

            intensity::aggregate(&conv, &mut state);
            let first_uncertainty = state.uncertainty;
            let first_tension = state.tension;
            let first_intensity = state.emotional_intensity;

            intensity::aggregate(&conv, &mut state);
            assert_eq!(state.uncertainty, first_uncertainty);
            assert_eq!(state.tension, first_tension);
            assert_eq!(state.emotional_intensity, first_intensity);
        }
    }

    /// Uncertainty MUST stay within the variance cap plus the hedging boost
    #[test]
    fn test_prop_sim_002_uncertainty_bounds() {
        let mut rng = TestRng::new(77777);

        for _ in 0..500 {
            let conv = random_conversation(&mut rng, 10);
            let mut state = InternalState::new();

            intensity::aggregate(&conv, &mut state);
            assert!(
                (0.0..=0.8).contains(&state.uncertainty),
                "uncertainty {} outside [0, 0.8]",
                state.uncertainty
            );
        }
    }

    /// Aggregation MUST clamp whatever the agents wrote back into range
    #[test]
    fn test_prop_sim_003_reclamps_any_state() {
        let mut rng = TestRng::new(88888);

        for _ in 0..500 {
            let conv = random_conversation(&mut rng, 6);
            let mut state = InternalState::new();
            state.tension = rng.next_f64() * 10.0 - 5.0;
            state.emotional_intensity = rng.next_f64() * 10.0 - 5.0;

            intensity::aggregate(&conv, &mut state);
            assert!((0.0..=1.0).contains(&state.tension));
            assert!((0.0..=1.0).contains(&state.emotional_intensity));
        }
    }
}

// ============================================================================
// Contradiction Invariants
// ============================================================================

mod contradiction_properties {
    use super::*;

    /// The score MUST stay in [0.0, 1.0] for any transcript and tension
    #[test]
    fn test_prop_cam_001_bounds() {
        let mut rng = TestRng::new(99999);

        for _ in 0..500 {
            let conv = random_conversation(&mut rng, 12);
            let mut state = InternalState::new();
            state.tension = rng.next_f64();

            contradiction::score(&conv, &mut state);
            assert!(
                (0.0..=1.0).contains(&state.contradiction),
                "contradiction {} outside [0,1]",
                state.contradiction
            );
        }
    }

    /// Scoring MUST be deterministic over an unchanged transcript
    #[test]
    fn test_prop_cam_002_determinism() {
        let mut rng = TestRng::new(111111);

        for _ in 0..200 {
            let conv = random_conversation(&mut rng, 10);
            let mut state = InternalState::new();
            state.tension = rng.next_f64();

            contradiction::score(&conv, &mut state);
            let first = state.contradiction;
            contradiction::score(&conv, &mut state);
            assert_eq!(state.contradiction, first);
        }
    }

    /// Without a user turn only tension spillover can score
    #[test]
    fn test_prop_cam_003_assistant_only_transcripts() {
        let mut rng = TestRng::new(222222);

        for _ in 0..200 {
            let mut conv = Conversation::new();
            for _ in 0..rng.next_range(0, 6) {
                conv.push(Message::assistant(random_message(&mut rng)));
            }

            let mut state = InternalState::new();
            state.tension = rng.next_f64() * 0.7;
            contradiction::score(&conv, &mut state);
            assert_eq!(state.contradiction, 0.0);

            state.tension = 0.71 + rng.next_f64() * 0.29;
            contradiction::score(&conv, &mut state);
            assert!((state.contradiction - 0.15).abs() < 1e-12);
        }
    }
}

// ============================================================================
// Full Pass Invariants
// ============================================================================

mod pass_properties {
    use super::*;

    /// A second pass over an unchanged transcript MUST be a no-op
    #[test]
    fn test_prop_pass_001_idempotence() {
        let mut rng = TestRng::new(333333);

        for _ in 0..200 {
            let conv = random_conversation(&mut rng, 10);
            let mut state = InternalState::new();
            state.tension = rng.next_f64();
            state.emotional_intensity = rng.next_f64();

            serad::coherence::run_pass(&conv, &mut state);
            let first = state.clone();
            serad::coherence::run_pass(&conv, &mut state);

            assert_eq!(state.tension, first.tension);
            assert_eq!(state.uncertainty, first.uncertainty);
            assert_eq!(state.emotional_intensity, first.emotional_intensity);
            assert_eq!(state.contradiction, first.contradiction);
            assert_eq!(state.regulation, first.regulation);
            assert_eq!(state.trust_tau, first.trust_tau);
        }
    }

    /// After any pass the regulation mode MUST match a fresh selection over
    /// the state's own signals
    #[test]
    fn test_prop_pass_002_regulation_consistent_with_signals() {
        let mut rng = TestRng::new(444444);

        for _ in 0..200 {
            let conv = random_conversation(&mut rng, 10);
            let mut state = InternalState::new();
            state.tension = rng.next_f64();

            serad::coherence::run_pass(&conv, &mut state);
            assert_eq!(
                state.regulation,
                regulation::select(state.tension, state.uncertainty, state.contradiction)
            );
            assert_eq!(
                state.trust_tau,
                trust::compute(state.tension, state.uncertainty, state.contradiction)
            );
        }
    }
}

// ============================================================================
// Plan Invariants
// ============================================================================

mod plan_properties {
    use super::*;

    fn raw_plan(weights: [f64; 4]) -> RawPlan {
        let participants = ["analyst", "relational", "ethics", "verifier"];
        RawPlan {
            subtasks: participants
                .iter()
                .zip(weights.iter())
                .map(|(p, w)| RawSubtask {
                    participant: (*p).to_string(),
                    description: format!("{} subtask", p),
                    weight: *w,
                })
                .collect(),
        }
    }

    /// Any positive weight set MUST validate, and the accepted weights MUST
    /// sum to 1.0 within the tolerance band
    #[test]
    fn test_prop_plan_001_weights_renormalize() {
        let mut rng = TestRng::new(555555);

        for _ in 0..500 {
            let weights = [
                0.01 + rng.next_f64() * 10.0,
                0.01 + rng.next_f64() * 10.0,
                0.01 + rng.next_f64() * 10.0,
                0.01 + rng.next_f64() * 10.0,
            ];
            let raw_sum: f64 = weights.iter().sum();

            let plan = TaskPlan::from_raw(raw_plan(weights)).expect("positive weights validate");
            let sum: f64 = plan.subtasks.iter().map(|s| s.weight).sum();
            assert!(
                (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE + 1e-9,
                "weights sum to {}",
                sum
            );

            if (raw_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                // Renormalization preserves proportions.
                let expected_analyst = weights[0] / raw_sum;
                assert!(
                    (plan.weight_of(Participant::Analyst) - expected_analyst).abs() < 1e-9,
                    "analyst weight {} != {}",
                    plan.weight_of(Participant::Analyst),
                    expected_analyst
                );
            } else {
                // A sum inside the band is accepted untouched.
                assert_eq!(plan.weight_of(Participant::Analyst), weights[0]);
            }
        }
    }

    /// Negative or non-finite weights MUST be rejected
    #[test]
    fn test_prop_plan_002_invalid_weights_rejected() {
        let mut rng = TestRng::new(666666);

        for _ in 0..200 {
            let mut weights = [
                rng.next_f64(),
                rng.next_f64(),
                rng.next_f64(),
                rng.next_f64(),
            ];
            let slot = (rng.next_u64() % 4) as usize;

            weights[slot] = -0.1 - rng.next_f64();
            assert!(TaskPlan::from_raw(raw_plan(weights)).is_none());

            weights[slot] = f64::NAN;
            assert!(TaskPlan::from_raw(raw_plan(weights)).is_none());

            weights[slot] = f64::INFINITY;
            assert!(TaskPlan::from_raw(raw_plan(weights)).is_none());
        }
    }

    /// Both fallback splits MUST always be valid plans
    #[test]
    fn test_prop_plan_003_fallbacks_always_valid() {
        for factual in [false, true] {
            let plan = TaskPlan::fallback(factual);
            assert_eq!(plan.subtasks.len(), 4);
            let sum: f64 = plan.subtasks.iter().map(|s| s.weight).sum();
            assert!((sum - 1.0).abs() < 1e-9);
            for participant in Participant::all() {
                assert!(plan.weight_of(participant) > 0.0);
            }
        }
    }
}
