//! Trust calculation.
//!
//! τ is a pure function of the three signals at computation time, with no
//! state carried across turns. It is recomputed on the initial pass
//! and after every repair iteration, so it can change within a single turn.
//! The weights are a public contract shared with every consumer that
//! displays τ; they are constants, not configuration.

use sera_common::{clamp01, InternalState};

pub const TENSION_WEIGHT: f64 = 0.4;
pub const UNCERTAINTY_WEIGHT: f64 = 0.3;
pub const CONTRADICTION_WEIGHT: f64 = 0.3;

/// τ = clamp(1 − (0.4·tension + 0.3·uncertainty + 0.3·contradiction), 0, 1).
pub fn compute(tension: f64, uncertainty: f64, contradiction: f64) -> f64 {
    clamp01(
        1.0 - (TENSION_WEIGHT * tension
            + UNCERTAINTY_WEIGHT * uncertainty
            + CONTRADICTION_WEIGHT * contradiction),
    )
}

/// Recompute τ from the state's signals and store it.
pub fn apply(state: &mut InternalState) {
    state.trust_tau = compute(state.tension, state.uncertainty, state.contradiction);
}
