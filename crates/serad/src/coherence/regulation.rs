//! Regulation mode selection.
//!
//! A pure decision table over the raw signals. This is the only place a
//! regulation transition happens: the contradiction module reports its score
//! and the selector applies the forced-clarify rule at its fixed precedence
//! slot, so no stage ever read-modify-writes a mode chosen by another.
//!
//! Row order is load-bearing: swapping rows 1 and 2 changes repair-loop
//! termination behavior.

use sera_common::{InternalState, RegulationMode};

/// Row 1: tension or contradiction above this forces slow_down.
pub const SLOW_DOWN_TENSION: f64 = 0.7;
pub const SLOW_DOWN_CONTRADICTION: f64 = 0.7;

/// Row 2: contradiction above this forces clarify.
pub const FORCED_CLARIFY_CONTRADICTION: f64 = 0.6;

/// Row 3: tension and uncertainty both above these ask for clarify.
pub const CLARIFY_TENSION: f64 = 0.5;
pub const CLARIFY_UNCERTAINTY: f64 = 0.5;

/// Pick the regulation mode. First matching row wins; slow_down always
/// beats any clarify condition.
pub fn select(tension: f64, uncertainty: f64, contradiction: f64) -> RegulationMode {
    if tension > SLOW_DOWN_TENSION || contradiction > SLOW_DOWN_CONTRADICTION {
        RegulationMode::SlowDown
    } else if contradiction > FORCED_CLARIFY_CONTRADICTION {
        RegulationMode::Clarify
    } else if tension > CLARIFY_TENSION && uncertainty > CLARIFY_UNCERTAINTY {
        RegulationMode::Clarify
    } else {
        RegulationMode::Normal
    }
}

/// Run the selector over the state's signals and store the chosen mode.
pub fn apply(state: &mut InternalState) {
    state.regulation = select(state.tension, state.uncertainty, state.contradiction);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calm_signals_stay_normal() {
        assert_eq!(select(0.0, 0.0, 0.0), RegulationMode::Normal);
        assert_eq!(select(0.5, 0.5, 0.6), RegulationMode::Normal);
    }

    #[test]
    fn test_high_tension_forces_slow_down() {
        assert_eq!(select(0.71, 0.0, 0.0), RegulationMode::SlowDown);
    }

    #[test]
    fn test_high_contradiction_forces_slow_down() {
        assert_eq!(select(0.0, 0.0, 0.71), RegulationMode::SlowDown);
    }

    #[test]
    fn test_forced_clarify_band() {
        assert_eq!(select(0.0, 0.0, 0.65), RegulationMode::Clarify);
        assert_eq!(select(0.0, 0.0, 0.7), RegulationMode::Clarify);
    }

    #[test]
    fn test_tension_uncertainty_clarify_needs_both() {
        assert_eq!(select(0.6, 0.6, 0.0), RegulationMode::Clarify);
        assert_eq!(select(0.6, 0.4, 0.0), RegulationMode::Normal);
        assert_eq!(select(0.4, 0.6, 0.0), RegulationMode::Normal);
    }

    #[test]
    fn test_slow_down_wins_over_forced_clarify() {
        // Both the slow_down row and the forced-clarify row match; the
        // slow_down row is first.
        assert_eq!(select(0.8, 0.0, 0.65), RegulationMode::SlowDown);
        assert_eq!(select(0.0, 0.0, 0.9), RegulationMode::SlowDown);
    }

    #[test]
    fn test_thresholds_are_strict() {
        assert_eq!(select(0.7, 0.0, 0.0), RegulationMode::Normal);
        assert_eq!(select(0.0, 0.0, 0.6), RegulationMode::Normal);
        assert_eq!(select(0.5, 0.5, 0.0), RegulationMode::Normal);
    }

    #[test]
    fn test_apply_writes_the_mode() {
        let mut state = InternalState::new();
        state.tension = 0.9;
        apply(&mut state);
        assert_eq!(state.regulation, RegulationMode::SlowDown);
    }
}
