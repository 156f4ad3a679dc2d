//! Per-session coherence state.
//!
//! One `InternalState` is owned exclusively by its session. It is mutated in
//! place while a turn is being processed and snapshotted at turn boundaries;
//! nothing outside the owning session ever writes to it.

use serde::{Deserialize, Serialize};

/// Hard cap on repair iterations within one turn.
pub const MAX_REPAIRS: u8 = 3;

/// Clamp a signal into the unit interval.
///
/// Every scalar in the coherence state lives in [0,1]; upstream model output
/// is not trusted to respect that.
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Behavioral policy selected once per pipeline pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegulationMode {
    /// Converse normally.
    Normal,
    /// Ask for clarification before committing to an answer.
    Clarify,
    /// De-escalate: short, grounding responses.
    SlowDown,
}

impl RegulationMode {
    /// Short label for display and reports.
    pub fn label(&self) -> &'static str {
        match self {
            RegulationMode::Normal => "normal",
            RegulationMode::Clarify => "clarify",
            RegulationMode::SlowDown => "slow_down",
        }
    }
}

impl Default for RegulationMode {
    fn default() -> Self {
        RegulationMode::Normal
    }
}

/// Coherence signals for one conversation session.
///
/// `tension`, `uncertainty` and `emotional_intensity` are the intensity
/// dimensions written by the analysis agents and the intensity aggregator.
/// `contradiction` is derived from recent user turns, `regulation` and
/// `trust_tau` from the signals above. `repair_count` counts repair
/// iterations within the current turn and is reset when a new turn begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalState {
    pub tension: f64,
    pub uncertainty: f64,
    pub emotional_intensity: f64,
    pub contradiction: f64,
    pub regulation: RegulationMode,
    pub trust_tau: f64,
    pub repair_count: u8,
}

impl InternalState {
    /// Fresh state for a new session: all signals at rest, full trust.
    pub fn new() -> Self {
        Self {
            tension: 0.0,
            uncertainty: 0.0,
            emotional_intensity: 0.0,
            contradiction: 0.0,
            regulation: RegulationMode::Normal,
            trust_tau: 1.0,
            repair_count: 0,
        }
    }

    /// Re-clamp every intensity dimension into [0,1].
    ///
    /// Agents write these fields from model output; the aggregator calls this
    /// on every pass so a wild value never survives past one stage.
    pub fn clamp_intensities(&mut self) {
        self.tension = clamp01(self.tension);
        self.uncertainty = clamp01(self.uncertainty);
        self.emotional_intensity = clamp01(self.emotional_intensity);
    }

    /// One-line summary for logs and the REPL status line.
    pub fn summary(&self) -> String {
        format!(
            "tau={:.3} regulation={} tension={:.2} uncertainty={:.2} intensity={:.2} contradiction={:.2} repairs={}",
            self.trust_tau,
            self.regulation.label(),
            self.tension,
            self.uncertainty,
            self.emotional_intensity,
            self.contradiction,
            self.repair_count,
        )
    }
}

impl Default for InternalState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_at_rest() {
        let state = InternalState::new();
        assert_eq!(state.tension, 0.0);
        assert_eq!(state.uncertainty, 0.0);
        assert_eq!(state.emotional_intensity, 0.0);
        assert_eq!(state.contradiction, 0.0);
        assert_eq!(state.regulation, RegulationMode::Normal);
        assert_eq!(state.trust_tau, 1.0);
        assert_eq!(state.repair_count, 0);
    }

    #[test]
    fn test_clamp01_bounds() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(0.0), 0.0);
        assert_eq!(clamp01(0.42), 0.42);
        assert_eq!(clamp01(1.0), 1.0);
        assert_eq!(clamp01(3.7), 1.0);
    }

    #[test]
    fn test_clamp_intensities_repairs_wild_values() {
        let mut state = InternalState::new();
        state.tension = 1.8;
        state.uncertainty = -0.2;
        state.emotional_intensity = 0.5;

        state.clamp_intensities();

        assert_eq!(state.tension, 1.0);
        assert_eq!(state.uncertainty, 0.0);
        assert_eq!(state.emotional_intensity, 0.5);
    }

    #[test]
    fn test_regulation_labels() {
        assert_eq!(RegulationMode::Normal.label(), "normal");
        assert_eq!(RegulationMode::Clarify.label(), "clarify");
        assert_eq!(RegulationMode::SlowDown.label(), "slow_down");
    }

    #[test]
    fn test_state_serializes_round_trip() {
        let mut state = InternalState::new();
        state.tension = 0.3;
        state.regulation = RegulationMode::SlowDown;
        state.repair_count = 2;

        let json = serde_json::to_string(&state).unwrap();
        let back: InternalState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tension, 0.3);
        assert_eq!(back.regulation, RegulationMode::SlowDown);
        assert_eq!(back.repair_count, 2);
    }
}
