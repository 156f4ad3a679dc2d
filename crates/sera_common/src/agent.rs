//! Analysis-agent roles, partial updates and call outcomes.
//!
//! Each analysis agent is an independent scorer over the conversation
//! context. A call either succeeds with a partial state update or resolves to
//! a documented fallback delta; the resolved outcome is recorded in the turn
//! trace, so tests assert on fallback application directly rather than on
//! exception side effects.

use serde::{Deserialize, Serialize};

use crate::state::clamp01;

/// The three analysis agents.
///
/// Analyst and Relational participate in repair iterations; Ethics is
/// monitor-only and runs once per turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Logical-consistency scorer; primary writer of `tension`.
    Analyst,
    /// Relational/affect scorer; primary writer of `emotional_intensity`.
    Relational,
    /// Ethical monitor; reports `concern_level`, never repairs.
    Ethics,
}

impl AgentRole {
    pub fn label(&self) -> &'static str {
        match self {
            AgentRole::Analyst => "analyst",
            AgentRole::Relational => "relational",
            AgentRole::Ethics => "ethics",
        }
    }

    /// Every analysis agent, in the fixed application order.
    pub fn all() -> [AgentRole; 3] {
        [AgentRole::Analyst, AgentRole::Relational, AgentRole::Ethics]
    }

    /// The subset re-invoked by repair iterations.
    pub fn repair_participants() -> [AgentRole; 2] {
        [AgentRole::Analyst, AgentRole::Relational]
    }

    /// Fixed-magnitude recovery applied when this agent's call fails.
    pub fn fallback_delta(&self) -> FallbackDelta {
        match self {
            AgentRole::Analyst => FallbackDelta::Tension(0.10),
            AgentRole::Relational => FallbackDelta::EmotionalIntensity(0.15),
            AgentRole::Ethics => FallbackDelta::ConcernFloor(0.20),
        }
    }
}

/// Partial state update returned by a scoring call.
///
/// Absent fields mean "no opinion"; present values are clamped to [0,1] when
/// applied. `concern_level` is advisory and never enters `InternalState`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentUpdate {
    #[serde(default)]
    pub tension: Option<f64>,
    #[serde(default)]
    pub emotional_intensity: Option<f64>,
    #[serde(default)]
    pub concern_level: Option<f64>,
}

impl AgentUpdate {
    pub fn tension(value: f64) -> Self {
        Self {
            tension: Some(value),
            ..Self::default()
        }
    }

    pub fn emotional_intensity(value: f64) -> Self {
        Self {
            emotional_intensity: Some(value),
            ..Self::default()
        }
    }

    pub fn concern(value: f64) -> Self {
        Self {
            concern_level: Some(value),
            ..Self::default()
        }
    }
}

/// Documented per-role recovery when a call fails.
///
/// Deltas are additive and capped at 1.0; the concern floor raises the
/// turn-scoped concern level to at least the given value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "amount")]
pub enum FallbackDelta {
    Tension(f64),
    EmotionalIntensity(f64),
    ConcernFloor(f64),
}

impl FallbackDelta {
    pub fn describe(&self) -> String {
        match self {
            FallbackDelta::Tension(d) => format!("tension +{:.2}", d),
            FallbackDelta::EmotionalIntensity(d) => format!("emotional_intensity +{:.2}", d),
            FallbackDelta::ConcernFloor(c) => format!("concern floor {:.2}", c),
        }
    }
}

/// How a single agent call resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "resolution")]
pub enum CallResolution {
    /// The agent returned a usable update.
    Scored { update: AgentUpdate },
    /// The call failed (timeout, network, malformed JSON); the documented
    /// delta was applied instead.
    FellBack { error: String, delta: FallbackDelta },
}

/// One agent call as it happened, tagged with the pass it ran in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub role: AgentRole,
    /// 0 for the initial fan-out, 1..=3 for repair iterations.
    pub pass: u8,
    pub resolution: CallResolution,
    pub elapsed_ms: u64,
}

impl AgentOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.resolution, CallResolution::Scored { .. })
    }
}

/// Apply a successful update's intensity fields, clamped.
///
/// Returns the clamped concern level, if the agent reported one, for the
/// caller to track outside the state.
pub fn apply_update(
    state: &mut crate::state::InternalState,
    update: &AgentUpdate,
) -> Option<f64> {
    if let Some(t) = update.tension {
        state.tension = clamp01(t);
    }
    if let Some(e) = update.emotional_intensity {
        state.emotional_intensity = clamp01(e);
    }
    update.concern_level.map(clamp01)
}

/// Apply a fallback delta.
///
/// Returns the new concern floor when the delta is concern-kind.
pub fn apply_fallback(
    state: &mut crate::state::InternalState,
    delta: FallbackDelta,
) -> Option<f64> {
    match delta {
        FallbackDelta::Tension(d) => {
            state.tension = clamp01(state.tension + d);
            None
        }
        FallbackDelta::EmotionalIntensity(d) => {
            state.emotional_intensity = clamp01(state.emotional_intensity + d);
            None
        }
        FallbackDelta::ConcernFloor(c) => Some(c),
    }
}
