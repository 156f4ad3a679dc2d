//! Per-turn execution trace.
//!
//! A "fly on the wall" record of one pipeline turn: per-pass signal
//! snapshots, tagged agent outcomes, verifier output, plan, synthesis origin
//! and timings. All narrative text comes from static templates; rendering a
//! trace never makes a model call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::{AgentOutcome, CallResolution};
use crate::plan::TaskPlan;
use crate::state::{InternalState, RegulationMode, MAX_REPAIRS};
use crate::verified::VerifiedOutput;

// ============================================================================
// Synthesis Origin - Where did the response text come from?
// ============================================================================

/// Origin of the final response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisOrigin {
    /// Responder model produced the text.
    Llm,
    /// Provider failed; the deterministic per-mode template was used.
    Fallback,
}

impl SynthesisOrigin {
    /// Short label for display and reports.
    pub fn label(&self) -> &'static str {
        match self {
            SynthesisOrigin::Llm => "llm",
            SynthesisOrigin::Fallback => "fallback",
        }
    }
}

// ============================================================================
// Pass Trace - Signals after one full module pass
// ============================================================================

/// The coherence signals as they stood after one SIM→CAM→SRE→CTM pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassTrace {
    /// 0 for the initial pass, 1..=3 for repair iterations.
    pub pass: u8,
    pub tension: f64,
    pub uncertainty: f64,
    pub emotional_intensity: f64,
    pub contradiction: f64,
    pub regulation: RegulationMode,
    pub trust_tau: f64,
}

impl PassTrace {
    /// Snapshot the state after a module pass. The pass index is the repair
    /// count at capture time: 0 on the initial pass, then 1..=3.
    pub fn capture(state: &InternalState) -> Self {
        Self {
            pass: state.repair_count,
            tension: state.tension,
            uncertainty: state.uncertainty,
            emotional_intensity: state.emotional_intensity,
            contradiction: state.contradiction,
            regulation: state.regulation,
            trust_tau: state.trust_tau,
        }
    }
}

// ============================================================================
// Turn Trace - The complete record of one turn
// ============================================================================

/// Complete record of how one turn was processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnTrace {
    pub session_id: Uuid,
    pub user_input: String,
    pub started_at: DateTime<Utc>,
    /// Advisory decomposition, when the planner ran.
    pub plan: Option<TaskPlan>,
    /// Every agent call in launch order, tagged with its pass.
    pub agent_outcomes: Vec<AgentOutcome>,
    /// One snapshot per module pass (initial pass plus each repair).
    pub passes: Vec<PassTrace>,
    /// Verification result; `None` when the verifier call degraded.
    pub verifier: Option<VerifiedOutput>,
    /// The query looked factual, making the verification pass salient.
    pub verifier_salient: bool,
    /// Highest concern reported (or floored) by Ethics this turn.
    pub concern_level: Option<f64>,
    pub synthesis_origin: SynthesisOrigin,
    /// Regulation was still non-normal when the repair cap was hit.
    pub repairs_exhausted: bool,
    pub total_duration_ms: u64,
}

impl TurnTrace {
    /// Start a trace for a turn.
    pub fn new(session_id: Uuid, user_input: &str) -> Self {
        Self {
            session_id,
            user_input: user_input.to_string(),
            started_at: Utc::now(),
            plan: None,
            agent_outcomes: Vec::new(),
            passes: Vec::new(),
            verifier: None,
            verifier_salient: false,
            concern_level: None,
            synthesis_origin: SynthesisOrigin::Fallback,
            repairs_exhausted: false,
            total_duration_ms: 0,
        }
    }

    /// Record one agent call outcome.
    pub fn record_outcome(&mut self, outcome: AgentOutcome) {
        self.agent_outcomes.push(outcome);
    }

    /// Snapshot the state after a module pass.
    pub fn record_pass(&mut self, state: &InternalState) {
        self.passes.push(PassTrace::capture(state));
    }

    /// Track the turn-scoped concern level; the highest value wins.
    pub fn note_concern(&mut self, level: f64) {
        let current = self.concern_level.unwrap_or(0.0);
        if self.concern_level.is_none() || level > current {
            self.concern_level = Some(level);
        }
    }

    /// Close out the trace with the total wall-clock duration and whether
    /// the repair loop hit its cap without settling.
    pub fn finalize(&mut self, state: &InternalState, total_duration_ms: u64) {
        self.repairs_exhausted =
            state.repair_count == MAX_REPAIRS && state.regulation != RegulationMode::Normal;
        self.total_duration_ms = total_duration_ms;
    }

    /// Signals after the last module pass, if any pass ran.
    pub fn final_pass(&self) -> Option<&PassTrace> {
        self.passes.last()
    }

    /// Number of agent calls that resolved to a fallback delta.
    pub fn fallback_count(&self) -> usize {
        self.agent_outcomes
            .iter()
            .filter(|o| !o.succeeded())
            .count()
    }

    /// Compact one-line summary for logs.
    pub fn summary(&self) -> String {
        let (tau, regulation) = self
            .final_pass()
            .map(|p| (p.trust_tau, p.regulation.label()))
            .unwrap_or((0.0, "unset"));
        format!(
            "{} passes, {} agent calls ({} fell back), regulation {}, tau {:.3}, {}ms",
            self.passes.len(),
            self.agent_outcomes.len(),
            self.fallback_count(),
            regulation,
            tau,
            self.total_duration_ms,
        )
    }

    /// Human-readable narrative of the turn (static strings, no model calls).
    pub fn to_narrative(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("[TRACE] Turn for session {}", self.session_id));
        lines.push(String::new());

        if let Some(ref plan) = self.plan {
            lines.push(format!("Plan: {}", plan.summary()));
        }

        if !self.agent_outcomes.is_empty() {
            lines.push("Agent calls:".to_string());
            for outcome in &self.agent_outcomes {
                match &outcome.resolution {
                    CallResolution::Scored { .. } => {
                        lines.push(format!(
                            "  - {} pass {}: scored ({}ms)",
                            outcome.role.label(),
                            outcome.pass,
                            outcome.elapsed_ms
                        ));
                    }
                    CallResolution::FellBack { error, delta } => {
                        lines.push(format!(
                            "  - {} pass {}: fell back, {} applied ({})",
                            outcome.role.label(),
                            outcome.pass,
                            delta.describe(),
                            error
                        ));
                    }
                }
            }
        }

        if !self.passes.is_empty() {
            lines.push("Passes:".to_string());
            for pass in &self.passes {
                lines.push(format!(
                    "  - pass {}: tension={:.2} uncertainty={:.2} intensity={:.2} contradiction={:.2} -> {} (tau={:.3})",
                    pass.pass,
                    pass.tension,
                    pass.uncertainty,
                    pass.emotional_intensity,
                    pass.contradiction,
                    pass.regulation.label(),
                    pass.trust_tau,
                ));
            }
        }

        match &self.verifier {
            Some(output) => {
                let salient = if self.verifier_salient {
                    " [salient]"
                } else {
                    ""
                };
                lines.push(format!("Verification{}: {}", salient, output.summary()));
            }
            None => lines.push("Verification: unavailable".to_string()),
        }

        if let Some(concern) = self.concern_level {
            lines.push(format!("Concern level: {:.2}", concern));
        }

        lines.push(format!("Synthesis: {}", self.synthesis_origin.label()));

        if self.repairs_exhausted {
            lines.push("Repair budget exhausted; proceeded with best-effort state.".to_string());
        }

        lines.push(String::new());
        lines.push(format!("Total duration: {}ms", self.total_duration_ms));

        lines.join("\n")
    }
}

// ============================================================================
// Tests
// ============================================================================
