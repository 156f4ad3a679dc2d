//! Sera Common - Shared types for the coherence engine.
//!
//! Everything both the daemon and the tools need: conversation transcripts,
//! the per-session coherence state, agent call outcomes, verification and
//! planning types, the error taxonomy and the turn trace.

pub mod agent;
pub mod conversation;
pub mod error;
pub mod plan;
pub mod state;
pub mod trace;
pub mod verified;

pub use agent::{
    apply_fallback, apply_update, AgentOutcome, AgentRole, AgentUpdate, CallResolution,
    FallbackDelta,
};
pub use conversation::{split_latest_user, Conversation, Message, Role};
pub use error::{EngineError, ProviderError};
pub use plan::{
    is_factual_query, Participant, PlanOrigin, RawPlan, RawSubtask, Subtask, TaskPlan,
    WEIGHT_SUM_TOLERANCE,
};
pub use state::{clamp01, InternalState, RegulationMode, MAX_REPAIRS};
pub use trace::{PassTrace, SynthesisOrigin, TurnTrace};
pub use verified::{VerifiedOutput, VETO_CONFIDENCE_THRESHOLD};
