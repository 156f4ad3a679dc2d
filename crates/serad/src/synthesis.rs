//! Response synthesis.
//!
//! One responder-model call turns the final coherence state, the verifier's
//! advice and the conversation tail into the user-facing reply. When the
//! call fails, a deterministic per-regulation-mode text stands in; the turn
//! never fails on synthesis.

use std::sync::Arc;
use std::time::Duration;

use sera_common::{Conversation, InternalState, RegulationMode, Role, SynthesisOrigin, VerifiedOutput};
use tracing::warn;

use crate::engine::client_trait::AgentClient;

/// Messages of conversation tail included in the synthesis prompt.
const SYNTHESIS_WINDOW: usize = 8;

/// Compose the reply text, tagged with where it came from.
pub async fn compose(
    client: &Arc<dyn AgentClient>,
    conversation: &Conversation,
    state: &InternalState,
    verified: Option<&VerifiedOutput>,
    budget: Duration,
) -> (String, SynthesisOrigin) {
    let prompt = build_prompt(conversation, state, verified);

    match tokio::time::timeout(budget, client.synthesize(&prompt)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => (text, SynthesisOrigin::Llm),
        Ok(Ok(_)) => {
            warn!("[!]  synthesis returned empty text, using fallback");
            (fallback_text(state.regulation).to_string(), SynthesisOrigin::Fallback)
        }
        Ok(Err(e)) => {
            warn!("[!]  synthesis failed: {}", e);
            (fallback_text(state.regulation).to_string(), SynthesisOrigin::Fallback)
        }
        Err(_) => {
            warn!("[!]  synthesis timed out (budget: {}ms)", budget.as_millis());
            (fallback_text(state.regulation).to_string(), SynthesisOrigin::Fallback)
        }
    }
}

/// Render the last `n` messages as a plain transcript.
pub fn render_transcript(conversation: &Conversation, n: usize) -> String {
    conversation
        .recent(n)
        .iter()
        .map(|message| {
            let tag = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            };
            format!("{}: {}", tag, message.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_prompt(
    conversation: &Conversation,
    state: &InternalState,
    verified: Option<&VerifiedOutput>,
) -> String {
    let mut prompt = String::from("Conversation so far:\n");
    prompt.push_str(&render_transcript(conversation, SYNTHESIS_WINDOW));

    prompt.push_str("\n\nGuidance: ");
    prompt.push_str(regulation_guidance(state.regulation));
    prompt.push_str(&format!("\nSession trust is {:.2}.", state.trust_tau));

    if let Some(output) = verified {
        if output.has_discrepancy {
            prompt.push_str(
                "\nVerification flagged a possible discrepancy; acknowledge the \
                 uncertainty rather than asserting the claim.",
            );
        } else if !output.facts.is_empty() {
            prompt.push_str(&format!("\nVerified facts: {}.", output.facts.join("; ")));
        }
    }

    prompt
}

fn regulation_guidance(mode: RegulationMode) -> &'static str {
    match mode {
        RegulationMode::Normal => "Respond naturally and helpfully.",
        RegulationMode::Clarify => {
            "Before answering fully, ask one focused clarifying question about \
             the ambiguity or contradiction you see."
        }
        RegulationMode::SlowDown => {
            "De-escalate: acknowledge the friction, keep the reply short and \
             grounded, and do not push toward a conclusion."
        }
    }
}

/// Deterministic reply used when the responder model is unavailable.
fn fallback_text(mode: RegulationMode) -> &'static str {
    match mode {
        RegulationMode::Normal => "I'm listening. Could you tell me a little more about that?",
        RegulationMode::Clarify => {
            "I want to make sure I understand you correctly. Could you restate \
             what you mean, or point me at the part that matters most?"
        }
        RegulationMode::SlowDown => {
            "Let's take this one step at a time. I'd rather slow down here than \
             talk past you."
        }
    }
}
