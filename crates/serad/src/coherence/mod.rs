//! The per-pass coherence modules.
//!
//! Fixed execution order: intensity aggregation, contradiction scan,
//! regulation selection, trust calculation. The repair loop re-runs the
//! whole sequence after each repair iteration.

pub mod contradiction;
pub mod intensity;
pub mod regulation;
pub mod trust;

use sera_common::{Conversation, InternalState};

/// One full module pass in the fixed order.
pub fn run_pass(conversation: &Conversation, state: &mut InternalState) {
    intensity::aggregate(conversation, state);
    contradiction::score(conversation, state);
    regulation::apply(state);
    trust::apply(state);
}
