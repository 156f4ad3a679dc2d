//! Intensity aggregation.
//!
//! Derives `uncertainty` from utterance-length variability plus a hedging
//! lexicon, then re-clamps every intensity dimension. Pure
//! arithmetic over already-fetched messages; never fails, and running it
//! twice on unchanged input yields an unchanged state.

use sera_common::{Conversation, InternalState, Role};

/// How many trailing messages feed the length-variance window.
pub const INTENSITY_WINDOW: usize = 5;

/// Divisor mapping raw length variance onto the unit interval.
pub const VARIANCE_DIVISOR: f64 = 10_000.0;

/// Variance alone can never push uncertainty past this.
pub const VARIANCE_UNCERTAINTY_CAP: f64 = 0.5;

/// Flat boost when the newest user message hedges.
pub const HEDGING_BOOST: f64 = 0.3;

/// Substring match, not word match: "not sure" is a phrase.
const HEDGING_LEXICON: [&str; 7] = [
    "maybe",
    "perhaps",
    "unclear",
    "not sure",
    "uncertain",
    "confused",
    "ambiguous",
];

/// Run the aggregation pass: recompute `uncertainty` from the trailing
/// window and re-clamp what the agents wrote.
pub fn aggregate(conversation: &Conversation, state: &mut InternalState) {
    let window = conversation.recent(INTENSITY_WINDOW);

    let mut uncertainty = (length_variance(window) / VARIANCE_DIVISOR).min(VARIANCE_UNCERTAINTY_CAP);

    if let Some(latest_user) = window.iter().rev().find(|m| m.role == Role::User) {
        if hedges(&latest_user.content) {
            uncertainty = (uncertainty + HEDGING_BOOST).min(1.0);
        }
    }

    state.uncertainty = uncertainty;
    state.clamp_intensities();
}

/// Population variance of the message lengths in the window.
fn length_variance(window: &[sera_common::Message]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }

    let lengths: Vec<f64> = window
        .iter()
        .map(|m| m.content.chars().count() as f64)
        .collect();
    let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
    lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / lengths.len() as f64
}

fn hedges(content: &str) -> bool {
    let lowered = content.to_lowercase();
    HEDGING_LEXICON.iter().any(|word| lowered.contains(word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sera_common::Message;

    fn conversation_of(contents: &[&str]) -> Conversation {
        let mut conv = Conversation::new();
        for content in contents {
            conv.push(Message::user(*content));
        }
        conv
    }

    #[test]
    fn test_empty_conversation_yields_zero_uncertainty() {
        let conv = Conversation::new();
        let mut state = InternalState::new();
        aggregate(&conv, &mut state);
        assert_eq!(state.uncertainty, 0.0);
    }

    #[test]
    fn test_uniform_lengths_yield_zero_variance() {
        let conv = conversation_of(&["aaaa", "bbbb", "cccc"]);
        let mut state = InternalState::new();
        aggregate(&conv, &mut state);
        assert_eq!(state.uncertainty, 0.0);
    }

    #[test]
    fn test_variance_contribution_is_capped() {
        // One short and one very long message: variance far above the
        // divisor, so the cap has to hold.
        let long = "x".repeat(900);
        let conv = conversation_of(&["hi", &long]);
        let mut state = InternalState::new();
        aggregate(&conv, &mut state);
        assert_eq!(state.uncertainty, VARIANCE_UNCERTAINTY_CAP);
    }

    #[test]
    fn test_hedging_boost_applies_once() {
        let conv = conversation_of(&["maybe it was something else"]);
        let mut state = InternalState::new();
        aggregate(&conv, &mut state);

        // Single message: variance 0, so uncertainty is exactly the boost.
        assert!((state.uncertainty - HEDGING_BOOST).abs() < 1e-12);
    }

    #[test]
    fn test_hedging_matches_the_multiword_phrase() {
        let conv = conversation_of(&["I am not sure this is what I meant"]);
        let mut state = InternalState::new();
        aggregate(&conv, &mut state);
        assert!(state.uncertainty >= HEDGING_BOOST);
    }

    #[test]
    fn test_hedging_ignores_assistant_turns() {
        let mut conv = Conversation::new();
        conv.push(Message::user("tell me about it"));
        conv.push(Message::assistant("perhaps we could explore that"));
        let mut state = InternalState::new();
        aggregate(&conv, &mut state);

        // The assistant hedged; the user did not. No boost.
        assert!(state.uncertainty < HEDGING_BOOST);
    }

    #[test]
    fn test_boost_on_top_of_cap_stays_below_one() {
        let long = "x".repeat(900);
        let mut conv = conversation_of(&["hi", &long]);
        conv.push(Message::user("maybe"));
        let mut state = InternalState::new();
        aggregate(&conv, &mut state);
        assert!(state.uncertainty <= 1.0);
        assert!(state.uncertainty > VARIANCE_UNCERTAINTY_CAP);
    }

    #[test]
    fn test_reclamps_wild_agent_writes() {
        let conv = conversation_of(&["hello there"]);
        let mut state = InternalState::new();
        state.tension = 2.4;
        state.emotional_intensity = -0.6;

        aggregate(&conv, &mut state);

        assert_eq!(state.tension, 1.0);
        assert_eq!(state.emotional_intensity, 0.0);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let conv = conversation_of(&["short", "a much longer message entirely", "maybe so"]);
        let mut state = InternalState::new();
        state.tension = 0.4;

        aggregate(&conv, &mut state);
        let first = state.clone();
        aggregate(&conv, &mut state);

        assert_eq!(state.uncertainty, first.uncertainty);
        assert_eq!(state.tension, first.tension);
        assert_eq!(state.emotional_intensity, first.emotional_intensity);
    }
}
