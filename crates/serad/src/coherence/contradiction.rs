//! Cross-turn contradiction scoring.
//!
//! Scans the recent transcript for polarity flips between the newest user
//! message and the user turns that precede it, plus contrastive discourse
//! markers in the newest message itself. High ambient tension spills over
//! into the score. The result is clamped and written to
//! `state.contradiction`; regulation transitions belong to the regulation
//! selector, not here.

use sera_common::{clamp01, split_latest_user, Conversation, InternalState};

/// How many trailing messages the scan examines.
pub const CONTRADICTION_WINDOW: usize = 6;

/// How many user turns before the newest one are compared against it.
pub const COMPARED_PRIOR_TURNS: usize = 5;

/// Contribution of one matched affirm/negate pair.
pub const POLARITY_PAIR_WEIGHT: f64 = 0.3;

/// Contribution of a contrastive marker in the newest user message.
pub const CONTRAST_MARKER_WEIGHT: f64 = 0.2;

/// Tension above this level spills over into the contradiction score.
pub const TENSION_SPILLOVER_THRESHOLD: f64 = 0.7;

/// Size of the tension spillover contribution.
pub const TENSION_SPILLOVER_WEIGHT: f64 = 0.15;

/// Affirm/negate word pairs; a flip across turns counts once per pair.
const POLARITY_PAIRS: [(&str, &str); 5] = [
    ("yes", "no"),
    ("agree", "disagree"),
    ("correct", "incorrect"),
    ("right", "wrong"),
    ("true", "false"),
];

/// Contrastive discourse markers.
const CONTRAST_MARKERS: [&str; 2] = ["but", "however"];

/// Run the contradiction scan and write the clamped score into the state.
pub fn score(conversation: &Conversation, state: &mut InternalState) {
    let window = conversation.recent(CONTRADICTION_WINDOW);

    let mut total = 0.0;

    if let Some((latest, prior)) = split_latest_user(window) {
        let latest_words = tokenize(&latest.content);

        // Compare against at most the 5 user turns closest to the newest one.
        let start = prior.len().saturating_sub(COMPARED_PRIOR_TURNS);
        let compared = &prior[start..];

        for (affirm, negate) in POLARITY_PAIRS {
            let flipped = compared.iter().any(|earlier| {
                let earlier_words = tokenize(&earlier.content);
                polarity_flip(&latest_words, &earlier_words, affirm, negate)
            });
            if flipped {
                total += POLARITY_PAIR_WEIGHT;
            }
        }

        if CONTRAST_MARKERS
            .iter()
            .any(|marker| latest_words.iter().any(|w| w == marker))
        {
            total += CONTRAST_MARKER_WEIGHT;
        }
    }

    if state.tension > TENSION_SPILLOVER_THRESHOLD {
        total += TENSION_SPILLOVER_WEIGHT;
    }

    state.contradiction = clamp01(total);
}

/// Lowercased whole words; splitting on non-alphanumerics keeps
/// "yesterday" from counting as "yes".
fn tokenize(content: &str) -> Vec<String> {
    content
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

/// One side of the pair in the newest turn, the opposite side in the
/// earlier one, in either direction.
fn polarity_flip(latest: &[String], earlier: &[String], affirm: &str, negate: &str) -> bool {
    let contains = |words: &[String], target: &str| words.iter().any(|w| w == target);
    (contains(latest, affirm) && contains(earlier, negate))
        || (contains(latest, negate) && contains(earlier, affirm))
}
