//! Independent fact-check output.
//!
//! Produced once per verification call. Advisory input to synthesis only;
//! never persisted as ground truth and never fed back into the repair loop.

use serde::{Deserialize, Serialize};

use crate::state::clamp01;

/// Below this confidence the discrepancy flag is forced on, regardless of
/// what the verifier itself claimed.
pub const VETO_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Result of the independent verification pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifiedOutput {
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub has_discrepancy: bool,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl VerifiedOutput {
    /// Normalize confidence and apply the low-confidence veto.
    ///
    /// Called once, right after a successful verifier call. The veto only
    /// ever raises the flag; a verifier-reported discrepancy survives even at
    /// high confidence.
    pub fn finalize(&mut self) {
        self.confidence = clamp01(self.confidence);
        if self.confidence < VETO_CONFIDENCE_THRESHOLD {
            self.has_discrepancy = true;
        }
    }

    /// Compact summary for traces and logs.
    pub fn summary(&self) -> String {
        format!(
            "{} facts, confidence {:.2}{}",
            self.facts.len(),
            self.confidence,
            if self.has_discrepancy {
                ", discrepancy flagged"
            } else {
                ""
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_confidence_forces_discrepancy() {
        let mut output = VerifiedOutput {
            facts: vec!["the sky is blue".to_string()],
            confidence: 0.5,
            has_discrepancy: false,
            sources: vec![],
        };
        output.finalize();
        assert!(output.has_discrepancy);
    }

    #[test]
    fn test_high_confidence_leaves_flag_untouched() {
        let mut clean = VerifiedOutput {
            confidence: 0.95,
            has_discrepancy: false,
            ..VerifiedOutput::default()
        };
        clean.finalize();
        assert!(!clean.has_discrepancy);

        // A discrepancy the verifier itself reported is never cleared.
        let mut flagged = VerifiedOutput {
            confidence: 0.95,
            has_discrepancy: true,
            ..VerifiedOutput::default()
        };
        flagged.finalize();
        assert!(flagged.has_discrepancy);
    }

    #[test]
    fn test_threshold_boundary_is_exclusive() {
        let mut at_threshold = VerifiedOutput {
            confidence: VETO_CONFIDENCE_THRESHOLD,
            ..VerifiedOutput::default()
        };
        at_threshold.finalize();
        assert!(!at_threshold.has_discrepancy);
    }

    #[test]
    fn test_finalize_clamps_confidence() {
        let mut output = VerifiedOutput {
            confidence: 1.4,
            ..VerifiedOutput::default()
        };
        output.finalize();
        assert_eq!(output.confidence, 1.0);
        assert!(!output.has_discrepancy);
    }

    #[test]
    fn test_parses_from_sparse_json() {
        let output: VerifiedOutput =
            serde_json::from_str(r#"{"confidence": 0.9, "facts": ["a"]}"#).unwrap();
        assert_eq!(output.confidence, 0.9);
        assert_eq!(output.facts.len(), 1);
        assert!(!output.has_discrepancy);
        assert!(output.sources.is_empty());
    }
}
