//! Advisory task decomposition.
//!
//! The planner splits a query into one weighted subtask per participant
//! (the three analysis agents plus the verifier). Weights are advisory
//! metadata for the trace and synthesis context; they never gate the repair
//! loop and are never folded into the trust formula.

use serde::{Deserialize, Serialize};

/// Allowed deviation of the weight sum from 1.0 before renormalization.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Every party a subtask can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Participant {
    Analyst,
    Relational,
    Ethics,
    Verifier,
}

impl Participant {
    pub fn label(&self) -> &'static str {
        match self {
            Participant::Analyst => "analyst",
            Participant::Relational => "relational",
            Participant::Ethics => "ethics",
            Participant::Verifier => "verifier",
        }
    }

    pub fn all() -> [Participant; 4] {
        [
            Participant::Analyst,
            Participant::Relational,
            Participant::Ethics,
            Participant::Verifier,
        ]
    }

    fn parse(label: &str) -> Option<Participant> {
        match label.trim().to_lowercase().as_str() {
            "analyst" => Some(Participant::Analyst),
            "relational" => Some(Participant::Relational),
            "ethics" => Some(Participant::Ethics),
            "verifier" => Some(Participant::Verifier),
            _ => None,
        }
    }
}

/// Plan as the model produced it, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPlan {
    #[serde(default)]
    pub subtasks: Vec<RawSubtask>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSubtask {
    #[serde(default)]
    pub participant: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub weight: f64,
}

/// One validated, weighted subtask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub participant: Participant,
    pub description: String,
    pub weight: f64,
}

/// Where the final plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOrigin {
    /// Model output that passed validation (possibly renormalized).
    Model,
    /// Balanced fallback: the model plan was malformed or absent.
    BalancedFallback,
    /// Verification-heavy fallback for a detected factual query.
    VerificationHeavyFallback,
}

/// Validated decomposition with weights summing to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    pub subtasks: Vec<Subtask>,
    pub origin: PlanOrigin,
}

impl TaskPlan {
    /// Validate a model-produced plan.
    ///
    /// Requirements: exactly one subtask per participant (all four present,
    /// no duplicates), finite non-negative weights with a positive sum. A
    /// sum within `WEIGHT_SUM_TOLERANCE` of 1.0 is accepted as-is; any other
    /// positive sum is renormalized. Returns `None` when the plan is
    /// malformed, in which case the caller picks a fallback split.
    pub fn from_raw(raw: RawPlan) -> Option<TaskPlan> {
        if raw.subtasks.len() != Participant::all().len() {
            return None;
        }

        let mut subtasks = Vec::with_capacity(raw.subtasks.len());
        let mut seen: Vec<Participant> = Vec::new();
        for rs in raw.subtasks {
            let participant = Participant::parse(&rs.participant)?;
            if seen.contains(&participant) {
                return None;
            }
            if !rs.weight.is_finite() || rs.weight < 0.0 {
                return None;
            }
            seen.push(participant);
            subtasks.push(Subtask {
                participant,
                description: rs.description,
                weight: rs.weight,
            });
        }

        let sum: f64 = subtasks.iter().map(|s| s.weight).sum();
        if sum <= 0.0 {
            return None;
        }
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            for s in &mut subtasks {
                s.weight /= sum;
            }
        }

        Some(TaskPlan {
            subtasks,
            origin: PlanOrigin::Model,
        })
    }

    /// Fixed fallback split, verification-heavy when the query looks factual.
    pub fn fallback(factual: bool) -> TaskPlan {
        let (weights, origin) = if factual {
            (
                [0.30, 0.15, 0.15, 0.40],
                PlanOrigin::VerificationHeavyFallback,
            )
        } else {
            ([0.25, 0.25, 0.25, 0.25], PlanOrigin::BalancedFallback)
        };

        let descriptions = [
            "assess logical consistency",
            "assess relational tone",
            "monitor ethical concerns",
            "check factual claims",
        ];

        let subtasks = Participant::all()
            .iter()
            .zip(weights.iter())
            .zip(descriptions.iter())
            .map(|((p, w), d)| Subtask {
                participant: *p,
                description: (*d).to_string(),
                weight: *w,
            })
            .collect();

        TaskPlan { subtasks, origin }
    }

    /// Weight assigned to a participant (0.0 if somehow absent).
    pub fn weight_of(&self, participant: Participant) -> f64 {
        self.subtasks
            .iter()
            .find(|s| s.participant == participant)
            .map(|s| s.weight)
            .unwrap_or(0.0)
    }

    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .subtasks
            .iter()
            .map(|s| format!("{} {:.2}", s.participant.label(), s.weight))
            .collect();
        parts.join(", ")
    }
}

/// Keyword heuristic for queries that hinge on checkable facts.
///
/// Used only to pick the verification-heavy fallback split and to mark the
/// verifier pass as salient in the trace.
pub fn is_factual_query(query: &str) -> bool {
    let q = query.to_lowercase();
    const FACTUAL_MARKERS: [&str; 12] = [
        "what is",
        "what are",
        "when did",
        "when was",
        "who is",
        "who was",
        "where is",
        "how many",
        "how much",
        "define",
        "is it true",
        "fact",
    ];
    FACTUAL_MARKERS.iter().any(|m| q.contains(m))
}
