//! Agent Client Trait Abstraction
//!
//! This module provides a trait abstraction over model calls to enable:
//! - Deterministic testing with fake implementations
//! - No running model backend required for testing
//! - Clear interface boundaries between orchestration and transport
//!
//! ## Usage
//!
//! Production code uses `OllamaClient` which talks to a local Ollama
//! instance. Test code uses `FakeAgentClient` with pre-configured responses.

use async_trait::async_trait;
use sera_common::{AgentRole, AgentUpdate, ProviderError, RawPlan, RawSubtask, VerifiedOutput};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

// ============================================================================
// Agent Client Trait
// ============================================================================

/// Trait abstraction for every model call the engine makes.
///
/// This trait defines the minimal interface needed by `CoherenceEngine`:
/// per-role scoring, verification, planning, and response synthesis.
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Score the conversation from one analysis perspective.
    async fn score(&self, role: AgentRole, context: &str) -> Result<AgentUpdate, ProviderError>;

    /// Fact-check the latest user input against the conversation.
    async fn verify(&self, query: &str, context: &str) -> Result<VerifiedOutput, ProviderError>;

    /// Decompose the query into weighted subtasks.
    async fn plan(&self, query: &str) -> Result<RawPlan, ProviderError>;

    /// Produce the user-facing response text.
    async fn synthesize(&self, prompt: &str) -> Result<String, ProviderError>;
}

// ============================================================================
// Fake Agent Client (Testing)
// ============================================================================

/// Fake agent client for deterministic testing.
///
/// Provides pre-configured responses without any network traffic. Scoring
/// calls consume a per-role scripted sequence first when one is set, then
/// fall back to the fixed per-role response.
///
/// ## Example
///
/// ```rust,ignore
/// let fake = FakeAgentClientBuilder::new()
///     .score_response(AgentRole::Analyst, AgentUpdate::tension(0.9))
///     .verifier_error(ProviderError::Timeout { ms: 5000 })
///     .build();
///
/// let update = fake.score(AgentRole::Analyst, "context").await.unwrap();
/// assert_eq!(update.tension, Some(0.9));
/// ```
pub struct FakeAgentClient {
    /// Fixed response per role, used once any scripted sequence is drained.
    score_responses: HashMap<AgentRole, Result<AgentUpdate, ProviderError>>,
    /// Scripted per-role responses, consumed front to back.
    score_sequences: Mutex<HashMap<AgentRole, VecDeque<Result<AgentUpdate, ProviderError>>>>,
    verify_response: Result<VerifiedOutput, ProviderError>,
    plan_response: Result<RawPlan, ProviderError>,
    synthesize_response: Result<String, ProviderError>,
    /// Track call counts for assertions, keyed by role label or call kind.
    call_counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl FakeAgentClient {
    /// Create a fake where every call succeeds with neutral output.
    pub fn new() -> Self {
        let mut score_responses = HashMap::new();
        for role in AgentRole::all() {
            score_responses.insert(role, Ok(AgentUpdate::default()));
        }

        Self {
            score_responses,
            score_sequences: Mutex::new(HashMap::new()),
            verify_response: Ok(confident_verification()),
            plan_response: Ok(balanced_raw_plan()),
            synthesize_response: Ok("Here is a calm, considered response.".to_string()),
            call_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get the number of calls for one key.
    ///
    /// Scoring calls are keyed by role label (`"analyst"`, `"relational"`,
    /// `"ethics"`); the other calls by kind (`"verifier"`, `"planner"`,
    /// `"synthesis"`).
    pub fn call_count(&self, key: &str) -> usize {
        self.call_counts
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Get total call count across all keys.
    pub fn total_calls(&self) -> usize {
        self.call_counts.lock().unwrap().values().sum()
    }

    /// Reset all call counts.
    pub fn reset_counts(&self) {
        self.call_counts.lock().unwrap().clear();
    }

    fn record_call(&self, key: &str) {
        let mut counts = self.call_counts.lock().unwrap();
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
}

impl Default for FakeAgentClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentClient for FakeAgentClient {
    async fn score(&self, role: AgentRole, _context: &str) -> Result<AgentUpdate, ProviderError> {
        self.record_call(role.label());

        if let Some(next) = self
            .score_sequences
            .lock()
            .unwrap()
            .get_mut(&role)
            .and_then(|queue| queue.pop_front())
        {
            return next;
        }

        self.score_responses
            .get(&role)
            .cloned()
            .unwrap_or_else(|| Ok(AgentUpdate::default()))
    }

    async fn verify(&self, _query: &str, _context: &str) -> Result<VerifiedOutput, ProviderError> {
        self.record_call("verifier");
        self.verify_response.clone()
    }

    async fn plan(&self, _query: &str) -> Result<RawPlan, ProviderError> {
        self.record_call("planner");
        self.plan_response.clone()
    }

    async fn synthesize(&self, _prompt: &str) -> Result<String, ProviderError> {
        self.record_call("synthesis");
        self.synthesize_response.clone()
    }
}

/// Verification output that clears the confidence veto.
fn confident_verification() -> VerifiedOutput {
    VerifiedOutput {
        facts: vec!["conversation reviewed".to_string()],
        confidence: 0.9,
        has_discrepancy: false,
        sources: vec![],
    }
}

/// Well-formed model plan: all four participants at equal weight.
fn balanced_raw_plan() -> RawPlan {
    let subtasks = [
        ("analyst", "assess logical consistency"),
        ("relational", "assess relational tone"),
        ("ethics", "monitor ethical concerns"),
        ("verifier", "check factual claims"),
    ]
    .iter()
    .map(|(participant, description)| RawSubtask {
        participant: (*participant).to_string(),
        description: (*description).to_string(),
        weight: 0.25,
    })
    .collect();

    RawPlan { subtasks }
}

// ============================================================================
// Builder for FakeAgentClient
// ============================================================================

/// Builder for `FakeAgentClient` with convenient test setup.
pub struct FakeAgentClientBuilder {
    inner: FakeAgentClient,
}

impl FakeAgentClientBuilder {
    /// Start from the all-succeeding defaults.
    pub fn new() -> Self {
        Self {
            inner: FakeAgentClient::new(),
        }
    }

    /// Fix the scoring response for one role.
    pub fn score_response(mut self, role: AgentRole, update: AgentUpdate) -> Self {
        self.inner.score_responses.insert(role, Ok(update));
        self
    }

    /// Make scoring calls for one role fail.
    pub fn score_error(mut self, role: AgentRole, error: ProviderError) -> Self {
        self.inner.score_responses.insert(role, Err(error));
        self
    }

    /// Script a sequence of scoring results for one role, consumed in order.
    /// Once drained, the fixed response for that role takes over.
    pub fn score_sequence(
        self,
        role: AgentRole,
        results: Vec<Result<AgentUpdate, ProviderError>>,
    ) -> Self {
        self.inner
            .score_sequences
            .lock()
            .unwrap()
            .insert(role, results.into());
        self
    }

    /// Fix the verification response.
    pub fn verifier_response(mut self, output: VerifiedOutput) -> Self {
        self.inner.verify_response = Ok(output);
        self
    }

    /// Make verification calls fail.
    pub fn verifier_error(mut self, error: ProviderError) -> Self {
        self.inner.verify_response = Err(error);
        self
    }

    /// Fix the raw plan the planner returns.
    pub fn plan_response(mut self, plan: RawPlan) -> Self {
        self.inner.plan_response = Ok(plan);
        self
    }

    /// Make planning calls fail.
    pub fn plan_error(mut self, error: ProviderError) -> Self {
        self.inner.plan_response = Err(error);
        self
    }

    /// Fix the synthesized response text.
    pub fn synthesis_response(mut self, text: &str) -> Self {
        self.inner.synthesize_response = Ok(text.to_string());
        self
    }

    /// Make synthesis calls fail.
    pub fn synthesis_error(mut self, error: ProviderError) -> Self {
        self.inner.synthesize_response = Err(error);
        self
    }

    /// Build the `FakeAgentClient`.
    pub fn build(self) -> FakeAgentClient {
        self.inner
    }
}

impl Default for FakeAgentClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helper constructors for common test scenarios
// ============================================================================

impl FakeAgentClient {
    /// Every agent reports a quiet conversation.
    pub fn calm() -> Self {
        FakeAgentClientBuilder::new()
            .score_response(AgentRole::Analyst, AgentUpdate::tension(0.1))
            .score_response(AgentRole::Relational, AgentUpdate::emotional_intensity(0.1))
            .build()
    }

    /// Every call fails with the same error.
    pub fn all_failing(error: ProviderError) -> Self {
        let mut builder = FakeAgentClientBuilder::new();
        for role in AgentRole::all() {
            builder = builder.score_error(role, error.clone());
        }
        builder
            .verifier_error(error.clone())
            .plan_error(error.clone())
            .synthesis_error(error)
            .build()
    }
}

// ============================================================================
// Tests
// ============================================================================
