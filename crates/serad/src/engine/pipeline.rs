//! Turn orchestration.
//!
//! One `step()` call runs the whole per-turn pipeline: agent fan-out with
//! the early verification pass, signal aggregation, bounded repair,
//! synthesis, persistence. Model failures degrade to their documented
//! fallbacks; only infrastructure failures (unknown session) surface as
//! errors, so a user-visible response is always produced.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sera_common::{
    apply_fallback, apply_update, is_factual_query, AgentOutcome, AgentRole, CallResolution,
    EngineError, InternalState, Message, RegulationMode, TurnTrace, MAX_REPAIRS,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::{call_agent, planner, verifier};
use crate::coherence;
use crate::config::SeraConfig;
use crate::engine::client_trait::AgentClient;
use crate::persistence::SessionStore;
use crate::session::SessionManager;
use crate::synthesis;

/// Messages of conversation tail given to scoring and verification calls.
const SCORING_WINDOW: usize = 6;

/// Result of one conversation step.
#[derive(Debug)]
pub struct StepOutcome {
    pub response_text: String,
    /// State snapshot at the turn boundary.
    pub state: InternalState,
    pub trace: TurnTrace,
}

/// The per-session coherence pipeline.
pub struct CoherenceEngine {
    client: Arc<dyn AgentClient>,
    store: Arc<dyn SessionStore>,
    sessions: SessionManager,
    config: SeraConfig,
}

impl CoherenceEngine {
    pub fn new(
        client: Arc<dyn AgentClient>,
        store: Arc<dyn SessionStore>,
        config: SeraConfig,
    ) -> Self {
        Self {
            client,
            store,
            sessions: SessionManager::new(),
            config,
        }
    }

    pub async fn create_session(&self) -> Uuid {
        self.sessions.create_session().await
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.session_count().await
    }

    /// Run one conversation turn.
    ///
    /// Turns within one session are serialized by the session lock; callers
    /// wanting a whole-turn deadline can wrap this in their own timeout, the
    /// per-call budgets inside keep any single stage from stalling.
    pub async fn step(
        &self,
        session_id: Uuid,
        user_input: &str,
    ) -> Result<StepOutcome, EngineError> {
        let handle = self
            .sessions
            .get(session_id)
            .await
            .ok_or(EngineError::SessionNotFound(session_id))?;
        let mut guard = handle.lock().await;
        let session = &mut *guard;

        let turn_start = Instant::now();
        let mut trace = TurnTrace::new(session_id, user_input);
        trace.verifier_salient = is_factual_query(user_input);

        info!("[>]  turn start (session {})", session_id);

        // Record and persist the user message. Store failures are logged and
        // absorbed; persistence never fails a turn.
        let user_message = Message::user(user_input);
        session.conversation.push(user_message.clone());
        if let Err(e) = self.store.append_message(session_id, &user_message).await {
            warn!("[!]  transcript append failed: {:#}", e);
        }

        // Fresh repair budget each turn.
        session.state.repair_count = 0;

        if self.config.engine.planner_enabled {
            let plan = planner::build_plan(
                &self.client,
                user_input,
                Duration::from_millis(self.config.budget.planner_ms),
            )
            .await;
            trace.plan = Some(plan);
        }

        let context = synthesis::render_transcript(&session.conversation, SCORING_WINDOW);
        let agent_budget = Duration::from_millis(self.config.budget.agent_ms);

        // Fan-out: the three scorers and the early verification pass run
        // concurrently and are joined together. A failed branch resolves to
        // its own fallback without blocking the siblings.
        let (analyst, relational, ethics, verified) = tokio::join!(
            call_agent(&self.client, AgentRole::Analyst, &context, agent_budget, 0),
            call_agent(&self.client, AgentRole::Relational, &context, agent_budget, 0),
            call_agent(&self.client, AgentRole::Ethics, &context, agent_budget, 0),
            verifier::run_verification(
                &self.client,
                user_input,
                &context,
                Duration::from_millis(self.config.budget.verifier_ms),
            ),
        );

        trace.verifier = verified;
        self.absorb_outcome(&mut session.state, &mut trace, analyst);
        self.absorb_outcome(&mut session.state, &mut trace, relational);
        self.absorb_outcome(&mut session.state, &mut trace, ethics);

        coherence::run_pass(&session.conversation, &mut session.state);
        trace.record_pass(&session.state);

        // Bounded fixed-point iteration: re-run the two repair participants
        // and the module pass while regulation is non-normal. Ethics is
        // monitor-only and never re-runs. Hitting the cap is not an error.
        while session.state.regulation != RegulationMode::Normal
            && session.state.repair_count < MAX_REPAIRS
        {
            session.state.repair_count += 1;
            let pass = session.state.repair_count;
            info!(
                "[~]  repair pass {} (regulation {})",
                pass,
                session.state.regulation.label()
            );

            let (analyst, relational) = tokio::join!(
                call_agent(&self.client, AgentRole::Analyst, &context, agent_budget, pass),
                call_agent(
                    &self.client,
                    AgentRole::Relational,
                    &context,
                    agent_budget,
                    pass
                ),
            );
            self.absorb_outcome(&mut session.state, &mut trace, analyst);
            self.absorb_outcome(&mut session.state, &mut trace, relational);

            coherence::run_pass(&session.conversation, &mut session.state);
            trace.record_pass(&session.state);
        }

        // Synthesis runs exactly once, after the loop settles.
        let (response_text, origin) = synthesis::compose(
            &self.client,
            &session.conversation,
            &session.state,
            trace.verifier.as_ref(),
            Duration::from_millis(self.config.budget.synthesis_ms),
        )
        .await;
        trace.synthesis_origin = origin;

        let assistant_message = Message::assistant(response_text.clone());
        session.conversation.push(assistant_message.clone());
        if let Err(e) = self
            .store
            .append_message(session_id, &assistant_message)
            .await
        {
            warn!("[!]  transcript append failed: {:#}", e);
        }
        if let Err(e) = self.store.snapshot_state(session_id, &session.state).await {
            warn!("[!]  state snapshot failed: {:#}", e);
        }

        trace.finalize(&session.state, turn_start.elapsed().as_millis() as u64);
        info!("[<]  turn complete: {}", trace.summary());

        Ok(StepOutcome {
            response_text,
            state: session.state.clone(),
            trace,
        })
    }

    /// Fold one agent outcome into the state and the trace.
    fn absorb_outcome(
        &self,
        state: &mut InternalState,
        trace: &mut TurnTrace,
        outcome: AgentOutcome,
    ) {
        let concern = match &outcome.resolution {
            CallResolution::Scored { update } => apply_update(state, update),
            CallResolution::FellBack { delta, .. } => apply_fallback(state, *delta),
        };
        if let Some(level) = concern {
            trace.note_concern(level);
        }
        trace.record_outcome(outcome);
    }
}
