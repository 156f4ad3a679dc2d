//! Optional planning pass.
//!
//! Decomposes the turn's query into four weighted subtasks. Planning can
//! never block a turn: any failure resolves to a fixed fallback split.

use std::sync::Arc;
use std::time::Duration;

use sera_common::{is_factual_query, TaskPlan};
use tracing::{debug, warn};

use crate::engine::client_trait::AgentClient;

/// Produce the turn's task plan.
///
/// A provider error, a blown budget, or a malformed plan all resolve to the
/// fallback split; verification-heavy when the query looks factual.
pub async fn build_plan(client: &Arc<dyn AgentClient>, query: &str, budget: Duration) -> TaskPlan {
    let factual = is_factual_query(query);

    match tokio::time::timeout(budget, client.plan(query)).await {
        Ok(Ok(raw)) => match TaskPlan::from_raw(raw) {
            Some(plan) => {
                debug!("[+]  plan accepted: {}", plan.summary());
                plan
            }
            None => {
                warn!("[!]  plan malformed, using fallback split");
                TaskPlan::fallback(factual)
            }
        },
        Ok(Err(e)) => {
            warn!("[!]  planner call failed: {}", e);
            TaskPlan::fallback(factual)
        }
        Err(_) => {
            warn!("[!]  planner timed out (budget: {}ms)", budget.as_millis());
            TaskPlan::fallback(factual)
        }
    }
}
