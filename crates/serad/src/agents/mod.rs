//! Analysis agents.
//!
//! Three scoring perspectives (analyst, relational, ethics) plus the
//! verification and planning calls. Every call runs under a budget; a failed
//! or late call resolves to the role's documented fallback delta so the turn
//! always completes.

pub mod planner;
pub mod verifier;

use std::sync::Arc;
use std::time::{Duration, Instant};

use sera_common::{AgentOutcome, AgentRole, CallResolution, ProviderError};
use tracing::{debug, warn};

use crate::engine::client_trait::AgentClient;

/// Run one scoring call and tag how it resolved.
///
/// Never fails: a provider error or a blown budget becomes a `FellBack`
/// resolution carrying the role's documented delta.
pub async fn call_agent(
    client: &Arc<dyn AgentClient>,
    role: AgentRole,
    context: &str,
    budget: Duration,
    pass: u8,
) -> AgentOutcome {
    let start = Instant::now();

    let resolution = match tokio::time::timeout(budget, client.score(role, context)).await {
        Ok(Ok(update)) => {
            debug!("[+]  {} scored (pass {})", role.label(), pass);
            CallResolution::Scored { update }
        }
        Ok(Err(e)) => {
            warn!("[!]  {} call failed: {}", role.label(), e);
            CallResolution::FellBack {
                error: e.to_string(),
                delta: role.fallback_delta(),
            }
        }
        Err(_) => {
            let budget_ms = budget.as_millis() as u64;
            warn!(
                "[!]  {} call timed out (budget: {}ms)",
                role.label(),
                budget_ms
            );
            CallResolution::FellBack {
                error: ProviderError::Timeout { ms: budget_ms }.to_string(),
                delta: role.fallback_delta(),
            }
        }
    };

    AgentOutcome {
        role,
        pass,
        resolution,
        elapsed_ms: start.elapsed().as_millis() as u64,
    }
}
