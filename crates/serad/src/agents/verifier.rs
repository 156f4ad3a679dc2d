//! Independent verification pass.
//!
//! Advisory only: its output reaches synthesis and the trace, never the
//! coherence state or the repair loop, and a failed call costs nothing but
//! the missing advice.

use std::sync::Arc;
use std::time::Duration;

use sera_common::VerifiedOutput;
use tracing::{debug, warn};

use crate::engine::client_trait::AgentClient;

/// Run the verification call.
///
/// Returns `None` on failure or timeout. On success the output is finalized
/// immediately: confidence clamped, low-confidence veto applied.
pub async fn run_verification(
    client: &Arc<dyn AgentClient>,
    query: &str,
    context: &str,
    budget: Duration,
) -> Option<VerifiedOutput> {
    match tokio::time::timeout(budget, client.verify(query, context)).await {
        Ok(Ok(mut output)) => {
            output.finalize();
            debug!("[+]  verification: {}", output.summary());
            Some(output)
        }
        Ok(Err(e)) => {
            warn!("[!]  verification failed: {}", e);
            None
        }
        Err(_) => {
            warn!(
                "[!]  verification timed out (budget: {}ms)",
                budget.as_millis()
            );
            None
        }
    }
}
