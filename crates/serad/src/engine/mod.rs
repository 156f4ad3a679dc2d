//! Engine layer: provider clients and the turn pipeline.

pub mod client_trait;
pub mod llm_client;
pub mod pipeline;

pub use client_trait::{AgentClient, FakeAgentClient, FakeAgentClientBuilder};
pub use llm_client::OllamaClient;
pub use pipeline::{CoherenceEngine, StepOutcome};
