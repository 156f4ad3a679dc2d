//! Ollama Agent Client
//!
//! Robust JSON parsing that handles common model output variations:
//! - Scores wrapped in prose around the JSON object
//! - Missing optional fields
//! - Wrong value types (skipped rather than failing the whole call)
//!
//! On-demand model loading with a keep_alive parameter so small scorer
//! models stay resident between turns without pinning VRAM forever.

use async_trait::async_trait;
use sera_common::{AgentRole, AgentUpdate, ProviderError, RawPlan, RawSubtask, VerifiedOutput};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::SeraConfig;
use crate::engine::client_trait::AgentClient;

/// Transport-level backstop; per-call budgets are enforced above this client.
const HTTP_TIMEOUT_MS: u64 = 120_000;

/// Debug-log preview cap in bytes.
const LOG_PREVIEW_BYTES: usize = 500;

// ============================================================================
// System prompts
// ============================================================================

const ANALYST_SYSTEM_PROMPT: &str = "You are the analyst perspective of a conversation \
coherence engine. Read the conversation and rate the logical tension you observe: \
unresolved disagreement, pressure, or friction between the participants. \
Respond with JSON only: {\"tension\": <number between 0.0 and 1.0>}";

const RELATIONAL_SYSTEM_PROMPT: &str = "You are the relational perspective of a conversation \
coherence engine. Read the conversation and rate the emotional intensity of the latest \
user message in its context. \
Respond with JSON only: {\"emotional_intensity\": <number between 0.0 and 1.0>}";

const ETHICS_SYSTEM_PROMPT: &str = "You are the ethics perspective of a conversation \
coherence engine. Read the conversation and rate how much ethical concern it warrants: \
potential for harm, manipulation, or boundary issues. \
Respond with JSON only: {\"concern_level\": <number between 0.0 and 1.0>}";

const VERIFIER_SYSTEM_PROMPT: &str = "You are an independent fact checker. Extract the \
checkable factual claims from the user's latest message and assess them against the \
conversation. Respond with JSON only: \
{\"facts\": [<claims checked>], \"confidence\": <0.0 to 1.0>, \
\"has_discrepancy\": <true if any claim conflicts with the conversation>, \
\"sources\": [<where each claim was checked>]}";

const PLANNER_SYSTEM_PROMPT: &str = "You decompose a user query into exactly four weighted \
subtasks, one per participant: analyst, relational, ethics, verifier. Weights must sum \
to 1.0. Respond with JSON only: {\"subtasks\": [{\"participant\": <name>, \
\"description\": <what that participant should focus on>, \"weight\": <0.0 to 1.0>}]}";

const RESPONDER_SYSTEM_PROMPT: &str = "You are Sera, a careful conversational assistant. \
Write the reply to the user's latest message, following the regulation guidance in the \
prompt. Plain text only, no JSON.";

fn scoring_system_prompt(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Analyst => ANALYST_SYSTEM_PROMPT,
        AgentRole::Relational => RELATIONAL_SYSTEM_PROMPT,
        AgentRole::Ethics => ETHICS_SYSTEM_PROMPT,
    }
}

// ============================================================================
// Ollama wire types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

// ============================================================================
// Ollama client
// ============================================================================

/// Ollama-backed agent client with role-specific models.
///
/// Scoring and planning run on the small scorer model, verification on the
/// verifier model, synthesis on the larger responder model. Scoring,
/// verification and planning calls request Ollama's JSON format; synthesis
/// gets free text.
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
    scorer_model: String,
    verifier_model: String,
    responder_model: String,
    /// How long Ollama keeps a model loaded after a request (e.g., "5m", "0").
    keep_alive: String,
}

impl OllamaClient {
    pub fn new(config: &SeraConfig) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_millis(HTTP_TIMEOUT_MS))
                .build()
                .unwrap_or_default(),
            base_url: config.llm.ollama_url.clone(),
            scorer_model: config.llm.scorer_model.clone(),
            verifier_model: config.llm.verifier_model.clone(),
            responder_model: config.llm.responder_model.clone(),
            keep_alive: config.llm.keep_alive.clone(),
        }
    }

    pub fn scorer_model(&self) -> &str {
        &self.scorer_model
    }

    pub fn verifier_model(&self) -> &str {
        &self.verifier_model
    }

    pub fn responder_model(&self) -> &str {
        &self.responder_model
    }

    pub fn keep_alive(&self) -> &str {
        &self.keep_alive
    }

    /// Check if Ollama is reachable.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.http_client.get(&url).send().await.is_ok()
    }

    /// Raw chat call against one model.
    ///
    /// `json_format` asks Ollama to constrain output to JSON; synthesis
    /// leaves it off.
    async fn call_chat(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        json_format: bool,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            stream: false,
            format: json_format.then(|| "json".to_string()),
            keep_alive: Some(self.keep_alive.clone()),
        };

        info!("[>]  model call [{}] (keep_alive: {})", model, self.keep_alive);
        debug!(
            "[U]  prompt ({} bytes): {}",
            user_prompt.len(),
            log_preview(user_prompt)
        );

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            error!("[-]  ollama error {}: {}", status, error_text);
            return Err(ProviderError::HttpStatus(status));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let content = chat.message.content;
        if content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        debug!(
            "[<]  model response ({} bytes): {}",
            content.len(),
            log_preview(&content)
        );

        Ok(content)
    }

    /// Extract JSON from text that may have prose around it.
    fn extract_json(&self, text: &str) -> String {
        if let Some(json_start) = text.find('{') {
            if let Some(json_end) = text.rfind('}') {
                return text[json_start..=json_end].to_string();
            }
        }
        text.to_string()
    }

    /// Parse a scoring response with flexible handling of extra fields.
    fn parse_update(&self, text: &str) -> Result<AgentUpdate, ProviderError> {
        // First try direct serde parse
        if let Ok(update) = serde_json::from_str::<AgentUpdate>(text) {
            return Ok(update);
        }

        // Extract JSON if wrapped in prose, then read fields individually so
        // a wrong-typed field is skipped instead of failing the call
        let json_text = self.extract_json(text);
        match serde_json::from_str::<Value>(&json_text) {
            Ok(v) => {
                debug!("parsed scoring response via flexible parsing");
                Ok(AgentUpdate {
                    tension: read_number(&v, "tension"),
                    emotional_intensity: read_number(&v, "emotional_intensity"),
                    concern_level: read_number(&v, "concern_level"),
                })
            }
            Err(e) => {
                warn!("scoring response is not JSON: {} - text: {}", e, text);
                Err(ProviderError::Malformed(e.to_string()))
            }
        }
    }

    /// Parse a verification response with flexible handling.
    ///
    /// Missing confidence parses as 0.0, which the confidence veto then
    /// treats as untrustworthy.
    fn parse_verification(&self, text: &str) -> Result<VerifiedOutput, ProviderError> {
        if let Ok(output) = serde_json::from_str::<VerifiedOutput>(text) {
            return Ok(output);
        }

        let json_text = self.extract_json(text);
        match serde_json::from_str::<Value>(&json_text) {
            Ok(v) => {
                debug!("parsed verification response via flexible parsing");
                Ok(VerifiedOutput {
                    facts: read_string_array(&v, "facts"),
                    confidence: read_number(&v, "confidence").unwrap_or(0.0),
                    has_discrepancy: v
                        .get("has_discrepancy")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    sources: read_string_array(&v, "sources"),
                })
            }
            Err(e) => {
                warn!("verification response is not JSON: {} - text: {}", e, text);
                Err(ProviderError::Malformed(e.to_string()))
            }
        }
    }

    /// Parse a planner response with flexible handling.
    ///
    /// A JSON response without usable subtasks parses as an empty plan; plan
    /// validation downstream turns that into a fallback split.
    fn parse_plan(&self, text: &str) -> Result<RawPlan, ProviderError> {
        if let Ok(plan) = serde_json::from_str::<RawPlan>(text) {
            return Ok(plan);
        }

        let json_text = self.extract_json(text);
        match serde_json::from_str::<Value>(&json_text) {
            Ok(v) => {
                debug!("parsed plan response via flexible parsing");
                let subtasks = v
                    .get("subtasks")
                    .and_then(Value::as_array)
                    .map(|arr| {
                        arr.iter()
                            .map(|s| RawSubtask {
                                participant: s
                                    .get("participant")
                                    .and_then(Value::as_str)
                                    .unwrap_or_default()
                                    .to_string(),
                                description: s
                                    .get("description")
                                    .and_then(Value::as_str)
                                    .unwrap_or_default()
                                    .to_string(),
                                weight: read_number(s, "weight").unwrap_or(0.0),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(RawPlan { subtasks })
            }
            Err(e) => {
                warn!("plan response is not JSON: {} - text: {}", e, text);
                Err(ProviderError::Malformed(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl AgentClient for OllamaClient {
    async fn score(&self, role: AgentRole, context: &str) -> Result<AgentUpdate, ProviderError> {
        let text = self
            .call_chat(&self.scorer_model, scoring_system_prompt(role), context, true)
            .await?;
        self.parse_update(&text)
    }

    async fn verify(&self, query: &str, context: &str) -> Result<VerifiedOutput, ProviderError> {
        let prompt = format!(
            "Latest user message:\n{}\n\nConversation:\n{}",
            query, context
        );
        let text = self
            .call_chat(&self.verifier_model, VERIFIER_SYSTEM_PROMPT, &prompt, true)
            .await?;
        self.parse_verification(&text)
    }

    async fn plan(&self, query: &str) -> Result<RawPlan, ProviderError> {
        let text = self
            .call_chat(&self.scorer_model, PLANNER_SYSTEM_PROMPT, query, true)
            .await?;
        self.parse_plan(&text)
    }

    async fn synthesize(&self, prompt: &str) -> Result<String, ProviderError> {
        let text = self
            .call_chat(&self.responder_model, RESPONDER_SYSTEM_PROMPT, prompt, false)
            .await?;
        Ok(text.trim().to_string())
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(&SeraConfig::default())
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout { ms: HTTP_TIMEOUT_MS }
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// First `LOG_PREVIEW_BYTES` bytes of `text`, backed off to the nearest
/// char boundary.
fn log_preview(text: &str) -> &str {
    let mut end = LOG_PREVIEW_BYTES.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn read_number(v: &Value, key: &str) -> Option<f64> {
    v.get(key).and_then(Value::as_f64)
}

fn read_string_array(v: &Value, key: &str) -> Vec<String> {
    v.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|x| x.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}
