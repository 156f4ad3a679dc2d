//! Configuration management for serad.
//!
//! Loads settings from /etc/sera/config.toml, then ~/.config/sera/config.toml,
//! or uses defaults. Configuration covers models, call budgets and storage;
//! the pipeline thresholds and the trust formula are compiled in.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// System config file path
pub const CONFIG_PATH: &str = "/etc/sera/config.toml";

/// Model and endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama base URL
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Model for the scoring perspectives and the planner - fast, small
    #[serde(default = "default_scorer_model")]
    pub scorer_model: String,

    /// Model for verification
    #[serde(default = "default_verifier_model")]
    pub verifier_model: String,

    /// Model for response synthesis - capable, slower
    #[serde(default = "default_responder_model")]
    pub responder_model: String,

    /// How long Ollama keeps a model loaded after a request (e.g., "5m", "0")
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,
}

fn default_ollama_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_scorer_model() -> String {
    "qwen3:4b".to_string()
}

fn default_verifier_model() -> String {
    "qwen3:4b".to_string()
}

fn default_responder_model() -> String {
    "qwen3:8b".to_string()
}

fn default_keep_alive() -> String {
    "5m".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            ollama_url: default_ollama_url(),
            scorer_model: default_scorer_model(),
            verifier_model: default_verifier_model(),
            responder_model: default_responder_model(),
            keep_alive: default_keep_alive(),
        }
    }
}

/// Per-call budget configuration in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Budget for one scoring call (analyst, relational, ethics)
    #[serde(default = "default_agent_budget")]
    pub agent_ms: u64,

    /// Budget for the verification call
    #[serde(default = "default_verifier_budget")]
    pub verifier_ms: u64,

    /// Budget for the planning call
    #[serde(default = "default_planner_budget")]
    pub planner_ms: u64,

    /// Budget for the synthesis call
    #[serde(default = "default_synthesis_budget")]
    pub synthesis_ms: u64,
}

fn default_agent_budget() -> u64 {
    10_000
}

fn default_verifier_budget() -> u64 {
    15_000
}

fn default_planner_budget() -> u64 {
    10_000
}

fn default_synthesis_budget() -> u64 {
    30_000
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            agent_ms: default_agent_budget(),
            verifier_ms: default_verifier_budget(),
            planner_ms: default_planner_budget(),
            synthesis_ms: default_synthesis_budget(),
        }
    }
}

/// Engine behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Run the planning call before the agent fan-out.
    /// Off by default: the fixed fallback split covers its absence and each
    /// turn saves one model call.
    #[serde(default = "default_planner_enabled")]
    pub planner_enabled: bool,

    /// Directory for session transcripts and state snapshots
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_planner_enabled() -> bool {
    false
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("sera").join("sessions"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/sera/sessions"))
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            planner_enabled: default_planner_enabled(),
            data_dir: default_data_dir(),
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeraConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl SeraConfig {
    /// User config path: ~/.config/sera/config.toml
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sera").join("config.toml"))
    }

    /// Load config from the system path, then the user path, or defaults.
    pub fn load() -> Self {
        let mut candidates = vec![PathBuf::from(CONFIG_PATH)];
        if let Some(user_path) = Self::user_config_path() {
            candidates.push(user_path);
        }

        for path in candidates {
            if path.exists() {
                match Self::load_from_path(&path) {
                    Ok(config) => return config,
                    Err(e) => warn!("Skipping config {}: {:#}", path.display(), e),
                }
            }
        }

        info!("No config file found, using defaults");
        Self::default()
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: SeraConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
