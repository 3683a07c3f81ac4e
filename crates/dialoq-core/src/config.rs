use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DialoqError, Result};

/// Top-level dialoq configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub fallback_models: Vec<ModelConfig>,
    #[serde(default)]
    pub dialogue: DialogueConfig,
    #[serde(default)]
    pub roles: RolesConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout for one generation call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

fn default_provider() -> String { "openai".to_string() }
fn default_max_tokens() -> u32 { 1024 }
fn default_temperature() -> f32 { 0.7 }
fn default_timeout_secs() -> u64 { 60 }

/// Retry configuration for LLM requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 30000 }

/// Dialogue loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// Hard cap on dialogue turns. The flow graph should contain a reachable
    /// terminal node; this cutoff bounds sessions where it does not.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// How many trailing messages to show the decision step.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Directory for persisted session records.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Optional pre-generated flow description file. When absent, the flow
    /// is generated from the task description at session start.
    #[serde(default)]
    pub flow_file: Option<String>,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            history_window: default_history_window(),
            output_dir: default_output_dir(),
            flow_file: None,
        }
    }
}

fn default_max_turns() -> usize { 30 }
fn default_history_window() -> usize { 6 }
fn default_output_dir() -> String { "output".to_string() }

/// Role descriptions for the two simulated parties and the task itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesConfig {
    #[serde(default = "default_assistant_role")]
    pub assistant_role: String,
    #[serde(default = "default_user_role")]
    pub user_role: String,
    #[serde(default = "default_task")]
    pub task: String,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            assistant_role: default_assistant_role(),
            user_role: default_user_role(),
            task: default_task(),
        }
    }
}

fn default_assistant_role() -> String {
    "You are a professional assistant dedicated to helping users achieve \
     their goals. You are skilled at understanding user needs and guiding \
     conversations to collect necessary information."
        .to_string()
}

fn default_user_role() -> String {
    "You are a user seeking assistance with your request".to_string()
}

fn default_task() -> String {
    "Understand the user's requirements and collect necessary information \
     to assist them effectively"
        .to_string()
}

/// Transcript evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_eval_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub weights: EvalWeights,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weights: EvalWeights::default(),
        }
    }
}

fn default_eval_enabled() -> bool { true }

/// Per-metric weights for the overall evaluation score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalWeights {
    #[serde(default = "default_w_success")]
    pub success_rate: f64,
    #[serde(default = "default_w_relevance")]
    pub response_relevance: f64,
    #[serde(default = "default_w_transition")]
    pub subtask_transition_accuracy: f64,
    #[serde(default = "default_w_flow")]
    pub dialogue_flow: f64,
    #[serde(default = "default_w_boundary")]
    pub topic_boundary_control: f64,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            success_rate: default_w_success(),
            response_relevance: default_w_relevance(),
            subtask_transition_accuracy: default_w_transition(),
            dialogue_flow: default_w_flow(),
            topic_boundary_control: default_w_boundary(),
        }
    }
}

fn default_w_success() -> f64 { 0.3 }
fn default_w_relevance() -> f64 { 0.2 }
fn default_w_transition() -> f64 { 0.2 }
fn default_w_flow() -> f64 { 0.15 }
fn default_w_boundary() -> f64 { 0.15 }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| DialoqError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| DialoqError::Config(e.to_string()))
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_DIALOQ_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_DIALOQ_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_DIALOQ_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_DIALOQ_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_DIALOQ_VAR}\"");
    }

    #[test]
    fn test_defaults_from_minimal_toml() {
        let toml_str = r#"
[model]
model_id = "gpt-4o-mini"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model.provider, "openai");
        assert_eq!(config.model.max_tokens, 1024);
        assert_eq!(config.model.timeout_secs, 60);
        assert_eq!(config.dialogue.max_turns, 30);
        assert_eq!(config.dialogue.output_dir, "output");
        assert!(config.dialogue.flow_file.is_none());
        assert!(config.evaluation.enabled);
        assert!(config.fallback_models.is_empty());
    }

    #[test]
    fn test_eval_weights_sum_to_one() {
        let w = EvalWeights::default();
        let sum = w.success_rate
            + w.response_relevance
            + w.subtask_transition_accuracy
            + w.dialogue_flow
            + w.topic_boundary_control;
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_roles_override() {
        let toml_str = r#"
[model]
model_id = "gpt-4o-mini"

[roles]
assistant_role = "You are a travel agent."
user_role = "You are booking a trip."
task = "Book a flight to Tokyo"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.roles.assistant_role, "You are a travel agent.");
        assert_eq!(config.roles.task, "Book a flight to Tokyo");
    }
}
