pub mod providers;
pub mod retry;

use dialoq_core::config::{AppConfig, ModelConfig};
use dialoq_core::traits::LlmClient;

pub use providers::anthropic::AnthropicClient;
pub use providers::openai::OpenAiClient;
pub use retry::RetryingClient;

/// Create an LLM client based on the provider name.
pub fn create_client(config: &ModelConfig) -> Box<dyn LlmClient> {
    match config.provider.as_str() {
        "anthropic" | "claude" => Box::new(AnthropicClient::new()),
        // Everything else uses the OpenAI-compatible client
        _ => Box::new(OpenAiClient::new()),
    }
}

/// Build the full client stack for an app config: primary provider wrapped
/// with retries and the configured fallback models.
pub fn build_client(config: &AppConfig) -> Box<dyn LlmClient> {
    let primary = create_client(&config.model);

    if config.fallback_models.is_empty() && config.model.retry.is_none() {
        return primary;
    }

    let fallbacks = config
        .fallback_models
        .iter()
        .map(|m| (m.clone(), create_client(m)))
        .collect();

    Box::new(RetryingClient::new(
        primary,
        fallbacks,
        config.model.retry.clone().unwrap_or_default(),
    ))
}
