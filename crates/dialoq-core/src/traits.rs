use futures::future::BoxFuture;

use crate::config::ModelConfig;
use crate::error::Result;
use crate::types::ChatMessage;

/// LLM client — the single generation boundary.
///
/// One logical operation: send a conversation, receive the completion text.
/// Calls are request/response with a bounded timeout; transport failures
/// surface as `DialoqError::LlmRequest` and are absorbed by callers that
/// must not abort a running dialogue (decision step, evaluator).
pub trait LlmClient: Send + Sync + 'static {
    /// Send a chat request and receive the full completion text.
    fn generate(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<String>>;
}
