//! Shared test utilities for dialoq crates.

use std::collections::VecDeque;
use std::sync::Mutex;

use futures::future::BoxFuture;

use dialoq_core::config::{AppConfig, ModelConfig};
use dialoq_core::error::{DialoqError, Result};
use dialoq_core::traits::LlmClient;
use dialoq_core::types::ChatMessage;

/// An [`LlmClient`] that replays a fixed script of replies.
///
/// Each `generate` call pops the next reply; an exhausted script returns an
/// `LlmRequest` error, which exercises the callers' failure paths. Prompts
/// are captured for assertion.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// All prompts seen so far (first message content of each call).
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

impl LlmClient for ScriptedLlm {
    fn generate(
        &self,
        _config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<String>> {
        if let Some(first) = messages.first() {
            self.prompts.lock().unwrap().push(first.content.clone());
        }
        let next = self.replies.lock().unwrap().pop_front();
        Box::pin(async move {
            next.ok_or_else(|| DialoqError::LlmRequest("scripted replies exhausted".into()))
        })
    }
}

/// An [`LlmClient`] that always fails, for failure-path tests.
pub struct FailingLlm;

impl LlmClient for FailingLlm {
    fn generate(
        &self,
        _config: &ModelConfig,
        _messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<String>> {
        Box::pin(async { Err(DialoqError::LlmRequest("unreachable".into())) })
    }
}

/// Minimal config for tests that only need a model id.
pub fn test_config() -> AppConfig {
    toml::from_str(
        r#"
[model]
model_id = "test-model"
"#,
    )
    .expect("test config parses")
}

/// The four-node flow used across integration tests.
pub fn sample_flow() -> &'static str {
    "N1[Greet]\nN1 --> N2[Collect Info]\nN2 --> |confirms| N3[Confirm]\nN3 --> N4[Farewell]"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_llm_replays_in_order() {
        let llm = ScriptedLlm::new(vec!["one", "two"]);
        let config = test_config().model;

        let first = llm.generate(&config, vec![ChatMessage::user("a")]).await.unwrap();
        let second = llm.generate(&config, vec![ChatMessage::user("b")]).await.unwrap();
        assert_eq!(first, "one");
        assert_eq!(second, "two");
        assert_eq!(llm.remaining(), 0);
        assert_eq!(llm.prompts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_scripted_llm_errors_when_exhausted() {
        let llm = ScriptedLlm::new(vec![]);
        let config = test_config().model;
        let err = llm
            .generate(&config, vec![ChatMessage::user("a")])
            .await
            .unwrap_err();
        assert!(matches!(err, DialoqError::LlmRequest(_)));
    }
}
