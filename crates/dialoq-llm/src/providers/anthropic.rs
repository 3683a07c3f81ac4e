use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use dialoq_core::config::ModelConfig;
use dialoq_core::error::{DialoqError, Result};
use dialoq_core::traits::LlmClient;
use dialoq_core::types::{ChatMessage, Role};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    http: Client,
}

impl AnthropicClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl Default for AnthropicClient {
    fn default() -> Self {
        Self::new()
    }
}

// Anthropic API request types
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

// Anthropic API response types
#[derive(Deserialize, Debug)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// System messages go into the dedicated `system` field; consecutive
/// same-role messages are legal for the messages API, so no merging.
fn convert_messages(messages: Vec<ChatMessage>) -> (Option<String>, Vec<ApiMessage>) {
    let mut system = None;
    let mut api_msgs = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => {
                system = Some(msg.content);
            }
            Role::User => api_msgs.push(ApiMessage {
                role: "user".to_string(),
                content: msg.content,
            }),
            Role::Assistant => api_msgs.push(ApiMessage {
                role: "assistant".to_string(),
                content: msg.content,
            }),
        }
    }

    (system, api_msgs)
}

impl LlmClient for AnthropicClient {
    fn generate(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<String>> {
        let config = config.clone();

        Box::pin(async move {
            let base_url = config.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL);

            let (system, api_messages) = convert_messages(messages);

            let body = AnthropicRequest {
                model: config.model_id.clone(),
                max_tokens: config.max_tokens,
                temperature: if config.temperature > 0.0 {
                    Some(config.temperature)
                } else {
                    None
                },
                messages: api_messages,
                system,
            };

            let mut req = self
                .http
                .post(base_url)
                .timeout(Duration::from_secs(config.timeout_secs))
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body);

            if let Some(api_key) = &config.api_key {
                req = req.header("x-api-key", api_key);
            }

            let response = req
                .send()
                .await
                .map_err(|e| DialoqError::LlmRequest(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown".to_string());
                return Err(DialoqError::LlmRequest(format!("HTTP {}: {}", status, body)));
            }

            let parsed: AnthropicResponse = response
                .json()
                .await
                .map_err(|e| DialoqError::LlmParse(e.to_string()))?;

            let text: String = parsed
                .content
                .into_iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text),
                    ContentBlock::Other => None,
                })
                .collect::<Vec<_>>()
                .join("");

            if text.is_empty() {
                return Err(DialoqError::LlmParse(
                    "response contained no text blocks".into(),
                ));
            }

            Ok(text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_messages_splits_system() {
        let msgs = vec![
            ChatMessage::system("instructions"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ];
        let (system, api) = convert_messages(msgs);
        assert_eq!(system.as_deref(), Some("instructions"));
        assert_eq!(api.len(), 2);
        assert_eq!(api[0].role, "user");
        assert_eq!(api[1].role, "assistant");
    }

    #[test]
    fn test_response_parsing_text_blocks() {
        let body = r#"{"content": [{"type": "text", "text": "hello "}, {"type": "text", "text": "world"}]}"#;
        let parsed: AnthropicResponse = serde_json::from_str(body).unwrap();
        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_response_parsing_skips_unknown_blocks() {
        let body = r#"{"content": [{"type": "thinking", "thinking": "hmm"}, {"type": "text", "text": "answer"}]}"#;
        let parsed: AnthropicResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.content.len(), 2);
    }
}
