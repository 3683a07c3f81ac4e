use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use dialoq_core::config::{EvalWeights, ModelConfig};
use dialoq_core::error::Result;
use dialoq_core::traits::LlmClient;
use dialoq_core::types::{ChatMessage, Role};

/// Per-metric scores (0-10) from the judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalScores {
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub response_relevance: f64,
    #[serde(default)]
    pub subtask_transition_accuracy: f64,
    #[serde(default)]
    pub dialogue_flow: f64,
    #[serde(default)]
    pub topic_boundary_control: f64,
}

/// Outcome of evaluating a finished dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub scores: EvalScores,
    /// Weighted combination of the per-metric scores, 0-10.
    pub overall: f64,
    #[serde(default)]
    pub assessment: String,
}

/// Scores a finished transcript with an LLM judge.
///
/// A judge reply that fails to parse yields a neutral fallback report
/// rather than an error; evaluation never poisons a completed session.
pub struct DialogueEvaluator {
    llm: Arc<dyn LlmClient>,
    config: ModelConfig,
    weights: EvalWeights,
}

impl DialogueEvaluator {
    pub fn new(llm: Arc<dyn LlmClient>, config: ModelConfig, weights: EvalWeights) -> Self {
        Self {
            llm,
            config,
            weights,
        }
    }

    /// Evaluate a finished dialogue against its task description.
    pub async fn evaluate(&self, task: &str, history: &[ChatMessage]) -> Result<EvalReport> {
        let transcript = history
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                let who = match m.role {
                    Role::Assistant => "Assistant",
                    Role::User => "User",
                    Role::System => "System",
                };
                format!("{}: {}", who, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            r#"Evaluate the following task-oriented dialogue on these dimensions:

1. Success Rate: Did the dialogue successfully complete the intended task?
2. Response Relevance: How relevant were the assistant's responses to the user's inputs?
3. Sub-Task Transition Accuracy: How appropriate and smooth were transitions between subtasks?
4. Dialogue Flow: How natural was the overall conversation?
5. Topic Boundary Control: How well did the assistant maintain focus while transitioning between topics?

Task Description: {}

Dialogue:
{}

Score each dimension from 0 to 10. Respond with ONLY valid JSON in this format:
{{
  "success_rate": 0-10,
  "response_relevance": 0-10,
  "subtask_transition_accuracy": 0-10,
  "dialogue_flow": 0-10,
  "topic_boundary_control": 0-10,
  "assessment": "brief overall assessment"
}}"#,
            task, transcript
        );

        debug!("Running dialogue evaluation");

        let reply = self
            .llm
            .generate(&self.config, vec![ChatMessage::user(prompt)])
            .await?;

        Ok(self.parse_report(&reply))
    }

    fn parse_report(&self, reply: &str) -> EvalReport {
        let json_str = extract_json(reply);

        #[derive(Deserialize)]
        struct JudgeReply {
            #[serde(flatten)]
            scores: EvalScores,
            #[serde(default)]
            assessment: String,
        }

        match serde_json::from_str::<JudgeReply>(json_str) {
            Ok(parsed) => {
                let overall = weighted_overall(&parsed.scores, &self.weights);
                EvalReport {
                    scores: parsed.scores,
                    overall,
                    assessment: parsed.assessment,
                }
            }
            Err(e) => {
                warn!(error = %e, reply = %reply, "Failed to parse evaluation reply");
                EvalReport {
                    scores: EvalScores {
                        success_rate: 5.0,
                        response_relevance: 5.0,
                        subtask_transition_accuracy: 5.0,
                        dialogue_flow: 5.0,
                        topic_boundary_control: 5.0,
                    },
                    overall: 5.0,
                    assessment: format!("Evaluation parse failed: {}", e),
                }
            }
        }
    }
}

fn weighted_overall(scores: &EvalScores, weights: &EvalWeights) -> f64 {
    scores.success_rate * weights.success_rate
        + scores.response_relevance * weights.response_relevance
        + scores.subtask_transition_accuracy * weights.subtask_transition_accuracy
        + scores.dialogue_flow * weights.dialogue_flow
        + scores.topic_boundary_control * weights.topic_boundary_control
}

/// Extract JSON from a reply that may contain markdown code fences.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            return &trimmed[start..=end];
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores_json() -> &'static str {
        r#"{"success_rate": 8, "response_relevance": 9, "subtask_transition_accuracy": 7, "dialogue_flow": 8, "topic_boundary_control": 6, "assessment": "solid run"}"#
    }

    #[test]
    fn test_extract_json_plain() {
        let parsed: EvalScores = serde_json::from_str(extract_json(scores_json())).unwrap();
        assert!((parsed.success_rate - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_extract_json_code_fence() {
        let fenced = format!("Here you go:\n```json\n{}\n```", scores_json());
        let parsed: EvalScores = serde_json::from_str(extract_json(&fenced)).unwrap();
        assert!((parsed.response_relevance - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_extract_json_with_surrounding_text() {
        let noisy = format!("My evaluation: {} done", scores_json());
        let parsed: EvalScores = serde_json::from_str(extract_json(&noisy)).unwrap();
        assert!((parsed.dialogue_flow - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_overall_default_weights() {
        let scores = EvalScores {
            success_rate: 10.0,
            response_relevance: 10.0,
            subtask_transition_accuracy: 10.0,
            dialogue_flow: 10.0,
            topic_boundary_control: 10.0,
        };
        let overall = weighted_overall(&scores, &EvalWeights::default());
        assert!((overall - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_overall_mixed() {
        let scores = EvalScores {
            success_rate: 10.0,
            response_relevance: 0.0,
            subtask_transition_accuracy: 0.0,
            dialogue_flow: 0.0,
            topic_boundary_control: 0.0,
        };
        let overall = weighted_overall(&scores, &EvalWeights::default());
        assert!((overall - 3.0).abs() < 1e-9);
    }
}
