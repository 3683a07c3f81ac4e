use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use dialoq_core::config::ModelConfig;
use dialoq_core::traits::LlmClient;
use dialoq_core::types::{ChatMessage, Decision};

use crate::graph::TaskGraph;

/// Decides after each exchange whether the dialogue stays at the current
/// subtask, advances to a successor, or ends.
///
/// The classifier model is asked for the id of the next step; its free-text
/// reply is reduced to a [`Decision`] by [`parse_decision`]. Any failure on
/// the model side (unreachable, timeout, unparsable reply) degrades to
/// `Stay`: the conversation simply continues at the same subtask.
pub struct DecisionMaker {
    llm: Arc<dyn LlmClient>,
    config: ModelConfig,
}

impl DecisionMaker {
    pub fn new(llm: Arc<dyn LlmClient>, config: ModelConfig) -> Self {
        Self { llm, config }
    }

    /// Classify the next step given the user's latest response.
    pub async fn decide(&self, graph: &TaskGraph, current: &str, user_response: &str) -> Decision {
        let candidates = graph.next_nodes(current);

        let prompt = build_classifier_prompt(graph, current, candidates, user_response);
        let messages = vec![ChatMessage::system(prompt)];

        match self.llm.generate(&self.config, messages).await {
            Ok(reply) => {
                debug!(current, reply = %reply.trim(), "State classifier replied");
                parse_decision(&reply, current, candidates, graph)
            }
            Err(e) => {
                warn!(current, error = %e, "State classifier unavailable, staying");
                Decision::Stay
            }
        }
    }
}

fn build_classifier_prompt(
    graph: &TaskGraph,
    current: &str,
    candidates: &[String],
    user_response: &str,
) -> String {
    let candidate_list = candidates
        .iter()
        .map(|id| format!("{} ({})", id, graph.label(id)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are tasked with analyzing a task-oriented dialogue system to decide the subsequent step in the conversation. Your decision should be based on the current dialogue flow, the user's recent response, and predefined rules governing the flow of the dialogue.
Current node task: {}
Possible next tasks: [{}]
User response: {}

Guidelines for Decision Making:

Completion Check: Evaluate whether the current task or sub-task has been fully addressed. If not, maintain the current step to ensure all necessary actions are completed before progressing.

Response Analysis: Analyze the user's response for cues or information that may indicate readiness to move forward or require further clarification.

Branching Conditions: Pay special attention to any branching conditions in the possible next tasks. Determine if the user's response satisfies the conditions required to switch to a different path or sub-task.

Decision:

Based on the above guidelines, respond with ONLY the step id that represents the most appropriate next action in the dialogue flow (e.g., "N1", "N2", "N3"), or the word "stay" to remain at the current step."#,
        graph.label(current),
        candidate_list,
        user_response,
    )
}

/// Reduce a classifier reply to a [`Decision`].
///
/// Recognized in order: an explicit stay cue; a candidate node id named in
/// the reply (declaration order breaks ties); an explicit end cue; a move
/// cue combined with a candidate label occurring in the reply, or with a
/// single candidate selected unconditionally. Anything else is a stay;
/// progression errs toward staying put over guessing a transition.
pub fn parse_decision(
    reply: &str,
    current: &str,
    candidates: &[String],
    graph: &TaskGraph,
) -> Decision {
    let lower = reply.to_lowercase();

    if lower.contains("stay") || lower.contains("option 1") {
        return Decision::Stay;
    }

    for id in candidates {
        if mentions_word(&lower, &id.to_lowercase()) {
            return Decision::transition(id.clone());
        }
    }

    // The current node named explicitly is a stay, not a transition.
    if mentions_word(&lower, &current.to_lowercase()) {
        return Decision::Stay;
    }

    if mentions_word(&lower, "end") || mentions_word(&lower, "terminate") {
        return Decision::End;
    }

    if lower.contains("move") || lower.contains("option 2") || lower.contains("proceed") {
        for id in candidates {
            let label = graph.label(id).to_lowercase();
            if !label.is_empty() && lower.contains(&label) {
                return Decision::transition(id.clone());
            }
        }
        if candidates.len() == 1 {
            return Decision::transition(candidates[0].clone());
        }
    }

    Decision::Stay
}

/// Whole-word containment check, so "N1" doesn't match inside "N10".
fn mentions_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    match Regex::new(&format!(r"\b{}\b", regex::escape(word))) {
        Ok(re) => re.is_match(haystack),
        Err(_) => false,
    }
}
