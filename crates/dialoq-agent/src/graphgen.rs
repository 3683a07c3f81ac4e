use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use dialoq_core::config::ModelConfig;
use dialoq_core::error::Result;
use dialoq_core::traits::LlmClient;
use dialoq_core::types::ChatMessage;

/// Decomposes a task description into a flow description via the LLM.
///
/// The output is the line-oriented arrow format the flow parser consumes;
/// generation happens once, before the dialogue starts.
pub struct GraphGenerator {
    llm: Arc<dyn LlmClient>,
    config: ModelConfig,
}

impl GraphGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, config: ModelConfig) -> Self {
        Self { llm, config }
    }

    /// Ask the model to decompose `task` into a subtask flow description.
    pub async fn generate(&self, task: &str) -> Result<String> {
        let prompt = format!(
            r#"You are a sub-task dependency graph generator for a task-oriented dialogue system. Decompose the following task into a structured flow of dialogue subtasks.

Task Description: {}

Rules:
1. Decompose the task into 4-10 subtasks. The first subtask should greet the user; the last should close the conversation.
2. Output one item per line using exactly this format:
   - A node with its label: N1[Short Subtask Name]
   - A dependency edge: N1[Source Name] --> N2[Target Name]
   - A conditional edge: N2[Source Name] --> |accepts| N3[Target Name]
3. Node ids are N1, N2, N3, ... in order. Every subtask must be reachable from N1, and at least one subtask must have no outgoing edge.
4. Output ONLY the flow lines, no explanations and no code fences."#,
            task
        );

        let reply = self
            .llm
            .generate(&self.config, vec![ChatMessage::system(prompt)])
            .await?;

        let flow = strip_code_fence(&reply).to_string();
        info!(lines = flow.lines().count(), "Generated task flow");
        Ok(flow)
    }

    /// Write a generated flow description to `dir`, returning the file path.
    pub fn save_to_file(flow_text: &str, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let name = format!("flow_{}.txt", Utc::now().format("%Y%m%d_%H%M%S"));
        let path = dir.join(name);
        std::fs::write(&path, flow_text)?;
        Ok(path)
    }
}

/// Strip a surrounding markdown code fence, if the model added one anyway.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence_plain() {
        assert_eq!(strip_code_fence("N1 --> N2"), "N1 --> N2");
    }

    #[test]
    fn test_strip_code_fence_fenced() {
        let fenced = "```\nN1 --> N2\n```";
        assert_eq!(strip_code_fence(fenced), "N1 --> N2");
    }

    #[test]
    fn test_strip_code_fence_language_tag() {
        let fenced = "```mermaid\nN1[Greet]\nN1 --> N2[Collect]\n```";
        assert_eq!(strip_code_fence(fenced), "N1[Greet]\nN1 --> N2[Collect]");
    }

    #[test]
    fn test_save_to_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = GraphGenerator::save_to_file("N1 --> N2", dir.path()).unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(path).unwrap(), "N1 --> N2");
    }
}
